//! # 图库图片缓存 — 演示入口
//!
//! 本文件仅负责日志初始化、参数解析与一次“滚动列表”模拟。
//! 缓存逻辑分布在 `image_cache` 子模块中，详见 `lib.rs` 架构文档。
//!
//! 用法：`gallery-image-cache <assets_dir> [catalog.json]`
//!
//! 环境变量 `GALLERY_MAX_MEMORY_MB` 指定可用内存，缓存预算取其 1/8。

use std::process::ExitCode;
use std::sync::Arc;

use gallery_image_cache::catalog::Catalog;
use gallery_image_cache::error::AppError;
use gallery_image_cache::image_cache::{BundledResources, CacheConfig, ImageCache};

const THUMBNAIL_DP: f32 = 160.0;
const MAX_MEMORY_ENV: &str = "GALLERY_MAX_MEMORY_MB";

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("运行失败: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<CacheConfig, AppError> {
    match std::env::var(MAX_MEMORY_ENV) {
        Ok(value) => Ok(CacheConfig::from_max_memory(parse_max_memory_mb(&value)?)),
        Err(_) => Ok(CacheConfig::default()),
    }
}

/// 把 MB 数解析为字节数。
fn parse_max_memory_mb(value: &str) -> Result<u64, AppError> {
    let megabytes: u64 = value
        .trim()
        .parse()
        .map_err(|e| AppError::Usage(format!("{MAX_MEMORY_ENV} 不是有效数字: {e}")))?;

    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| AppError::Usage(format!("{MAX_MEMORY_ENV} 数值过大: {megabytes}")))
}

async fn run() -> Result<(), AppError> {
    let mut args = std::env::args().skip(1);
    let assets_dir = args
        .next()
        .ok_or_else(|| AppError::Usage("用法: gallery-image-cache <assets_dir> [catalog.json]".to_string()))?;

    let resources = BundledResources::from_dir(&assets_dir)?;
    let keys: Vec<String> = match args.next() {
        Some(catalog_path) => Catalog::from_path(catalog_path)?
            .summaries()
            .map(|(_, image_key, _)| image_key.to_string())
            .collect(),
        None => resources.names().map(str::to_string).collect(),
    };

    let mut cache = ImageCache::new(load_config()?, Arc::new(resources))?;

    // 第二轮模拟“滚动回来”，预算足够时应全部命中
    for pass in 1..=2 {
        let handles: Vec<_> = keys
            .iter()
            .map(|key| cache.request_dp(key.as_str(), THUMBNAIL_DP, THUMBNAIL_DP))
            .collect();
        cache.settle().await;

        let loaded = handles.iter().filter(|handle| handle.is_loaded()).count();
        log::info!("第 {} 轮：{}/{} 张图片已就绪", pass, loaded, handles.len());
    }

    let stats = cache.stats();
    println!(
        "entries={} memory={}KB/{}KB hits={} misses={} decodes={} failures={} evictions={} hit_rate={:.2}%",
        stats.entries,
        stats.current_bytes / 1024,
        stats.capacity_bytes / 1024,
        stats.hits,
        stats.misses,
        stats.decodes_started,
        stats.failures,
        stats.evictions,
        stats.hit_rate() * 100.0
    );

    cache.close();
    Ok(())
}
