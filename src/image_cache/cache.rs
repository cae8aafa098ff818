//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageCache` 属于某个显示作用域（列表页、详情页），由作用域显式创建并持有，
//! 通过构造注入传给需要它的显示组件，不使用全局单例。
//!
//! 处理链路：
//! 1. `request` 在 UI 上下文中查存储，命中则同步返回 `Ready`
//! 2. 未命中且没有在途解码时，登记在途表并把解码交给后台
//! 3. `pump` 在 UI 上下文中取回结果：写入存储、按预算淘汰、发布终态
//!
//! ## 实现思路
//!
//! - 存储、在途表、失败表都只通过 `&mut self` 修改，天然不需要锁。
//! - 在途表 `ImageKey -> watch::Sender`：同一 key 的并发请求订阅同一个发送端，
//!   保证最多一次在途解码，所有观察者得到同一个终态位图。
//! - 失败的 key 会被记住，后续请求直接返回 `Failed`，不自动重试；
//!   调用方可用 `forget_failure` 显式重试。
//! - 作用域销毁（`close` 或 `Drop`）后到达的结果只计数并丢弃，不修改存储。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

use super::worker::{Completion, DecodeJob, WorkerContext};
use super::{
    Bitmap, CacheConfig, Decoder, ImageError, ImageHandle, ImageKey, LoadState, LruStore,
    ResourceStore, default_placeholder,
};

/// 缓存使用统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 当前条目数
    pub entries: usize,
    /// 当前占用字节数
    pub current_bytes: u64,
    /// 容量预算（字节）
    pub capacity_bytes: u64,
    /// 在途解码数
    pub in_flight: usize,
    pub hits: u64,
    /// 未命中次数，包含复用在途解码的请求
    pub misses: u64,
    /// 实际调度的解码次数
    pub decodes_started: u64,
    pub failures: u64,
    pub evictions: u64,
    /// 单个条目超出整体预算的写入次数
    pub oversized_insertions: u64,
    /// 作用域销毁后被丢弃的结果数
    pub discarded_completions: u64,
}

impl CacheStats {
    /// 命中率（0.0 ~ 1.0）。
    ///
    /// 只统计 `hits + misses`；已知失败、尺寸非法与销毁后的请求不计入。
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// 内存利用率（可能因超大条目短暂超过 1.0）。
    pub fn memory_utilization(&self) -> f64 {
        if self.capacity_bytes == 0 {
            0.0
        } else {
            self.current_bytes as f64 / self.capacity_bytes as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    decodes_started: u64,
    failures: u64,
    evictions: u64,
    oversized_insertions: u64,
    discarded_completions: u64,
}

/// 作用域级图片缓存。
pub struct ImageCache {
    config: CacheConfig,
    store: LruStore,
    in_flight: HashMap<ImageKey, watch::Sender<LoadState>>,
    failures: HashMap<ImageKey, ImageError>,
    completions: mpsc::UnboundedReceiver<Completion>,
    worker: WorkerContext,
    placeholder: Bitmap,
    counters: Counters,
    closed: bool,
}

impl ImageCache {
    /// 使用当前 tokio 运行时创建缓存。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use gallery_image_cache::image_cache::{BundledResources, CacheConfig, ImageCache};
    ///
    /// # async fn demo() -> Result<(), gallery_image_cache::image_cache::ImageError> {
    /// let resources = Arc::new(BundledResources::from_dir("assets/drawable")?);
    /// let mut cache = ImageCache::new(CacheConfig::default(), resources)?;
    /// let handle = cache.request("great_pyrenees", 360, 240);
    /// cache.settle().await;
    /// assert!(handle.is_loaded());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: CacheConfig, resources: Arc<dyn ResourceStore>) -> Result<Self, ImageError> {
        let runtime = Handle::try_current()
            .map_err(|e| ImageError::InvalidRequest(format!("当前线程没有 tokio 运行时：{}", e)))?;
        Self::with_runtime(config, resources, runtime)
    }

    /// 使用指定运行时创建缓存，解码任务会被调度到该运行时。
    pub fn with_runtime(
        config: CacheConfig,
        resources: Arc<dyn ResourceStore>,
        runtime: Handle,
    ) -> Result<Self, ImageError> {
        config.validate()?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = WorkerContext::new(
            runtime,
            resources,
            Decoder::new(&config),
            config.decode_timeout,
            sender,
        );

        log::info!(
            "🗂️ 图片缓存已创建 - 预算: {}KB 解码超时: {}ms",
            config.capacity_kb(),
            config.decode_timeout.as_millis()
        );

        Ok(Self {
            store: LruStore::new(config.capacity_bytes),
            config,
            in_flight: HashMap::new(),
            failures: HashMap::new(),
            completions: receiver,
            worker,
            placeholder: default_placeholder(),
            counters: Counters::default(),
            closed: false,
        })
    }

    /// 替换加载中与失败时显示的占位图。
    pub fn with_placeholder(mut self, placeholder: Bitmap) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// 请求 `key` 对应的图片，目标尺寸为 `width x height` 像素。
    ///
    /// 命中时同步返回 `Ready`；否则返回 `Pending`，终态由后续 `pump` 发布。
    /// 同一 key 的尺寸以首个请求为准。
    pub fn request(&mut self, key: impl Into<ImageKey>, width: u32, height: u32) -> ImageHandle {
        let key = key.into();

        if self.closed {
            return self.failed_handle(key, ImageError::Cancelled("图片缓存作用域已销毁".to_string()));
        }

        if width == 0 || height == 0 {
            return self.failed_handle(
                key,
                ImageError::InvalidRequest(format!("目标尺寸必须大于 0：{}x{}", width, height)),
            );
        }

        if let Some(bitmap) = self.store.get(&key) {
            self.counters.hits += 1;
            log::debug!("🎯 缓存命中 - key: {}", key);
            return ImageHandle::resolved(key, LoadState::Ready(bitmap));
        }

        if let Some(error) = self.failures.get(&key) {
            log::debug!("⛔ 已知失败，不重试 - key: {} 错误: {}", key, error);
            let error = error.clone();
            return self.failed_handle(key, error);
        }

        if let Some(sender) = self.in_flight.get(&key) {
            self.counters.misses += 1;
            log::debug!("🔗 复用在途解码 - key: {}", key);
            return ImageHandle::new(key, sender.subscribe());
        }

        self.counters.misses += 1;
        self.counters.decodes_started += 1;

        let (sender, receiver) = watch::channel(LoadState::Pending {
            placeholder: self.placeholder.clone(),
        });
        self.in_flight.insert(key.clone(), sender);

        log::debug!("🧵 缓存未命中，调度解码 - key: {} 目标: {}x{}", key, width, height);
        self.worker.spawn_decode(DecodeJob {
            key: key.clone(),
            width,
            height,
        });

        ImageHandle::new(key, receiver)
    }

    /// 以 dp 为单位请求，按 `display_density` 换算为像素。
    pub fn request_dp(&mut self, key: impl Into<ImageKey>, width_dp: f32, height_dp: f32) -> ImageHandle {
        let width = self.config.dp_to_px(width_dp);
        let height = self.config.dp_to_px(height_dp);
        self.request(key, width, height)
    }

    /// 非阻塞地取回所有已完成的解码并发布，返回处理的结果数。
    ///
    /// 适合在每帧开始时调用。
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.apply_completion(completion);
            processed += 1;
        }
        processed
    }

    /// 等待并处理下一个解码结果。
    ///
    /// 没有在途解码时立即返回 `false`。
    pub async fn process_next(&mut self) -> bool {
        if self.closed || self.in_flight.is_empty() {
            return self.pump() > 0;
        }

        match self.completions.recv().await {
            Some(completion) => {
                self.apply_completion(completion);
                true
            }
            None => false,
        }
    }

    /// 处理结果直到没有在途解码。
    pub async fn settle(&mut self) {
        while !self.in_flight.is_empty() && !self.closed {
            if !self.process_next().await {
                break;
            }
        }
        self.pump();
    }

    /// 忘记 `key` 的失败记录，下一次请求会重新解码。
    pub fn forget_failure(&mut self, key: impl Into<ImageKey>) -> bool {
        self.failures.remove(&key.into()).is_some()
    }

    /// 是否已缓存（不刷新最近使用顺序）。
    pub fn contains(&self, key: impl Into<ImageKey>) -> bool {
        self.store.contains(&key.into())
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.store.len(),
            current_bytes: self.store.current_bytes(),
            capacity_bytes: self.store.capacity_bytes(),
            in_flight: self.in_flight.len(),
            hits: self.counters.hits,
            misses: self.counters.misses,
            decodes_started: self.counters.decodes_started,
            failures: self.counters.failures,
            evictions: self.counters.evictions,
            oversized_insertions: self.counters.oversized_insertions,
            discarded_completions: self.counters.discarded_completions,
        }
    }

    /// 销毁作用域：清空存储，在途请求以 `Cancelled` 结束，之后到达的结果被丢弃。
    ///
    /// 正在执行的解码不会被打断，只是其完成效果被抑制。
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        for (key, sender) in self.in_flight.drain() {
            log::debug!("🛑 作用域销毁，取消在途请求 - key: {}", key);
            sender.send_replace(LoadState::Failed {
                error: ImageError::Cancelled(format!("{} 的作用域已销毁", key)),
                placeholder: self.placeholder.clone(),
            });
        }

        let entries = self.store.len();
        self.store.clear();
        self.failures.clear();

        log::info!("🧹 图片缓存作用域已销毁 - 释放条目: {}", entries);
    }

    fn failed_handle(&self, key: ImageKey, error: ImageError) -> ImageHandle {
        ImageHandle::resolved(
            key,
            LoadState::Failed {
                error,
                placeholder: self.placeholder.clone(),
            },
        )
    }

    fn apply_completion(&mut self, completion: Completion) {
        let Completion { key, result, elapsed } = completion;

        if self.closed {
            self.counters.discarded_completions += 1;
            log::debug!("🗑️ 作用域已销毁，丢弃解码结果 - key: {}", key);
            return;
        }

        let sender = self.in_flight.remove(&key);

        let state = match result {
            Ok(bitmap) => {
                let outcome = self.store.insert(key.clone(), bitmap.clone());
                self.counters.evictions += outcome.evicted.len() as u64;
                if outcome.oversized {
                    self.counters.oversized_insertions += 1;
                }

                log::debug!(
                    "📥 已写入缓存 - key: {} 耗时: {}ms 淘汰: {} 占用: {}KB/{}KB",
                    key,
                    elapsed.as_millis(),
                    outcome.evicted.len(),
                    self.store.current_bytes() / 1024,
                    self.store.capacity_bytes() / 1024
                );

                LoadState::Ready(bitmap)
            }
            Err(error) => {
                self.counters.failures += 1;
                log::warn!(
                    "❌ 图片加载失败 - key: {} 错误: {} 耗时: {}ms",
                    key,
                    error,
                    elapsed.as_millis()
                );
                self.failures.insert(key.clone(), error.clone());

                LoadState::Failed {
                    error,
                    placeholder: self.placeholder.clone(),
                }
            }
        };

        if let Some(sender) = sender {
            sender.send_replace(state);
        }
    }
}

impl Drop for ImageCache {
    fn drop(&mut self) {
        self.close();
    }
}
