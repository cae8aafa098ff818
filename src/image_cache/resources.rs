//! # 资源存储模块
//!
//! ## 设计思路
//!
//! `ResourceStore` 是缓存与“打包资源”之间唯一的接缝：
//! - `resolve_resource_id`：逻辑名 → 资源句柄
//! - `decode_bounds`：只读 header 尺寸
//! - `decode_scaled`：按采样因子完整解码
//!
//! 三者都是同步阻塞调用，只允许在后台工作线程中执行。
//!
//! `BundledResources` 是默认实现：编码后的字节常驻内存，解码走 `pipeline`。

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use image::imageops::FilterType;

use super::pipeline;
use super::{Bitmap, ImageError, ResourceId};

const SUPPORTED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "gif", "bmp"];

/// 打包资源存储接口。
pub trait ResourceStore: Send + Sync {
    /// 把逻辑名解析为资源句柄。
    fn resolve_resource_id(&self, image_key: &str) -> Result<ResourceId, ImageError>;

    /// 读取资源的原始宽高，不分配像素缓冲。
    fn decode_bounds(&self, id: ResourceId) -> Result<(u32, u32), ImageError>;

    /// 以 `sample_size` 为采样因子完整解码，`filter` 用于缩小。
    fn decode_scaled(
        &self,
        id: ResourceId,
        sample_size: u32,
        filter: FilterType,
    ) -> Result<Bitmap, ImageError>;
}

struct BundledAsset {
    name: String,
    bytes: Arc<[u8]>,
}

/// 内存中的打包资源集合。
pub struct BundledResources {
    ids: HashMap<String, ResourceId>,
    assets: Vec<BundledAsset>,
}

impl Default for BundledResources {
    fn default() -> Self {
        Self::new()
    }
}

impl BundledResources {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            assets: Vec::new(),
        }
    }

    /// 注册一份编码后的图片；同名资源会被替换但保留原句柄。
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> ResourceId {
        let name = name.into();
        let bytes = bytes.into();

        if let Some(&id) = self.ids.get(&name) {
            self.assets[id.0 as usize].bytes = bytes;
            return id;
        }

        let id = ResourceId(self.assets.len() as u32);
        self.ids.insert(name.clone(), id);
        self.assets.push(BundledAsset { name, bytes });
        id
    }

    /// 从目录加载所有受支持的图片，以文件名（不含扩展名）作为逻辑名。
    ///
    /// 文件按名称排序后注册，保证句柄在多次启动间稳定。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use gallery_image_cache::image_cache::BundledResources;
    ///
    /// let resources = BundledResources::from_dir("assets/drawable")?;
    /// println!("loaded {} images", resources.len());
    /// # Ok::<(), gallery_image_cache::image_cache::ImageError>(())
    /// ```
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ImageError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir)
            .map_err(|e| ImageError::FileSystem(format!("读取资源目录失败 {}：{}", dir.display(), e)))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| ImageError::FileSystem(format!("遍历资源目录失败：{}", e)))?
                .path();

            let supported = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if !supported || !path.is_file() {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                files.push((stem.to_string(), path.clone()));
            }
        }
        files.sort();

        let mut resources = Self::new();
        for (name, path) in files {
            let bytes = fs::read(&path)
                .map_err(|e| ImageError::FileSystem(format!("读取资源失败 {}：{}", path.display(), e)))?;
            resources.insert(name, bytes);
        }

        log::info!("📦 已加载打包资源 {} 个 - 目录: {}", resources.len(), dir.display());
        Ok(resources)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// 按句柄顺序返回所有逻辑名。
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(|asset| asset.name.as_str())
    }

    fn asset(&self, id: ResourceId) -> Result<&BundledAsset, ImageError> {
        self.assets
            .get(id.0 as usize)
            .ok_or_else(|| ImageError::ResourceNotFound(format!("未知资源句柄：{}", id)))
    }
}

impl ResourceStore for BundledResources {
    fn resolve_resource_id(&self, image_key: &str) -> Result<ResourceId, ImageError> {
        self.ids
            .get(image_key)
            .copied()
            .ok_or_else(|| ImageError::ResourceNotFound(image_key.to_string()))
    }

    fn decode_bounds(&self, id: ResourceId) -> Result<(u32, u32), ImageError> {
        pipeline::inspect_dimensions(&self.asset(id)?.bytes)
    }

    fn decode_scaled(
        &self,
        id: ResourceId,
        sample_size: u32,
        filter: FilterType,
    ) -> Result<Bitmap, ImageError> {
        pipeline::decode_sampled(&self.asset(id)?.bytes, sample_size, filter)
    }
}
