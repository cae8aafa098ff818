//! # 键与位图模型
//!
//! ## 设计思路
//!
//! 将“外部标识”和“解码结果”解耦：
//! - `ImageKey` 表示逻辑图片名，决定缓存命中
//! - `ResourceId` 表示打包资源句柄，由 `ResourceStore` 解析得到
//! - `Bitmap` 表示已解码的 RGBA8 像素，克隆只增加引用计数

use std::fmt;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use once_cell::sync::Lazy;

/// 缓存键：逻辑图片名。
///
/// 同一资源的不同目标尺寸共用同一个键，先到者决定尺寸。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageKey(Arc<str>);

impl ImageKey {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageKey {
    fn from(name: &str) -> Self {
        Self(Arc::from(name))
    }
}

impl From<String> for ImageKey {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&ImageKey> for ImageKey {
    fn from(key: &ImageKey) -> Self {
        key.clone()
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 打包资源句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res-{}", self.0)
    }
}

/// 已解码的 RGBA8 位图。
#[derive(Debug, Clone)]
pub struct Bitmap {
    image: Arc<RgbaImage>,
}

impl Bitmap {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// 生成纯色位图，宽高至少为 1。
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::new(RgbaImage::from_pixel(width.max(1), height.max(1), Rgba(rgba)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// 像素缓冲实际占用的字节数（RGBA8 即 `width * height * 4`）。
    pub fn byte_count(&self) -> u64 {
        self.image.as_raw().len() as u64
    }

    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// 两个句柄是否指向同一份像素。
    pub fn ptr_eq(&self, other: &Bitmap) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

static DEFAULT_PLACEHOLDER: Lazy<Bitmap> = Lazy::new(|| Bitmap::solid(16, 16, [0xDD, 0xDD, 0xDD, 0xFF]));

/// 默认占位图：加载中与加载失败时显示。
pub fn default_placeholder() -> Bitmap {
    DEFAULT_PLACEHOLDER.clone()
}
