//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `CacheConfig`，保证缓存行为可观测、可调整、可测试。
//! 容量预算（Budget）是其中最重要的参数：构造时一次性确定，缓存生命周期内不变。
//!
//! ## 实现思路
//!
//! - `Default` 提供可直接使用的配置，容量取 `DEFAULT_MAX_MEMORY_BYTES / MEMORY_FRACTION`。
//! - `from_max_memory` 接收调用方上报的最大堆内存，不依赖任何运行时内存接口。
//! - `validate` 在构造缓存前拒绝无意义的参数组合。
//!
//! 容量只是粗略的启发式值，并不保证不会 OOM。

use std::time::Duration;

use image::imageops::FilterType;

use super::ImageError;

/// 容量取最大可用内存的 1/8。
pub const MEMORY_FRACTION: u64 = 8;

/// 未提供最大内存时的假定值（512MB，容量即 64MB）。
pub const DEFAULT_MAX_MEMORY_BYTES: u64 = 512 * 1024 * 1024;

/// RGBA8 每像素字节数，位图统一使用该格式。
pub const RGBA_BYTES_PER_PIXEL: u32 = 4;

/// 图片缓存配置。
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// 缓存容量预算（字节）。
    pub capacity_bytes: u64,
    /// 解码前按 header 尺寸拦截的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 单次解码允许的最长耗时，超时后请求进入 `Failed`。
    pub decode_timeout: Duration,
    /// 显示密度，`request_dp` 用它把 dp 换算为像素。
    pub display_density: f32,
    /// 应用采样因子时使用的缩放滤镜，经 `Decoder` 传给 `ResourceStore::decode_scaled`。
    pub resize_filter: FilterType,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: DEFAULT_MAX_MEMORY_BYTES / MEMORY_FRACTION,
            max_decoded_pixels: 40_000_000,
            decode_timeout: Duration::from_secs(10),
            display_density: 1.0,
            resize_filter: FilterType::Triangle,
        }
    }
}

impl CacheConfig {
    /// 按调用方上报的最大内存计算容量（1/8）。
    ///
    /// # 示例
    /// ```rust
    /// use gallery_image_cache::image_cache::CacheConfig;
    ///
    /// let config = CacheConfig::from_max_memory(256 * 1024 * 1024);
    /// assert_eq!(config.capacity_bytes, 32 * 1024 * 1024);
    /// ```
    pub fn from_max_memory(max_memory_bytes: u64) -> Self {
        Self {
            capacity_bytes: max_memory_bytes / MEMORY_FRACTION,
            ..Self::default()
        }
    }

    /// 以 KB 表示的容量。
    pub fn capacity_kb(&self) -> u64 {
        self.capacity_bytes / 1024
    }

    /// 把 dp 尺寸换算为像素，至少为 1。
    pub(crate) fn dp_to_px(&self, dp: f32) -> u32 {
        let px = (dp * self.display_density).round();
        if px.is_finite() && px >= 1.0 {
            px.min(u32::MAX as f32) as u32
        } else {
            1
        }
    }

    /// 校验配置是否可用。
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.capacity_bytes == 0 {
            return Err(ImageError::InvalidRequest("capacity_bytes 不能为 0".to_string()));
        }
        if self.max_decoded_pixels == 0 {
            return Err(ImageError::InvalidRequest("max_decoded_pixels 不能为 0".to_string()));
        }
        if self.decode_timeout.is_zero() {
            return Err(ImageError::InvalidRequest("decode_timeout 不能为 0".to_string()));
        }
        if !(self.display_density.is_finite() && self.display_density > 0.0) {
            return Err(ImageError::InvalidRequest(format!(
                "display_density 必须为正数：{}",
                self.display_density
            )));
        }
        Ok(())
    }
}
