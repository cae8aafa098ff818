//! # 解码器模块
//!
//! ## 设计思路
//!
//! 两阶段解码，尽量不为最终会缩小显示的大图分配全尺寸像素缓冲：
//! 1. 只读 header，拿到 `(out_width, out_height)`
//! 2. 计算 2 的幂采样因子 `n`
//! 3. 按 `n` 完整解码，结果接近但不小于请求的包围盒
//!
//! 解码器是纯同步、无共享状态的，只在后台工作线程中调用。

use image::imageops::FilterType;

use super::{Bitmap, CacheConfig, ImageError, ResourceId, ResourceStore};

/// 计算采样因子（inSampleSize）。
///
/// 原图在两个方向上都不大于请求尺寸时返回 1；否则从 1 开始翻倍，
/// 直到 `(out_height / 2) / n >= req_height && (out_width / 2) / n >= req_width` 不再成立。
/// 由于判断基于半尺寸，返回的 `n` 仍满足 `out / n >= req`，解码结果不会小于请求尺寸。
///
/// # 示例
/// ```rust
/// use gallery_image_cache::image_cache::calculate_sample_size;
///
/// assert_eq!(calculate_sample_size(4000, 3000, 400, 300), 8);
/// assert_eq!(calculate_sample_size(300, 200, 400, 300), 1);
/// ```
pub fn calculate_sample_size(out_width: u32, out_height: u32, req_width: u32, req_height: u32) -> u32 {
    let req_width = req_width.max(1);
    let req_height = req_height.max(1);
    let mut sample_size = 1;

    if out_height > req_height || out_width > req_width {
        let half_height = out_height / 2;
        let half_width = out_width / 2;

        while half_height / sample_size >= req_height && half_width / sample_size >= req_width {
            sample_size *= 2;
        }
    }

    sample_size
}

/// 按目标包围盒解码资源。
#[derive(Debug, Clone)]
pub struct Decoder {
    max_decoded_pixels: u64,
    filter: FilterType,
}

impl Decoder {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            max_decoded_pixels: config.max_decoded_pixels,
            filter: config.resize_filter,
        }
    }

    /// 解码 `id` 并降采样到约 `req_width x req_height`。
    pub fn decode(
        &self,
        store: &dyn ResourceStore,
        id: ResourceId,
        req_width: u32,
        req_height: u32,
    ) -> Result<Bitmap, ImageError> {
        if req_width == 0 || req_height == 0 {
            return Err(ImageError::InvalidRequest(format!(
                "目标尺寸必须大于 0：{}x{}",
                req_width, req_height
            )));
        }

        let (out_width, out_height) = store.decode_bounds(id)?;
        if out_width == 0 || out_height == 0 {
            return Err(ImageError::Decode(format!(
                "资源 {} 尺寸为零：{}x{}",
                id, out_width, out_height
            )));
        }
        self.validate_pixel_limits(out_width, out_height)?;

        let sample_size = calculate_sample_size(out_width, out_height, req_width, req_height);
        let bitmap = store.decode_scaled(id, sample_size, self.filter)?;

        log::debug!(
            "🖼️ 资源 {} 原始 {}x{} 请求 {}x{} 采样 {} 输出 {}x{}",
            id,
            out_width,
            out_height,
            req_width,
            req_height,
            sample_size,
            bitmap.width(),
            bitmap.height()
        );

        Ok(bitmap)
    }

    /// 校验 header 像素数量是否超过配置上限。
    fn validate_pixel_limits(&self, width: u32, height: u32) -> Result<(), ImageError> {
        let pixels = u64::from(width) * u64::from(height);

        if pixels > self.max_decoded_pixels {
            return Err(ImageError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, self.max_decoded_pixels
            )));
        }

        Ok(())
    }
}
