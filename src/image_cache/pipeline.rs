//! # 编解码流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 尺寸 → 像素”的过程集中管理，供 `ResourceStore` 实现复用。
//! 读取尺寸只解析 header，不分配像素缓冲；完整解码后立即按采样因子缩小。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 完整解码
//! 3. 按采样因子计算目标尺寸 `max(1, w / n) x max(1, h / n)`
//! 4. 优先使用 `fast_image_resize`，失败时回退 `image::imageops::resize`
//! 5. 校验 RGBA 字节长度一致性

use std::io::Cursor;

use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{GenericImageView, ImageReader, RgbaImage};

use super::config::RGBA_BYTES_PER_PIXEL;
use super::{Bitmap, ImageError};

/// 仅通过图片头信息读取宽高。
pub(crate) fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

    if reader.format().is_none() {
        return Err(ImageError::InvalidFormat("无法识别图片格式".to_string()));
    }

    reader
        .into_dimensions()
        .map_err(|e| ImageError::Decode(format!("无法读取图片尺寸：{}", e)))
}

/// 完整解码并按采样因子缩小。
pub(crate) fn decode_sampled(
    bytes: &[u8],
    sample_size: u32,
    filter: FilterType,
) -> Result<Bitmap, ImageError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;

    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageError::Decode(format!("图片尺寸为零：{}x{}", width, height)));
    }

    let sample_size = sample_size.max(1);
    let target_width = (width / sample_size).max(1);
    let target_height = (height / sample_size).max(1);

    // 已是 RGBA8 时 into_rgba8 不复制像素
    let src = decoded.into_rgba8();
    let rgba = if sample_size == 1 {
        src
    } else {
        match resize_with_fast_image_resize(&src, target_width, target_height, filter) {
            Ok(resized) => resized,
            Err(err) => {
                log::warn!(
                    "⚠️ fast_image_resize 降采样失败，回退 image::imageops::resize：{}",
                    err
                );
                image::imageops::resize(&src, target_width, target_height, filter)
            }
        }
    };

    let expected_len = (rgba.width() as usize)
        .checked_mul(rgba.height() as usize)
        .and_then(|pixels| pixels.checked_mul(RGBA_BYTES_PER_PIXEL as usize))
        .ok_or_else(|| ImageError::ResourceLimit("图片尺寸导致内存溢出风险".to_string()))?;

    if rgba.as_raw().len() != expected_len {
        return Err(ImageError::Decode("解码后像素数据长度异常".to_string()));
    }

    log::debug!(
        "🧩 采样解码：{}x{} -> {}x{}（inSampleSize={}）",
        width,
        height,
        rgba.width(),
        rgba.height(),
        sample_size
    );

    Ok(Bitmap::new(rgba))
}

fn resize_with_fast_image_resize(
    src: &RgbaImage,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<RgbaImage, ImageError> {
    let (src_width, src_height) = src.dimensions();

    let src_image = fr::images::ImageRef::new(src_width, src_height, src.as_raw(), fr::PixelType::U8x4)
        .map_err(|e| ImageError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| ImageError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    RgbaImage::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| ImageError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}
