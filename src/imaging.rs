//! # 图像读写与变换模块
//!
//! 核心算法只与 [`ImageCodec`] 和 [`ImageTransform`] 两个能力接口打交道，
//! [`ImageRs`] 使用 `image` crate 实现它们。内存中的像素顺序为 B, G, R，
//! 在读写边界处与 `image` 的 R, G, B 顺序互相转换。

use crate::constants::CARRIER_CHANNELS;
use crate::error::StegoError;
use crate::logger::Logger;
use crate::pixel::PixelBuffer;
use colored::Colorize;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageError, RgbImage};
use std::path::{Path, PathBuf};

/// 图像文件的读写能力。
pub trait ImageCodec {
    /// 以 8 位彩色图像读取文件。
    fn load(&self, path: &Path) -> Result<PixelBuffer, ImageError>;

    /// 按文件扩展名决定的格式保存图像。
    fn save(&self, buffer: &PixelBuffer, path: &Path) -> Result<(), ImageError>;
}

/// 像素重采样与颜色转换能力。
pub trait ImageTransform {
    /// 面积平均缩放，适合缩小。
    fn resize_area(&self, buffer: &PixelBuffer, fx: f64, fy: f64) -> Result<PixelBuffer, StegoError>;

    /// 高质量 (Lanczos) 缩放，适合放大。
    fn resize_high_quality(
        &self,
        buffer: &PixelBuffer,
        fx: f64,
        fy: f64,
    ) -> Result<PixelBuffer, StegoError>;

    /// 转换为单通道灰度图像。
    fn to_grayscale(&self, buffer: &PixelBuffer) -> Result<PixelBuffer, StegoError>;
}

/// 基于 `image` crate 的实现。
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRs;

/// 按系数缩放后的尺寸，四舍五入且至少为 1。
pub fn scaled_dimension(dimension: usize, factor: f64) -> u32 {
    let scaled = (dimension as f64 * factor).round();
    if scaled < 1.0 {
        1
    } else if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        scaled as u32
    }
}

fn swap_red_blue(data: &mut [u8]) {
    data.chunks_exact_mut(CARRIER_CHANNELS)
        .for_each(|pixel| pixel.swap(0, 2));
}

fn invalid(buffer: &PixelBuffer) -> StegoError {
    StegoError::InvalidBuffer {
        rows: buffer.rows(),
        cols: buffer.cols(),
        channels: buffer.channels(),
        len: buffer.data().len(),
    }
}

fn to_dynamic(buffer: &PixelBuffer) -> Result<DynamicImage, StegoError> {
    let width = u32::try_from(buffer.cols()).map_err(|_| invalid(buffer))?;
    let height = u32::try_from(buffer.rows()).map_err(|_| invalid(buffer))?;
    if buffer.channels() == 1 {
        return GrayImage::from_raw(width, height, buffer.data().to_vec())
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(|| invalid(buffer));
    }
    let mut rgb = buffer.data().to_vec();
    swap_red_blue(&mut rgb);
    RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| invalid(buffer))
}

fn from_dynamic(image: DynamicImage, channels: usize) -> Result<PixelBuffer, StegoError> {
    let (rows, cols) = (image.height() as usize, image.width() as usize);
    if channels == 1 {
        return PixelBuffer::new(rows, cols, 1, image.into_luma8().into_raw());
    }
    let mut data = image.into_rgb8().into_raw();
    swap_red_blue(&mut data);
    PixelBuffer::new(rows, cols, CARRIER_CHANNELS, data)
}

impl ImageCodec for ImageRs {
    fn load(&self, path: &Path) -> Result<PixelBuffer, ImageError> {
        let image = image::open(path)?;
        let (rows, cols) = (image.height() as usize, image.width() as usize);
        let mut data = image.into_rgb8().into_raw();
        swap_red_blue(&mut data);
        PixelBuffer::new(rows, cols, CARRIER_CHANNELS, data).map_err(|err| {
            ImageError::Decoding(image::error::DecodingError::new(
                image::error::ImageFormatHint::Unknown,
                err,
            ))
        })
    }

    fn save(&self, buffer: &PixelBuffer, path: &Path) -> Result<(), ImageError> {
        let image = to_dynamic(buffer).map_err(|err| {
            ImageError::Encoding(image::error::EncodingError::new(
                image::error::ImageFormatHint::Unknown,
                err,
            ))
        })?;
        image.save(path)
    }
}

impl ImageTransform for ImageRs {
    fn resize_area(&self, buffer: &PixelBuffer, fx: f64, fy: f64) -> Result<PixelBuffer, StegoError> {
        let width = scaled_dimension(buffer.cols(), fx);
        let height = scaled_dimension(buffer.rows(), fy);
        let resized = to_dynamic(buffer)?.thumbnail_exact(width, height);
        from_dynamic(resized, buffer.channels())
    }

    fn resize_high_quality(
        &self,
        buffer: &PixelBuffer,
        fx: f64,
        fy: f64,
    ) -> Result<PixelBuffer, StegoError> {
        let width = scaled_dimension(buffer.cols(), fx);
        let height = scaled_dimension(buffer.rows(), fy);
        let resized = to_dynamic(buffer)?.resize_exact(width, height, FilterType::Lanczos3);
        from_dynamic(resized, buffer.channels())
    }

    fn to_grayscale(&self, buffer: &PixelBuffer) -> Result<PixelBuffer, StegoError> {
        if buffer.channels() == 1 {
            return Ok(buffer.clone());
        }
        let gray = to_dynamic(buffer)?.to_luma8();
        from_dynamic(DynamicImage::ImageLuma8(gray), 1)
    }
}

/// 保存图像；若目标路径无法写入，则在工作目录中以 `fallback` 为文件名重试。
///
/// 返回实际写入的路径。
///
/// # Errors
///
/// 两次保存都失败时返回 [`StegoError::OutputWriteFailed`]，内存中的结果不受影响。
pub fn save_with_fallback<C: ImageCodec + ?Sized>(
    codec: &C,
    buffer: &PixelBuffer,
    requested: &Path,
    fallback: &str,
    logger: &Logger,
) -> Result<PathBuf, StegoError> {
    let err = match codec.save(buffer, requested) {
        Ok(()) => {
            logger.log(format!(
                "Image saved at - {}",
                requested.to_string_lossy().green().bold()
            ));
            return Ok(requested.to_path_buf());
        }
        Err(err) => err,
    };

    logger.error(format!(
        "Cannot save the output file with the given name: {} ({err})",
        requested.to_string_lossy().red().bold()
    ));
    logger.log(format!("Saving as {fallback} in the working directory"));

    let fallback = PathBuf::from(fallback);
    codec
        .save(buffer, &fallback)
        .map_err(|source| StegoError::OutputWriteFailed {
            path: fallback.clone(),
            source,
        })?;
    logger.log(format!(
        "Image saved at - {}",
        fallback.to_string_lossy().green().bold()
    ));
    Ok(fallback)
}
