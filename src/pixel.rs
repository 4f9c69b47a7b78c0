//! # 像素缓冲区模块
//!
//! 定义核心算法操作的数据模型：按行优先、通道交错 (B, G, R) 存放的 [`PixelBuffer`]，
//! 以及由载体尺寸推导出的 [`CarrierGeometry`]。

use crate::constants::{CARRIER_CHANNELS, HEADER_CHANNELS, HEADER_PIXELS, MIN_CARRIER_PIXELS};
use crate::error::StegoError;

/// 图像尺寸：行数、列数与通道数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub rows: usize,
    pub cols: usize,
    pub channels: usize,
}

impl Dimensions {
    pub fn new(rows: usize, cols: usize, channels: usize) -> Self {
        Self {
            rows,
            cols,
            channels,
        }
    }

    /// 像素总数。
    pub fn pixels(&self) -> u64 {
        self.rows as u64 * self.cols as u64
    }

    /// 通道字节总数。
    pub fn bytes(&self) -> u64 {
        self.pixels() * self.channels as u64
    }

    /// 作为载荷写入时需要的总位数。
    pub fn payload_bits(&self) -> u64 {
        self.bytes() * 8
    }
}

/// 拥有所有权的连续像素数据，长度恒为 `rows * cols * channels`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    rows: usize,
    cols: usize,
    channels: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// 由已有数据构造缓冲区。
    ///
    /// # Errors
    ///
    /// 尺寸为零、通道数不是 1 或 3，或数据长度与尺寸不符时返回 [`StegoError::InvalidBuffer`]。
    pub fn new(rows: usize, cols: usize, channels: usize, data: Vec<u8>) -> Result<Self, StegoError> {
        let expected = rows.checked_mul(cols).and_then(|p| p.checked_mul(channels));
        let valid_channels = channels == 1 || channels == CARRIER_CHANNELS;
        if rows == 0 || cols == 0 || !valid_channels || expected != Some(data.len()) {
            return Err(StegoError::InvalidBuffer {
                rows,
                cols,
                channels,
                len: data.len(),
            });
        }
        Ok(Self {
            rows,
            cols,
            channels,
            data,
        })
    }

    /// 构造一个全零 (黑色) 的缓冲区。
    pub fn zeroed(rows: usize, cols: usize, channels: usize) -> Result<Self, StegoError> {
        let len = rows.saturating_mul(cols).saturating_mul(channels);
        Self::new(rows, cols, channels, vec![0; len])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.rows, self.cols, self.channels)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// 由载体尺寸推导出的两个常量。
///
/// 最后 7 个像素保留给头部，其余像素可承载数据。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarrierGeometry {
    available_pixels: usize,
}

impl CarrierGeometry {
    /// 像素数不足 8 个时返回 `None`。
    pub fn new(rows: usize, cols: usize) -> Option<Self> {
        let pixels = rows.checked_mul(cols)?;
        (pixels >= MIN_CARRIER_PIXELS).then(|| Self {
            available_pixels: pixels - HEADER_PIXELS,
        })
    }

    /// 可用于载荷的像素数 (`rows * cols - 7`)。
    pub fn available_pixels(&self) -> usize {
        self.available_pixels
    }

    /// 载荷可使用的通道数，即第一个头部通道的下标。
    pub fn usable_channels(&self) -> usize {
        self.available_pixels * CARRIER_CHANNELS
    }

    /// `AvailablePixels * 3 + 21`：头部区域之后的位置，其前一个通道是校验绑定字节。
    pub fn reserved_channel_count(&self) -> usize {
        self.usable_channels() + HEADER_CHANNELS
    }
}
