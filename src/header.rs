//! # 头部编解码模块
//!
//! 头部描述符共 5 字节：
//!
//! | 字节 | 内容 |
//! | --- | --- |
//! | 0 | 载荷行数高 8 位 |
//! | 1 | 载荷行数低 8 位 |
//! | 2 | 灰度标志 (最高位) + 载荷列数高 7 位 |
//! | 3 | 载荷列数低 8 位 |
//! | 4 | 校验和 |
//!
//! 描述符以每通道 2 bit、高位在前的方式写入载体最后 7 个像素的前 20 个通道。
//! 第 21 个通道 (载体的最后一个字节) 从不改写，校验和将描述符与它绑定在一起。

use crate::constants::{
    CARRIER_CHANNELS, HEADER_BITS_PER_CHANNEL, HEADER_BYTES, HEADER_CHANNELS, MAX_DIMENSION,
    MAX_PAYLOAD_COLS,
};
use crate::error::{ImageRole, StegoError};
use crate::pixel::{CarrierGeometry, Dimensions, PixelBuffer};
use std::ops::Range;

const GRAYSCALE_FLAG: u8 = 0x80;
const GROUPS_PER_BYTE: usize = 8 / HEADER_BITS_PER_CHANNEL;
const GROUP_MASK: u8 = 0b11;

/// 载荷的尺寸与颜色模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderDescriptor {
    rows: u16,
    cols: u16,
    grayscale: bool,
}

impl HeaderDescriptor {
    /// 由载荷的实际尺寸构造描述符。
    ///
    /// # Errors
    ///
    /// * 行数超过 65535 或列数超过 32767 时返回 [`StegoError::ImageTooLarge`]。
    /// * 通道数不是 1 或 3 时返回 [`StegoError::UnsupportedChannels`]。
    pub fn for_payload(payload: Dimensions) -> Result<Self, StegoError> {
        let grayscale = match payload.channels {
            1 => true,
            CARRIER_CHANNELS => false,
            channels => {
                return Err(StegoError::UnsupportedChannels {
                    role: ImageRole::Payload,
                    channels,
                });
            }
        };
        let too_large = || StegoError::ImageTooLarge {
            role: ImageRole::Payload,
            rows: payload.rows,
            cols: payload.cols,
            max_rows: MAX_DIMENSION,
            max_cols: MAX_PAYLOAD_COLS,
        };
        let rows = u16::try_from(payload.rows).map_err(|_| too_large())?;
        let cols = u16::try_from(payload.cols)
            .ok()
            .filter(|&cols| usize::from(cols) <= MAX_PAYLOAD_COLS)
            .ok_or_else(too_large)?;
        Ok(Self {
            rows,
            cols,
            grayscale,
        })
    }

    pub fn rows(&self) -> usize {
        usize::from(self.rows)
    }

    pub fn cols(&self) -> usize {
        usize::from(self.cols)
    }

    /// 载荷的尺寸 (灰度为 1 通道，否则为 3 通道)。
    pub fn dimensions(&self) -> Dimensions {
        let channels = if self.grayscale { 1 } else { CARRIER_CHANNELS };
        Dimensions::new(self.rows(), self.cols(), channels)
    }

    fn descriptor_bytes(&self) -> [u8; 4] {
        let [rows_hi, rows_lo] = self.rows.to_be_bytes();
        let [cols_hi, cols_lo] = self.cols.to_be_bytes();
        let flag = if self.grayscale { GRAYSCALE_FLAG } else { 0 };
        [rows_hi, rows_lo, flag | (cols_hi & !GRAYSCALE_FLAG), cols_lo]
    }

    fn from_descriptor_bytes(bytes: [u8; 4]) -> Self {
        Self {
            rows: u16::from_be_bytes([bytes[0], bytes[1]]),
            cols: u16::from_be_bytes([bytes[2] & !GRAYSCALE_FLAG, bytes[3]]),
            grayscale: bytes[2] & GRAYSCALE_FLAG != 0,
        }
    }
}

fn checksum(descriptor: &[u8; 4], binding: u8) -> u8 {
    descriptor.iter().fold(binding, |acc, byte| acc ^ byte)
}

/// 头部占用的通道区间 (含校验绑定通道)。
///
/// # Errors
///
/// 载体不是 3 通道时返回 [`StegoError::UnsupportedChannels`]，
/// 像素数不足 8 个时返回 [`StegoError::CarrierTooSmall`]。
fn header_region(carrier: &PixelBuffer) -> Result<Range<usize>, StegoError> {
    if carrier.channels() != CARRIER_CHANNELS {
        return Err(StegoError::UnsupportedChannels {
            role: ImageRole::Carrier,
            channels: carrier.channels(),
        });
    }
    let geometry = CarrierGeometry::new(carrier.rows(), carrier.cols()).ok_or(
        StegoError::CarrierTooSmall {
            pixels: carrier.rows() * carrier.cols(),
        },
    )?;
    Ok(geometry.usable_channels()..geometry.reserved_channel_count())
}

/// 将描述符写入载体的头部通道，原地修改 20 个字节。
///
/// # Errors
///
/// 载体不是 3 通道时返回 [`StegoError::UnsupportedChannels`]，
/// 像素数不足 8 个时返回 [`StegoError::CarrierTooSmall`]。
pub fn write(carrier: &mut PixelBuffer, descriptor: &HeaderDescriptor) -> Result<(), StegoError> {
    let region = header_region(carrier)?;
    let channels = &mut carrier.data_mut()[region];
    let (slots, binding) = channels.split_at_mut(HEADER_CHANNELS - 1);
    let descriptor_bytes = descriptor.descriptor_bytes();

    let mut bytes = [0u8; HEADER_BYTES];
    bytes[..4].copy_from_slice(&descriptor_bytes);
    bytes[4] = checksum(&descriptor_bytes, binding[0]);

    for (index, slot) in slots.iter_mut().enumerate() {
        let byte = bytes[index / GROUPS_PER_BYTE];
        let shift = HEADER_BITS_PER_CHANNEL * (GROUPS_PER_BYTE - 1 - index % GROUPS_PER_BYTE);
        *slot = (*slot & !GROUP_MASK) | ((byte >> shift) & GROUP_MASK);
    }

    Ok(())
}

/// 读取并校验载体中的头部描述符，不修改载体。
///
/// # Errors
///
/// 载体不可能包含头部、校验和不符或描述了零尺寸的载荷时返回 [`StegoError::NoEmbeddedData`]。
pub fn read(carrier: &PixelBuffer) -> Result<HeaderDescriptor, StegoError> {
    let region = header_region(carrier).map_err(|_| StegoError::NoEmbeddedData)?;
    let channels = &carrier.data()[region];
    let (slots, binding) = channels.split_at(HEADER_CHANNELS - 1);

    let mut bytes = [0u8; HEADER_BYTES];
    for (index, slot) in slots.iter().enumerate() {
        let byte = &mut bytes[index / GROUPS_PER_BYTE];
        *byte = (*byte << HEADER_BITS_PER_CHANNEL) | (slot & GROUP_MASK);
    }

    let descriptor_bytes = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if checksum(&descriptor_bytes, binding[0]) != bytes[4] {
        return Err(StegoError::NoEmbeddedData);
    }

    let descriptor = HeaderDescriptor::from_descriptor_bytes(descriptor_bytes);
    if descriptor.rows == 0 || descriptor.cols == 0 {
        return Err(StegoError::NoEmbeddedData);
    }
    Ok(descriptor)
}
