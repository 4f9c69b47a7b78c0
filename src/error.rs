//! # 错误类型模块
//!
//! 核心库的所有失败情形都汇总在 [`StegoError`] 中。
//! 命令处理层 (`handler`) 再通过 `anyhow` 为其附加上下文。

use std::fmt;
use std::path::PathBuf;

/// 参与一次操作的图像角色。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    /// 承载数据的外层图像。
    Carrier,
    /// 被隐藏的图像。
    Payload,
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRole::Carrier => f.write_str("carrier"),
            ImageRole::Payload => f.write_str("payload"),
        }
    }
}

/// 隐写编码/解码过程中可能出现的错误。
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StegoError {
    #[error("cannot open {role} image {}: {source}", path.display())]
    CannotOpenImage {
        role: ImageRole,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{role} image too large: [{rows} x {cols}], limit is [{max_rows} x {max_cols}]")]
    ImageTooLarge {
        role: ImageRole,
        rows: usize,
        cols: usize,
        max_rows: usize,
        max_cols: usize,
    },

    #[error("carrier image too small: {pixels} pixels, at least 8 are required")]
    CarrierTooSmall { pixels: usize },

    #[error(
        "not enough space in the carrier image: required {required_bits} bits, available {available_bits} bits"
    )]
    CapacityExceeded {
        required_bits: u64,
        available_bits: u64,
    },

    #[error("the given image does not have any data embedded using this application")]
    NoEmbeddedData,

    #[error("cannot save output image {}: {source}", path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("pixel buffer mismatch: [{rows} x {cols} x {channels}] does not match {len} bytes")]
    InvalidBuffer {
        rows: usize,
        cols: usize,
        channels: usize,
        len: usize,
    },

    #[error("unsupported {role} channel count: {channels}")]
    UnsupportedChannels { role: ImageRole, channels: usize },
}
