//! # image_hide 库
//!
//! 本库包含图像隐写工具的核心逻辑：比特分配表、头部编解码、容量规划、
//! 分区求解以及多线程的比特流打包/解包。

// 声明库包含的所有模块。

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod handler;
pub mod header;
pub mod imaging;
pub mod logger;
pub mod partition;
pub mod pipeline;
pub mod pixel;
pub mod planner;
pub mod steganography;

pub use error::{ImageRole, StegoError};
pub use pixel::PixelBuffer;
