//! # 命令行接口模块
//!
//! 使用 `clap` 定义了程序的命令行结构，包括子命令和参数。
//! 所有用户通过命令行与程序交互的入口点都在此模块中定义。

use clap::{Args, Parser};
use std::path::PathBuf;

/// 一款把图像隐藏在另一幅图像中的隐写工具，结果必须以无损格式 (如 PNG) 保存。
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "一款把图像隐藏在另一幅图像中的隐写工具。载荷按载体容量自适应地写入每个通道的最低有效位，结果必须以无损格式 (如 PNG, BMP, TIFF) 保存。"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令：encode (隐藏) 和 decode (恢复)。
#[derive(Parser, Debug)]
pub enum Commands {
    /// 把载荷图像隐藏进载体图像。
    Encode(EncodeArgs),

    /// 从经过隐写的图像中恢复被隐藏的图像。
    Decode(DecodeArgs),
}

/// 两个子命令共享的运行参数。
#[derive(Args, Debug, Clone)]
pub struct RuntimeArgs {
    /// 打包/解包使用的线程数 (会被限制在可用的硬件线程数以内)。
    #[arg(short, long, default_value_t = 1)]
    pub threads: usize,

    /// 输出详细的处理过程。
    #[arg(short, long)]
    pub verbose: bool,

    /// 只输出错误信息。
    #[arg(short, long)]
    pub quiet: bool,
}

/// 'encode' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct EncodeArgs {
    /// 载体图像的文件路径。
    #[arg(short, long)]
    pub carrier: PathBuf,

    /// 要隐藏的载荷图像的文件路径。
    #[arg(short, long)]
    pub payload: PathBuf,

    /// 结果图像的输出路径，默认为 `Encoded.png`。
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 容量不足时放大载体，而不是缩小载荷。
    #[arg(short, long)]
    pub expand: bool,

    /// 允许超出常规倍数的变换，必要时截断载荷。
    #[arg(short, long)]
    pub force: bool,

    /// 禁止缩小载荷。
    #[arg(long)]
    pub no_reduction: bool,

    /// 缩小载荷时不转换为灰度。
    #[arg(long)]
    pub no_grayscale: bool,

    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

/// 'decode' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct DecodeArgs {
    /// 已隐藏图像数据的载体文件路径。
    #[arg(short, long)]
    pub carrier: PathBuf,

    /// 恢复图像的输出路径，默认为 `Decoded.png`。
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub runtime: RuntimeArgs,
}
