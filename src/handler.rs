//! # 命令处理逻辑模块
//!
//! 包含处理 `encode` 和 `decode` 子命令的高级业务逻辑。
//! 本模块负责协调文件 I/O、调用核心隐写流程以及向用户报告结果。

use crate::cli::{DecodeArgs, EncodeArgs};
use crate::config::Config;
use crate::constants::{DEFAULT_DECODED_FILE, DEFAULT_ENCODED_FILE};
use crate::error::{ImageRole, StegoError};
use crate::imaging::{ImageCodec, ImageRs, save_with_fallback};
use crate::logger::Logger;
use crate::pipeline::{conceal, reveal};
use crate::pixel::PixelBuffer;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::panic;
use std::thread;
use std::time::Instant;

fn load<C: ImageCodec + ?Sized>(codec: &C, role: ImageRole, path: &Path) -> Result<PixelBuffer, StegoError> {
    codec.load(path).map_err(|source| StegoError::CannotOpenImage {
        role,
        path: path.to_path_buf(),
        source,
    })
}

/// 在两个线程上同时读取载体与载荷。
fn load_pair<C: ImageCodec + Sync + ?Sized>(
    codec: &C,
    carrier: &Path,
    payload: &Path,
    logger: &Logger,
) -> (Result<PixelBuffer, StegoError>, Result<PixelBuffer, StegoError>) {
    thread::scope(|scope| {
        let carrier = scope.spawn(|| {
            logger.verbose("Reading base image");
            load(codec, ImageRole::Carrier, carrier)
        });
        let payload = scope.spawn(|| {
            logger.verbose("Reading source image");
            load(codec, ImageRole::Payload, payload)
        });
        (joined(carrier), joined(payload))
    })
}

fn joined<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle.join().unwrap_or_else(|cause| panic::resume_unwind(cause))
}

/// 处理 'Encode' 命令的执行逻辑。
///
/// 负责读取载体和载荷图像、执行容量规划与隐写，最后将结果写入目标图像文件。
///
/// # Arguments
///
/// * `args` - 包含输入/输出路径与容量选项的 `EncodeArgs` 结构体。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 无法读取载体或载荷图像。
/// * 图像尺寸超出限制，或载体容量不足且未指定对应的选项。
/// * 目标路径与回退文件名都无法写入。
pub fn handle_encode(args: EncodeArgs) -> Result<()> {
    let config = Config::from(&args);
    let logger = Logger::new(config.verbosity);
    logger.verbose(format!("Expand base = {}", args.expand));
    logger.verbose(format!("No reduction = {}", args.no_reduction));
    logger.verbose(format!("No grayscale = {}", args.no_grayscale));
    logger.verbose(format!("Forced encode = {}", args.force));

    let codec = ImageRs;
    let (carrier, payload) = load_pair(&codec, &args.carrier, &args.payload, &logger);
    let carrier = carrier.with_context(|| {
        format!(
            "Cannot open base image: {}\nPlease check if the path is correct and if the file is an 8 bit color image.",
            args.carrier.to_string_lossy().red().bold()
        )
    })?;
    let payload = payload.with_context(|| {
        format!(
            "Cannot open source image: {}\nPlease check if the path is correct and if the file is an 8 bit color image.",
            args.payload.to_string_lossy().red().bold()
        )
    })?;

    let start = Instant::now();
    let concealed = conceal(carrier, payload, &config, &codec, &logger).with_context(|| {
        format!(
            "Failed to hide {} inside {}.",
            args.payload.to_string_lossy().red().bold(),
            args.carrier.to_string_lossy().red().bold()
        )
    })?;

    logger.verbose("Saving encoded image");
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ENCODED_FILE));
    save_with_fallback(&codec, &concealed.carrier, &output, DEFAULT_ENCODED_FILE, &logger)
        .context("Cannot save the encoded image, skipping save step.")?;

    logger.verbose(format!(
        "Encoding took: {:.3} seconds",
        start.elapsed().as_secs_f64()
    ));
    Ok(())
}

/// 处理 'Decode' 命令的执行逻辑。
///
/// 负责读取经过隐写的图像、校验头部并恢复被隐藏的图像，最后将其写入目标文件。
///
/// # Arguments
///
/// * `args` - 包含输入/输出路径的 `DecodeArgs` 结构体。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 无法读取输入的图像文件。
/// * 图像中没有由本工具嵌入的数据。
/// * 目标路径与回退文件名都无法写入。
pub fn handle_decode(args: DecodeArgs) -> Result<()> {
    let config = Config::from(&args);
    let logger = Logger::new(config.verbosity);
    let codec = ImageRs;

    logger.verbose("Reading source image");
    let carrier = load(&codec, ImageRole::Carrier, &args.carrier).with_context(|| {
        format!(
            "Cannot open image: {}\nPlease check if the path is correct and if the file is an 8 bit color image.",
            args.carrier.to_string_lossy().red().bold()
        )
    })?;

    let start = Instant::now();
    let revealed = reveal(&carrier, config.workers, &logger).with_context(|| {
        format!(
            "Failed to recover an image from {}.",
            args.carrier.to_string_lossy().red().bold()
        )
    })?;

    logger.verbose("Saving decoded image");
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DECODED_FILE));
    save_with_fallback(&codec, &revealed.payload, &output, DEFAULT_DECODED_FILE, &logger)
        .context("Cannot save the decoded image, skipping save step.")?;

    logger.verbose(format!(
        "Decoding took: {:.3} seconds",
        start.elapsed().as_secs_f64()
    ));
    Ok(())
}
