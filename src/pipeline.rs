//! # 编解码流程模块
//!
//! 在内存中的像素缓冲区上组合各个核心模块：
//!
//! * [`conceal`]：校验尺寸 → 容量规划 → 执行变换 → 写入头部 → (多线程) 打包；
//! * [`reveal`]：读取并校验头部 → 推导布局 → (多线程) 解包。
//!
//! 所有校验都在工作线程启动之前完成，打包/解包阶段本身不会失败。

use crate::config::Config;
use crate::constants::{BIT_LEVELS, CARRIER_CHANNELS, MAX_DIMENSION, MAX_PAYLOAD_COLS};
use crate::error::{ImageRole, StegoError};
use crate::header::{self, HeaderDescriptor};
use crate::imaging::{ImageTransform, scaled_dimension};
use crate::logger::Logger;
use crate::pixel::{CarrierGeometry, Dimensions, PixelBuffer};
use crate::planner::{Adaptation, CapacityPlan, Layout, Notice, plan_capacity};
use crate::steganography::{embed, extract};

/// 编码结果。
#[derive(Debug, Clone)]
pub struct Concealed {
    /// 已写入头部与载荷的载体 (可能已被放大)。
    pub carrier: PixelBuffer,
    pub plan: CapacityPlan,
    pub layout: Layout,
    /// 实际写入的载荷尺寸 (可能已被缩小或转为灰度)。
    pub payload: Dimensions,
}

/// 解码结果。
#[derive(Debug, Clone)]
pub struct Revealed {
    pub payload: PixelBuffer,
    pub layout: Layout,
}

fn describe(dimensions: Dimensions) -> String {
    format!(
        "[{} x {} x {}]",
        dimensions.rows, dimensions.cols, dimensions.channels
    )
}

fn check_dimensions(
    role: ImageRole,
    dimensions: Dimensions,
    max_cols: usize,
) -> Result<(), StegoError> {
    if dimensions.rows > MAX_DIMENSION || dimensions.cols > max_cols {
        return Err(StegoError::ImageTooLarge {
            role,
            rows: dimensions.rows,
            cols: dimensions.cols,
            max_rows: MAX_DIMENSION,
            max_cols,
        });
    }
    Ok(())
}

fn check_carrier(carrier: &PixelBuffer) -> Result<CarrierGeometry, StegoError> {
    if carrier.channels() != CARRIER_CHANNELS {
        return Err(StegoError::UnsupportedChannels {
            role: ImageRole::Carrier,
            channels: carrier.channels(),
        });
    }
    CarrierGeometry::new(carrier.rows(), carrier.cols()).ok_or(StegoError::CarrierTooSmall {
        pixels: carrier.rows() * carrier.cols(),
    })
}

fn announce(plan: &CapacityPlan, logger: &Logger) {
    match plan.adaptation {
        Adaptation::None => {}
        Adaptation::ReducePayload {
            grayscale,
            area_factor,
        } => {
            logger.log("Base image not large enough, reducing source image");
            match (grayscale, area_factor) {
                (true, 1) => logger.log("Converting source image to grayscale"),
                (true, factor) => logger.log(format!(
                    "Reducing source image area by {factor} and converting to grayscale"
                )),
                (false, factor) => logger.log(format!("Reducing source image area by {factor}")),
            }
        }
        Adaptation::ExpandCarrier { area_factor } => {
            logger.log(format!("Expanding base image area by {area_factor}"));
        }
    }
    match plan.notice {
        Some(Notice::QualityLoss) => logger.warn(
            "Forceful encoding beyond the regular limits, this may lead to significant loss of quality.",
        ),
        Some(Notice::Truncation) => logger.warn(
            "Base image not large enough, encoding forcefully. Some part of source will be lost.",
        ),
        None => {}
    }
}

/// 把 `payload` 隐藏进 `carrier`。
///
/// 容量不足时按照 `config.policy` 缩小载荷或放大载体，变换通过 `transform` 完成。
///
/// # Errors
///
/// * [`StegoError::ImageTooLarge`]：载体或载荷尺寸超出头部可表示的范围。
/// * [`StegoError::CarrierTooSmall`]：载体像素不足 8 个。
/// * [`StegoError::CapacityExceeded`]：在不允许强制编码时容量不足。
/// * [`StegoError::UnsupportedChannels`]：载体不是 3 通道，或载荷不是 1/3 通道。
pub fn conceal<T: ImageTransform + ?Sized>(
    mut carrier: PixelBuffer,
    mut payload: PixelBuffer,
    config: &Config,
    transform: &T,
    logger: &Logger,
) -> Result<Concealed, StegoError> {
    check_carrier(&carrier)?;
    check_dimensions(ImageRole::Carrier, carrier.dimensions(), MAX_DIMENSION)?;
    check_dimensions(ImageRole::Payload, payload.dimensions(), MAX_PAYLOAD_COLS)?;

    logger.verbose(format!("Base image size = {}", describe(carrier.dimensions())));
    logger.verbose(format!("Source image size = {}", describe(payload.dimensions())));

    let plan = plan_capacity(carrier.dimensions(), payload.dimensions(), &config.policy)?;
    announce(&plan, logger);

    match plan.adaptation {
        Adaptation::None => {}
        Adaptation::ReducePayload {
            grayscale,
            area_factor,
        } => {
            if grayscale {
                payload = transform.to_grayscale(&payload)?;
            }
            if area_factor > 1 {
                let scale = plan.adaptation.scale();
                payload = transform.resize_area(&payload, scale, scale)?;
            }
            logger.verbose(format!(
                "Modified source image size = {}",
                describe(payload.dimensions())
            ));
        }
        Adaptation::ExpandCarrier { .. } => {
            let scale = plan.adaptation.scale();
            let target = Dimensions::new(
                scaled_dimension(carrier.rows(), scale) as usize,
                scaled_dimension(carrier.cols(), scale) as usize,
                CARRIER_CHANNELS,
            );
            check_dimensions(ImageRole::Carrier, target, MAX_DIMENSION)?;
            carrier = transform.resize_high_quality(&carrier, scale, scale)?;
            check_dimensions(ImageRole::Carrier, carrier.dimensions(), MAX_DIMENSION)?;
            logger.verbose(format!(
                "Modified base image size = {}",
                describe(carrier.dimensions())
            ));
        }
    }

    let geometry = check_carrier(&carrier)?;
    let descriptor = HeaderDescriptor::for_payload(payload.dimensions())?;
    let layout = Layout::derive(&geometry, payload.dimensions());
    if layout.overflow {
        if !config.policy.force_overflow {
            return Err(StegoError::CapacityExceeded {
                required_bits: payload.dimensions().payload_bits(),
                available_bits: (geometry.available_pixels() * BIT_LEVELS) as u64,
            });
        }
        if !plan.overflow {
            logger.warn("Adapted images still exceed the capacity, some part of source will be lost.");
        }
    }

    logger.verbose(format!(
        "Encoding now with {} bits per pixel and a stride of {} ({} worker(s))...",
        layout.level.bits_per_pixel(),
        layout.stride,
        config.workers
    ));

    header::write(&mut carrier, &descriptor)?;
    let usable = geometry.usable_channels();
    embed(
        &mut carrier.data_mut()[..usable],
        payload.data(),
        &layout,
        config.workers,
    );
    logger.verbose("Finished encoding");

    Ok(Concealed {
        carrier,
        plan,
        layout,
        payload: payload.dimensions(),
    })
}

/// 从 `carrier` 中恢复被隐藏的图像。
///
/// # Errors
///
/// 头部校验失败时返回 [`StegoError::NoEmbeddedData`]，
/// 载体不是 3 通道时返回 [`StegoError::UnsupportedChannels`]。
pub fn reveal(carrier: &PixelBuffer, workers: usize, logger: &Logger) -> Result<Revealed, StegoError> {
    if carrier.channels() != CARRIER_CHANNELS {
        return Err(StegoError::UnsupportedChannels {
            role: ImageRole::Carrier,
            channels: carrier.channels(),
        });
    }
    logger.verbose(format!("Source image size = {}", describe(carrier.dimensions())));

    let geometry =
        CarrierGeometry::new(carrier.rows(), carrier.cols()).ok_or(StegoError::NoEmbeddedData)?;
    let descriptor = header::read(carrier)?;
    logger.verbose("Encoded image found, decoding...");

    let dimensions = descriptor.dimensions();
    let mut payload = PixelBuffer::zeroed(dimensions.rows, dimensions.cols, dimensions.channels)?;
    let layout = Layout::derive(&geometry, dimensions);
    if layout.overflow {
        logger.warn("The image was encoded forcefully, the remainder of the source is black.");
    }

    let usable = geometry.usable_channels();
    extract(
        &carrier.data()[..usable],
        payload.data_mut(),
        &layout,
        workers,
    );
    logger.verbose("Finished decoding");

    Ok(Revealed { payload, layout })
}
