//! # 容量规划模块
//!
//! 根据载体与载荷的尺寸决定：
//!
//! 1. 是否需要缩小载荷 (降采样、转灰度) 或放大载体，以及放大/缩小的面积倍数；
//! 2. 最终使用的比特分配级别 [`BitLevel`] 与像素跨度 (stride)。
//!
//! 整个决策过程是纯函数，相同的输入总是得到相同的计划。

use crate::constants::{BIT_ALLOCATION, BIT_LEVELS};
use crate::error::StegoError;
use crate::pixel::{CarrierGeometry, Dimensions};

/// 容量不足时的开关选项。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapacityPolicy {
    /// 放大载体而不是缩小载荷。
    pub expand_carrier: bool,
    /// 允许有损的强制编码，必要时截断载荷。
    pub force_overflow: bool,
    /// 禁止缩小载荷。
    pub disable_reduction: bool,
    /// 缩小载荷时不转换为灰度。
    pub disable_grayscale: bool,
}

/// 比特分配表的索引，级别 `k` 表示每个使用的像素写入 `k + 1` 位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BitLevel(u8);

impl BitLevel {
    /// 最高级别：每像素 12 位，每通道 4 位。
    pub const MAX: BitLevel = BitLevel(BIT_LEVELS as u8 - 1);

    pub fn new(index: usize) -> Option<Self> {
        (index < BIT_LEVELS).then(|| Self(index as u8))
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// (B, G, R) 各通道写入的位数。
    pub fn channel_bits(self) -> [u8; 3] {
        BIT_ALLOCATION[self.index()]
    }

    /// 每个使用的像素写入的总位数。
    pub fn bits_per_pixel(self) -> u64 {
        u64::from(self.0) + 1
    }
}

/// 打包/解包所需的全部参数，在整个操作中保持不变。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub level: BitLevel,
    /// 每个使用的像素之后跳过的像素数。
    pub stride: usize,
    /// 密集截断模式：不跳过像素，超出容量的载荷被丢弃。
    pub overflow: bool,
}

impl Layout {
    /// 由可用像素数与载荷尺寸推导布局。编码端和解码端共用此函数，
    /// 所需级别达到 12 时退化为密集截断模式 (级别 11，stride 0)。
    pub fn derive(geometry: &CarrierGeometry, payload: Dimensions) -> Self {
        let available = geometry.available_pixels() as u64;
        let bits = payload.payload_bits().max(1);
        let required = bits / available;
        if required >= LEVELS {
            return Layout::dense_overflow();
        }
        let level = BitLevel(required as u8);
        Layout {
            level,
            stride: (available * level.bits_per_pixel() / bits).saturating_sub(1) as usize,
            overflow: false,
        }
    }

    pub fn dense_overflow() -> Self {
        Layout {
            level: BitLevel::MAX,
            stride: 0,
            overflow: true,
        }
    }
}

/// 在载体容量不足时要执行的变换。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adaptation {
    /// 无需变换。
    None,
    /// 缩小载荷：可选地先转灰度，再把面积缩小 `area_factor` 倍 (1 表示不缩放)。
    ReducePayload { grayscale: bool, area_factor: u32 },
    /// 把载体面积放大 `area_factor` 倍。
    ExpandCarrier { area_factor: u32 },
}

impl Adaptation {
    /// 每个维度上的缩放系数 (面积倍数的平方根)。
    pub fn scale(&self) -> f64 {
        match *self {
            Adaptation::None => 1.0,
            Adaptation::ReducePayload { area_factor, .. } => 1.0 / f64::from(area_factor).sqrt(),
            Adaptation::ExpandCarrier { area_factor } => f64::from(area_factor).sqrt(),
        }
    }
}

/// 计划附带的用户提示。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// 超出常规倍数的强制变换，画质可能明显下降。
    QualityLoss,
    /// 载荷的尾部将被丢弃。
    Truncation,
}

/// 容量规划的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPlan {
    /// 变换前计算出的所需级别 (可能 >= 12)。
    pub required_level: u64,
    pub adaptation: Adaptation,
    pub overflow: bool,
    pub notice: Option<Notice>,
}

impl CapacityPlan {
    fn fits(required_level: u64) -> Self {
        Self {
            required_level,
            adaptation: Adaptation::None,
            overflow: false,
            notice: None,
        }
    }
}

const LEVELS: u64 = BIT_LEVELS as u64;
const MAX_FORCED_AREA: u32 = 16;

/// 决定载体容量不足时的处理方式。
///
/// # Errors
///
/// * 载体像素不足 8 个时返回 [`StegoError::CarrierTooSmall`]。
/// * 在未设置 `force_overflow` 的情况下需要超出常规倍数的变换，
///   或禁止缩小时容量不足，返回 [`StegoError::CapacityExceeded`]。
pub fn plan_capacity(
    carrier: Dimensions,
    payload: Dimensions,
    policy: &CapacityPolicy,
) -> Result<CapacityPlan, StegoError> {
    let geometry = CarrierGeometry::new(carrier.rows, carrier.cols).ok_or(
        StegoError::CarrierTooSmall {
            pixels: carrier.rows.saturating_mul(carrier.cols),
        },
    )?;
    let available = geometry.available_pixels() as u64;
    let bits = payload.payload_bits();
    let required_level = bits / available;

    if required_level < LEVELS {
        return Ok(CapacityPlan::fits(required_level));
    }

    let exceeded = || StegoError::CapacityExceeded {
        required_bits: bits,
        available_bits: available * LEVELS,
    };
    let plan = |adaptation, overflow, notice| CapacityPlan {
        required_level,
        adaptation,
        overflow,
        notice,
    };

    if policy.disable_reduction && !policy.expand_carrier {
        if !policy.force_overflow {
            return Err(exceeded());
        }
        return Ok(plan(Adaptation::None, true, Some(Notice::Truncation)));
    }

    if policy.expand_carrier {
        let factor = (bits / LEVELS + 8) / carrier.pixels() + 1;
        let expand = |area_factor| Adaptation::ExpandCarrier { area_factor };
        return match factor {
            0..=8 => Ok(plan(expand(factor as u32), false, None)),
            _ if !policy.force_overflow => Err(exceeded()),
            9..=16 => Ok(plan(expand(factor as u32), false, Some(Notice::QualityLoss))),
            _ => Ok(plan(expand(MAX_FORCED_AREA), true, Some(Notice::Truncation))),
        };
    }

    let factor = required_level / LEVELS + 1;
    let reduce = |grayscale, area_factor| Adaptation::ReducePayload {
        grayscale,
        area_factor,
    };
    // 灰度转换本身已减少 3 倍数据量，剩余部分由面积缩小承担
    let with_grayscale = |factor: u64| (factor / 3 + 1) as u32;

    if policy.disable_grayscale {
        match factor {
            0..=8 => Ok(plan(reduce(false, factor as u32), false, None)),
            _ if !policy.force_overflow => Err(exceeded()),
            9..=16 => Ok(plan(reduce(false, factor as u32), false, Some(Notice::QualityLoss))),
            _ => Ok(plan(reduce(false, MAX_FORCED_AREA), true, Some(Notice::Truncation))),
        }
    } else {
        match factor {
            0..=3 => Ok(plan(reduce(true, 1), false, None)),
            4..=24 => Ok(plan(reduce(true, with_grayscale(factor)), false, None)),
            _ if !policy.force_overflow => Err(exceeded()),
            25..=48 => Ok(plan(
                reduce(true, with_grayscale(factor)),
                false,
                Some(Notice::QualityLoss),
            )),
            _ => Ok(plan(reduce(true, MAX_FORCED_AREA), true, Some(Notice::Truncation))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(rows: usize, cols: usize) -> Dimensions {
        Dimensions::new(rows, cols, 3)
    }

    fn forced() -> CapacityPolicy {
        CapacityPolicy {
            force_overflow: true,
            ..CapacityPolicy::default()
        }
    }

    #[test]
    fn table_rows_sum_to_level_plus_one() {
        for (index, bits) in BIT_ALLOCATION.iter().enumerate() {
            let sum: u8 = bits.iter().sum();
            assert_eq!(usize::from(sum), index + 1);
            assert_eq!(BitLevel::new(index).unwrap().bits_per_pixel(), index as u64 + 1);
        }
        assert!(BitLevel::new(12).is_none());
    }

    #[test]
    fn small_payload_uses_lowest_level_with_stride() {
        let carrier = color(100, 100);
        let payload = color(10, 10);
        let policy = CapacityPolicy {
            disable_grayscale: true,
            ..CapacityPolicy::default()
        };
        let plan = plan_capacity(carrier, payload, &policy).unwrap();
        assert_eq!(plan.adaptation, Adaptation::None);
        assert!(!plan.overflow);

        let layout = Layout::derive(&CarrierGeometry::new(100, 100).unwrap(), payload);
        assert!(layout.level.index() <= 1);
        assert_eq!(layout.level.index(), 0);
        assert_eq!(layout.stride, 3);
        assert!(!layout.overflow);
    }

    #[test]
    fn planning_is_deterministic() {
        let policy = CapacityPolicy {
            expand_carrier: true,
            force_overflow: true,
            ..CapacityPolicy::default()
        };
        let first = plan_capacity(color(40, 40), color(400, 400), &policy).unwrap();
        let second = plan_capacity(color(40, 40), color(400, 400), &policy).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn disabled_reduction_fails_without_force() {
        let policy = CapacityPolicy {
            disable_reduction: true,
            ..CapacityPolicy::default()
        };
        let err = plan_capacity(color(10, 10), color(20, 20), &policy).unwrap_err();
        assert!(matches!(err, StegoError::CapacityExceeded { .. }));
    }

    #[test]
    fn disabled_reduction_with_force_truncates() {
        let policy = CapacityPolicy {
            disable_reduction: true,
            force_overflow: true,
            ..CapacityPolicy::default()
        };
        let plan = plan_capacity(color(10, 10), color(20, 20), &policy).unwrap();
        assert_eq!(plan.adaptation, Adaptation::None);
        assert!(plan.overflow);
        assert_eq!(plan.notice, Some(Notice::Truncation));
    }

    #[test]
    fn mild_shortfall_only_converts_to_grayscale() {
        // 93 个可用像素最多容纳 1116 bit，载荷 7 x 7 x 3 = 1176 bit
        let plan = plan_capacity(color(10, 10), color(7, 7), &CapacityPolicy::default()).unwrap();
        assert_eq!(plan.required_level, 12);
        assert_eq!(
            plan.adaptation,
            Adaptation::ReducePayload {
                grayscale: true,
                area_factor: 1
            }
        );
    }

    #[test]
    fn larger_shortfall_combines_grayscale_and_area_reduction() {
        // 载荷 16 x 16 x 3 = 6144 bit => 级别 66 => 因子 6
        let plan = plan_capacity(color(10, 10), color(16, 16), &CapacityPolicy::default()).unwrap();
        assert_eq!(plan.required_level, 66);
        assert_eq!(
            plan.adaptation,
            Adaptation::ReducePayload {
                grayscale: true,
                area_factor: 3
            }
        );
        assert_eq!(plan.notice, None);
    }

    #[test]
    fn color_reduction_factor_boundaries() {
        let policy = CapacityPolicy {
            disable_grayscale: true,
            ..CapacityPolicy::default()
        };
        // 载荷 16 x 16 x 3 => 因子 6，<= 8 直接缩小
        let plan = plan_capacity(color(10, 10), color(16, 16), &policy).unwrap();
        assert_eq!(
            plan.adaptation,
            Adaptation::ReducePayload {
                grayscale: false,
                area_factor: 6
            }
        );

        // 载荷 24 x 24 x 3 = 13824 bit => 级别 148 => 因子 13，需要强制
        let err = plan_capacity(color(10, 10), color(24, 24), &policy).unwrap_err();
        assert!(matches!(err, StegoError::CapacityExceeded { .. }));

        let forced = CapacityPolicy {
            force_overflow: true,
            ..policy
        };
        let plan = plan_capacity(color(10, 10), color(24, 24), &forced).unwrap();
        assert_eq!(plan.notice, Some(Notice::QualityLoss));
        assert!(!plan.overflow);

        // 载荷 40 x 40 x 3 = 38400 bit => 级别 412 => 因子 35 > 16，截断
        let plan = plan_capacity(color(10, 10), color(40, 40), &forced).unwrap();
        assert_eq!(
            plan.adaptation,
            Adaptation::ReducePayload {
                grayscale: false,
                area_factor: 16
            }
        );
        assert!(plan.overflow);
    }

    #[test]
    fn grayscale_reduction_requires_force_beyond_twenty_four() {
        // 载荷 40 x 40 x 3 => 因子 35
        let err = plan_capacity(color(10, 10), color(40, 40), &CapacityPolicy::default()).unwrap_err();
        assert!(matches!(err, StegoError::CapacityExceeded { .. }));

        let plan = plan_capacity(color(10, 10), color(40, 40), &forced()).unwrap();
        assert_eq!(
            plan.adaptation,
            Adaptation::ReducePayload {
                grayscale: true,
                area_factor: 12
            }
        );
        assert_eq!(plan.notice, Some(Notice::QualityLoss));

        // 载荷 60 x 60 x 3 = 86400 bit => 级别 929 => 因子 78 > 48
        let plan = plan_capacity(color(10, 10), color(60, 60), &forced()).unwrap();
        assert_eq!(
            plan.adaptation,
            Adaptation::ReducePayload {
                grayscale: true,
                area_factor: 16
            }
        );
        assert!(plan.overflow);
        assert_eq!(plan.notice, Some(Notice::Truncation));
    }

    #[test]
    fn expansion_factor_boundaries() {
        let policy = CapacityPolicy {
            expand_carrier: true,
            ..CapacityPolicy::default()
        };
        // (6144 / 12 + 8) / 100 + 1 = 6
        let plan = plan_capacity(color(10, 10), color(16, 16), &policy).unwrap();
        assert_eq!(plan.adaptation, Adaptation::ExpandCarrier { area_factor: 6 });
        assert!((plan.adaptation.scale() - 6f64.sqrt()).abs() < 1e-12);

        // (13824 / 12 + 8) / 100 + 1 = 12，需要强制
        assert!(plan_capacity(color(10, 10), color(24, 24), &policy).is_err());
        let forced = CapacityPolicy {
            force_overflow: true,
            ..policy
        };
        let plan = plan_capacity(color(10, 10), color(24, 24), &forced).unwrap();
        assert_eq!(plan.adaptation, Adaptation::ExpandCarrier { area_factor: 12 });
        assert_eq!(plan.notice, Some(Notice::QualityLoss));

        // (38400 / 12 + 8) / 100 + 1 = 33 > 16
        let plan = plan_capacity(color(10, 10), color(40, 40), &forced).unwrap();
        assert_eq!(plan.adaptation, Adaptation::ExpandCarrier { area_factor: 16 });
        assert!(plan.overflow);
    }

    /// 10 x 10 载体 (93 个可用像素) 上缩小因子恰为 `factor` 的灰度载荷。
    fn reduction_payload(factor: u64) -> Dimensions {
        Dimensions::new(1, 140 * (factor as usize - 1) + 1, 1)
    }

    /// 10 x 10 载体上放大因子恰为 `factor` 的灰度载荷。
    fn expansion_payload(factor: u64) -> Dimensions {
        Dimensions::new(1, 150 * (factor as usize - 1) - 6, 1)
    }

    fn reduce(grayscale: bool, area_factor: u32) -> Adaptation {
        Adaptation::ReducePayload {
            grayscale,
            area_factor,
        }
    }

    #[test]
    fn boundary_payloads_hit_the_intended_factor() {
        let carrier = color(10, 10);
        for factor in [3, 4, 8, 9, 16, 17, 24, 25, 48, 49] {
            let plan = plan_capacity(carrier, reduction_payload(factor), &forced()).unwrap();
            assert_eq!(plan.required_level / LEVELS + 1, factor);
        }
        for factor in [8, 9, 16, 17] {
            let bits = expansion_payload(factor).payload_bits();
            assert_eq!((bits / LEVELS + 8) / 100 + 1, factor);
            assert!(bits / 93 >= LEVELS);
        }
    }

    #[test]
    fn grayscale_reduction_thresholds() {
        let carrier = color(10, 10);
        let policy = CapacityPolicy::default();

        let plan = plan_capacity(carrier, reduction_payload(3), &policy).unwrap();
        assert_eq!((plan.adaptation, plan.notice), (reduce(true, 1), None));
        let plan = plan_capacity(carrier, reduction_payload(4), &policy).unwrap();
        assert_eq!((plan.adaptation, plan.notice), (reduce(true, 2), None));

        let plan = plan_capacity(carrier, reduction_payload(24), &policy).unwrap();
        assert_eq!((plan.adaptation, plan.notice), (reduce(true, 9), None));
        assert!(plan_capacity(carrier, reduction_payload(25), &policy).is_err());
        let plan = plan_capacity(carrier, reduction_payload(25), &forced()).unwrap();
        assert_eq!(
            (plan.adaptation, plan.notice),
            (reduce(true, 9), Some(Notice::QualityLoss))
        );

        let plan = plan_capacity(carrier, reduction_payload(48), &forced()).unwrap();
        assert_eq!(
            (plan.adaptation, plan.notice, plan.overflow),
            (reduce(true, 17), Some(Notice::QualityLoss), false)
        );
        let plan = plan_capacity(carrier, reduction_payload(49), &forced()).unwrap();
        assert_eq!(
            (plan.adaptation, plan.notice, plan.overflow),
            (reduce(true, 16), Some(Notice::Truncation), true)
        );
    }

    #[test]
    fn color_reduction_thresholds() {
        let carrier = color(10, 10);
        let policy = CapacityPolicy {
            disable_grayscale: true,
            ..CapacityPolicy::default()
        };
        let forced = CapacityPolicy {
            force_overflow: true,
            ..policy
        };

        let plan = plan_capacity(carrier, reduction_payload(8), &policy).unwrap();
        assert_eq!((plan.adaptation, plan.notice), (reduce(false, 8), None));
        assert!(plan_capacity(carrier, reduction_payload(9), &policy).is_err());
        let plan = plan_capacity(carrier, reduction_payload(9), &forced).unwrap();
        assert_eq!(
            (plan.adaptation, plan.notice),
            (reduce(false, 9), Some(Notice::QualityLoss))
        );

        let plan = plan_capacity(carrier, reduction_payload(16), &forced).unwrap();
        assert_eq!(
            (plan.adaptation, plan.notice, plan.overflow),
            (reduce(false, 16), Some(Notice::QualityLoss), false)
        );
        let plan = plan_capacity(carrier, reduction_payload(17), &forced).unwrap();
        assert_eq!(
            (plan.adaptation, plan.notice, plan.overflow),
            (reduce(false, 16), Some(Notice::Truncation), true)
        );
    }

    #[test]
    fn expansion_thresholds() {
        let carrier = color(10, 10);
        let policy = CapacityPolicy {
            expand_carrier: true,
            ..CapacityPolicy::default()
        };
        let forced = CapacityPolicy {
            force_overflow: true,
            ..policy
        };
        let expand = |area_factor| Adaptation::ExpandCarrier { area_factor };

        let plan = plan_capacity(carrier, expansion_payload(8), &policy).unwrap();
        assert_eq!((plan.adaptation, plan.notice), (expand(8), None));
        assert!(plan_capacity(carrier, expansion_payload(9), &policy).is_err());
        let plan = plan_capacity(carrier, expansion_payload(9), &forced).unwrap();
        assert_eq!(
            (plan.adaptation, plan.notice),
            (expand(9), Some(Notice::QualityLoss))
        );

        let plan = plan_capacity(carrier, expansion_payload(16), &forced).unwrap();
        assert_eq!(
            (plan.adaptation, plan.notice, plan.overflow),
            (expand(16), Some(Notice::QualityLoss), false)
        );
        let plan = plan_capacity(carrier, expansion_payload(17), &forced).unwrap();
        assert_eq!(
            (plan.adaptation, plan.notice, plan.overflow),
            (expand(16), Some(Notice::Truncation), true)
        );
    }

    #[test]
    fn expansion_overrides_disabled_reduction() {
        let policy = CapacityPolicy {
            expand_carrier: true,
            disable_reduction: true,
            ..CapacityPolicy::default()
        };
        let plan = plan_capacity(color(10, 10), color(16, 16), &policy).unwrap();
        assert_eq!(plan.adaptation, Adaptation::ExpandCarrier { area_factor: 6 });
    }

    #[test]
    fn layout_falls_back_to_dense_overflow() {
        let geometry = CarrierGeometry::new(10, 10).unwrap();
        let layout = Layout::derive(&geometry, color(20, 20));
        assert_eq!(layout, Layout::dense_overflow());
        assert_eq!(layout.level.channel_bits(), [4, 4, 4]);
    }

    #[test]
    fn layout_at_full_capacity_is_dense() {
        let geometry = CarrierGeometry::new(10, 10).unwrap();
        let payload = Dimensions::new(1, 372, 3); // 8928 bit => 级别 96
        let layout = Layout::derive(&geometry, payload);
        assert!(layout.overflow);

        let payload = Dimensions::new(1, 42, 3); // 1008 bit => 级别 10
        let layout = Layout::derive(&geometry, payload);
        assert_eq!(layout.level.index(), 10);
        assert_eq!(layout.stride, 0);
        assert!(!layout.overflow);
    }
}
