//! # 分区求解模块
//!
//! 把可用通道的下标空间切分为 `N` 段连续区间，并以闭式计算出顺序算法到达每段起点时的状态。
//! 由于比特分配级别和 stride 在整个操作中固定不变，任意通道下标处的比特流位置只取决于下标本身，
//! 因此每个工作线程都能独立推导自己的起始状态，无需任何同步。

use crate::planner::Layout;

/// 顺序打包/解包算法在某个通道处的中间状态。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionState {
    /// 物理通道下标 (已越过 stride 跳过的像素)。
    pub channel: usize,
    /// 当前像素内的通道槽位：0 = B，1 = G，2 = R。
    pub slot: usize,
    /// 载荷比特流中当前字节的下标。
    pub byte: usize,
    /// 当前字节中已经传输的位数，取值 `0..8`。
    pub carried_bits: u8,
}

/// 一个工作线程负责的通道区间 `[boundary, end)` 及其起始状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub boundary: usize,
    pub end: usize,
    pub start: PartitionState,
}

/// 计算顺序算法处理到通道下标 `boundary` 时的状态。
///
/// 若 `boundary` 落在被 stride 跳过的像素中，返回的状态指向下一个使用像素的 B 通道。
pub fn solve(boundary: usize, layout: &Layout) -> PartitionState {
    let group_channels = (layout.stride + 1) * 3;
    let bits = layout.level.channel_bits();
    let bits_per_group = layout.level.bits_per_pixel();

    let groups = boundary / group_channels;
    let offset = boundary % group_channels;

    let (channel, slot, transferred) = if offset < 3 {
        let partial: u64 = bits[..offset].iter().map(|&b| u64::from(b)).sum();
        (boundary, offset, groups as u64 * bits_per_group + partial)
    } else {
        let next = groups + 1;
        (next * group_channels, 0, next as u64 * bits_per_group)
    };

    PartitionState {
        channel,
        slot,
        byte: (transferred / 8) as usize,
        carried_bits: (transferred % 8) as u8,
    }
}

/// 把 `usable_channels` 个通道均分给 `workers` 个工作线程，余数归最后一个。
pub fn partitions(usable_channels: usize, workers: usize, layout: &Layout) -> Vec<Partition> {
    let workers = workers.max(1);
    let chunk = usable_channels / workers;
    (0..workers)
        .map(|k| {
            let boundary = k * chunk;
            let end = if k + 1 == workers {
                usable_channels
            } else {
                (k + 1) * chunk
            };
            let start = if k == 0 {
                PartitionState::default()
            } else {
                solve(boundary, layout)
            };
            Partition {
                boundary,
                end,
                start,
            }
        })
        .collect()
}
