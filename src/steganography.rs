//! # 比特流打包模块
//!
//! 把载荷视为一条连续的比特流 (每字节高位在前)，把载体的可用通道视为另一条字节序列，
//! 按 `B, G, R, 跳过 stride 个像素, ...` 的顺序，每个通道写入或读出
//! [`BitLevel::channel_bits`](crate::planner::BitLevel::channel_bits) 指定的低位。
//! 一个通道可能跨越两个相邻的载荷字节。
//!
//! 多线程时由 [`partitions`] 切分通道区间：编码时每个线程独占载体的一段可变子切片，
//! 解码时每个线程独占输出缓冲区的一段可变子切片，分区边界处被两个线程共享的那个字节
//! 由前一个线程以溢出值返回，汇合后再合并。

use crate::partition::{Partition, PartitionState, partitions};
use crate::planner::Layout;
use std::{mem, panic, thread};

fn low_mask(width: u8) -> u8 {
    ((1u16 << width) - 1) as u8
}

/// 在通道上交换若干位的方向 (写入或读出)。
trait Transfer {
    /// 在物理通道 `channel` 上交换 `width` 位；比特流位置为第 `byte` 字节中已传输 `carried` 位之后。
    fn transfer(&mut self, channel: usize, width: u8, byte: usize, carried: u8);
}

/// 从 `start` 开始顺序遍历通道直到 `end`，或直到载荷的 `total_bytes` 个字节全部处理完。
fn walk<T: Transfer>(
    transfer: &mut T,
    layout: &Layout,
    start: PartitionState,
    end: usize,
    total_bytes: usize,
) {
    let bits = layout.level.channel_bits();
    let skip = layout.stride * 3;
    let PartitionState {
        mut channel,
        mut slot,
        mut byte,
        carried_bits: mut carried,
    } = start;

    while byte < total_bytes && channel < end {
        if slot == 3 {
            slot = 0;
            channel += skip;
            continue;
        }
        let width = bits[slot];
        if width > 0 {
            transfer.transfer(channel, width, byte, carried);
            let consumed = carried + width;
            byte += usize::from(consumed / 8);
            carried = consumed % 8;
        }
        slot += 1;
        channel += 1;
    }
}

struct Embed<'a> {
    window: &'a mut [u8],
    base: usize,
    payload: &'a [u8],
}

impl Transfer for Embed<'_> {
    fn transfer(&mut self, channel: usize, width: u8, byte: usize, carried: u8) {
        let next = self.payload.get(byte + 1).copied().unwrap_or(0);
        let stream = u16::from_be_bytes([self.payload[byte], next]);
        let shift = 16 - u32::from(carried) - u32::from(width);
        let value = (stream >> shift) as u8 & low_mask(width);

        let cell = &mut self.window[channel - self.base];
        *cell = (*cell & !low_mask(width)) | value;
    }
}

struct Extract<'a> {
    carrier: &'a [u8],
    window: &'a mut [u8],
    base: usize,
    spill: u8,
}

impl Extract<'_> {
    fn deposit(&mut self, index: usize, bits: u8) {
        let len = self.window.len();
        match index.checked_sub(self.base) {
            Some(offset) if offset < len => self.window[offset] |= bits,
            Some(offset) if offset == len => self.spill |= bits,
            _ => {}
        }
    }
}

impl Transfer for Extract<'_> {
    fn transfer(&mut self, channel: usize, width: u8, byte: usize, carried: u8) {
        let value = u16::from(self.carrier[channel] & low_mask(width));
        let shift = 16 - u32::from(carried) - u32::from(width);
        let [high, low] = (value << shift).to_be_bytes();
        self.deposit(byte, high);
        if carried + width > 8 {
            self.deposit(byte + 1, low);
        }
    }
}

/// 把 `payload` 写入载体的可用通道 `usable`。
///
/// 载体通道不足时 (密集截断模式) 剩余载荷被丢弃。
pub fn embed(usable: &mut [u8], payload: &[u8], layout: &Layout, workers: usize) {
    let parts = partitions(usable.len(), workers, layout);
    if let [part] = parts.as_slice() {
        let mut embed = Embed {
            window: usable,
            base: 0,
            payload,
        };
        walk(&mut embed, layout, part.start, part.end, payload.len());
        return;
    }

    thread::scope(|scope| {
        let mut rest = usable;
        let handles: Vec<_> = parts
            .iter()
            .map(|&Partition { boundary, end, start }| {
                let (window, tail) = mem::take(&mut rest).split_at_mut(end - boundary);
                rest = tail;
                scope.spawn(move || {
                    let mut embed = Embed {
                        window,
                        base: boundary,
                        payload,
                    };
                    walk(&mut embed, layout, start, end, payload.len());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap_or_else(|cause| panic::resume_unwind(cause));
        }
    });
}

/// 从载体的可用通道 `usable` 中读出 `output.len()` 个载荷字节。
///
/// `output` 必须是全零缓冲区；载体通道耗尽时未写入的字节保持为零。
pub fn extract(usable: &[u8], output: &mut [u8], layout: &Layout, workers: usize) {
    let total = output.len();
    let parts = partitions(usable.len(), workers, layout);
    if let [part] = parts.as_slice() {
        let mut extract = Extract {
            carrier: usable,
            window: output,
            base: 0,
            spill: 0,
        };
        walk(&mut extract, layout, part.start, part.end, total);
        return;
    }

    let starts: Vec<usize> = parts.iter().map(|p| p.start.byte.min(total)).collect();
    let spills: Vec<u8> = thread::scope(|scope| {
        let mut rest = &mut *output;
        let handles: Vec<_> = parts
            .iter()
            .enumerate()
            .map(|(k, &Partition { end, start, .. })| {
                let base = starts[k];
                let stop = starts.get(k + 1).copied().unwrap_or(total);
                let (window, tail) = mem::take(&mut rest).split_at_mut(stop - base);
                rest = tail;
                scope.spawn(move || {
                    let mut extract = Extract {
                        carrier: usable,
                        window,
                        base,
                        spill: 0,
                    };
                    walk(&mut extract, layout, start, end, total);
                    extract.spill
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|cause| panic::resume_unwind(cause)))
            .collect()
    });

    for (spill, &index) in spills.iter().zip(starts.iter().skip(1)) {
        if index < total {
            output[index] |= spill;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::BitLevel;
    use rand::{RngCore, SeedableRng, rngs::StdRng};

    fn layout(level: usize, stride: usize) -> Layout {
        Layout {
            level: BitLevel::new(level).unwrap(),
            stride,
            overflow: false,
        }
    }

    fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
        let mut bytes = vec![0; len];
        StdRng::seed_from_u64(seed).fill_bytes(&mut bytes);
        bytes
    }

    #[test]
    fn single_channel_spans_two_payload_bytes() {
        // 级别 8：每通道 3 位，第 3 个通道跨越两个载荷字节
        let layout = layout(8, 0);
        let payload = [0b1011_0110, 0b0101_1100];
        let mut carrier = vec![0xFF; 6];
        embed(&mut carrier, &payload, &layout, 1);
        assert_eq!(
            carrier,
            vec![0xF8 | 0b101, 0xF8 | 0b101, 0xF8 | 0b100, 0xF8 | 0b101, 0xF8 | 0b110, 0xF8]
        );

        let mut output = vec![0; 2];
        extract(&carrier, &mut output, &layout, 1);
        assert_eq!(output, payload);
    }

    #[test]
    fn zero_width_slots_are_left_alone() {
        let layout = layout(0, 0);
        let payload = [0xFF];
        let mut carrier = vec![0x00; 24];
        embed(&mut carrier, &payload, &layout, 1);
        for (index, &byte) in carrier.iter().enumerate() {
            let expected = u8::from(index % 3 == 2);
            assert_eq!(byte, expected, "channel {index}");
        }
    }

    #[test]
    fn stride_skips_whole_pixels() {
        let layout = layout(2, 1);
        let payload = [0b1010_1010];
        let mut carrier = vec![0u8; 18];
        embed(&mut carrier, &payload, &layout, 1);
        // 使用像素 0 和 2，像素 1 被跳过
        assert_eq!(&carrier[0..3], &[1, 0, 1]);
        assert_eq!(&carrier[3..6], &[0, 0, 0]);
        assert_eq!(&carrier[6..9], &[0, 1, 0]);
        assert_eq!(&carrier[9..12], &[0, 0, 0]);
        assert_eq!(&carrier[12..15], &[1, 0, 0]);
    }

    #[test]
    fn parallel_embedding_matches_sequential() {
        for (level, stride) in [(0, 3), (3, 1), (8, 0), (9, 2), (10, 0), (11, 0)] {
            let layout = layout(level, stride);
            let carrier = random_bytes(3_000, 7);
            let capacity_bytes = 1_000 / (stride + 1) * (level + 1) / 8;
            let payload = random_bytes(capacity_bytes.saturating_sub(1), 11);

            let mut sequential = carrier.clone();
            embed(&mut sequential, &payload, &layout, 1);

            for workers in [2, 3, 7, 16] {
                let mut parallel = carrier.clone();
                embed(&mut parallel, &payload, &layout, workers);
                assert_eq!(parallel, sequential, "level {level} stride {stride} workers {workers}");

                let mut output = vec![0; payload.len()];
                extract(&sequential, &mut output, &layout, workers);
                assert_eq!(output, payload, "level {level} stride {stride} workers {workers}");
            }
        }
    }

    #[test]
    fn exhausted_carrier_leaves_zero_remainder() {
        let layout = Layout::dense_overflow();
        // 30 个通道 * 4 位 = 120 位 = 15 字节
        let payload = random_bytes(40, 3);
        let mut carrier = random_bytes(30, 5);
        embed(&mut carrier, &payload, &layout, 4);

        for workers in [1, 4] {
            let mut output = vec![0; payload.len()];
            extract(&carrier, &mut output, &layout, workers);
            assert_eq!(&output[..15], &payload[..15]);
            assert!(output[15..].iter().all(|&b| b == 0));
        }
    }
}
