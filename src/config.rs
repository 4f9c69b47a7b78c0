//! # 运行配置模块
//!
//! 命令行参数解析后被转换为一个不可变的 [`Config`]，以参数形式传入容量规划与日志模块。

use crate::cli::{DecodeArgs, EncodeArgs, RuntimeArgs};
use crate::planner::CapacityPolicy;
use std::thread;

/// 终端输出的详细程度。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    /// 同时指定时，详细模式优先于安静模式。
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (_, true) => Verbosity::Verbose,
            (true, false) => Verbosity::Quiet,
            (false, false) => Verbosity::Normal,
        }
    }
}

/// 一次编码或解码操作的全部配置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// 打包/解包的工作线程数，至少为 1。
    pub workers: usize,
    pub policy: CapacityPolicy,
    pub verbosity: Verbosity,
}

impl Config {
    /// 线程数被限制在 `1..=` 可用硬件并行度。
    pub fn new(requested_workers: usize, policy: CapacityPolicy, verbosity: Verbosity) -> Self {
        let available = thread::available_parallelism().map_or(1, |n| n.get());
        Self {
            workers: requested_workers.clamp(1, available),
            policy,
            verbosity,
        }
    }

    fn from_runtime(runtime: &RuntimeArgs, policy: CapacityPolicy) -> Self {
        Self::new(
            runtime.threads,
            policy,
            Verbosity::from_flags(runtime.quiet, runtime.verbose),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(1, CapacityPolicy::default(), Verbosity::Normal)
    }
}

impl From<&EncodeArgs> for Config {
    fn from(args: &EncodeArgs) -> Self {
        let policy = CapacityPolicy {
            expand_carrier: args.expand,
            force_overflow: args.force,
            disable_reduction: args.no_reduction,
            disable_grayscale: args.no_grayscale,
        };
        Self::from_runtime(&args.runtime, policy)
    }
}

impl From<&DecodeArgs> for Config {
    fn from(args: &DecodeArgs) -> Self {
        Self::from_runtime(&args.runtime, CapacityPolicy::default())
    }
}
