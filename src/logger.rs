//! # 日志输出模块
//!
//! 按照 [`Verbosity`] 决定哪些信息输出到终端。普通信息与详细信息写入 stdout，
//! 错误写入 stderr，并使用 `colored` 着色。

use crate::config::Verbosity;
use colored::Colorize;
use std::fmt::Display;

/// 日志记录器，持有不可变的输出级别。
#[derive(Debug, Clone, Copy)]
pub struct Logger {
    verbosity: Verbosity,
}

impl Logger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// 普通信息，安静模式下不输出。
    pub fn log(&self, message: impl Display) {
        if self.verbosity != Verbosity::Quiet {
            println!("{message}");
        }
    }

    /// 详细信息，仅在详细模式下输出。
    pub fn verbose(&self, message: impl Display) {
        if self.verbosity == Verbosity::Verbose {
            println!("{}", message.to_string().dimmed());
        }
    }

    /// 非致命的警告，例如画质损失或截断。
    pub fn warn(&self, message: impl Display) {
        if self.verbosity != Verbosity::Quiet {
            println!("{} {message}", "Warning!".yellow().bold());
        }
    }

    /// 错误总是输出。
    pub fn error(&self, message: impl Display) {
        eprintln!("{} {message}", "Error!".red().bold());
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Verbosity::Normal)
    }
}
