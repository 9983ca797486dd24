//! # 批量处理模块
//!
//! 对一个目录下的多个计算批量提取态密度。
//!
//! ## 功能
//! - 收集匹配的 vasprun 文件
//! - 并行处理
//! - 进度反馈与统计
//!
//! ## 依赖关系
//! - 被 `commands/extract.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::FileCollector;
pub use runner::{BatchRunner, ProcessResult};
