//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `extract`: 提取总态密度和投影态密度
//! - `info`: 打印计算摘要
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: extract, info

pub mod extract;
pub mod info;

use clap::{Parser, Subcommand};

/// qdos - VASP 态密度提取工具
#[derive(Parser)]
#[command(name = "qdos")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Extract total and projected density of states from VASP calculations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Write total and projected DOS data files from vasprun.xml
    Extract(extract::ExtractArgs),

    /// Show a summary of a vasprun.xml calculation
    Info(info::InfoArgs),
}
