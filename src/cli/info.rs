//! # info 子命令 CLI 定义
//!
//! 打印 vasprun.xml 的计算摘要和各元素的轨道信息。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/info.rs`

use clap::Args;
use std::path::PathBuf;

/// info 子命令参数
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Input vasprun.xml file
    #[arg(env = "QDOS_VASPRUN", default_value = "vasprun.xml")]
    pub input: PathBuf,

    /// Also save the per-element table to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}
