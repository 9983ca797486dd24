//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `dos/`, `utils/`
//! - 子模块: extract, info

pub mod extract;
pub mod info;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Extract(args) => extract::execute(args),
        Commands::Info(args) => info::execute(args),
    }
}
