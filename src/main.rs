//! # qdos - VASP 态密度提取工具
//!
//! 从 vasprun.xml 读取总态密度和位点投影态密度，按元素、轨道、位点
//! 过滤求和后写成可直接作图的数据文件。
//!
//! ## 子命令
//! - `extract` - 提取态密度（单个文件或批量目录）
//! - `info`    - 打印计算摘要和可用的投影轨道
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── dos/       (对齐、投影、写出)
//!   │     ├── parsers/   (vasprun.xml 解析)
//!   │     ├── batch/     (批量处理)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod dos;
mod error;
mod models;
mod parsers;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
