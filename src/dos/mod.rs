//! # 态密度处理模块
//!
//! 读取、对齐、投影并导出态密度。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `parsers/` 和 `models/`
//! - 子模块: loader, projection, writer

pub mod loader;
pub mod projection;
pub mod writer;

pub use loader::{extract_dos, load_dos};
pub use projection::{DosFilter, ProjectedDos};
pub use writer::write_files;
