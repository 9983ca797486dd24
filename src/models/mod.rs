//! # 数据模型模块
//!
//! 定义晶体结构、自旋/轨道标识、态密度曲线以及计算参数。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `dos/` 和 `commands/` 使用
//! - 子模块: structure, orbital, dos, calculation

pub mod calculation;
pub mod dos;
pub mod orbital;
pub mod structure;

pub use calculation::{BandSummary, CalcParameters};
pub use dos::{CompleteDos, Densities, Dos, SiteProjection};
pub use orbital::{Orbital, OrbitalType, Spin};
pub use structure::{Atom, Crystal, Lattice};
