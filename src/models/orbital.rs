//! # 自旋与轨道标识
//!
//! 定义自旋通道、spd 壳层以及 lm 分解轨道。
//!
//! ## 依赖关系
//! - 被 `models/dos.rs`, `parsers/vasprun.rs`, `dos/` 使用
//! - 无外部模块依赖

use serde::{Deserialize, Serialize};
use std::fmt;

/// 自旋通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Spin {
    Up,
    Down,
}

impl fmt::Display for Spin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spin::Up => write!(f, "up"),
            Spin::Down => write!(f, "down"),
        }
    }
}

/// spd 壳层
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrbitalType {
    S,
    P,
    D,
    F,
}

impl OrbitalType {
    pub const ALL: [OrbitalType; 4] = [OrbitalType::S, OrbitalType::P, OrbitalType::D, OrbitalType::F];

    pub fn name(&self) -> &'static str {
        match self {
            OrbitalType::S => "s",
            OrbitalType::P => "p",
            OrbitalType::D => "d",
            OrbitalType::F => "f",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        OrbitalType::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for OrbitalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// lm 分解轨道
///
/// 顺序与 vasprun.xml 中的投影列一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Orbital {
    S,
    Py,
    Pz,
    Px,
    Dxy,
    Dyz,
    Dz2,
    Dxz,
    Dx2,
    F3Minus,
    F2Minus,
    F1Minus,
    F0,
    F1,
    F2,
    F3,
}

impl Orbital {
    pub const ALL: [Orbital; 16] = [
        Orbital::S,
        Orbital::Py,
        Orbital::Pz,
        Orbital::Px,
        Orbital::Dxy,
        Orbital::Dyz,
        Orbital::Dz2,
        Orbital::Dxz,
        Orbital::Dx2,
        Orbital::F3Minus,
        Orbital::F2Minus,
        Orbital::F1Minus,
        Orbital::F0,
        Orbital::F1,
        Orbital::F2,
        Orbital::F3,
    ];

    /// 轨道标签，如 "px", "dx2", "f_3"
    pub fn name(&self) -> &'static str {
        match self {
            Orbital::S => "s",
            Orbital::Py => "py",
            Orbital::Pz => "pz",
            Orbital::Px => "px",
            Orbital::Dxy => "dxy",
            Orbital::Dyz => "dyz",
            Orbital::Dz2 => "dz2",
            Orbital::Dxz => "dxz",
            Orbital::Dx2 => "dx2",
            Orbital::F3Minus => "f_3",
            Orbital::F2Minus => "f_2",
            Orbital::F1Minus => "f_1",
            Orbital::F0 => "f0",
            Orbital::F1 => "f1",
            Orbital::F2 => "f2",
            Orbital::F3 => "f3",
        }
    }

    /// 所属 spd 壳层
    pub fn orbital_type(&self) -> OrbitalType {
        match self {
            Orbital::S => OrbitalType::S,
            Orbital::Py | Orbital::Pz | Orbital::Px => OrbitalType::P,
            Orbital::Dxy | Orbital::Dyz | Orbital::Dz2 | Orbital::Dxz | Orbital::Dx2 => {
                OrbitalType::D
            }
            _ => OrbitalType::F,
        }
    }

    /// 由 vasprun.xml `<partial>` 中的 field 名称解析轨道
    pub fn from_vasp_label(label: &str) -> Option<Self> {
        let orbital = match label.trim() {
            "s" => Orbital::S,
            "py" => Orbital::Py,
            "pz" => Orbital::Pz,
            "px" => Orbital::Px,
            "dxy" => Orbital::Dxy,
            "dyz" => Orbital::Dyz,
            "dz2" => Orbital::Dz2,
            "dxz" => Orbital::Dxz,
            "x2-y2" | "dx2" | "dx2-y2" => Orbital::Dx2,
            "fy3x2" | "f-3" => Orbital::F3Minus,
            "fxyz" | "f-2" => Orbital::F2Minus,
            "fyz2" | "f-1" => Orbital::F1Minus,
            "fz3" | "f0" => Orbital::F0,
            "fxz2" | "f1" => Orbital::F1,
            "fzx2" | "f2" => Orbital::F2,
            "fx3" | "f3" => Orbital::F3,
            _ => return None,
        };
        Some(orbital)
    }

    /// 某壳层的全部 lm 轨道
    pub fn of_type(orbital_type: OrbitalType) -> impl Iterator<Item = Orbital> {
        Orbital::ALL
            .into_iter()
            .filter(move |o| o.orbital_type() == orbital_type)
    }
}

impl fmt::Display for Orbital {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
