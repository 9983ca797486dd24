//! # 计算参数与能带摘要
//!
//! 存储从 vasprun.xml 中提取的计算参数（展宽方法、自旋轨道耦合等）
//! 以及判断金属性、价带顶所需的本征值。
//!
//! ## 依赖关系
//! - 被 `parsers/vasprun.rs` 构造
//! - 被 `dos/loader.rs`, `commands/info.rs` 使用

use serde::{Deserialize, Serialize};

/// 判断能带是否穿过 Fermi 能级的容差 (eV)
const EFERMI_TOL: f64 = 1e-4;

/// 计算参数
///
/// 缺失的参数表示对应特性不存在，而不是错误。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalcParameters {
    /// 展宽方法 ISMEAR
    pub ismear: Option<i64>,
    /// 展宽宽度 SIGMA (eV)
    pub sigma: Option<f64>,
    /// 是否开启自旋轨道耦合 LSORBIT
    pub lsorbit: Option<bool>,
    /// 自旋极化 ISPIN
    pub ispin: Option<i64>,
}

impl CalcParameters {
    /// 高斯类展宽 (ISMEAR = -1, 0, 1) 下需要额外扣除的能量平移
    pub fn smearing_shift(&self) -> Option<f64> {
        match self.ismear {
            Some(-1) | Some(0) | Some(1) => self.sigma,
            _ => None,
        }
    }

    pub fn is_spin_orbit(&self) -> bool {
        self.lsorbit.unwrap_or(false)
    }
}

/// 能带本征值摘要
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandSummary {
    /// Fermi 能级 (eV)
    pub efermi: f64,
    /// `[spin][kpoint][band] = (本征值, 占据数)`
    pub eigenvalues: Vec<Vec<Vec<(f64, f64)>>>,
}

impl BandSummary {
    pub fn new(efermi: f64, eigenvalues: Vec<Vec<Vec<(f64, f64)>>>) -> Self {
        BandSummary { efermi, eigenvalues }
    }

    pub fn is_empty(&self) -> bool {
        self.all_energies().next().is_none()
    }

    fn all_energies(&self) -> impl Iterator<Item = f64> + '_ {
        self.eigenvalues
            .iter()
            .flatten()
            .flatten()
            .map(|(e, _)| *e)
    }

    /// 任一能带在不同 k 点上同时出现于 Fermi 能级上下即为金属
    pub fn is_metal(&self) -> bool {
        for spin in &self.eigenvalues {
            let nbands = spin.iter().map(|k| k.len()).min().unwrap_or(0);
            for band in 0..nbands {
                let below = spin.iter().any(|k| k[band].0 - self.efermi < -EFERMI_TOL);
                let above = spin.iter().any(|k| k[band].0 - self.efermi > EFERMI_TOL);
                if below && above {
                    return true;
                }
            }
        }
        false
    }

    /// 价带顶：低于 Fermi 能级的最高本征值
    pub fn vbm(&self) -> Option<f64> {
        self.all_energies()
            .filter(|&e| e < self.efermi)
            .fold(None, |acc: Option<f64>, e| Some(acc.map_or(e, |m| m.max(e))))
    }

    /// 导带底：不低于 Fermi 能级的最低本征值
    pub fn cbm(&self) -> Option<f64> {
        self.all_energies()
            .filter(|&e| e >= self.efermi)
            .fold(None, |acc: Option<f64>, e| Some(acc.map_or(e, |m| m.min(e))))
    }

    /// 能带带隙 (eV)，金属为 0
    pub fn band_gap(&self) -> Option<f64> {
        if self.is_metal() {
            return Some(0.0);
        }
        match (self.cbm(), self.vbm()) {
            (Some(cbm), Some(vbm)) => Some(cbm - vbm),
            _ => None,
        }
    }
}
