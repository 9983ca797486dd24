//! # 态密度数据模型
//!
//! `Dos` 是一条与能量网格对齐的态密度曲线（每个自旋通道一列），
//! 支持逐点相加、高斯展宽和基于态密度的带隙判断。
//! `CompleteDos` 在总态密度之外保存结构和每个位点的 lm 投影。
//!
//! ## 依赖关系
//! - 被 `parsers/vasprun.rs` 构造
//! - 被 `dos/loader.rs`, `dos/projection.rs`, `dos/writer.rs` 使用
//! - 使用 `models/orbital.rs`, `models/structure.rs`

use crate::models::orbital::{Orbital, OrbitalType, Spin};
use crate::models::structure::Crystal;

use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

/// 高斯核截断位置（标准差的倍数）
const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// 高斯核半宽上限（格点数）
const MAX_KERNEL_RADIUS: f64 = 1.0e6;

/// 各自旋通道的态密度
pub type Densities = BTreeMap<Spin, Vec<f64>>;

/// 单个位点的 lm 投影
pub type SiteProjection = BTreeMap<Orbital, Densities>;

/// 态密度曲线
#[derive(Debug, Clone, PartialEq)]
pub struct Dos {
    /// Fermi 能级 (eV)，与能量网格使用同一参考点
    pub efermi: f64,
    /// 能量网格 (eV)
    pub energies: Vec<f64>,
    /// 态密度，长度与 `energies` 相同
    pub densities: Densities,
}

impl Dos {
    pub fn new(efermi: f64, energies: Vec<f64>, densities: Densities) -> Self {
        Dos {
            efermi,
            energies,
            densities,
        }
    }

    /// 自旋通道数
    pub fn num_spins(&self) -> usize {
        self.densities.len()
    }

    pub fn density(&self, spin: Spin) -> Option<&[f64]> {
        self.densities.get(&spin).map(|d| d.as_slice())
    }

    /// 所有自旋通道之和
    pub fn summed_densities(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.energies.len()];
        for dens in self.densities.values() {
            for (t, d) in total.iter_mut().zip(dens) {
                *t += d;
            }
        }
        total
    }

    /// 能量网格与 Fermi 能级整体减去 `delta`
    pub fn shift_energies(&mut self, delta: f64) {
        for e in self.energies.iter_mut() {
            *e -= delta;
        }
        self.efermi -= delta;
    }

    /// 高斯展宽后的副本，`sigma` 单位为 eV
    pub fn smeared(&self, sigma: f64) -> Dos {
        Dos {
            efermi: self.efermi,
            energies: self.energies.clone(),
            densities: smear_densities(&self.energies, &self.densities, sigma),
        }
    }

    pub fn remove_spin(&mut self, spin: Spin) -> Option<Vec<f64>> {
        self.densities.remove(&spin)
    }

    /// 由态密度确定 (CBM, VBM)。
    ///
    /// `tol` 是相对于平均态密度的阈值：从 Fermi 能级向下找到态密度
    /// 不超过阈值区间的起点，再向上找到终点。
    pub fn cbm_vbm(&self, tol: f64) -> (f64, f64) {
        let n = self.energies.len();
        if n == 0 {
            return (self.efermi, self.efermi);
        }

        let tdos = self.summed_densities();
        let tol = tol * tdos.iter().sum::<f64>() / n as f64;

        let i_fermi = self
            .energies
            .iter()
            .position(|&e| e > self.efermi)
            .unwrap_or(n - 1);

        let mut i_gap_start = i_fermi;
        while i_gap_start > 0 && tdos[i_gap_start - 1] <= tol {
            i_gap_start -= 1;
        }

        let mut i_gap_end = i_gap_start;
        while i_gap_end < n && tdos[i_gap_end] <= tol {
            i_gap_end += 1;
        }
        let i_gap_end = i_gap_end.saturating_sub(1);

        (self.energies[i_gap_end], self.energies[i_gap_start])
    }

    /// 态密度带隙 (eV)，金属为 0
    pub fn gap(&self, tol: f64) -> f64 {
        let (cbm, vbm) = self.cbm_vbm(tol);
        (cbm - vbm).max(0.0)
    }
}

impl AddAssign<&Dos> for Dos {
    /// 逐点相加；只在一侧出现的自旋通道直接保留
    fn add_assign(&mut self, other: &Dos) {
        for (spin, dens) in &other.densities {
            match self.densities.get_mut(spin) {
                Some(mine) => {
                    for (a, b) in mine.iter_mut().zip(dens) {
                        *a += b;
                    }
                }
                None => {
                    self.densities.insert(*spin, dens.clone());
                }
            }
        }
    }
}

impl Add<&Dos> for Dos {
    type Output = Dos;

    fn add(mut self, other: &Dos) -> Dos {
        self += other;
        self
    }
}

/// 完整态密度：总态密度 + 结构 + 位点投影
#[derive(Debug, Clone)]
pub struct CompleteDos {
    pub total: Dos,
    pub structure: Crystal,
    /// 下标为全局位点索引
    pub pdos: Vec<SiteProjection>,
}

impl CompleteDos {
    pub fn new(total: Dos, structure: Crystal, pdos: Vec<SiteProjection>) -> Self {
        CompleteDos {
            total,
            structure,
            pdos,
        }
    }

    pub fn energies(&self) -> &[f64] {
        &self.total.energies
    }

    fn wrap(&self, densities: Densities) -> Dos {
        Dos::new(self.total.efermi, self.total.energies.clone(), densities)
    }

    /// 单个位点单个 lm 轨道的态密度
    pub fn site_orbital_dos(&self, site: usize, orbital: Orbital) -> Option<Dos> {
        self.pdos
            .get(site)
            .and_then(|proj| proj.get(&orbital))
            .map(|dens| self.wrap(dens.clone()))
    }

    /// 单个位点按 spd 壳层求和的态密度
    pub fn site_spd_dos(&self, site: usize) -> BTreeMap<OrbitalType, Dos> {
        let mut spd: BTreeMap<OrbitalType, Dos> = BTreeMap::new();
        if let Some(proj) = self.pdos.get(site) {
            for (orbital, dens) in proj {
                let dos = self.wrap(dens.clone());
                match spd.get_mut(&orbital.orbital_type()) {
                    Some(acc) => *acc += &dos,
                    None => {
                        spd.insert(orbital.orbital_type(), dos);
                    }
                }
            }
        }
        spd
    }

    /// 某元素任一位点上出现过的 spd 壳层
    pub fn element_spd_types(&self, element: &str) -> Vec<OrbitalType> {
        let mut types: Vec<OrbitalType> = self
            .structure
            .element_sites(element)
            .into_iter()
            .filter_map(|site| self.pdos.get(site))
            .flat_map(|proj| proj.keys().map(|o| o.orbital_type()))
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// 总态密度与全部投影共享同一能量网格，一并平移
    pub fn shift_energies(&mut self, delta: f64) {
        self.total.shift_energies(delta);
    }

    /// 对总态密度和每个位点轨道投影做高斯展宽
    pub fn smear(&mut self, sigma: f64) {
        let energies = &self.total.energies;
        for proj in self.pdos.iter_mut() {
            for dens in proj.values_mut() {
                *dens = smear_densities(energies, dens, sigma);
            }
        }
        self.total = self.total.smeared(sigma);
    }

    /// 从总态密度和所有投影中删除某个自旋通道
    pub fn remove_spin(&mut self, spin: Spin) {
        self.total.remove_spin(spin);
        for proj in self.pdos.iter_mut() {
            for dens in proj.values_mut() {
                dens.remove(&spin);
            }
        }
    }
}

/// 按能量网格平均间距把 `sigma` 换算成格点数后做一维高斯滤波
fn smear_densities(energies: &[f64], densities: &Densities, sigma: f64) -> Densities {
    if energies.len() < 2 || !sigma.is_finite() || sigma <= 0.0 {
        return densities.clone();
    }

    let avg_diff = (energies[energies.len() - 1] - energies[0]) / (energies.len() - 1) as f64;
    let sd = sigma / avg_diff.abs();
    // 退化网格（首末能量相同）上 sd 为无穷大
    if !sd.is_finite() {
        return densities.clone();
    }

    densities
        .iter()
        .map(|(spin, dens)| (*spin, gaussian_filter1d(dens, sd)))
        .collect()
}

/// 一维高斯滤波，边界按半格点镜像延拓 (d c b a | a b c d | d c b a)
fn gaussian_filter1d(input: &[f64], sd: f64) -> Vec<f64> {
    let n = input.len();
    if n == 0 || !sd.is_finite() || sd <= 0.0 {
        return input.to_vec();
    }

    let radius = (GAUSSIAN_TRUNCATE * sd + 0.5).min(MAX_KERNEL_RADIUS) as isize;
    let period = 2 * n as isize;
    let reflect = |i: isize| -> usize {
        let m = i.rem_euclid(period);
        if m < n as isize {
            m as usize
        } else {
            (period - 1 - m) as usize
        }
    };

    let kernel = (-radius..=radius).map(|k| (k, (-0.5 * (k as f64 / sd).powi(2)).exp()));
    // 镜像延拓以 2n 为周期，核比周期宽时按周期折叠
    let mut taps: Vec<(isize, f64)> = if 2 * radius + 1 > period {
        let mut folded = vec![0.0; period as usize];
        for (k, w) in kernel {
            folded[k.rem_euclid(period) as usize] += w;
        }
        (0..period).zip(folded).collect()
    } else {
        kernel.collect()
    };
    let norm: f64 = taps.iter().map(|(_, w)| w).sum();
    taps.iter_mut().for_each(|(_, w)| *w /= norm);

    (0..n as isize)
        .map(|i| taps.iter().map(|(k, w)| w * input[reflect(i + k)]).sum())
        .collect()
}
