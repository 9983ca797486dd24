//! # 态密度读取与能量对齐
//!
//! 读取 vasprun.xml 后依次完成：
//! 1. 确定能量零点（金属取 Fermi 能级，否则取价带顶）并平移能量
//! 2. 高斯类展宽 (ISMEAR = -1, 0, 1) 下再扣除 SIGMA
//! 3. 可选的高斯展宽，作用于总态密度和每个位点轨道
//! 4. 自旋轨道耦合计算删除无意义的下自旋通道
//! 5. 按过滤条件计算投影态密度
//!
//! ## 依赖关系
//! - 被 `commands/extract.rs` 调用
//! - 使用 `parsers/vasprun.rs` 读取数据
//! - 使用 `dos/projection.rs` 计算投影态密度
//! - 使用 `utils/output.rs` 输出带隙信息

use crate::dos::projection::{get_pdos, DosFilter, ProjectedDos};
use crate::error::Result;
use crate::models::{CalcParameters, CompleteDos, Spin};
use crate::parsers::{parse_vasprun_file, Vasprun};
use crate::utils::output;

use std::path::Path;

/// 态密度判断带隙时的相对阈值
pub const DOS_GAP_TOL: f64 = 0.001;

/// 能量零点
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZeroPoint {
    /// 金属：Fermi 能级
    FermiLevel(f64),
    /// 非金属：价带顶
    Vbm(f64),
}

impl ZeroPoint {
    pub fn energy(&self) -> f64 {
        match self {
            ZeroPoint::FermiLevel(e) | ZeroPoint::Vbm(e) => *e,
        }
    }

    pub fn is_metal(&self) -> bool {
        matches!(self, ZeroPoint::FermiLevel(_))
    }
}

/// 根据能带本征值确定能量零点；没有本征值时退回到态密度带隙
pub fn zero_point(vasprun: &Vasprun) -> ZeroPoint {
    let bands = &vasprun.bands;
    let total = &vasprun.complete_dos.total;

    if !bands.is_empty() {
        if bands.is_metal() {
            return ZeroPoint::FermiLevel(bands.efermi);
        }
        return ZeroPoint::Vbm(bands.vbm().unwrap_or(bands.efermi));
    }

    if total.gap(DOS_GAP_TOL) > 0.0 {
        ZeroPoint::Vbm(total.cbm_vbm(DOS_GAP_TOL).1)
    } else {
        ZeroPoint::FermiLevel(total.efermi)
    }
}

/// 对齐能量、展宽并清理自旋通道
///
/// `zero_point` 为能量零点 (eV)，`gaussian` 为展宽宽度 (eV)。
pub fn align_and_broaden(
    dos: &mut CompleteDos,
    zero_point: f64,
    parameters: &CalcParameters,
    gaussian: Option<f64>,
) {
    dos.shift_energies(zero_point);

    if let Some(sigma) = parameters.smearing_shift() {
        dos.shift_energies(sigma);
    }

    if let Some(sigma) = gaussian.filter(|s| s.is_finite() && *s > 0.0) {
        dos.smear(sigma);
    }

    if parameters.is_spin_orbit() {
        dos.remove_spin(Spin::Down);
    }
}

/// 从已解析的 vasprun 提取总态密度和投影态密度
///
/// vasprun 中没有位点投影时，投影态密度为空。
pub fn extract_dos(
    vasprun: Vasprun,
    filter: &DosFilter,
    gaussian: Option<f64>,
    total_only: bool,
    log: bool,
) -> (CompleteDos, ProjectedDos) {
    let zero = zero_point(&vasprun);

    // 没有投影数据时只输出总态密度
    let total_only = total_only || !vasprun.has_projections();

    if log {
        if zero.is_metal() {
            output::print_info("System is metallic");
        } else {
            if let Some(gap) = vasprun.bands.band_gap() {
                output::print_info(&format!("Band gap: {:.3}", gap));
            }
            output::print_info(&format!(
                "DOS band gap: {:.3}",
                vasprun.complete_dos.total.gap(DOS_GAP_TOL)
            ));
        }
    }

    let Vasprun {
        parameters,
        complete_dos: mut dos,
        ..
    } = vasprun;

    align_and_broaden(&mut dos, zero.energy(), &parameters, gaussian);

    let pdos = if total_only {
        ProjectedDos::new()
    } else {
        get_pdos(&dos, filter)
    };

    (dos, pdos)
}

/// 读取 vasprun.xml 并提取总态密度和投影态密度
pub fn load_dos(
    path: &Path,
    filter: &DosFilter,
    gaussian: Option<f64>,
    total_only: bool,
    log: bool,
) -> Result<(CompleteDos, ProjectedDos)> {
    let vasprun = parse_vasprun_file(path)?;
    Ok(extract_dos(vasprun, filter, gaussian, total_only, log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BandSummary;
    use crate::parsers::vasprun::parse_vasprun_content;
    use crate::parsers::vasprun::tests::{GAAS_VASPRUN, SOC_VASPRUN};

    fn gaas() -> Vasprun {
        parse_vasprun_content(GAAS_VASPRUN, "GaAs").unwrap()
    }

    fn no_smearing() -> CalcParameters {
        CalcParameters::default()
    }

    #[test]
    fn test_metal_aligns_to_fermi_level() {
        let mut vr = gaas();
        vr.bands = BandSummary::new(0.5, vec![vec![vec![(-0.2, 1.0)], vec![(0.9, 0.0)]]]);
        let zero = zero_point(&vr);
        assert_eq!(zero, ZeroPoint::FermiLevel(0.5));

        let original = vr.complete_dos.total.energies.clone();
        let mut dos = vr.complete_dos;
        align_and_broaden(&mut dos, zero.energy(), &no_smearing(), None);

        let expected: Vec<f64> = original.iter().map(|e| e - 0.5).collect();
        assert_eq!(dos.energies(), expected.as_slice());
    }

    #[test]
    fn test_insulator_aligns_to_vbm() {
        let vr = gaas();
        let zero = zero_point(&vr);
        assert_eq!(zero, ZeroPoint::Vbm(-0.8));

        let original = vr.complete_dos.total.energies.clone();
        let mut dos = vr.complete_dos;
        align_and_broaden(&mut dos, zero.energy(), &no_smearing(), None);

        let expected: Vec<f64> = original.iter().map(|e| e - (-0.8)).collect();
        assert_eq!(dos.energies(), expected.as_slice());
    }

    #[test]
    fn test_zero_point_without_eigenvalues_uses_dos() {
        let mut vr = gaas();
        vr.bands = BandSummary::default();
        // 总态密度处处非零：金属
        assert_eq!(zero_point(&vr), ZeroPoint::FermiLevel(0.5));
    }

    #[test]
    fn test_gaussian_family_smearing_shifts_by_sigma() {
        for (ismear, shifted) in [(-1, true), (0, true), (1, true), (-5, false), (2, false)] {
            let params = CalcParameters {
                ismear: Some(ismear),
                sigma: Some(0.05),
                ..Default::default()
            };
            let mut dos = gaas().complete_dos;
            let original = dos.total.energies.clone();
            align_and_broaden(&mut dos, 0.0, &params, None);

            let expected: Vec<f64> = original
                .iter()
                .map(|e| if shifted { (e - 0.0) - 0.05 } else { e - 0.0 })
                .collect();
            assert_eq!(dos.energies(), expected.as_slice(), "ISMEAR = {}", ismear);
        }
    }

    #[test]
    fn test_spin_orbit_removes_down_channel() {
        let params = CalcParameters {
            lsorbit: Some(true),
            ..Default::default()
        };
        let mut dos = gaas().complete_dos;
        let up = dos.total.densities[&Spin::Up].clone();
        align_and_broaden(&mut dos, 0.0, &params, None);

        assert_eq!(dos.total.num_spins(), 1);
        assert_eq!(dos.total.densities[&Spin::Up], up);
        assert!(dos
            .pdos
            .iter()
            .flat_map(|p| p.values())
            .all(|d| d.len() == 1 && d.contains_key(&Spin::Up)));
    }

    #[test]
    fn test_non_collinear_extract_keeps_spin_up_only() {
        let vr = parse_vasprun_content(SOC_VASPRUN, "Ga").unwrap();
        let (dos, pdos) = extract_dos(vr, &DosFilter::default(), None, false, false);

        assert_eq!(dos.total.num_spins(), 1);
        assert_eq!(dos.total.density(Spin::Up).unwrap(), &[1.0, 2.0, 3.0]);
        // ISMEAR = -5，只按 VBM (-1.0) 对齐
        assert_eq!(dos.energies(), &[0.0, 1.0, 2.0]);

        // spin 2 (mx) 被删除，spin 3/4 从未读入
        let s = &pdos["Ga"]["s"];
        assert_eq!(s.num_spins(), 1);
        assert_eq!(s.density(Spin::Up).unwrap(), &[0.1, 0.1, 0.1]);

        let p = &pdos["Ga"]["p"];
        assert_eq!(p.num_spins(), 1);
        assert!(p.density(Spin::Up).unwrap().iter().all(|v| (v - 0.9).abs() < 1e-12));
    }

    #[test]
    fn test_broadening_applies_to_projections() {
        let mut dos = gaas().complete_dos;
        dos.pdos[0]
            .get_mut(&crate::models::Orbital::S)
            .unwrap()
            .insert(Spin::Up, vec![0.0, 3.0, 0.0]);
        align_and_broaden(&mut dos, 0.0, &no_smearing(), Some(1.0));

        let s = &dos.pdos[0][&crate::models::Orbital::S][&Spin::Up];
        assert!(s[1] < 3.0);
        assert!(s[0] > 0.0);
        assert!((s[0] - s[2]).abs() < 1e-12);
    }

    #[test]
    fn test_extract_total_only_skips_projection() {
        let (dos, pdos) = extract_dos(gaas(), &DosFilter::default(), None, true, false);
        assert!(pdos.is_empty());
        assert_eq!(dos.total.num_spins(), 2);

        let (_, pdos) = extract_dos(gaas(), &DosFilter::default(), None, false, false);
        assert_eq!(pdos.keys().collect::<Vec<_>>(), vec!["As", "Ga"]);
        assert_eq!(pdos["Ga"].keys().collect::<Vec<_>>(), vec!["p", "s"]);
    }

    #[test]
    fn test_missing_projections_fall_back_to_total_only() {
        let mut vr = gaas();
        for proj in vr.complete_dos.pdos.iter_mut() {
            proj.clear();
        }
        let (dos, pdos) = extract_dos(vr, &DosFilter::default(), None, false, false);
        assert!(pdos.is_empty());
        assert_eq!(dos.energies().len(), 3);
    }

    #[test]
    fn test_load_dos_from_file() {
        let dir = std::env::temp_dir().join(format!("qdos_loader_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("vasprun.xml");
        std::fs::write(&path, GAAS_VASPRUN).unwrap();

        let (dos, pdos) = load_dos(&path, &DosFilter::default(), None, false, false).unwrap();
        assert_eq!(dos.structure.formula(), "GaAs");
        assert_eq!(pdos.len(), 2);

        assert!(load_dos(&dir.join("missing.xml"), &DosFilter::default(), None, false, false)
            .is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
