//! # info 子命令实现
//!
//! 打印 vasprun.xml 的计算摘要：结构、计算参数、能量网格、
//! 金属性与带隙，以及每个元素可用的投影轨道。
//!
//! ## 依赖关系
//! - 使用 `cli/info.rs` 定义的 InfoArgs
//! - 使用 `parsers/` 读取 vasprun.xml
//! - 使用 `dos/loader.rs` 判断能量零点
//! - 使用 `tabled` 显示表格，`csv` + `serde` 导出表格

use crate::cli::info::InfoArgs;
use crate::dos::loader::{zero_point, DOS_GAP_TOL};
use crate::error::{QdosError, Result};
use crate::models::{CompleteDos, Orbital};
use crate::parsers::{self, Vasprun};
use crate::utils::{output, progress};

use serde::Serialize;
use std::path::Path;
use tabled::{Table, Tabled};

/// 每个元素一行
#[derive(Debug, Clone, PartialEq, Tabled, Serialize)]
struct ElementRow {
    #[tabled(rename = "Element")]
    element: String,
    #[tabled(rename = "Sites")]
    sites: usize,
    #[tabled(rename = "Shells")]
    shells: String,
    #[tabled(rename = "Orbitals")]
    orbitals: String,
}

/// 执行 info 命令
pub fn execute(args: InfoArgs) -> Result<()> {
    let spinner = progress::create_read_spinner(&args.input);
    let parsed = parsers::parse_vasprun_file(&args.input);
    spinner.finish_and_clear();
    let vasprun = parsed?;

    print_summary(&vasprun);

    let rows = element_rows(&vasprun.complete_dos);
    if rows.is_empty() {
        output::print_warning("No atoms found in vasprun.xml");
        return Ok(());
    }

    output::print_header("Projected Orbitals");
    println!("{}", Table::new(&rows));

    if let Some(ref path) = args.csv {
        save_rows_csv(&rows, path)?;
        output::print_saved("Element table", path);
    }

    Ok(())
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn print_summary(vasprun: &Vasprun) {
    let structure = vasprun.structure();
    let dos = &vasprun.complete_dos;
    let params = &vasprun.parameters;

    output::print_header(&format!("Calculation Summary: {}", structure.name));

    output::print_field("Formula", &structure.formula());
    output::print_field("Sites", &structure.num_sites().to_string());

    let (a, b, c, alpha, beta, gamma) = structure.lattice.parameters();
    output::print_field("Lattice (Å)", &format!("{:.4} {:.4} {:.4}", a, b, c));
    output::print_field("Angles (°)", &format!("{:.2} {:.2} {:.2}", alpha, beta, gamma));
    output::print_field("Volume (Å³)", &format!("{:.4}", structure.lattice.volume()));

    output::print_separator();
    output::print_field("ISMEAR", &or_dash(params.ismear));
    output::print_field("SIGMA", &or_dash(params.sigma));
    output::print_field("ISPIN", &or_dash(params.ispin));
    output::print_field("LSORBIT", &params.is_spin_orbit().to_string());
    output::print_field("Spin channels", &dos.total.num_spins().to_string());

    let energies = dos.energies();
    let range = match (energies.first(), energies.last()) {
        (Some(lo), Some(hi)) => format!("{:.3} .. {:.3} eV", lo, hi),
        _ => "-".to_string(),
    };
    output::print_field("Energy points", &format!("{} ({})", energies.len(), range));
    output::print_field("Fermi level", &format!("{:.4} eV", vasprun.efermi()));

    let zero = zero_point(vasprun);
    if zero.is_metal() {
        output::print_field("Electronic", "metallic");
    } else {
        let gap = vasprun
            .bands
            .band_gap()
            .map_or_else(|| "-".to_string(), |g| format!("{:.3} eV", g));
        output::print_field("Band gap", &gap);
        output::print_field("VBM", &format!("{:.4} eV", zero.energy()));
    }
    output::print_field(
        "DOS band gap",
        &format!("{:.3} eV", dos.total.gap(DOS_GAP_TOL)),
    );
    output::print_field(
        "Projections",
        if vasprun.has_projections() { "yes" } else { "no" },
    );
}

/// 统计每个元素的位点数和出现过的轨道
fn element_rows(dos: &CompleteDos) -> Vec<ElementRow> {
    dos.structure
        .symbol_set()
        .into_iter()
        .map(|el| {
            let sites = dos.structure.element_sites(&el);
            let shells: Vec<&str> = dos
                .element_spd_types(&el)
                .iter()
                .map(|t| t.name())
                .collect();
            let orbitals: Vec<&str> = Orbital::ALL
                .iter()
                .filter(|o| {
                    sites
                        .iter()
                        .filter_map(|&s| dos.pdos.get(s))
                        .any(|proj| proj.contains_key(*o))
                })
                .map(|o| o.name())
                .collect();

            ElementRow {
                sites: sites.len(),
                shells: shells.join(" "),
                orbitals: orbitals.join(" "),
                element: el,
            }
        })
        .collect()
}

/// 保存元素表到 CSV
fn save_rows_csv(rows: &[ElementRow], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|e| QdosError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::vasprun::parse_vasprun_content;
    use crate::parsers::vasprun::tests::GAAS_VASPRUN;

    #[test]
    fn test_element_rows() {
        let vr = parse_vasprun_content(GAAS_VASPRUN, "GaAs").unwrap();
        let rows = element_rows(&vr.complete_dos);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].element, "Ga");
        assert_eq!(rows[0].sites, 1);
        assert_eq!(rows[0].shells, "s p");
        assert_eq!(rows[0].orbitals, "s py pz px");
        assert_eq!(rows[1].element, "As");
    }

    #[test]
    fn test_save_rows_csv() {
        let path = std::env::temp_dir().join(format!("qdos_info_{}.csv", std::process::id()));
        let rows = vec![ElementRow {
            element: "Bi".to_string(),
            sites: 2,
            shells: "s p d".to_string(),
            orbitals: "s".to_string(),
        }];
        save_rows_csv(&rows, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "element,sites,shells,orbitals\nBi,2,s p d,s\n");
        std::fs::remove_file(&path).unwrap();
    }
}
