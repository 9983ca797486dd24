//! # 态密度数据导出
//!
//! 把总态密度和各元素的投影态密度写成空格分隔的文本文件。
//!
//! ## 文件格式
//! ```text
//! # energy s(up) s(down) p(up) p(down)
//! -5.000000000000000000e+00 1.000000000000000000e-01 -1.000000000000000000e-01 ...
//! ```
//! - 单自旋：每个轨道一列，列名不带后缀
//! - 双自旋：`(up)`/`(down)` 两列，下自旋取负值便于作图
//! - 轨道按固定顺序排列，不在顺序表中的轨道不输出
//!
//! ## 依赖关系
//! - 被 `commands/extract.rs` 调用
//! - 使用 `dos/projection.rs` 的 ProjectedDos
//! - 使用 `csv` 库写入（空格分隔），`rayon` 并行写各元素文件

use crate::dos::projection::ProjectedDos;
use crate::error::{QdosError, Result};
use crate::models::{Dos, Spin};

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 输出时的轨道顺序
pub const ORBITAL_ORDER: [&str; 19] = [
    "s", "p", "py", "pz", "px", "d", "dxy", "dyz", "dz2", "dxz", "dx2", "f", "f_3", "f_2", "f_1",
    "f_0", "f1", "f2", "f3",
];

/// 每个输出自旋通道：(自旋, 符号, 列名后缀)
type SpinColumn = (Spin, f64, &'static str);

fn spin_columns(dos: &Dos) -> Vec<SpinColumn> {
    if dos.num_spins() == 1 {
        let spin = dos.densities.keys().next().copied().unwrap_or(Spin::Up);
        vec![(spin, 1.0, "")]
    } else {
        vec![(Spin::Up, 1.0, "(up)"), (Spin::Down, -1.0, "(down)")]
    }
}

/// 按输出顺序排列某元素的轨道，丢弃顺序表之外的轨道
pub fn sort_orbitals(element_pdos: &BTreeMap<String, Dos>) -> Vec<&'static str> {
    ORBITAL_ORDER
        .iter()
        .copied()
        .filter(|orb| element_pdos.contains_key(*orb))
        .collect()
}

/// 输出文件名
pub fn output_path(name: &str, prefix: Option<&str>, directory: Option<&Path>) -> PathBuf {
    let filename = match prefix {
        Some(prefix) => format!("{}_{}_dos.dat", prefix, name),
        None => format!("{}_dos.dat", name),
    };
    match directory {
        Some(dir) => dir.join(filename),
        None => PathBuf::from(filename),
    }
}

/// 写出总态密度和各元素的投影态密度，返回写出的文件列表
pub fn write_files(
    dos: &Dos,
    pdos: &ProjectedDos,
    prefix: Option<&str>,
    directory: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    if let Some(dir) = directory {
        fs::create_dir_all(dir).map_err(|e| QdosError::FileWriteError {
            path: dir.display().to_string(),
            source: e,
        })?;
    }

    let sdata = spin_columns(dos);

    // 总态密度
    let mut header = vec!["energy".to_string()];
    let mut columns: Vec<Vec<f64>> = Vec::new();
    for &(spin, sign, label) in &sdata {
        header.push(format!("dos{}", label));
        columns.push(signed_density(dos, spin, sign, "total")?);
    }
    let total_path = output_path("total", prefix, directory);
    write_table(&total_path, &header, &dos.energies, &columns)?;

    // 各元素投影态密度，文件互不相关，并行写出
    let element_paths = pdos
        .par_iter()
        .map(|(el, el_pdos)| -> Result<PathBuf> {
            let mut header = vec!["energy".to_string()];
            let mut columns: Vec<Vec<f64>> = Vec::new();
            for orb in sort_orbitals(el_pdos) {
                for &(spin, sign, label) in &sdata {
                    header.push(format!("{}{}", orb, label));
                    columns.push(signed_density(&el_pdos[orb], spin, sign, el)?);
                }
            }

            let path = output_path(el, prefix, directory);
            write_table(&path, &header, &dos.energies, &columns)?;
            Ok(path)
        })
        .collect::<Result<Vec<PathBuf>>>()?;

    let mut written = vec![total_path];
    written.extend(element_paths);
    Ok(written)
}

fn signed_density(dos: &Dos, spin: Spin, sign: f64, owner: &str) -> Result<Vec<f64>> {
    dos.density(spin)
        .map(|d| d.iter().map(|v| v * sign).collect())
        .ok_or_else(|| QdosError::Other(format!("{} DOS has no spin {} channel", owner, spin)))
}

/// 写出一张 能量 + 数据列 的表
fn write_table(path: &Path, header: &[String], energies: &[f64], columns: &[Vec<f64>]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b' ')
        .flexible(true)
        .from_path(path)
        .map_err(QdosError::CsvError)?;

    let mut header_record = vec!["#".to_string()];
    header_record.extend(header.iter().cloned());
    wtr.write_record(&header_record)?;

    for (i, energy) in energies.iter().enumerate() {
        let mut row = vec![format_savetxt(*energy)];
        row.extend(columns.iter().map(|col| format_savetxt(col[i])));
        wtr.write_record(&row)?;
    }

    wtr.flush().map_err(|e| QdosError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 按 numpy `savetxt` 默认格式 `%.18e` 输出
fn format_savetxt(value: f64) -> String {
    let s = format!("{:.18e}", value);
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => s,
    }
}
