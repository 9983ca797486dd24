//! # extract 子命令 CLI 定义
//!
//! 从 vasprun.xml 提取总态密度和投影态密度并写成数据文件。
//!
//! ## 过滤字符串
//! - 元素：`"Bi.s.p,S"` → Bi 只保留 s、p 壳层，S 保留全部
//! - lm 分解：`"Bi.p.d"` → Bi 的 p、d 壳层按 m 分量输出
//! - 位点：`"Bi.1-3.5,S"` → Bi 的第 1~3 和第 5 个原子（元素内从 1 开始编号）
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/extract.rs`
//! - 生成 `dos/projection.rs` 的 DosFilter

use crate::dos::DosFilter;
use crate::error::{QdosError, Result};
use crate::models::OrbitalType;

use clap::Args;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// 元素内原子编号上限
pub const MAX_ATOM_INDEX: usize = 100_000;

/// extract 子命令参数
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Input: vasprun.xml file, or a directory of calculations (batch mode)
    #[arg(env = "QDOS_VASPRUN", default_value = "vasprun.xml")]
    pub input: PathBuf,

    /// Elements and shells to include (e.g., "Bi.s.p,S")
    #[arg(short, long)]
    pub elements: Option<String>,

    /// Shells to split into lm-decomposed orbitals (e.g., "Bi.p.d")
    #[arg(short, long)]
    pub orbitals: Option<String>,

    /// Atoms to sum over, 1-based within each element (e.g., "Bi.1-3.5,S")
    #[arg(short, long)]
    pub atoms: Option<String>,

    /// Gaussian broadening width in eV
    #[arg(short, long)]
    pub gaussian: Option<f64>,

    /// Only write the total DOS
    #[arg(long, default_value_t = false)]
    pub total_only: bool,

    /// Prefix for output file names
    #[arg(short, long, env = "QDOS_PREFIX")]
    pub prefix: Option<String>,

    /// Output directory
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Do not print band gap information
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    // ─────────────────────────────────────────────────────────────
    // 批量处理参数
    // ─────────────────────────────────────────────────────────────
    /// Glob pattern for vasprun files (batch mode, e.g., "vasprun.xml*")
    #[arg(long, default_value = "vasprun.xml*")]
    pub pattern: String,

    /// Recurse into subdirectories (batch mode)
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Number of parallel jobs (0 = auto, batch mode only)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Overwrite existing output files (batch mode)
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}

impl ExtractArgs {
    /// 由命令行字符串构造过滤条件
    pub fn filter(&self) -> Result<DosFilter> {
        Ok(DosFilter {
            elements: self.elements.as_deref().map(parse_elements).transpose()?,
            lm_orbitals: self.orbitals.as_deref().map(parse_orbitals).transpose()?,
            atoms: self.atoms.as_deref().map(parse_atoms).transpose()?,
        })
    }

    /// 检查展宽宽度为有限正数
    pub fn check_gaussian(&self) -> Result<()> {
        match self.gaussian {
            Some(sigma) if !sigma.is_finite() || sigma <= 0.0 => Err(QdosError::InvalidArgument(
                format!("Gaussian width must be a positive number of eV, got {}", sigma),
            )),
            _ => Ok(()),
        }
    }
}

fn element_regex() -> Result<Regex> {
    Regex::new(r"^[A-Z][a-z]?$").map_err(|e| QdosError::Other(e.to_string()))
}

/// 规范化元素符号（首字母大写），拒绝不像元素符号的输入
pub fn normalize_element(re: &Regex, symbol: &str) -> Option<String> {
    let mut chars = symbol.trim().chars();
    let first = chars.next()?;
    let normalized: String = first
        .to_uppercase()
        .chain(chars.flat_map(|c| c.to_lowercase()))
        .collect();
    re.is_match(&normalized).then_some(normalized)
}

/// 把 `"El.a.b,El2"` 拆成 元素 → 字段列表
fn split_filter(kind: &str, input: &str) -> Result<BTreeMap<String, Vec<String>>> {
    let invalid = |reason: String| QdosError::InvalidFilter {
        kind: kind.to_string(),
        input: input.to_string(),
        reason,
    };

    let re = element_regex()?;
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for group in input.split(',').map(str::trim).filter(|g| !g.is_empty()) {
        let mut fields = group.split('.').map(str::trim);
        let symbol = fields.next().unwrap_or_default();
        let element = normalize_element(&re, symbol)
            .ok_or_else(|| invalid(format!("'{}' is not an element symbol", symbol)))?;

        let entry = map.entry(element).or_default();
        for field in fields.filter(|f| !f.is_empty()) {
            if !entry.iter().any(|f| f == field) {
                entry.push(field.to_string());
            }
        }
    }

    if map.is_empty() {
        return Err(invalid("no element given".to_string()));
    }
    Ok(map)
}

fn parse_shells(kind: &str, input: &str) -> Result<BTreeMap<String, Vec<String>>> {
    let map = split_filter(kind, input)?;
    for shells in map.values() {
        if let Some(bad) = shells.iter().find(|s| OrbitalType::from_name(s).is_none()) {
            return Err(QdosError::InvalidFilter {
                kind: kind.to_string(),
                input: input.to_string(),
                reason: format!("unknown shell '{}' (expected s, p, d or f)", bad),
            });
        }
    }
    Ok(map)
}

/// 解析元素过滤 `"Bi.s.p,S"`
pub fn parse_elements(input: &str) -> Result<BTreeMap<String, Vec<String>>> {
    parse_shells("element", input)
}

/// 解析 lm 分解过滤 `"Bi.p.d"`
pub fn parse_orbitals(input: &str) -> Result<BTreeMap<String, Vec<String>>> {
    parse_shells("orbital", input)
}

/// 解析位点过滤 `"Bi.1-3.5,S"`，返回元素内从 0 开始的升序编号
pub fn parse_atoms(input: &str) -> Result<BTreeMap<String, Vec<usize>>> {
    let invalid = |reason: String| QdosError::InvalidFilter {
        kind: "atom".to_string(),
        input: input.to_string(),
        reason,
    };

    let mut atoms = BTreeMap::new();
    for (element, fields) in split_filter("atom", input)? {
        let mut indices = BTreeSet::new();
        for field in &fields {
            let (start, end) = match field.split_once('-') {
                Some((a, b)) => (a.trim(), b.trim()),
                None => (field.as_str(), field.as_str()),
            };
            let start: usize = start
                .parse()
                .map_err(|_| invalid(format!("'{}' is not an atom index or range", field)))?;
            let end: usize = end
                .parse()
                .map_err(|_| invalid(format!("'{}' is not an atom index or range", field)))?;

            if start == 0 {
                return Err(invalid("atom indices start at 1".to_string()));
            }
            if end < start {
                return Err(invalid(format!("range '{}' is reversed", field)));
            }
            if end > MAX_ATOM_INDEX {
                return Err(invalid(format!(
                    "atom index {} exceeds the limit of {}",
                    end, MAX_ATOM_INDEX
                )));
            }

            indices.extend((start..=end).map(|index| index - 1));
        }
        atoms.insert(element, indices.into_iter().collect());
    }

    Ok(atoms)
}
