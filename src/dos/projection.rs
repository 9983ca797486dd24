//! # 投影态密度的选择与求和
//!
//! 按元素、轨道和位点过滤条件，把每个位点的投影态密度
//! 求和成 元素 → 轨道标签 → 态密度 的嵌套映射。
//!
//! ## 过滤规则
//! - 未给出元素过滤：结构中的所有元素，所有轨道，所有位点
//! - 给出位点过滤但其中没有该元素：跳过该元素
//! - 位点编号在每个元素内部从 0 开始，按结构顺序排列；越界编号不选中任何位点
//! - spd 壳层受轨道列表约束；要求 lm 分解的壳层总是给出全部 m 分量
//!
//! ## 依赖关系
//! - 被 `dos/loader.rs`, `commands/extract.rs` 使用
//! - 使用 `models/dos.rs`, `models/orbital.rs`

use crate::models::{CompleteDos, Dos, Orbital, OrbitalType};

use std::collections::BTreeMap;

/// 元素 → 轨道标签 → 求和后的态密度
pub type ProjectedDos = BTreeMap<String, BTreeMap<String, Dos>>;

/// 投影态密度过滤条件
///
/// `None` 表示未指定（全部包含）。元素和位点过滤中某元素对应空列表时
/// 表示该元素的全部轨道/位点；lm 列表为空表示不做 lm 分解。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DosFilter {
    /// 元素 → 保留的轨道，如 {"Bi": ["s", "p"]}
    pub elements: Option<BTreeMap<String, Vec<String>>>,
    /// 元素 → 需要 lm 分解的壳层，如 {"Bi": ["p", "d"]}
    pub lm_orbitals: Option<BTreeMap<String, Vec<String>>>,
    /// 元素 → 参与求和的位点（元素内从 0 开始编号）
    pub atoms: Option<BTreeMap<String, Vec<usize>>>,
}

impl DosFilter {
    /// 过滤条件中出现但结构里不存在的元素
    pub fn missing_elements(&self, dos: &CompleteDos) -> Vec<String> {
        let symbols = dos.structure.symbol_set();
        let mut named: Vec<&String> = [&self.elements, &self.lm_orbitals]
            .into_iter()
            .flatten()
            .flat_map(|m| m.keys())
            .chain(self.atoms.iter().flat_map(|m| m.keys()))
            .filter(|el| !symbols.contains(el))
            .collect();
        named.sort();
        named.dedup();
        named.into_iter().cloned().collect()
    }
}

/// 计算投影态密度
pub fn get_pdos(dos: &CompleteDos, filter: &DosFilter) -> ProjectedDos {
    let elements: Vec<(String, Option<&[String]>)> = match &filter.elements {
        Some(map) if !map.is_empty() => map
            .iter()
            .map(|(el, orbs)| (el.clone(), Some(orbs.as_slice())))
            .collect(),
        _ => dos
            .structure
            .symbol_set()
            .into_iter()
            .map(|el| (el, None))
            .collect(),
    };

    let atoms = filter.atoms.as_ref().filter(|a| !a.is_empty());

    let mut pdos = ProjectedDos::new();
    for (el, orbitals) in elements {
        if atoms.map_or(false, |a| !a.contains_key(&el)) {
            continue;
        }

        let element_sites = dos.structure.element_sites(&el);
        if element_sites.is_empty() {
            continue;
        }

        let sites = select_sites(&element_sites, atoms.and_then(|a| a.get(&el)));
        let lm = filter
            .lm_orbitals
            .as_ref()
            .and_then(|m| m.get(&el))
            .map(|v| v.as_slice());

        let el_dos = get_element_pdos(dos, &el, &sites, lm, orbitals);
        pdos.insert(el, el_dos);
    }
    pdos
}

/// 从元素位点列表中选出指定编号的位点，返回全局位点索引
fn select_sites(element_sites: &[usize], indices: Option<&Vec<usize>>) -> Vec<usize> {
    match indices {
        Some(idx) if !idx.is_empty() => element_sites
            .iter()
            .enumerate()
            .filter(|(i, _)| idx.contains(i))
            .map(|(_, &site)| site)
            .collect(),
        _ => element_sites.to_vec(),
    }
}

/// 计算单个元素的投影态密度
///
/// `sites` 为全局位点索引；`lm_orbitals` 为需要 lm 分解的壳层，
/// `orbitals` 为保留的 spd 壳层。返回 轨道标签 → 各位点求和后的态密度。
pub fn get_element_pdos(
    dos: &CompleteDos,
    element: &str,
    sites: &[usize],
    lm_orbitals: Option<&[String]>,
    orbitals: Option<&[String]>,
) -> BTreeMap<String, Dos> {
    let lm = lm_orbitals.filter(|l| !l.is_empty());
    let orbitals = orbitals.filter(|o| !o.is_empty());
    let named = |list: &[String], shell: OrbitalType| list.iter().any(|n| n == shell.name());

    let spd: Vec<OrbitalType> = dos
        .element_spd_types(element)
        .into_iter()
        .filter(|&t| orbitals.map_or(true, |o| named(o, t)))
        .filter(|&t| lm.map_or(true, |l| !named(l, t)))
        .collect();

    let lm_orbitals: Vec<Orbital> = OrbitalType::ALL
        .into_iter()
        .filter(|&t| lm.map_or(false, |l| named(l, t)))
        .flat_map(Orbital::of_type)
        .collect();

    let mut el_dos: BTreeMap<String, Dos> = BTreeMap::new();
    for &site in sites {
        let site_spd = dos.site_spd_dos(site);
        for shell in &spd {
            if let Some(pdos) = site_spd.get(shell) {
                accumulate(&mut el_dos, shell.name(), pdos);
            }
        }

        for &orbital in &lm_orbitals {
            if let Some(pdos) = dos.site_orbital_dos(site, orbital) {
                accumulate(&mut el_dos, orbital.name(), &pdos);
            }
        }
    }
    el_dos
}

fn accumulate(el_dos: &mut BTreeMap<String, Dos>, label: &str, pdos: &Dos) {
    match el_dos.get_mut(label) {
        Some(acc) => *acc += pdos,
        None => {
            el_dos.insert(label.to_string(), pdos.clone());
        }
    }
}
