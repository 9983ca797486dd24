//! # 晶体结构数据模型
//!
//! 计算所用的晶体结构：晶格与按顺序排列的原子位点。
//! 投影态密度按元素选择位点时只读使用。
//!
//! ## 依赖关系
//! - 被 `parsers/vasprun.rs` 构造
//! - 被 `models/dos.rs`, `dos/projection.rs`, `commands/info.rs` 使用

use serde::{Deserialize, Serialize};

/// 晶格参数表示
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    /// [[a1, a2, a3], [b1, b2, b3], [c1, c2, c3]]
    pub matrix: [[f64; 3]; 3],
}

impl Lattice {
    /// 从晶格向量矩阵创建
    pub fn from_vectors(matrix: [[f64; 3]; 3]) -> Self {
        Lattice { matrix }
    }

    /// 获取晶格参数 (a, b, c, alpha, beta, gamma)
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let [a_vec, b_vec, c_vec] = self.matrix;

        let norm = |v: [f64; 3]| (v[0].powi(2) + v[1].powi(2) + v[2].powi(2)).sqrt();
        let dot = |u: [f64; 3], v: [f64; 3]| -> f64 { u.iter().zip(v.iter()).map(|(x, y)| x * y).sum() };

        let a = norm(a_vec);
        let b = norm(b_vec);
        let c = norm(c_vec);

        let alpha = (dot(b_vec, c_vec) / (b * c)).acos().to_degrees();
        let beta = (dot(a_vec, c_vec) / (a * c)).acos().to_degrees();
        let gamma = (dot(a_vec, b_vec) / (a * b)).acos().to_degrees();

        (a, b, c, alpha, beta, gamma)
    }

    /// 计算晶格体积
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.matrix;

        // 行列式计算
        a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
            + a[2] * (b[0] * c[1] - b[1] * c[0])
    }
}

/// 原子位点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    /// 元素符号
    pub element: String,

    /// 分数坐标 [x, y, z]
    pub position: [f64; 3],
}

impl Atom {
    pub fn new(element: impl Into<String>, position: [f64; 3]) -> Self {
        Atom {
            element: element.into(),
            position,
        }
    }
}

/// 晶体结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crystal {
    /// 结构名称
    pub name: String,

    /// 晶格
    pub lattice: Lattice,

    /// 原子列表（顺序即全局位点索引）
    pub atoms: Vec<Atom>,
}

impl Crystal {
    pub fn new(name: impl Into<String>, lattice: Lattice, atoms: Vec<Atom>) -> Self {
        Crystal {
            name: name.into(),
            lattice,
            atoms,
        }
    }

    /// 位点数
    pub fn num_sites(&self) -> usize {
        self.atoms.len()
    }

    /// 结构中出现的元素，按首次出现的顺序
    pub fn symbol_set(&self) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        for atom in &self.atoms {
            if !symbols.iter().any(|s| s == &atom.element) {
                symbols.push(atom.element.clone());
            }
        }
        symbols
    }

    /// 某元素所有位点的全局索引，保持结构顺序。
    ///
    /// 返回向量的下标就是该元素内部从 0 开始的位点编号。
    pub fn element_sites(&self, element: &str) -> Vec<usize> {
        self.atoms
            .iter()
            .enumerate()
            .filter(|(_, atom)| atom.element == element)
            .map(|(i, _)| i)
            .collect()
    }

    /// 计算化学式
    pub fn formula(&self) -> String {
        self.symbol_set()
            .into_iter()
            .map(|el| {
                let count = self.atoms.iter().filter(|a| a.element == el).count();
                if count == 1 {
                    el
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic(a: f64) -> Lattice {
        Lattice::from_vectors([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]])
    }

    fn bi2se3_like() -> Crystal {
        Crystal::new(
            "test",
            cubic(5.0),
            vec![
                Atom::new("Bi", [0.0, 0.0, 0.0]),
                Atom::new("Se", [0.25, 0.25, 0.25]),
                Atom::new("Bi", [0.5, 0.5, 0.5]),
                Atom::new("Se", [0.75, 0.75, 0.75]),
                Atom::new("Se", [0.5, 0.0, 0.0]),
            ],
        )
    }

    #[test]
    fn test_lattice_volume_cubic() {
        let vol = cubic(5.0).volume().abs();

        // 5^3 = 125
        assert!((vol - 125.0).abs() < 1e-6);
    }

    #[test]
    fn test_lattice_parameters() {
        let (a, b, c, alpha, beta, gamma) = cubic(4.0).parameters();

        assert!((a - 4.0).abs() < 1e-6);
        assert!((b - 4.0).abs() < 1e-6);
        assert!((c - 4.0).abs() < 1e-6);
        assert!((alpha - 90.0).abs() < 1e-6);
        assert!((beta - 90.0).abs() < 1e-6);
        assert!((gamma - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_symbol_set_keeps_first_appearance_order() {
        assert_eq!(bi2se3_like().symbol_set(), vec!["Bi", "Se"]);
    }

    #[test]
    fn test_element_sites_are_global_indices() {
        let crystal = bi2se3_like();
        assert_eq!(crystal.element_sites("Bi"), vec![0, 2]);
        assert_eq!(crystal.element_sites("Se"), vec![1, 3, 4]);
        assert!(crystal.element_sites("O").is_empty());
    }

    #[test]
    fn test_crystal_formula() {
        assert_eq!(bi2se3_like().formula(), "Bi2Se3");
    }
}
