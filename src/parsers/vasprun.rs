//! # VASP vasprun.xml 解析器
//!
//! 流式读取 vasprun.xml，提取态密度提取流程需要的全部数据。
//!
//! ## 提取内容
//! ```text
//! <parameters>/<incar>   ISMEAR, SIGMA, LSORBIT, ISPIN   (parameters 优先)
//! <atominfo>             每个位点的元素符号
//! <structure>            最后一个结构的晶格与分数坐标
//! <eigenvalues>          最后一个离子步的本征值与占据数 (不含 <projected> 内的)
//! <dos>                  efermi, <total> 总态密度, <partial> 位点 lm 投影
//! ```
//! 非共线计算的 `<partial>` 含 spin 1..4，其中 spin 3/4 为磁化分量，忽略。
//!
//! ## 依赖关系
//! - 被 `dos/loader.rs`, `commands/info.rs` 使用
//! - 使用 `models/` 数据模型
//! - 使用 `xml-rs` 事件流解析

use crate::error::{QdosError, Result};
use crate::models::{
    Atom, BandSummary, CalcParameters, CompleteDos, Crystal, Densities, Dos, Lattice, Orbital,
    SiteProjection, Spin,
};

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use xml::reader::{EventReader, XmlEvent};

/// vasprun.xml 中与态密度相关的全部数据
#[derive(Debug, Clone)]
pub struct Vasprun {
    pub parameters: CalcParameters,
    pub bands: BandSummary,
    pub complete_dos: CompleteDos,
}

impl Vasprun {
    pub fn structure(&self) -> &Crystal {
        &self.complete_dos.structure
    }

    pub fn efermi(&self) -> f64 {
        self.complete_dos.total.efermi
    }

    /// 是否包含位点投影态密度 (LORBIT)
    pub fn has_projections(&self) -> bool {
        self.complete_dos.pdos.iter().any(|p| !p.is_empty())
    }
}

/// 解析 vasprun.xml 文件
pub fn parse_vasprun_file(path: &Path) -> Result<Vasprun> {
    if !path.is_file() {
        return Err(QdosError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let file = File::open(path).map_err(|e| QdosError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let name = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("vasprun");

    parse_vasprun_reader(BufReader::new(file), &path.display().to_string(), name)
}

/// 从字符串内容解析 vasprun.xml
#[cfg(test)]
pub fn parse_vasprun_content(content: &str, name: &str) -> Result<Vasprun> {
    parse_vasprun_reader(content.as_bytes(), name, name)
}

fn parse_vasprun_reader<R: Read>(reader: R, source: &str, name: &str) -> Result<Vasprun> {
    let mut builder = VasprunBuilder::new(source);

    for event in EventReader::new(reader) {
        let event = event.map_err(|e| QdosError::XmlError {
            path: source.to_string(),
            source: e,
        })?;

        match event {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                let attrs = attributes
                    .into_iter()
                    .map(|a| (a.name.local_name, a.value))
                    .collect();
                builder.start(name.local_name, attrs);
            }
            XmlEvent::Characters(text) | XmlEvent::CData(text) => builder.text.push_str(&text),
            XmlEvent::EndElement { .. } => builder.end()?,
            _ => {}
        }
    }

    builder.finish(name)
}

/// 元素栈中的一帧
struct Frame {
    name: String,
    attrs: Vec<(String, String)>,
}

impl Frame {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// 位点投影的原始数据：每个自旋一组 `[能量点][列]`
type RawIon = BTreeMap<Spin, Vec<Vec<f64>>>;

/// 解析状态
struct VasprunBuilder {
    source: String,
    stack: Vec<Frame>,
    text: String,

    parameters: HashMap<String, String>,
    incar: HashMap<String, String>,

    symbols: Vec<String>,
    rc_column: usize,

    basis: Vec<[f64; 3]>,
    positions: Vec<[f64; 3]>,
    last_structure: Option<(Vec<[f64; 3]>, Vec<[f64; 3]>)>,

    eigenvalues: Vec<Vec<Vec<(f64, f64)>>>,

    efermi: Option<f64>,
    total_energies: Vec<f64>,
    total: BTreeMap<Spin, Vec<f64>>,
    fields: Vec<String>,
    ions: Vec<RawIon>,
    found_dos: bool,
}

impl VasprunBuilder {
    fn new(source: &str) -> Self {
        VasprunBuilder {
            source: source.to_string(),
            stack: Vec::new(),
            text: String::new(),
            parameters: HashMap::new(),
            incar: HashMap::new(),
            symbols: Vec::new(),
            rc_column: 0,
            basis: Vec::new(),
            positions: Vec::new(),
            last_structure: None,
            eigenvalues: Vec::new(),
            efermi: None,
            total_energies: Vec::new(),
            total: BTreeMap::new(),
            fields: Vec::new(),
            ions: Vec::new(),
            found_dos: false,
        }
    }

    fn parse_error(&self, reason: impl Into<String>) -> QdosError {
        QdosError::ParseError {
            format: "vasprun".to_string(),
            path: self.source.clone(),
            reason: reason.into(),
        }
    }

    fn inside(&self, name: &str) -> bool {
        self.stack.iter().any(|f| f.name == name)
    }

    fn parent(&self) -> Option<&Frame> {
        self.stack.iter().rev().nth(1)
    }

    /// 最近的带 comment="spin N" 的 set
    fn enclosing_spin(&self) -> Option<usize> {
        self.stack
            .iter()
            .rev()
            .filter(|f| f.name == "set")
            .find_map(|f| f.attr("comment").and_then(|c| parse_comment(c, "spin")))
    }

    fn start(&mut self, name: String, attrs: Vec<(String, String)>) {
        self.text.clear();
        let frame = Frame { name, attrs };

        match frame.name.as_str() {
            "rc" => self.rc_column = 0,
            "structure" => {
                self.basis.clear();
                self.positions.clear();
            }
            "eigenvalues" if !self.inside("projected") => self.eigenvalues.clear(),
            "dos" => {
                self.found_dos = true;
                self.efermi = None;
                self.total_energies.clear();
                self.total.clear();
                self.fields.clear();
                self.ions.clear();
            }
            "set" => self.start_set(&frame),
            _ => {}
        }

        self.stack.push(frame);
    }

    fn start_set(&mut self, frame: &Frame) {
        let comment = match frame.attr("comment") {
            Some(c) => c,
            None => return,
        };

        if self.inside("eigenvalues") && !self.inside("projected") {
            if parse_comment(comment, "spin").is_some() {
                self.eigenvalues.push(Vec::new());
            } else if parse_comment(comment, "kpoint").is_some() {
                if let Some(spin) = self.eigenvalues.last_mut() {
                    spin.push(Vec::new());
                }
            }
        } else if self.inside("dos")
            && self.inside("partial")
            && parse_comment(comment, "ion").is_some()
        {
            self.ions.push(RawIon::new());
        }
    }

    fn end(&mut self) -> Result<()> {
        let text = std::mem::take(&mut self.text);
        let (element, key) = match self.stack.last() {
            Some(frame) => (
                frame.name.clone(),
                frame.attr("name").unwrap_or_default().to_string(),
            ),
            None => return Ok(()),
        };

        match element.as_str() {
            "i" => self.end_scalar(key, &text)?,
            "c" => self.end_column(&text),
            "v" => self.end_vector(&text)?,
            "r" => self.end_row(&text)?,
            "field" => {
                if self.inside("partial") {
                    self.fields.push(text.trim().to_string());
                }
            }
            "structure" => {
                if !self.basis.is_empty() {
                    self.last_structure = Some((self.basis.clone(), self.positions.clone()));
                }
            }
            _ => {}
        }

        self.stack.pop();
        Ok(())
    }

    fn end_scalar(&mut self, key: String, text: &str) -> Result<()> {
        let value = text.trim().to_string();
        if self.inside("parameters") {
            self.parameters.insert(key, value);
        } else if self.inside("incar") {
            self.incar.insert(key, value);
        } else if key == "efermi" && self.parent().map_or(false, |p| p.name == "dos") {
            let efermi = value
                .parse()
                .map_err(|_| self.parse_error(format!("Invalid efermi '{}'", value)))?;
            self.efermi = Some(efermi);
        }
        Ok(())
    }

    fn end_column(&mut self, text: &str) {
        let in_atoms = self
            .stack
            .iter()
            .any(|f| f.name == "array" && f.attr("name") == Some("atoms"));

        if self.inside("atominfo") && in_atoms && self.inside("rc") {
            if self.rc_column == 0 {
                self.symbols.push(text.trim().to_string());
            }
            self.rc_column += 1;
        }
    }

    fn end_vector(&mut self, text: &str) -> Result<()> {
        if !self.inside("structure") {
            return Ok(());
        }
        let varray = match self.parent() {
            Some(p) if p.name == "varray" => p.attr("name").unwrap_or_default().to_string(),
            _ => return Ok(()),
        };

        match varray.as_str() {
            "basis" => {
                let v = self.parse_vector(text)?;
                self.basis.push(v);
            }
            "positions" => {
                let v = self.parse_vector(text)?;
                self.positions.push(v);
            }
            _ => {}
        }
        Ok(())
    }

    fn end_row(&mut self, text: &str) -> Result<()> {
        if self.inside("eigenvalues") && !self.inside("projected") {
            let values = self.parse_row(text)?;
            if values.len() < 2 {
                return Err(self.parse_error("Eigenvalue row needs energy and occupation"));
            }
            if let Some(kpoint) = self.eigenvalues.last_mut().and_then(|s| s.last_mut()) {
                kpoint.push((values[0], values[1]));
            }
        } else if self.inside("dos") && self.inside("total") {
            let spin = match self.enclosing_spin().and_then(spin_from_index) {
                Some(s) => s,
                None => return Ok(()),
            };
            let values = self.parse_row(text)?;
            if values.len() < 2 {
                return Err(self.parse_error("Total DOS row needs energy and density"));
            }
            if spin == Spin::Up {
                self.total_energies.push(values[0]);
            }
            self.total.entry(spin).or_default().push(values[1]);
        } else if self.inside("dos") && self.inside("partial") {
            let spin = match self.enclosing_spin().and_then(spin_from_index) {
                Some(s) => s,
                None => return Ok(()),
            };
            let values = self.parse_row(text)?;
            if let Some(ion) = self.ions.last_mut() {
                ion.entry(spin).or_default().push(values);
            }
        }
        Ok(())
    }

    fn parse_row(&self, text: &str) -> Result<Vec<f64>> {
        text.split_whitespace()
            .map(|s| {
                s.parse::<f64>()
                    .map_err(|_| self.parse_error(format!("Invalid number '{}'", s)))
            })
            .collect()
    }

    fn parse_vector(&self, text: &str) -> Result<[f64; 3]> {
        let values = self.parse_row(text)?;
        if values.len() < 3 {
            return Err(self.parse_error(format!("Expected 3 components, got '{}'", text.trim())));
        }
        Ok([values[0], values[1], values[2]])
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .or_else(|| self.incar.get(key))
            .map(|s| s.as_str())
    }

    fn calc_parameters(&self) -> CalcParameters {
        CalcParameters {
            ismear: self.lookup("ISMEAR").and_then(|v| v.parse().ok()),
            sigma: self.lookup("SIGMA").and_then(|v| v.parse().ok()),
            lsorbit: self.lookup("LSORBIT").and_then(parse_logical),
            ispin: self.lookup("ISPIN").and_then(|v| v.parse().ok()),
        }
    }

    fn finish(self, name: &str) -> Result<Vasprun> {
        if !self.found_dos || self.total_energies.is_empty() {
            return Err(self.parse_error("No <dos> block with total density of states"));
        }
        let efermi = self
            .efermi
            .ok_or_else(|| self.parse_error("Missing efermi in <dos>"))?;

        if self.symbols.is_empty() {
            return Err(self.parse_error("No atoms found in <atominfo>"));
        }
        let (basis, positions) = self
            .last_structure
            .clone()
            .ok_or_else(|| self.parse_error("No <structure> found"))?;
        if basis.len() != 3 || positions.len() != self.symbols.len() {
            return Err(self.parse_error(format!(
                "Structure has {} lattice vectors and {} positions for {} atoms",
                basis.len(),
                positions.len(),
                self.symbols.len()
            )));
        }

        let atoms = self
            .symbols
            .iter()
            .zip(positions)
            .map(|(el, pos)| Atom::new(el.clone(), pos))
            .collect();
        let structure = Crystal::new(name, Lattice::from_vectors([basis[0], basis[1], basis[2]]), atoms);

        let npoints = self.total_energies.len();
        if self.total.values().any(|d| d.len() != npoints) {
            return Err(self.parse_error("Total DOS spin channels differ in length"));
        }
        let total = Dos::new(efermi, self.total_energies.clone(), self.total.clone());

        let pdos = self.site_projections(npoints)?;

        Ok(Vasprun {
            parameters: self.calc_parameters(),
            bands: BandSummary::new(efermi, self.eigenvalues),
            complete_dos: CompleteDos::new(total, structure, pdos),
        })
    }

    /// 把 `<partial>` 原始列转换成每个位点的轨道投影
    fn site_projections(&self, npoints: usize) -> Result<Vec<SiteProjection>> {
        let natoms = self.symbols.len();
        if self.ions.is_empty() {
            return Ok(vec![SiteProjection::new(); natoms]);
        }
        if self.ions.len() != natoms {
            return Err(self.parse_error(format!(
                "Projected DOS has {} ions but structure has {}",
                self.ions.len(),
                natoms
            )));
        }

        // 第 0 列是能量
        let columns: Vec<(usize, Orbital)> = self
            .fields
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(i, label)| Orbital::from_vasp_label(label).map(|o| (i, o)))
            .collect();

        self.ions
            .iter()
            .map(|ion| {
                let mut projection = SiteProjection::new();
                for (spin, rows) in ion {
                    if rows.len() != npoints {
                        return Err(self.parse_error("Projected DOS length differs from total DOS"));
                    }
                    for &(col, orbital) in &columns {
                        let dens = rows
                            .iter()
                            .map(|r| {
                                r.get(col).copied().ok_or_else(|| {
                                    self.parse_error("Projected DOS row is shorter than its fields")
                                })
                            })
                            .collect::<Result<Vec<f64>>>()?;
                        projection
                            .entry(orbital)
                            .or_insert_with(Densities::new)
                            .insert(*spin, dens);
                    }
                }
                Ok(projection)
            })
            .collect()
    }
}

/// 解析 "spin 1", "kpoint 3", "ion 12" 形式的注释
fn parse_comment(comment: &str, prefix: &str) -> Option<usize> {
    comment.trim().strip_prefix(prefix)?.trim().parse().ok()
}

/// spin 1/2 对应上/下自旋，非共线的 spin 3/4 不对应任何通道
fn spin_from_index(index: usize) -> Option<Spin> {
    match index {
        1 => Some(Spin::Up),
        2 => Some(Spin::Down),
        _ => None,
    }
}

fn parse_logical(value: &str) -> Option<bool> {
    match value.trim().trim_matches('.').to_uppercase().as_str() {
        "T" | "TRUE" => Some(true),
        "F" | "FALSE" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 两个位点 (Ga, As)，自旋极化，三个能量点，Fermi 能级 0.5
    pub(crate) const GAAS_VASPRUN: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<modeling>
 <incar>
  <i type="int" name="ISMEAR">    -5</i>
  <i name="SIGMA">      0.10000000</i>
 </incar>
 <parameters>
  <separator name="electronic">
   <separator name="electronic smearing">
    <i name="SIGMA">      0.05000000</i>
    <i type="int" name="ISMEAR">     0</i>
   </separator>
   <separator name="electronic spin">
    <i type="int" name="ISPIN">     2</i>
    <i type="logical" name="LSORBIT"> F  </i>
   </separator>
  </separator>
 </parameters>
 <atominfo>
  <atoms>       2 </atoms>
  <types>       2 </types>
  <array name="atoms" >
   <dimension dim="1">ion</dimension>
   <field type="string">element</field>
   <field type="int">atomtype</field>
   <set>
    <rc><c>Ga</c><c>   1</c></rc>
    <rc><c>As</c><c>   2</c></rc>
   </set>
  </array>
 </atominfo>
 <structure name="initialpos" >
  <crystal>
   <varray name="basis" >
    <v>       1.00000000       0.00000000       0.00000000 </v>
    <v>       0.00000000       1.00000000       0.00000000 </v>
    <v>       0.00000000       0.00000000       1.00000000 </v>
   </varray>
  </crystal>
  <varray name="positions" >
   <v>       0.00000000       0.00000000       0.00000000 </v>
   <v>       0.50000000       0.50000000       0.50000000 </v>
  </varray>
 </structure>
 <calculation>
  <eigenvalues>
   <array>
    <dimension dim="1">band</dimension>
    <set>
     <set comment="spin 1">
      <set comment="kpoint 1">
       <r>   -1.0000    1.0000 </r>
       <r>    2.0000    0.0000 </r>
      </set>
     </set>
     <set comment="spin 2">
      <set comment="kpoint 1">
       <r>   -0.8000    1.0000 </r>
       <r>    2.1000    0.0000 </r>
      </set>
     </set>
    </set>
   </array>
  </eigenvalues>
  <dos>
   <i name="efermi">      0.50000000 </i>
   <total>
    <array>
     <field>energy</field>
     <field>total</field>
     <field>integrated</field>
     <set>
      <set comment="spin 1">
       <r>    -1.0000     1.0000     0.0000 </r>
       <r>     0.0000     2.0000     1.0000 </r>
       <r>     1.0000     3.0000     2.0000 </r>
      </set>
      <set comment="spin 2">
       <r>    -1.0000     0.5000     0.0000 </r>
       <r>     0.0000     1.5000     1.0000 </r>
       <r>     1.0000     2.5000     2.0000 </r>
      </set>
     </set>
    </array>
   </total>
   <partial>
    <array>
     <field>energy</field>
     <field> s</field>
     <field> py</field>
     <field> pz</field>
     <field> px</field>
     <set>
      <set comment="ion 1">
       <set comment="spin 1">
        <r>    -1.0000  0.1000  0.2000  0.3000  0.4000 </r>
        <r>     0.0000  0.1000  0.2000  0.3000  0.4000 </r>
        <r>     1.0000  0.1000  0.2000  0.3000  0.4000 </r>
       </set>
       <set comment="spin 2">
        <r>    -1.0000  0.0100  0.0200  0.0300  0.0400 </r>
        <r>     0.0000  0.0100  0.0200  0.0300  0.0400 </r>
        <r>     1.0000  0.0100  0.0200  0.0300  0.0400 </r>
       </set>
      </set>
      <set comment="ion 2">
       <set comment="spin 1">
        <r>    -1.0000  1.0000  2.0000  3.0000  4.0000 </r>
        <r>     0.0000  1.0000  2.0000  3.0000  4.0000 </r>
        <r>     1.0000  1.0000  2.0000  3.0000  4.0000 </r>
       </set>
       <set comment="spin 2">
        <r>    -1.0000  0.5000  0.5000  0.5000  0.5000 </r>
        <r>     0.0000  0.5000  0.5000  0.5000  0.5000 </r>
        <r>     1.0000  0.5000  0.5000  0.5000  0.5000 </r>
       </set>
      </set>
     </set>
    </array>
   </partial>
  </dos>
 </calculation>
</modeling>
"#;

    /// 非共线（LSORBIT = T）：总态密度单通道，投影含 spin 1..4
    pub(crate) const SOC_VASPRUN: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<modeling>
 <parameters>
  <separator name="electronic">
   <separator name="electronic smearing">
    <i name="SIGMA">      0.05000000</i>
    <i type="int" name="ISMEAR">    -5</i>
   </separator>
   <separator name="electronic spin">
    <i type="int" name="ISPIN">     1</i>
    <i type="logical" name="LSORBIT"> T  </i>
   </separator>
  </separator>
 </parameters>
 <atominfo>
  <atoms>       1 </atoms>
  <types>       1 </types>
  <array name="atoms" >
   <dimension dim="1">ion</dimension>
   <field type="string">element</field>
   <field type="int">atomtype</field>
   <set>
    <rc><c>Ga</c><c>   1</c></rc>
   </set>
  </array>
 </atominfo>
 <structure name="initialpos" >
  <crystal>
   <varray name="basis" >
    <v>       1.00000000       0.00000000       0.00000000 </v>
    <v>       0.00000000       1.00000000       0.00000000 </v>
    <v>       0.00000000       0.00000000       1.00000000 </v>
   </varray>
  </crystal>
  <varray name="positions" >
   <v>       0.00000000       0.00000000       0.00000000 </v>
  </varray>
 </structure>
 <calculation>
  <eigenvalues>
   <array>
    <dimension dim="1">band</dimension>
    <set>
     <set comment="spin 1">
      <set comment="kpoint 1">
       <r>   -1.0000    1.0000 </r>
       <r>    2.0000    0.0000 </r>
      </set>
     </set>
    </set>
   </array>
  </eigenvalues>
  <dos>
   <i name="efermi">      0.50000000 </i>
   <total>
    <array>
     <field>energy</field>
     <field>total</field>
     <field>integrated</field>
     <set>
      <set comment="spin 1">
       <r>    -1.0000     1.0000     0.0000 </r>
       <r>     0.0000     2.0000     1.0000 </r>
       <r>     1.0000     3.0000     2.0000 </r>
      </set>
     </set>
    </array>
   </total>
   <partial>
    <array>
     <field>energy</field>
     <field> s</field>
     <field> py</field>
     <field> pz</field>
     <field> px</field>
     <set>
      <set comment="ion 1">
       <set comment="spin 1">
        <r>    -1.0000  0.1000  0.2000  0.3000  0.4000 </r>
        <r>     0.0000  0.1000  0.2000  0.3000  0.4000 </r>
        <r>     1.0000  0.1000  0.2000  0.3000  0.4000 </r>
       </set>
       <set comment="spin 2">
        <r>    -1.0000  0.0100  0.0200  0.0300  0.0400 </r>
        <r>     0.0000  0.0100  0.0200  0.0300  0.0400 </r>
        <r>     1.0000  0.0100  0.0200  0.0300  0.0400 </r>
       </set>
       <set comment="spin 3">
        <r>    -1.0000  9.0000  9.0000  9.0000  9.0000 </r>
        <r>     0.0000  9.0000  9.0000  9.0000  9.0000 </r>
        <r>     1.0000  9.0000  9.0000  9.0000  9.0000 </r>
       </set>
       <set comment="spin 4">
        <r>    -1.0000  7.0000  7.0000  7.0000  7.0000 </r>
        <r>     0.0000  7.0000  7.0000  7.0000  7.0000 </r>
        <r>     1.0000  7.0000  7.0000  7.0000  7.0000 </r>
       </set>
      </set>
     </set>
    </array>
   </partial>
  </dos>
 </calculation>
</modeling>
"#;

    #[test]
    fn test_parse_parameters_prefer_parameters_block() {
        let vr = parse_vasprun_content(GAAS_VASPRUN, "GaAs").unwrap();
        assert_eq!(vr.parameters.ismear, Some(0));
        assert_eq!(vr.parameters.sigma, Some(0.05));
        assert_eq!(vr.parameters.lsorbit, Some(false));
        assert_eq!(vr.parameters.ispin, Some(2));
    }

    #[test]
    fn test_parse_structure() {
        let vr = parse_vasprun_content(GAAS_VASPRUN, "GaAs").unwrap();
        let structure = vr.structure();
        assert_eq!(structure.name, "GaAs");
        assert_eq!(structure.symbol_set(), vec!["Ga", "As"]);
        assert_eq!(structure.atoms[1].position, [0.5, 0.5, 0.5]);
        assert!((structure.lattice.volume() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_total_dos() {
        let vr = parse_vasprun_content(GAAS_VASPRUN, "GaAs").unwrap();
        let total = &vr.complete_dos.total;
        assert_eq!(vr.efermi(), 0.5);
        assert_eq!(total.energies, vec![-1.0, 0.0, 1.0]);
        assert_eq!(total.density(Spin::Up).unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(total.density(Spin::Down).unwrap(), &[0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_parse_partial_dos() {
        let vr = parse_vasprun_content(GAAS_VASPRUN, "GaAs").unwrap();
        assert!(vr.has_projections());

        let dos = &vr.complete_dos;
        assert_eq!(dos.pdos.len(), 2);
        assert_eq!(dos.pdos[0].len(), 4);

        let px = dos.site_orbital_dos(1, Orbital::Px).unwrap();
        assert_eq!(px.density(Spin::Up).unwrap(), &[4.0, 4.0, 4.0]);
        assert_eq!(px.density(Spin::Down).unwrap(), &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_non_collinear_ignores_magnetisation_sets() {
        let vr = parse_vasprun_content(SOC_VASPRUN, "Ga").unwrap();
        assert_eq!(vr.parameters.lsorbit, Some(true));

        let dos = &vr.complete_dos;
        assert_eq!(dos.total.num_spins(), 1);
        assert_eq!(dos.total.density(Spin::Up).unwrap(), &[1.0, 2.0, 3.0]);

        // spin 3/4 不进入任何通道，spin 2 暂存为下自旋
        let s = dos.site_orbital_dos(0, Orbital::S).unwrap();
        assert_eq!(s.num_spins(), 2);
        assert_eq!(s.density(Spin::Up).unwrap(), &[0.1, 0.1, 0.1]);
        assert_eq!(s.density(Spin::Down).unwrap(), &[0.01, 0.01, 0.01]);
        let px = dos.site_orbital_dos(0, Orbital::Px).unwrap();
        assert_eq!(px.density(Spin::Up).unwrap(), &[0.4, 0.4, 0.4]);
    }

    #[test]
    fn test_parse_eigenvalues() {
        let vr = parse_vasprun_content(GAAS_VASPRUN, "GaAs").unwrap();
        assert_eq!(vr.bands.eigenvalues.len(), 2);
        assert_eq!(vr.bands.eigenvalues[0][0], vec![(-1.0, 1.0), (2.0, 0.0)]);
        assert!(!vr.bands.is_metal());
        assert_eq!(vr.bands.vbm(), Some(-0.8));
    }

    #[test]
    fn test_missing_dos_is_parse_error() {
        let content = "<modeling><atominfo></atominfo></modeling>";
        let err = parse_vasprun_content(content, "broken").unwrap_err();
        assert!(matches!(err, QdosError::ParseError { .. }));
    }

    #[test]
    fn test_malformed_xml_is_xml_error() {
        let err = parse_vasprun_content("<modeling><dos>", "broken").unwrap_err();
        assert!(matches!(err, QdosError::XmlError { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_vasprun_file(Path::new("/nonexistent/vasprun.xml")).unwrap_err();
        assert!(matches!(err, QdosError::FileNotFound { .. }));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_comment("spin 2", "spin"), Some(2));
        assert_eq!(parse_comment("kpoint 10", "spin"), None);
        assert_eq!(parse_logical(" T "), Some(true));
        assert_eq!(parse_logical(".FALSE."), Some(false));
        assert_eq!(parse_logical("maybe"), None);
    }
}
