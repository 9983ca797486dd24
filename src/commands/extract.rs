//! # extract 子命令实现
//!
//! 从 vasprun.xml 提取总态密度和投影态密度，写成数据文件。
//!
//! ## 功能
//! - 单文件模式：读取、对齐、投影、写出，并报告带隙
//! - 批量模式：收集目录下的 vasprun 文件并行处理
//! - 过滤元素不在结构中、位点选择为空时给出警告
//!
//! ## 依赖关系
//! - 使用 `cli/extract.rs` 定义的 ExtractArgs
//! - 使用 `batch/` 模块进行批量处理
//! - 使用 `dos/` 模块完成提取和写出
//! - 使用 `parsers/` 读取 vasprun.xml

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::extract::ExtractArgs;
use crate::dos::{extract_dos, load_dos, write_files, writer, DosFilter, ProjectedDos};
use crate::error::{QdosError, Result};
use crate::parsers;
use crate::utils::{output, progress};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 执行态密度提取
pub fn execute(args: ExtractArgs) -> Result<()> {
    output::print_header("Density of States Extraction");

    let filter = args.filter()?;
    args.check_gaussian()?;

    if args.input.is_file() {
        execute_single_file(&args, &filter)
    } else if args.input.is_dir() {
        execute_batch(&args, filter)
    } else {
        Err(QdosError::FileNotFound {
            path: args.input.display().to_string(),
        })
    }
}

/// 单文件模式
fn execute_single_file(args: &ExtractArgs, filter: &DosFilter) -> Result<()> {
    let spinner = progress::create_read_spinner(&args.input);
    let parsed = parsers::parse_vasprun_file(&args.input);
    spinner.finish_and_clear();
    let vasprun = parsed?;

    let structure = vasprun.structure();
    output::print_success(&format!(
        "Loaded {} ({} sites, {} energy points, {} spin channel(s))",
        structure.formula(),
        structure.num_sites(),
        vasprun.complete_dos.energies().len(),
        vasprun.complete_dos.total.num_spins()
    ));

    for el in filter.missing_elements(&vasprun.complete_dos) {
        output::print_warning(&format!("Element '{}' is not in the structure, ignored", el));
    }

    if !args.total_only && !vasprun.has_projections() {
        output::print_warning(
            "No projected DOS in vasprun.xml (LORBIT not set?), writing total DOS only",
        );
    }
    if let Some(sigma) = args.gaussian {
        output::print_info(&format!("Applying Gaussian broadening (σ = {:.3} eV)", sigma));
    }

    let (dos, pdos) = extract_dos(
        vasprun,
        filter,
        args.gaussian,
        args.total_only,
        !args.quiet,
    );
    warn_empty_selections(&pdos);

    let written = write_files(
        &dos.total,
        &pdos,
        args.prefix.as_deref(),
        args.directory.as_deref(),
    )?;
    for path in &written {
        output::print_saved("DOS", path);
    }

    output::print_done(&format!("{} file(s) written", written.len()));
    Ok(())
}

fn warn_empty_selections(pdos: &ProjectedDos) {
    for (el, el_pdos) in pdos {
        if el_pdos.is_empty() {
            output::print_warning(&format!("No orbitals or sites selected for '{}'", el));
        }
    }
}

/// 批量处理模式
fn execute_batch(args: &ExtractArgs, filter: DosFilter) -> Result<()> {
    output::print_info(&format!("Batch mode: directory '{}'", args.input.display()));

    let files = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)
        .recursive(args.recursive)
        .collect()?;

    if files.is_empty() {
        output::print_warning(&format!(
            "No matching files found with pattern '{}'",
            args.pattern
        ));
        return Ok(());
    }

    output::print_info(&format!("Found {} vasprun files", files.len()));

    let config = Arc::new(BatchExtractConfig {
        input_root: args.input.clone(),
        filter,
        gaussian: args.gaussian,
        total_only: args.total_only,
        prefix: args.prefix.clone(),
        directory: args.directory.clone(),
        overwrite: args.overwrite,
    });

    let runner = BatchRunner::new(args.jobs)?;
    let result = runner.run(files, |file| process_batch_file(file, &config));

    output::print_separator();
    output::print_success(&format!(
        "Batch complete: {} files ({} success, {} skipped, {} failed)",
        result.total(),
        result.success,
        result.skipped,
        result.failed
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    Ok(())
}

/// 批量处理配置
struct BatchExtractConfig {
    input_root: PathBuf,
    filter: DosFilter,
    gaussian: Option<f64>,
    total_only: bool,
    prefix: Option<String>,
    directory: Option<PathBuf>,
    overwrite: bool,
}

impl BatchExtractConfig {
    /// 输出目录：指定了 directory 时保持相对目录结构，否则写在 vasprun 旁边
    fn output_dir(&self, input: &Path) -> PathBuf {
        let parent = input.parent().unwrap_or_else(|| Path::new("."));
        match &self.directory {
            Some(dir) => match parent.strip_prefix(&self.input_root) {
                Ok(rel) => dir.join(rel),
                Err(_) => dir.clone(),
            },
            None => parent.to_path_buf(),
        }
    }

    /// 同一目录下有多个 vasprun 文件时，用文件名区分输出
    fn output_prefix(&self, input: &Path) -> Option<String> {
        let name = input.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name == "vasprun.xml" || name.is_empty() {
            return self.prefix.clone();
        }
        match &self.prefix {
            Some(prefix) => Some(format!("{}_{}", prefix, name)),
            None => Some(name.to_string()),
        }
    }
}

/// 处理批量模式中的单个文件
fn process_batch_file(input: &PathBuf, config: &Arc<BatchExtractConfig>) -> ProcessResult {
    let out_dir = config.output_dir(input);
    let prefix = config.output_prefix(input);

    let total_file = writer::output_path("total", prefix.as_deref(), Some(&out_dir));
    if total_file.exists() && !config.overwrite {
        return ProcessResult::Skipped(format!(
            "Output exists, skipping: {}",
            total_file.display()
        ));
    }

    match process_with_config(input, &out_dir, prefix.as_deref(), config) {
        Ok(n) => ProcessResult::Success(format!(
            "{} -> {} ({} files)",
            input.display(),
            out_dir.display(),
            n
        )),
        Err(e) => ProcessResult::Failed(input.display().to_string(), e.to_string()),
    }
}

fn process_with_config(
    input: &Path,
    out_dir: &Path,
    prefix: Option<&str>,
    config: &BatchExtractConfig,
) -> Result<usize> {
    let (dos, pdos) = load_dos(
        input,
        &config.filter,
        config.gaussian,
        config.total_only,
        false,
    )?;
    let written = write_files(&dos.total, &pdos, prefix, Some(out_dir))?;
    Ok(written.len())
}
