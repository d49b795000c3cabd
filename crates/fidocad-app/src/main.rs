//! fidocad 命令行入口
//! 读取 .fcd 图纸，按输出文件扩展名导出为 PDF、SVG、EPS 或规范化的 .fcd

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fidocad_core::export::ExportOptions;
use fidocad_core::library::Library;
use fidocad_core::model::DrawingModel;
use fidocad_file::config::load_config;
use fidocad_file::fcd::{load_library_dir, read_drawing_into, save_drawing, DRAWING_EXTENSION};
use fidocad_file::{export_to_file, load_library_cached};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(
    name = "fidocad",
    version,
    about = "Convert FidoCadJ drawings to PDF, SVG, EPS or normalized .fcd",
    long_about = None
)]
struct Args {
    /// Input drawing (.fcd)
    input: PathBuf,
    /// Output file, format chosen by extension (.pdf, .svg, .eps, .fcd)
    output: PathBuf,
    /// Load every .fcl macro library in this directory
    #[arg(long)]
    library: Option<PathBuf>,
    /// Cache the parsed libraries in this file
    #[arg(long, requires = "library")]
    cache: Option<PathBuf>,
    /// Read drawing configuration from a JSON file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output units per drawing unit
    #[arg(long, default_value_t = 1.0, value_parser = parse_magnitude)]
    magnitude: f64,
    /// Export invisible layers too
    #[arg(long = "invisible")]
    export_invisible: bool,
    /// Skip lines that cannot be parsed
    #[arg(long)]
    lenient: bool,
}

fn parse_magnitude(s: &str) -> Result<f64, String> {
    let m: f64 = s
        .parse()
        .map_err(|_| format!("invalid magnitude '{}'", s))?;
    if m > 0.0 && m.is_finite() {
        Ok(m)
    } else {
        Err(format!("magnitude must be positive, got {}", m))
    }
}

fn load_library(args: &Args) -> Result<Library> {
    let Some(dir) = &args.library else {
        return Ok(Library::new());
    };
    let library = match &args.cache {
        Some(cache) => load_library_cached(dir, cache),
        None => load_library_dir(dir),
    };
    library.with_context(|| format!("failed to load macro libraries from {}", dir.display()))
}

fn is_drawing(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(DRAWING_EXTENSION))
}

fn run(args: &Args) -> Result<()> {
    let library = Arc::new(load_library(args)?);

    let mut model = DrawingModel::with_library(library);
    if let Some(path) = &args.config {
        model.config = load_config(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        model.text_font = model.config.default_text_font.clone();
    }
    // 图纸中的 FJC 行覆盖配置文件中的同名设置
    read_drawing_into(&mut model, &args.input, !args.lenient)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    if is_drawing(&args.output) {
        save_drawing(&mut model, &args.output)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
        return Ok(());
    }

    let options = ExportOptions {
        export_invisible: args.export_invisible,
        unit_per_pixel: args.magnitude,
    };
    export_to_file(&mut model, &args.output, &options)
        .with_context(|| format!("failed to export {}", args.output.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    // 初始化日志
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(Level::INFO).finish(),
    )?;

    let args = Args::parse();
    info!(
        "Converting {} to {}",
        args.input.display(),
        args.output.display()
    );
    run(&args)
}
