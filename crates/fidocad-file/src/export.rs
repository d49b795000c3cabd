//! 按格式导出整张图纸

use std::io::Write;
use std::path::Path;

use fidocad_core::export::{export_drawing, export_header, ExportInterface, ExportOptions};
use fidocad_core::model::DrawingModel;

use crate::eps::EpsExporter;
use crate::error::FileError;
use crate::pdf::PdfExporter;
use crate::svg::SvgExporter;

/// 导出时报告给目标格式的栅格间距
pub const DEFAULT_GRID: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Svg,
    Eps,
}

impl ExportFormat {
    /// 由扩展名（不区分大小写）判断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(ExportFormat::Pdf),
            "svg" => Some(ExportFormat::Svg),
            "eps" => Some(ExportFormat::Eps),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, FileError> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| FileError::UnknownFormat(path.display().to_string()))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Svg => "svg",
            ExportFormat::Eps => "eps",
        }
    }
}

/// 通过任意导出器输出整张图纸：文件头、各图层、钻孔、文件尾
pub fn export_with(
    model: &mut DrawingModel,
    exp: &mut dyn ExportInterface,
    options: &ExportOptions,
) -> Result<(), FileError> {
    let mut map = export_header(model, exp, options, DEFAULT_GRID)?;
    export_drawing(model, exp, options.export_invisible, &mut map)?;
    exp.export_end()?;
    Ok(())
}

/// 导出到写入器
pub fn export_to_writer<W: Write>(
    model: &mut DrawingModel,
    writer: W,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<(), FileError> {
    let config = model.config.clone();
    match format {
        ExportFormat::Pdf => export_with(model, &mut PdfExporter::new(writer, &config), options),
        ExportFormat::Svg => export_with(model, &mut SvgExporter::new(writer, &config), options),
        ExportFormat::Eps => export_with(model, &mut EpsExporter::new(writer, &config), options),
    }
}

/// 导出到文件，格式由扩展名决定
pub fn export_to_file(model: &mut DrawingModel, path: &Path, options: &ExportOptions) -> Result<(), FileError> {
    let format = ExportFormat::from_path(path)?;
    let config = model.config.clone();
    match format {
        ExportFormat::Pdf => export_with(model, &mut PdfExporter::create(path, &config)?, options)?,
        ExportFormat::Svg => export_with(model, &mut SvgExporter::create(path, &config)?, options)?,
        ExportFormat::Eps => export_with(model, &mut EpsExporter::create(path, &config)?, options)?,
    }
    tracing::info!(
        "Exported {} primitives to {} ({})",
        model.primitives.len(),
        path.display(),
        format.extension()
    );
    Ok(())
}
