//! FidoCadJ 文件处理
//!
//! 支持：
//! - `.fcd` 图纸读写
//! - `.fcl` 宏库读取与二进制缓存（MessagePack + Zstd）
//! - JSON 绘图配置
//! - PDF/SVG/EPS 导出

pub mod config;
pub mod eps;
pub mod error;
pub mod export;
pub mod fcd;
pub mod library_cache;
pub mod pdf;
pub mod svg;

mod util;

pub use eps::EpsExporter;
pub use error::FileError;
pub use export::{export_to_file, export_to_writer, export_with, ExportFormat};
pub use fcd::{load_drawing, load_library_dir, load_library_file, save_drawing};
pub use library_cache::load_library_cached;
pub use pdf::PdfExporter;
pub use svg::SvgExporter;
