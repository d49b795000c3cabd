//! 图纸（.fcd）与宏库（.fcl）文件
//!
//! 两种文件都是纯文本。旧文件可能不是 UTF-8 编码，读取时把无法解码的
//! 字节替换掉，而不是整个文件报错。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fidocad_core::library::Library;
use fidocad_core::model::DrawingModel;
use fidocad_core::parser::{read_library, ParserActions};

use crate::error::FileError;

/// 图纸文件扩展名
pub const DRAWING_EXTENSION: &str = "fcd";

/// 宏库文件扩展名
pub const LIBRARY_EXTENSION: &str = "fcl";

fn read_text(path: &Path) -> Result<String, FileError> {
    let bytes = fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("{} is not valid UTF-8, decoding lossily", path.display());
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

/// 读取图纸
///
/// `strict` 为 false 时跳过无法解析的行（记录警告），否则第一处错误即失败。
pub fn load_drawing(path: &Path, library: Arc<Library>, strict: bool) -> Result<DrawingModel, FileError> {
    let mut model = DrawingModel::with_library(library);
    read_drawing_into(&mut model, path, strict)?;
    Ok(model)
}

/// 把图纸读入已有的模型，模型的配置与宏库保持不变（FJC 行除外）
pub fn read_drawing_into(model: &mut DrawingModel, path: &Path, strict: bool) -> Result<(), FileError> {
    let text = read_text(path)?;
    let mut parser = ParserActions::new(model);
    if strict {
        parser.parse_string(&text)?;
    } else {
        parser.parse_string_lenient(&text);
    }

    tracing::info!(
        "Loaded {} primitives from {}",
        model.primitives.len(),
        path.display()
    );
    Ok(())
}

/// 保存图纸（带扩展行与配置行）
pub fn save_drawing(model: &mut DrawingModel, path: &Path) -> Result<(), FileError> {
    let count = model.primitives.len();
    let text = ParserActions::new(model).get_text(true);
    fs::write(path, text.as_bytes())?;

    tracing::info!("Saved {} primitives to {}", count, path.display());
    Ok(())
}

/// 读取单个宏库文件，宏键前缀取文件名
pub fn load_library_file(path: &Path) -> Result<Library, FileError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| FileError::InvalidFormat(format!("bad library name: {}", path.display())))?;
    let text = read_text(path)?;
    let library = read_library(&text, stem)?;
    tracing::debug!("Loaded {} macros from {}", library.len(), path.display());
    Ok(library)
}

/// 目录下所有宏库文件，按文件名排序
pub fn library_files(dir: &Path) -> Result<Vec<PathBuf>, FileError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(LIBRARY_EXTENSION))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// 读取目录下的全部宏库并合并
pub fn load_library_dir(dir: &Path) -> Result<Library, FileError> {
    let mut library = Library::new();
    let files = library_files(dir)?;
    for file in &files {
        library.merge(load_library_file(file)?);
    }

    tracing::info!(
        "Loaded {} macros from {} library files in {}",
        library.len(),
        files.len(),
        dir.display()
    );
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fidocad_core::primitives::GraphicPrimitive;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        fs::create_dir_all(&dir).expect("Failed to create temp dir");
        dir
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = temp_dir("fidocad_fcd_roundtrip");
        let path = dir.join("drawing.fcd");

        let mut model = DrawingModel::new();
        ParserActions::new(&mut model)
            .parse_string("FJC A 0.8\nLI 0 0 100 100 0\nRV 10 10 50 50 3\n")
            .expect("Failed to parse");
        save_drawing(&mut model, &path).expect("Failed to save");

        let loaded = load_drawing(&path, Arc::new(Library::new()), true).expect("Failed to load");
        assert_eq!(loaded.primitives.len(), 2);
        assert_eq!(loaded.config.line_width, 0.8);
        assert_eq!(loaded.primitives[1].layer(), 3);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_lenient_load_skips_bad_lines() {
        let dir = temp_dir("fidocad_fcd_lenient");
        let path = dir.join("bad.fcd");
        fs::write(&path, "LI 0 0 10 10 0\nLI 0 zero\nSA 5 5 0\n").expect("Failed to write");

        assert!(load_drawing(&path, Arc::new(Library::new()), true).is_err());
        let model = load_drawing(&path, Arc::new(Library::new()), false).expect("Failed to load");
        assert_eq!(model.primitives.len(), 2);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_library_dir() {
        let dir = temp_dir("fidocad_fcl_dir");
        fs::write(
            dir.join("parts.fcl"),
            "[FIDOLIB Parts]\n{Passive}\n[R1 Resistor]\nLI 0 0 10 0 0\n",
        )
        .expect("Failed to write library");
        fs::write(dir.join("notes.txt"), "[X1 Ignored]\n").expect("Failed to write");

        let library = load_library_dir(&dir).expect("Failed to load libraries");
        assert_eq!(library.len(), 1);
        let desc = library.get("parts.r1").expect("Macro not found");
        assert_eq!(desc.category, "Passive");

        let path = dir.join("uses_macro.fcd");
        fs::write(&path, "MC 20 20 0 0 parts.r1\n").expect("Failed to write");
        let model = load_drawing(&path, Arc::new(library), true).expect("Failed to load");
        assert!(model.primitives[0].is_macro());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_non_utf8_drawing() {
        let dir = temp_dir("fidocad_fcd_latin1");
        let path = dir.join("latin1.fcd");
        fs::write(&path, b"TY 0 0 4 3 0 0 0 * caf\xe9\n").expect("Failed to write");
        let model = load_drawing(&path, Arc::new(Library::new()), true).expect("Failed to load");
        assert_eq!(model.primitives.len(), 1);

        fs::remove_dir_all(&dir).ok();
    }
}
