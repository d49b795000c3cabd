//! JSON 绘图配置

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use fidocad_core::config::DrawingConfig;

use crate::error::FileError;

/// 读取配置，缺省字段取默认值
pub fn load_config(path: &Path) -> Result<DrawingConfig, FileError> {
    let reader = BufReader::new(File::open(path)?);
    let config: DrawingConfig = serde_json::from_reader(reader)?;
    tracing::info!("Loaded drawing configuration from {}", path.display());
    Ok(config)
}

pub fn save_config(config: &DrawingConfig, path: &Path) -> Result<(), FileError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, config)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let path = std::env::temp_dir().join("fidocad_partial_config.json");
        std::fs::write(&path, r#"{ "line_width": 1.25, "default_text_font": "Arial" }"#)
            .expect("Failed to write");

        let config = load_config(&path).expect("Failed to load");
        assert_eq!(config.line_width, 1.25);
        assert_eq!(config.default_text_font, "Arial");
        assert_eq!(config.line_width_circles, DrawingConfig::default().line_width_circles);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = std::env::temp_dir().join("fidocad_config_roundtrip.json");
        let mut config = DrawingConfig::default();
        config.connection_size = 3.0;
        config.dash[1] = vec![4.0, 1.0];

        save_config(&config, &path).expect("Failed to save");
        assert_eq!(load_config(&path).expect("Failed to load"), config);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_malformed_config() {
        let path = std::env::temp_dir().join("fidocad_bad_config.json");
        std::fs::write(&path, "{ line_width: ").expect("Failed to write");
        assert!(matches!(load_config(&path), Err(FileError::Json(_))));
        std::fs::remove_file(&path).ok();
    }
}
