//! 图层管理

use serde::{Deserialize, Serialize};

/// 最大图层数
pub const MAX_LAYERS: usize = 16;

/// RGB 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 从 0xRRGGBB（高位忽略）构造
    pub const fn from_rgb(rgb: u32) -> Self {
        Self::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// 以有符号 ARGB 整数表示（不透明），与图纸文件中的 `FJC L` 行一致
    pub fn to_argb_i32(self) -> i32 {
        (0xFF00_0000u32 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32) as i32
    }

    /// 分量归一化到 [0, 1]
    pub fn to_unit_rgb(self) -> (f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        )
    }

    /// `#rrggbb` 形式
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// 图层描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDesc {
    pub color: Color,
    pub visible: bool,
    /// 与标准图层表不同，需要写入文件
    pub modified: bool,
    pub description: String,
    pub alpha: f32,
}

impl LayerDesc {
    pub fn new(color: Color, visible: bool, description: impl Into<String>, alpha: f32) -> Self {
        Self {
            color,
            visible,
            modified: false,
            description: description.into(),
            alpha,
        }
    }
}

/// 标准图层表
pub fn standard_layers() -> Vec<LayerDesc> {
    const TABLE: [(u32, &str, f32); MAX_LAYERS] = [
        (0x000000, "Circuit", 1.0),
        (0x000080, "Bottom copper", 1.0),
        (0xFF0000, "Top copper", 1.0),
        (0x008080, "Silkscreen", 1.0),
        (0xFFC800, "Other 1", 1.0),
        (0x7FFF00, "Other 2", 1.0),
        (0x00FFFF, "Other 3", 1.0),
        (0x008000, "Other 4", 1.0),
        (0x9ACD32, "Other 5", 1.0),
        (0xFF1493, "Other 6", 1.0),
        (0xB59B0C, "Other 7", 1.0),
        (0x0180FF, "Other 8", 1.0),
        (0xE1E1E1, "Other 9", 0.95),
        (0xA2A2A2, "Other 10", 0.9),
        (0x5F5F5F, "Other 11", 0.9),
        (0x000000, "Other 12", 1.0),
    ];

    TABLE
        .iter()
        .map(|&(rgb, name, alpha)| LayerDesc::new(Color::from_rgb(rgb), true, name, alpha))
        .collect()
}

/// 把任意整数限制到合法图层号，越界时回落到 0
pub fn checked_layer(l: i64) -> usize {
    if l < 0 || l >= MAX_LAYERS as i64 {
        0
    } else {
        l as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layers() {
        let layers = standard_layers();
        assert_eq!(layers.len(), MAX_LAYERS);
        assert_eq!(layers[2].color, Color::RED);
        assert_eq!(layers[3].description, "Silkscreen");
        assert!(layers.iter().all(|l| l.visible && !l.modified));
        assert!((layers[12].alpha - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_color_argb() {
        // 文件中的颜色以有符号 ARGB 整数保存
        assert_eq!(Color::from_rgb(0x008000).to_argb_i32(), -16744448);
        assert_eq!(Color::from_rgb((-16744448i32) as u32), Color::new(0, 128, 0));
        assert_eq!(Color::new(255, 20, 147).to_hex(), "#ff1493");
    }

    #[test]
    fn test_checked_layer() {
        assert_eq!(checked_layer(3), 3);
        assert_eq!(checked_layer(16), 0);
        assert_eq!(checked_layer(-1), 0);
    }
}
