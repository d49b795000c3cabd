//! 绘图配置
//!
//! 线宽、连接点尺寸、虚线样式等在整个绘制/导出过程中共享的参数。

use serde::{Deserialize, Serialize};

/// 虚线样式数量
pub const DASH_STYLE_COUNT: usize = 5;

/// 默认文字字体
pub const DEFAULT_TEXT_FONT: &str = "Courier New";

/// 绘图配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingConfig {
    /// 普通线宽（逻辑单位）
    pub line_width: f64,
    /// 圆/椭圆线宽
    pub line_width_circles: f64,
    /// 连接点直径
    pub connection_size: f64,
    /// 默认文字字体
    pub default_text_font: String,
    /// 低于该像素高度的文字用线段代替
    pub text_size_limit: i32,
    /// 虚线样式：实段/空段长度交替（逻辑单位）
    pub dash: Vec<Vec<f32>>,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            line_width: 0.5,
            line_width_circles: 0.35,
            connection_size: 2.0,
            default_text_font: DEFAULT_TEXT_FONT.to_string(),
            text_size_limit: 4,
            dash: vec![
                vec![10.0, 0.0],
                vec![5.0, 5.0],
                vec![2.0, 2.0],
                vec![2.0, 5.0],
                vec![2.0, 5.0, 5.0, 5.0],
            ],
        }
    }
}

impl DrawingConfig {
    /// 取虚线样式，越界时使用实线
    pub fn dash_pattern(&self, style: usize) -> &[f32] {
        self.dash
            .get(style)
            .or_else(|| self.dash.first())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// 把虚线样式限制到 [0, DASH_STYLE_COUNT)
pub fn check_dash_style(style: i64) -> usize {
    style.clamp(0, DASH_STYLE_COUNT as i64 - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = DrawingConfig::default();
        assert_eq!(c.line_width, 0.5);
        assert_eq!(c.dash.len(), DASH_STYLE_COUNT);
        assert_eq!(c.dash_pattern(4), &[2.0, 5.0, 5.0, 5.0]);
        assert_eq!(c.dash_pattern(99), &[10.0, 0.0]);
    }

    #[test]
    fn test_check_dash_style() {
        assert_eq!(check_dash_style(-2), 0);
        assert_eq!(check_dash_style(2), 2);
        assert_eq!(check_dash_style(9), DASH_STYLE_COUNT - 1);
    }
}
