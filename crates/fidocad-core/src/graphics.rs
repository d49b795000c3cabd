//! 绘图表面抽象
//!
//! 图元通过 [`Graphics`] 绘制到任意后端。[`NullGraphics`] 不产生输出，只用于
//! 在不依赖真实窗口系统的情况下计算外包框与文字尺寸。

use crate::layer::Color;
use crate::math::{Point2, PointG};

/// 字体上行高度占字号的比例
const ASCENT_RATIO: f64 = 0.8;
/// 字体下行高度占字号的比例
const DESCENT_RATIO: f64 = 0.2;
/// 等宽近似下单字符宽度占字号的比例
const CHAR_WIDTH_RATIO: f64 = 0.6;

/// 近似的字体度量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent: i32,
    pub descent: i32,
    pub char_width: f64,
}

impl FontMetrics {
    /// 按字号估算度量
    pub fn for_size(size: f64) -> Self {
        Self {
            ascent: (size * ASCENT_RATIO).round() as i32,
            descent: (size * DESCENT_RATIO).round() as i32,
            char_width: size * CHAR_WIDTH_RATIO,
        }
    }

    pub fn height(&self) -> i32 {
        self.ascent + self.descent
    }

    pub fn string_width(&self, s: &str) -> i32 {
        (s.chars().count() as f64 * self.char_width).round() as i32
    }
}

/// 高级文字的绘制参数（已映射到设备坐标）
#[derive(Debug, Clone, PartialEq)]
pub struct TextDraw<'a> {
    /// 纵横拉伸系数
    pub xy_factor: f64,
    pub x: i32,
    pub y: i32,
    /// 拉伸前的基线 y
    pub qq: i32,
    pub ascent: i32,
    pub width: i32,
    pub needs_stretching: bool,
    /// 角度（度）
    pub orientation: i32,
    pub mirror: bool,
    pub text: &'a str,
}

/// 绘图表面
pub trait Graphics {
    fn set_color(&mut self, color: Color);
    fn color(&self) -> Color;
    fn set_alpha(&mut self, alpha: f32);
    /// 选中图元时使用的高亮色
    fn activate_select_color(&mut self) {
        self.set_color(Color::new(0, 255, 0));
    }

    /// 设置线宽与虚线样式
    fn apply_stroke(&mut self, width: f32, dash_style: usize);

    fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32);
    fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32);
    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32);
    fn fill_round_rect(&mut self, x: i32, y: i32, w: i32, h: i32, arc_w: i32, arc_h: i32);
    fn draw_oval(&mut self, x: i32, y: i32, w: i32, h: i32);
    fn fill_oval(&mut self, x: i32, y: i32, w: i32, h: i32);
    fn draw_polygon(&mut self, points: &[PointG]);
    fn fill_polygon(&mut self, points: &[PointG]);
    /// 三次贝塞尔曲线（控制点为设备坐标）
    fn draw_bezier(&mut self, p: &[Point2; 4]);
    /// 由贝塞尔段组成的路径，`segments` 的每项为 (控制点1, 控制点2, 终点)
    fn draw_path(&mut self, start: Point2, segments: &[[Point2; 3]], closed: bool, filled: bool);

    /// 选择字体，字号为像素
    fn set_font(&mut self, name: &str, size: f64, italic: bool, bold: bool);
    fn font_ascent(&self) -> i32;
    fn font_descent(&self) -> i32;
    fn string_width(&self, s: &str) -> i32;
    fn draw_string(&mut self, s: &str, x: i32, y: i32);
    fn draw_adv_text(&mut self, t: &TextDraw<'_>);

    /// 区域是否可能可见；返回 false 时可跳过绘制
    fn hit_clip(&self, x: i32, y: i32, w: i32, h: i32) -> bool;
}

/// 空绘图表面：丢弃所有输出，使用近似字体度量
#[derive(Debug, Clone)]
pub struct NullGraphics {
    color: Color,
    metrics: FontMetrics,
}

impl Default for NullGraphics {
    fn default() -> Self {
        Self::new()
    }
}

impl NullGraphics {
    pub fn new() -> Self {
        Self {
            color: Color::BLACK,
            metrics: FontMetrics::for_size(12.0),
        }
    }
}

impl Graphics for NullGraphics {
    fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    fn color(&self) -> Color {
        self.color
    }

    fn set_alpha(&mut self, _alpha: f32) {}

    fn apply_stroke(&mut self, _width: f32, _dash_style: usize) {}

    fn draw_line(&mut self, _x1: i32, _y1: i32, _x2: i32, _y2: i32) {}

    fn draw_rect(&mut self, _x: i32, _y: i32, _w: i32, _h: i32) {}

    fn fill_rect(&mut self, _x: i32, _y: i32, _w: i32, _h: i32) {}

    fn fill_round_rect(&mut self, _x: i32, _y: i32, _w: i32, _h: i32, _aw: i32, _ah: i32) {}

    fn draw_oval(&mut self, _x: i32, _y: i32, _w: i32, _h: i32) {}

    fn fill_oval(&mut self, _x: i32, _y: i32, _w: i32, _h: i32) {}

    fn draw_polygon(&mut self, _points: &[PointG]) {}

    fn fill_polygon(&mut self, _points: &[PointG]) {}

    fn draw_bezier(&mut self, _p: &[Point2; 4]) {}

    fn draw_path(&mut self, _start: Point2, _segments: &[[Point2; 3]], _closed: bool, _filled: bool) {}

    fn set_font(&mut self, _name: &str, size: f64, _italic: bool, _bold: bool) {
        self.metrics = FontMetrics::for_size(size);
    }

    fn font_ascent(&self) -> i32 {
        self.metrics.ascent
    }

    fn font_descent(&self) -> i32 {
        self.metrics.descent
    }

    fn string_width(&self, s: &str) -> i32 {
        self.metrics.string_width(s)
    }

    fn draw_string(&mut self, _s: &str, _x: i32, _y: i32) {}

    fn draw_adv_text(&mut self, _t: &TextDraw<'_>) {}

    fn hit_clip(&self, _x: i32, _y: i32, _w: i32, _h: i32) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_graphics_metrics() {
        let mut g = NullGraphics::new();
        g.set_font("Courier New", 10.0, false, false);
        assert_eq!(g.font_ascent(), 8);
        assert_eq!(g.font_descent(), 2);
        assert_eq!(g.string_width("abcde"), 30);
        assert!(g.hit_clip(0, 0, 1, 1));
    }
}
