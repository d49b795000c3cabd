//! 图元定义
//!
//! 每种图元各自实现 [`GraphicPrimitive`]，由 [`Primitive`] 枚举统一持有。
//! 图元在逻辑坐标中保存控制点；带名称/数值文字的图元把这两个文字锚点放在
//! 控制点数组的末尾。
//!
//! 设备坐标的缓存以 `Option` 保存：几何或样式改变时清空，绘制时若缓存为空
//! 或视图参数变化则重建。

mod adv_text;
mod arrow;
mod bezier;
mod complex_curve;
mod connection;
mod line;
mod macro_call;
mod oval;
mod pcb_line;
mod pcb_pad;
mod polygon;
mod rectangle;

pub use adv_text::AdvText;
pub use arrow::{arrow_shape, Arrow, ArrowShape, ARROW_EMPTY, ARROW_LIMITER};
pub use bezier::Bezier;
pub use complex_curve::ComplexCurve;
pub use connection::Connection;
pub use line::Line;
pub use macro_call::MacroCall;
pub use oval::Oval;
pub use pcb_line::PcbLine;
pub use pcb_pad::{PadStyle, PcbPad};
pub use polygon::Polygon;
pub use rectangle::Rectangle;

use std::io;

use crate::config::{DrawingConfig, DEFAULT_TEXT_FONT};
use crate::error::{int_token, FidoError, Result};
use crate::export::{ExportInterface, TextSpec};
use crate::geometry::point_in_rectangle;
use crate::graphics::{FontMetrics, Graphics};
use crate::layer::{checked_layer, LayerDesc};
use crate::map_coordinates::{MapCoordinates, ViewKey};
use crate::math::{clamp_coord, mirror_coord, PointG, RectangleG};

/// 最小绘制线宽（像素）
pub const D_MIN: f32 = 0.5;

/// 文字默认字号
pub const DEFAULT_FONT_SIZE: i32 = 4;

/// 绘制上下文
#[derive(Debug, Clone, Copy)]
pub struct DrawContext<'a> {
    pub layers: &'a [LayerDesc],
    pub config: &'a DrawingConfig,
    /// 只绘制该图层（宏展开时使用）
    pub only_layer: Option<usize>,
    /// 只绘制焊盘钻孔
    pub only_pads: bool,
}

/// 导出上下文
#[derive(Debug, Clone, Copy)]
pub struct ExportContext<'a> {
    pub layers: &'a [LayerDesc],
    pub config: &'a DrawingConfig,
    pub only_layer: Option<usize>,
    pub only_pads: bool,
    pub export_invisible: bool,
}

/// 带视图签名的设备坐标缓存
#[derive(Debug, Clone)]
pub(crate) struct DrawCache<T> {
    key: ViewKey,
    data: T,
}

/// 视图变化或缓存为空时重建，返回可用的缓存数据
pub(crate) fn refresh_cache<T>(
    slot: &mut Option<DrawCache<T>>,
    key: ViewKey,
    build: impl FnOnce() -> T,
) -> &T {
    if matches!(slot, Some(c) if c.key != key) {
        *slot = None;
    }
    &slot.get_or_insert_with(|| DrawCache { key, data: build() }).data
}

/// 所有图元共享的状态
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveBase {
    /// 控制点；带文字的图元末尾两个为名称、数值锚点
    pub points: Vec<PointG>,
    pub layer: usize,
    pub selected: bool,
    pub name: String,
    pub value: String,
    pub font: String,
    pub font_size: i32,
    has_text_points: bool,
}

impl PrimitiveBase {
    /// `n` 个几何控制点，`with_text` 时额外附加名称/数值锚点
    pub fn new(n: usize, with_text: bool, font: &str, font_size: i32) -> Self {
        let extra = if with_text { 2 } else { 0 };
        Self {
            points: vec![PointG::default(); n + extra],
            layer: 0,
            selected: false,
            name: String::new(),
            value: String::new(),
            font: font.to_string(),
            font_size: font_size.max(1),
            has_text_points: with_text,
        }
    }

    /// 几何控制点（不含文字锚点）
    pub fn geometry(&self) -> &[PointG] {
        &self.points[..self.geometry_len()]
    }

    pub fn geometry_len(&self) -> usize {
        if self.has_text_points {
            self.points.len().saturating_sub(2)
        } else {
            self.points.len()
        }
    }

    pub fn name_index(&self) -> Option<usize> {
        self.has_text_points.then(|| self.points.len() - 2)
    }

    pub fn value_index(&self) -> Option<usize> {
        self.has_text_points.then(|| self.points.len() - 1)
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn has_value(&self) -> bool {
        !self.value.is_empty()
    }

    /// 文字锚点放在 (x+5, y+5) 与 (x+5, y+10)
    pub fn place_text_points(&mut self, x: i32, y: i32) {
        if let (Some(n), Some(v)) = (self.name_index(), self.value_index()) {
            self.points[n] = PointG::new(x.saturating_add(5), y.saturating_add(5));
            self.points[v] = PointG::new(x.saturating_add(5), y.saturating_add(10));
        }
    }

    pub fn set_font(&mut self, font: &str, size: i32) {
        self.font = font.to_string();
        self.font_size = size.max(1);
    }

    /// 解析图层号，非法或越界时为 0
    pub fn parse_layer(&mut self, token: &str) {
        self.layer = token.parse::<i64>().map(checked_layer).unwrap_or(0);
    }

    pub fn set_layer(&mut self, l: usize) {
        self.layer = checked_layer(l as i64);
    }

    /// 选择图层颜色；图层不可见时返回 false
    pub fn select_layer(&mut self, g: &mut dyn Graphics, layers: &[LayerDesc]) -> bool {
        if layers.is_empty() {
            return true;
        }
        if self.layer >= layers.len() {
            self.layer = layers.len() - 1;
        }
        let l = &layers[self.layer];
        if !l.visible {
            return false;
        }
        if self.selected {
            g.activate_select_color();
        } else {
            g.set_color(l.color);
            g.set_alpha(l.alpha);
        }
        true
    }

    // ===== 名称/数值文字 =====

    /// 文字在逻辑坐标下的宽度与高度
    fn text_extent(&self, text: &str) -> (i32, i32) {
        let m = FontMetrics::for_size((self.font_size as f64 * 12.0 / 7.0 + 0.5).floor());
        (m.string_width(text), m.height())
    }

    /// 点是否落在名称或数值文字上
    pub fn check_text(&self, px: i32, py: i32) -> bool {
        let hit = |idx: Option<usize>, text: &str| {
            if text.is_empty() {
                return false;
            }
            let Some(p) = idx.map(|i| self.points[i]) else {
                return false;
            };
            let (w, h) = self.text_extent(text);
            point_in_rectangle(p.x, p.y, w, h, px, py)
        };
        hit(self.name_index(), &self.name) || hit(self.value_index(), &self.value)
    }

    /// 序列化名称/数值为两行 TY
    pub fn save_text(&self, extensions: bool) -> String {
        let (Some(ni), Some(vi)) = (self.name_index(), self.value_index()) else {
            return String::new();
        };
        if !self.has_name() && !self.has_value() {
            return String::new();
        }
        let font = encode_font(&self.font);
        let mut s = String::new();
        if extensions {
            s.push_str("FCJ\n");
        }
        for (p, text) in [(self.points[ni], &self.name), (self.points[vi], &self.value)] {
            s.push_str(&format!(
                "TY {} {} {} {} 0 0 {} {} {}\n",
                p.x,
                p.y,
                self.font_size * 4 / 3,
                self.font_size,
                self.layer,
                font,
                text
            ));
        }
        s
    }

    /// 从 TY 行读取名称
    pub fn set_name(&mut self, tokens: &[&str]) -> Result<()> {
        let (p, text) = parse_text_line(tokens)?;
        if let Some(i) = self.name_index() {
            self.points[i] = p;
        }
        self.name = text;
        Ok(())
    }

    /// 从 TY 行读取数值，同时更新字体与字号
    pub fn set_value(&mut self, tokens: &[&str]) -> Result<()> {
        let (p, text) = parse_text_line(tokens)?;
        if let Some(i) = self.value_index() {
            self.points[i] = p;
        }
        self.font = decode_font(tokens[8]);
        self.font_size = int_token(tokens[4])?.max(1);
        self.value = text;
        Ok(())
    }

    /// 绘制名称/数值文字
    pub fn draw_text(
        &self,
        g: &mut dyn Graphics,
        map: &mut MapCoordinates,
        config: &DrawingConfig,
        only_layer: Option<usize>,
    ) {
        if !self.has_name() && !self.has_value() {
            return;
        }
        if only_layer.is_some_and(|l| l != self.layer) {
            return;
        }
        let (Some(ni), Some(vi)) = (self.name_index(), self.value_index()) else {
            return;
        };
        let (pn, pv) = (self.points[ni], self.points[vi]);
        let xa = map.map_x(pn.x as f64, pn.y as f64);
        let ya = map.map_y(pn.x as f64, pn.y as f64);
        let xb = map.map_x(pv.x as f64, pv.y as f64);
        let yb = map.map_y(pv.x as f64, pv.y as f64);

        let size = (self.font_size as f64 * 12.0 * map.y_magnitude() / 7.0 + 0.5).floor();
        g.set_font(&self.font, size, false, false);
        let h = g.font_ascent();
        let th = h + g.font_descent();
        let w1 = g.string_width(&self.name);
        let w2 = g.string_width(&self.value);

        map.track_point(xa as f64, ya as f64);
        map.track_point((xa + w1) as f64, (ya + th) as f64);
        map.track_point(xb as f64, yb as f64);
        map.track_point((xb + w2) as f64, (yb + th) as f64);

        if !g.hit_clip(xa, ya, w1, th) && !g.hit_clip(xb, yb, w2, th) {
            return;
        }
        if th < config.text_size_limit {
            g.draw_line(xa, ya, xa + w1 - 1, ya);
            g.draw_line(xb, yb, xb + w2 - 1, yb);
            return;
        }
        if self.has_name() {
            g.draw_string(&self.name, xa, ya + h);
        }
        if self.has_value() {
            g.draw_string(&self.value, xb, yb + h);
        }
    }

    /// 导出名称/数值文字
    pub fn export_text(
        &self,
        exp: &mut dyn ExportInterface,
        map: &mut MapCoordinates,
        only_layer: Option<usize>,
    ) -> io::Result<()> {
        if only_layer.is_some_and(|l| l != self.layer) {
            return Ok(());
        }
        let (Some(ni), Some(vi)) = (self.name_index(), self.value_index()) else {
            return Ok(());
        };
        let fs = self.font_size as f64;
        let size = (map.map_xr(fs, fs) - map.map_xr(0.0, 0.0)).abs();
        for (idx, text) in [(ni, &self.name), (vi, &self.value)] {
            if text.is_empty() {
                continue;
            }
            let p = self.points[idx];
            exp.export_adv_text(&TextSpec {
                x: map.map_x(p.x as f64, p.y as f64),
                y: map.map_y(p.x as f64, p.y as f64),
                size_x: size as i32,
                size_y: (size * 12.0 / 7.0 + 0.5) as i32,
                font: &self.font,
                bold: false,
                mirrored: false,
                italic: false,
                orientation: 0,
                layer: self.layer,
                text,
            })?;
        }
        Ok(())
    }

    /// 控制点 i 是否为有效的操作手柄
    pub fn is_valid_handle(&self, i: usize) -> bool {
        if Some(i) == self.name_index() {
            return self.has_name();
        }
        if Some(i) == self.value_index() {
            return self.has_value();
        }
        true
    }
}

/// 解析 TY 行中的位置与文字部分
fn parse_text_line(tokens: &[&str]) -> Result<(PointG, String)> {
    if tokens.first() != Some(&"TY") {
        return Err(FidoError::InvalidPrimitive(
            tokens.first().unwrap_or(&"").to_string(),
        ));
    }
    if tokens.len() < 9 {
        return Err(FidoError::bad_arguments("TY"));
    }
    let p = PointG::new(int_token(tokens[1])?, int_token(tokens[2])?);
    Ok((p, tokens[9..].join(" ")))
}

/// 字体名写入文件时：默认字体写 `*`，空格写成 `++`
pub fn encode_font(font: &str) -> String {
    if font == DEFAULT_TEXT_FONT {
        "*".to_string()
    } else {
        font.replace(' ', "++")
    }
}

pub fn decode_font(token: &str) -> String {
    if token == "*" {
        DEFAULT_TEXT_FONT.to_string()
    } else {
        token.replace("++", " ")
    }
}

/// 绕 (ix, iy) 把一组点旋转 90°
pub(crate) fn rotate_points(points: &mut [PointG], ccw: bool, ix: i32, iy: i32) {
    for p in points.iter_mut() {
        let (x, y) = (p.x as i64, p.y as i64);
        let (ix, iy) = (ix as i64, iy as i64);
        if ccw {
            p.x = clamp_coord(ix + (y - iy));
            p.y = clamp_coord(iy - (x - ix));
        } else {
            p.x = clamp_coord(ix - (y - iy));
            p.y = clamp_coord(iy + (x - ix));
        }
    }
}

/// 映射一个逻辑点并追踪
pub(crate) fn map_point(map: &mut MapCoordinates, p: PointG) -> PointG {
    PointG::new(
        map.map_x(p.x as f64, p.y as f64),
        map.map_y(p.x as f64, p.y as f64),
    )
}

/// 逻辑线宽换算为绘制线宽，不小于 [`D_MIN`]
pub(crate) fn stroke_width(width: f64, map: &MapCoordinates) -> f32 {
    ((width * map.x_magnitude()) as f32).max(D_MIN)
}

/// 图元的公共行为
pub trait GraphicPrimitive {
    fn base(&self) -> &PrimitiveBase;
    fn base_mut(&mut self) -> &mut PrimitiveBase;

    /// 从记号解析（包括追加在末尾的 FCJ 扩展记号）
    fn parse_tokens(&mut self, tokens: &[&str]) -> Result<()>;

    /// 点到图元的距离（逻辑单位）
    fn distance_to_point(&self, px: i32, py: i32) -> i32;

    /// 序列化为文本命令
    fn to_fcd(&self, extensions: bool) -> String;

    fn draw(&mut self, g: &mut dyn Graphics, map: &mut MapCoordinates, ctx: &DrawContext<'_>);

    fn export(
        &mut self,
        exp: &mut dyn ExportInterface,
        map: &mut MapCoordinates,
        ctx: &ExportContext<'_>,
    ) -> io::Result<()>;

    /// 使设备坐标缓存失效
    fn invalidate(&mut self);

    fn layer(&self) -> usize {
        self.base().layer
    }

    fn contains_layer(&self, l: usize) -> bool {
        self.base().layer == l
    }

    fn max_layer(&self) -> usize {
        self.base().layer
    }

    fn needs_holes(&self) -> bool {
        false
    }

    fn is_macro(&self) -> bool {
        false
    }

    /// 一次完整导出结束后调用
    fn reset_export(&mut self) {}

    fn first_point(&self) -> PointG {
        self.base().points.first().copied().unwrap_or_default()
    }

    fn move_by(&mut self, dx: i32, dy: i32) {
        for p in self.base_mut().points.iter_mut() {
            p.x = p.x.saturating_add(dx);
            p.y = p.y.saturating_add(dy);
        }
        self.invalidate();
    }

    /// 以竖线 x = x_pos 为轴镜像
    fn mirror(&mut self, x_pos: i32) {
        for p in self.base_mut().points.iter_mut() {
            p.x = mirror_coord(p.x, x_pos);
        }
        self.invalidate();
    }

    /// 绕 (ix, iy) 旋转 90°
    fn rotate(&mut self, ccw: bool, ix: i32, iy: i32) {
        rotate_points(&mut self.base_mut().points, ccw, ix, iy);
        self.invalidate();
    }

    /// 框选判定：`fully` 时要求全部控制点在矩形内，否则有任一点在内即可
    fn intersects(&self, rect: &RectangleG, fully: bool) -> bool {
        let points = &self.base().points;
        if fully {
            points.iter().all(|p| rect.contains(p.x, p.y))
        } else {
            points.iter().any(|p| rect.contains(p.x, p.y))
        }
    }

    /// 任一有效控制点位于矩形内，或图元的边穿过矩形时选中
    fn select_rect(&mut self, x: i32, y: i32, w: i32, h: i32) -> bool {
        if select_by_handles(self.base_mut(), x, y, w, h) {
            return true;
        }
        let hit = self.intersects(&RectangleG::new(x, y, w, h), false);
        if hit {
            self.base_mut().selected = true;
        }
        hit
    }
}

/// 任一有效控制点落在矩形内时置选中标志
pub(crate) fn select_by_handles(base: &mut PrimitiveBase, x: i32, y: i32, w: i32, h: i32) -> bool {
    let (x1, y1) = (x as i64 + w as i64, y as i64 + h as i64);
    let hit = base.points.iter().enumerate().any(|(i, p)| {
        base.is_valid_handle(i) && x <= p.x && (p.x as i64) < x1 && y <= p.y && (p.y as i64) < y1
    });
    if hit {
        base.selected = true;
    }
    hit
}

/// 所有图元
#[derive(Debug, Clone)]
pub enum Primitive {
    Line(Line),
    Rectangle(Rectangle),
    Oval(Oval),
    Polygon(Polygon),
    Bezier(Bezier),
    ComplexCurve(ComplexCurve),
    PcbLine(PcbLine),
    PcbPad(PcbPad),
    AdvText(AdvText),
    Macro(Box<MacroCall>),
    Connection(Connection),
}

impl Primitive {
    pub fn as_graphic(&self) -> &dyn GraphicPrimitive {
        match self {
            Primitive::Line(p) => p,
            Primitive::Rectangle(p) => p,
            Primitive::Oval(p) => p,
            Primitive::Polygon(p) => p,
            Primitive::Bezier(p) => p,
            Primitive::ComplexCurve(p) => p,
            Primitive::PcbLine(p) => p,
            Primitive::PcbPad(p) => p,
            Primitive::AdvText(p) => p,
            Primitive::Macro(p) => p.as_ref(),
            Primitive::Connection(p) => p,
        }
    }

    pub fn as_graphic_mut(&mut self) -> &mut dyn GraphicPrimitive {
        match self {
            Primitive::Line(p) => p,
            Primitive::Rectangle(p) => p,
            Primitive::Oval(p) => p,
            Primitive::Polygon(p) => p,
            Primitive::Bezier(p) => p,
            Primitive::ComplexCurve(p) => p,
            Primitive::PcbLine(p) => p,
            Primitive::PcbPad(p) => p,
            Primitive::AdvText(p) => p,
            Primitive::Macro(p) => p.as_mut(),
            Primitive::Connection(p) => p,
        }
    }

    /// 图元类型名
    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::Line(_) => "Line",
            Primitive::Rectangle(_) => "Rectangle",
            Primitive::Oval(_) => "Oval",
            Primitive::Polygon(_) => "Polygon",
            Primitive::Bezier(_) => "Bezier",
            Primitive::ComplexCurve(_) => "ComplexCurve",
            Primitive::PcbLine(_) => "PcbLine",
            Primitive::PcbPad(_) => "PcbPad",
            Primitive::AdvText(_) => "AdvText",
            Primitive::Macro(_) => "Macro",
            Primitive::Connection(_) => "Connection",
        }
    }
}

impl GraphicPrimitive for Primitive {
    fn base(&self) -> &PrimitiveBase {
        self.as_graphic().base()
    }

    fn base_mut(&mut self) -> &mut PrimitiveBase {
        self.as_graphic_mut().base_mut()
    }

    fn parse_tokens(&mut self, tokens: &[&str]) -> Result<()> {
        self.as_graphic_mut().parse_tokens(tokens)
    }

    fn distance_to_point(&self, px: i32, py: i32) -> i32 {
        self.as_graphic().distance_to_point(px, py)
    }

    fn to_fcd(&self, extensions: bool) -> String {
        self.as_graphic().to_fcd(extensions)
    }

    fn draw(&mut self, g: &mut dyn Graphics, map: &mut MapCoordinates, ctx: &DrawContext<'_>) {
        self.as_graphic_mut().draw(g, map, ctx)
    }

    fn export(
        &mut self,
        exp: &mut dyn ExportInterface,
        map: &mut MapCoordinates,
        ctx: &ExportContext<'_>,
    ) -> io::Result<()> {
        self.as_graphic_mut().export(exp, map, ctx)
    }

    fn invalidate(&mut self) {
        self.as_graphic_mut().invalidate()
    }

    fn contains_layer(&self, l: usize) -> bool {
        self.as_graphic().contains_layer(l)
    }

    fn max_layer(&self) -> usize {
        self.as_graphic().max_layer()
    }

    fn needs_holes(&self) -> bool {
        self.as_graphic().needs_holes()
    }

    fn is_macro(&self) -> bool {
        self.as_graphic().is_macro()
    }

    fn reset_export(&mut self) {
        self.as_graphic_mut().reset_export()
    }

    fn move_by(&mut self, dx: i32, dy: i32) {
        self.as_graphic_mut().move_by(dx, dy)
    }

    fn mirror(&mut self, x_pos: i32) {
        self.as_graphic_mut().mirror(x_pos)
    }

    fn rotate(&mut self, ccw: bool, ix: i32, iy: i32) {
        self.as_graphic_mut().rotate(ccw, ix, iy)
    }

    fn intersects(&self, rect: &RectangleG, fully: bool) -> bool {
        self.as_graphic().intersects(rect, fully)
    }

    fn select_rect(&mut self, x: i32, y: i32, w: i32, h: i32) -> bool {
        self.as_graphic_mut().select_rect(x, y, w, h)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! 测试用的记录型导出器

    use super::*;
    use crate::export::{ArrowSpec, MacroSpec, PadSpec, StrokeStyle};
    use crate::math::{DimensionG, Point2};

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Text { x: i32, y: i32, text: String, layer: usize },
        Bezier { points: [PointG; 4], layer: usize },
        Connection { x: i32, y: i32, layer: usize },
        Line { p1: Point2, p2: Point2, layer: usize, arrows: ArrowSpec, dash: usize },
        Macro { key: String },
        Oval { p1: PointG, p2: PointG, filled: bool, layer: usize },
        PcbLine { p1: PointG, p2: PointG, width: i32, layer: usize },
        Pad(PadSpec),
        Polygon { vertices: Vec<Point2>, filled: bool, layer: usize },
        Rectangle { p1: PointG, p2: PointG, filled: bool, layer: usize },
        Arrow { tip: Point2 },
    }

    /// 记录所有导出调用
    #[derive(Debug, Default)]
    pub struct RecordingExporter {
        pub calls: Vec<Call>,
        /// 为 true 时宏整体导出
        pub handle_macros: bool,
    }

    impl ExportInterface for RecordingExporter {
        fn export_start(&mut self, _s: DimensionG, _l: &[LayerDesc], _g: i32) -> io::Result<()> {
            Ok(())
        }

        fn export_end(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn set_dash_unit(&mut self, _unit: f64) {}

        fn set_dash_phase(&mut self, _phase: f32) {}

        fn export_adv_text(&mut self, t: &TextSpec<'_>) -> io::Result<()> {
            self.calls.push(Call::Text {
                x: t.x,
                y: t.y,
                text: t.text.to_string(),
                layer: t.layer,
            });
            Ok(())
        }

        fn export_bezier(
            &mut self,
            points: &[PointG; 4],
            layer: usize,
            _a: &ArrowSpec,
            _s: &StrokeStyle,
        ) -> io::Result<()> {
            self.calls.push(Call::Bezier {
                points: *points,
                layer,
            });
            Ok(())
        }

        fn export_connection(&mut self, x: i32, y: i32, layer: usize, _size: f64) -> io::Result<()> {
            self.calls.push(Call::Connection { x, y, layer });
            Ok(())
        }

        fn export_line(
            &mut self,
            p1: Point2,
            p2: Point2,
            layer: usize,
            arrows: &ArrowSpec,
            stroke: &StrokeStyle,
        ) -> io::Result<()> {
            self.calls.push(Call::Line {
                p1,
                p2,
                layer,
                arrows: *arrows,
                dash: stroke.dash_style,
            });
            Ok(())
        }

        fn export_macro(&mut self, spec: &MacroSpec<'_>) -> io::Result<bool> {
            if self.handle_macros {
                self.calls.push(Call::Macro {
                    key: spec.key.to_string(),
                });
            }
            Ok(self.handle_macros)
        }

        fn export_oval(
            &mut self,
            p1: PointG,
            p2: PointG,
            filled: bool,
            layer: usize,
            _s: &StrokeStyle,
        ) -> io::Result<()> {
            self.calls.push(Call::Oval {
                p1,
                p2,
                filled,
                layer,
            });
            Ok(())
        }

        fn export_pcb_line(&mut self, p1: PointG, p2: PointG, width: i32, layer: usize) -> io::Result<()> {
            self.calls.push(Call::PcbLine {
                p1,
                p2,
                width,
                layer,
            });
            Ok(())
        }

        fn export_pcb_pad(&mut self, pad: &PadSpec) -> io::Result<()> {
            self.calls.push(Call::Pad(*pad));
            Ok(())
        }

        fn export_polygon(
            &mut self,
            vertices: &[Point2],
            filled: bool,
            layer: usize,
            _s: &StrokeStyle,
        ) -> io::Result<()> {
            self.calls.push(Call::Polygon {
                vertices: vertices.to_vec(),
                filled,
                layer,
            });
            Ok(())
        }

        fn export_rectangle(
            &mut self,
            p1: PointG,
            p2: PointG,
            filled: bool,
            layer: usize,
            _s: &StrokeStyle,
        ) -> io::Result<()> {
            self.calls.push(Call::Rectangle {
                p1,
                p2,
                filled,
                layer,
            });
            Ok(())
        }

        fn export_arrow(
            &mut self,
            tip: Point2,
            _toward: Point2,
            _length: f64,
            _half_width: f64,
            _style: i32,
        ) -> io::Result<Point2> {
            self.calls.push(Call::Arrow { tip });
            Ok(tip)
        }
    }

    /// 标准测试导出上下文
    pub fn export_ctx<'a>(layers: &'a [LayerDesc], config: &'a DrawingConfig) -> ExportContext<'a> {
        ExportContext {
            layers,
            config,
            only_layer: None,
            only_pads: false,
            export_invisible: false,
        }
    }

    /// 把一行命令切分成记号
    pub fn tokens(line: &str) -> Vec<&str> {
        line.split_whitespace().collect()
    }
}
