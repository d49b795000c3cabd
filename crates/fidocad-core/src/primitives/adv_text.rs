//! 高级文字 `TY` 与旧格式文字 `TE`
//!
//! 字号分为横向 `size_x` 与纵向 `size_y`，高宽比偏离标准字形时绘制端
//! 需要做纵向拉伸。样式位：1 粗体，2 斜体，4 镜像。

use std::io;

use super::{
    decode_font, encode_font, map_point, rotate_points, DrawContext, ExportContext,
    GraphicPrimitive, PrimitiveBase,
};
use crate::error::{f64_token, int_token, FidoError, Result};
use crate::export::{ExportInterface, TextSpec};
use crate::geometry::{point_in_polygon, point_in_rectangle};
use crate::graphics::{FontMetrics, Graphics, TextDraw};
use crate::map_coordinates::MapCoordinates;
use crate::math::{mirror_coord, PointG, RectangleG};

pub const TEXT_BOLD: i32 = 1;
pub const TEXT_ITALIC: i32 = 2;
pub const TEXT_MIRRORED: i32 = 4;

const MIN_SIZE: i32 = 1;
const MAX_SIZE: i32 = 2000;

/// 点不在文字框内时返回的距离
const FAR_AWAY: i32 = i32::MAX / 2;

#[derive(Debug, Clone)]
pub struct AdvText {
    base: PrimitiveBase,
    pub text: String,
    pub size_x: i32,
    pub size_y: i32,
    /// 角度（度）
    pub orientation: i32,
    pub style: i32,
}

impl AdvText {
    pub fn new(font: &str) -> Self {
        Self {
            base: PrimitiveBase::new(1, false, font, 4),
            text: String::new(),
            size_x: 3,
            size_y: 4,
            orientation: 0,
            style: 0,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_text(
        x: i32,
        y: i32,
        size_x: i32,
        size_y: i32,
        font: &str,
        orientation: i32,
        style: i32,
        text: &str,
        layer: usize,
    ) -> Self {
        let mut t = Self::new(font);
        t.base.points[0] = PointG::new(x, y);
        t.size_x = size_x;
        t.size_y = size_y;
        t.orientation = orientation;
        t.style = style;
        t.text = text.to_string();
        t.base.set_layer(layer);
        t.check_sizes();
        t
    }

    pub fn font(&self) -> &str {
        &self.base.font
    }

    pub fn is_bold(&self) -> bool {
        self.style & TEXT_BOLD != 0
    }

    pub fn is_italic(&self) -> bool {
        self.style & TEXT_ITALIC != 0
    }

    pub fn is_mirrored(&self) -> bool {
        self.style & TEXT_MIRRORED != 0
    }

    fn check_sizes(&mut self) {
        self.size_x = self.size_x.clamp(MIN_SIZE, MAX_SIZE);
        self.size_y = self.size_y.clamp(MIN_SIZE, MAX_SIZE);
    }

    /// 高宽比不是标准字形时需要拉伸
    fn needs_stretching(&self) -> bool {
        self.size_y / self.size_x != 1
    }

    /// 逻辑坐标下的字体度量
    fn logical_metrics(&self) -> FontMetrics {
        FontMetrics::for_size((self.size_x as f64 * 12.0 / 7.0 + 0.5).floor())
    }

    /// 逻辑坐标下的文字框：不旋转时为矩形，否则为四边形
    fn outline(&self) -> Outline {
        let m = self.logical_metrics();
        let mut th = m.height();
        let mut w = m.string_width(&self.text);
        if self.needs_stretching() {
            let f = self.size_y as f64 * 22.0 / 40.0 / self.size_x as f64;
            th = (th as f64 * f).round() as i32;
        }
        let mut o = self.orientation;
        if self.is_mirrored() {
            o = -o;
            w = -w;
        }
        let p = self.base.points[0];
        if o == 0 {
            return Outline::Box(p.x.min(p.x + w), p.y, w.abs(), th);
        }
        let (si, co) = (o as f64).to_radians().sin_cos();
        let (xa, ya) = (p.x as f64, p.y as f64);
        let (th, w) = (th as f64, w as f64);
        Outline::Quad(
            [
                xa as i32,
                (xa + th * si) as i32,
                (xa + th * si + w * co) as i32,
                (xa + w * co) as i32,
            ],
            [
                ya as i32,
                (ya + th * co) as i32,
                (ya + th * co - w * si) as i32,
                (ya - w * si) as i32,
            ],
        )
    }
}

enum Outline {
    Box(i32, i32, i32, i32),
    Quad([i32; 4], [i32; 4]),
}

impl GraphicPrimitive for AdvText {
    fn base(&self) -> &PrimitiveBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PrimitiveBase {
        &mut self.base
    }

    fn parse_tokens(&mut self, tokens: &[&str]) -> Result<()> {
        let nn = tokens.len();
        match tokens.first().copied() {
            Some("TY") => {
                if nn < 9 {
                    return Err(FidoError::bad_arguments("TY"));
                }
                self.base.points[0] = PointG::new(int_token(tokens[1])?, int_token(tokens[2])?);
                self.size_y = f64_token(tokens[3])?.round() as i32;
                self.size_x = f64_token(tokens[4])?.round() as i32;
                self.check_sizes();
                self.orientation = int_token(tokens[5])?;
                self.style = int_token(tokens[6])?;
                self.base.parse_layer(tokens[7]);
                self.base.font = decode_font(tokens[8]);
                self.text = tokens[9..].join(" ");
            }
            Some("TE") => {
                if nn < 4 {
                    return Err(FidoError::bad_arguments("TE"));
                }
                self.base.points[0] = PointG::new(int_token(tokens[1])?, int_token(tokens[2])?);
                self.size_x = 3;
                self.size_y = 4;
                self.orientation = 0;
                self.style = 0;
                self.text = tokens[3..].iter().map(|t| format!("{} ", t)).collect();
                self.base.layer = 0;
            }
            other => {
                return Err(FidoError::InvalidPrimitive(format!(
                    "TY/TE: unexpected command {}",
                    other.unwrap_or("")
                )))
            }
        }
        Ok(())
    }

    fn distance_to_point(&self, px: i32, py: i32) -> i32 {
        let inside = match self.outline() {
            Outline::Box(x, y, w, h) => point_in_rectangle(x, y, w, h, px, py),
            Outline::Quad(xs, ys) => point_in_polygon(&xs, &ys, px as f64, py as f64),
        };
        if inside {
            0
        } else {
            FAR_AWAY
        }
    }

    fn to_fcd(&self, _extensions: bool) -> String {
        let p = self.base.points[0];
        format!(
            "TY {} {} {} {} {} {} {} {} {}\n",
            p.x,
            p.y,
            self.size_y,
            self.size_x,
            self.orientation,
            self.style,
            self.base.layer,
            encode_font(&self.base.font),
            self.text
        )
    }

    fn draw(&mut self, g: &mut dyn Graphics, map: &mut MapCoordinates, ctx: &DrawContext<'_>) {
        if !self.base.select_layer(g, ctx.layers) || self.text.is_empty() {
            return;
        }
        let a = map_point(map, self.base.points[0]);
        g.set_font(
            &self.base.font,
            self.size_x as f64 * 12.0 * map.y_magnitude() / 7.0 + 0.5,
            self.is_italic(),
            self.is_bold(),
        );

        let mut mirror = false;
        let mut orientation = self.orientation;
        if self.is_mirrored() {
            mirror = !mirror;
            orientation = -orientation;
        }
        orientation -= map.orientation() * 90;
        if map.mirror() {
            mirror = !mirror;
            orientation = -orientation;
        }

        let h = g.font_ascent();
        let th = h + g.font_descent();
        let w = g.string_width(&self.text);
        let stretch = self.needs_stretching();
        let xy_factor = if stretch {
            self.size_y as f64 / self.size_x as f64 * 22.0 / 40.0
        } else {
            1.0
        };

        let (xa, ya) = (a.x as f64, a.y as f64);
        if orientation == 0 {
            let dx = if mirror { -w } else { w };
            let dy = if mirror { th } else { h };
            map.track_point(xa + dx as f64, ya);
            map.track_point(xa, ya + (dy as f64 * xy_factor).trunc());
        } else {
            let angle = if mirror { -orientation } else { orientation };
            let (si, co) = (angle as f64).to_radians().sin_cos();
            let (th, w) = (th as f64, w as f64);
            let sx = if mirror { -1.0 } else { 1.0 };
            let corners = [
                (xa, ya),
                (xa + sx * th * si, ya + th * co * xy_factor),
                (xa + sx * (w * co + th * si), ya + (th * co - w * si) * xy_factor),
                (xa + sx * w * co, ya - w * si * xy_factor),
            ];
            for (x, y) in corners {
                map.track_point(x.trunc(), y.trunc());
            }
        }

        g.draw_adv_text(&TextDraw {
            xy_factor,
            x: a.x,
            y: a.y,
            qq: (ya / xy_factor) as i32,
            ascent: h,
            width: w,
            needs_stretching: stretch,
            orientation,
            mirror,
            text: &self.text,
        });
    }

    fn export(
        &mut self,
        exp: &mut dyn ExportInterface,
        map: &mut MapCoordinates,
        _ctx: &ExportContext<'_>,
    ) -> io::Result<()> {
        let p = map_point(map, self.base.points[0]);
        let (sx, sy) = (self.size_x as f64, self.size_y as f64);
        exp.export_adv_text(&TextSpec {
            x: p.x,
            y: p.y,
            size_x: (map.map_xr(sx, sx) - map.map_xr(0.0, 0.0)).abs() as i32,
            size_y: (map.map_yr(sy, sy) - map.map_yr(0.0, 0.0)).abs() as i32,
            font: &self.base.font,
            bold: self.is_bold(),
            mirrored: self.is_mirrored(),
            italic: self.is_italic(),
            orientation: self.orientation - map.orientation() * 90,
            layer: self.base.layer,
            text: &self.text,
        })
    }

    fn intersects(&self, rect: &RectangleG, fully: bool) -> bool {
        if fully {
            let p = self.base.points[0];
            return rect.contains(p.x, p.y);
        }
        let m = self.logical_metrics();
        let (w, h) = (m.string_width(&self.text) as f64, m.height() as f64);
        let (si, co) = (self.orientation as f64).to_radians().sin_cos();
        let p = self.base.points[0];
        let xs = [
            p.x,
            p.x + (w * co) as i32,
            p.x + (w * co - h * si) as i32,
            p.x - (h * si) as i32,
        ];
        let ys = [
            p.y - h as i32,
            p.y - (w * si) as i32,
            p.y - (w * si + h * co) as i32,
            p.y - (h * co) as i32,
        ];
        let (min_x, max_x) = (xs.iter().min(), xs.iter().max());
        let (min_y, max_y) = (ys.iter().min(), ys.iter().max());
        let (Some(&x0), Some(&x1), Some(&y0), Some(&y1)) = (min_x, max_x, min_y, max_y) else {
            return false;
        };
        rect.intersects(&RectangleG::new(x0, y0, x1 - x0, y1 - y0))
    }

    fn rotate(&mut self, ccw: bool, ix: i32, iy: i32) {
        rotate_points(&mut self.base.points, ccw, ix, iy);
        let ccw = if self.is_mirrored() { !ccw } else { ccw };
        let po = self.orientation / 90;
        let po = if ccw { (po + 1) % 4 } else { (po + 3) % 4 };
        self.orientation = 90 * po;
    }

    fn mirror(&mut self, x_pos: i32) {
        for p in self.base.points.iter_mut() {
            p.x = mirror_coord(p.x, x_pos);
        }
        self.style ^= TEXT_MIRRORED;
    }

    fn invalidate(&mut self) {
        // 字体度量依赖绘图表面，每次绘制都重新计算
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DrawingConfig, DEFAULT_TEXT_FONT};
    use crate::graphics::NullGraphics;
    use crate::layer::standard_layers;
    use crate::primitives::test_support::{export_ctx, tokens, Call, RecordingExporter};

    fn parse(line: &str) -> AdvText {
        let mut t = AdvText::new(DEFAULT_TEXT_FONT);
        t.parse_tokens(&tokens(line)).expect("Failed to parse text");
        t
    }

    #[test]
    fn test_parse_ty() {
        let t = parse("TY 10 20 4 3 0 1 2 Arial++Black Hello world");
        assert_eq!((t.size_y, t.size_x), (4, 3));
        assert!(t.is_bold() && !t.is_italic());
        assert_eq!(t.font(), "Arial Black");
        assert_eq!(t.text, "Hello world");
        assert_eq!(t.layer(), 2);
        assert_eq!(t.to_fcd(true), "TY 10 20 4 3 0 1 2 Arial++Black Hello world\n");
    }

    #[test]
    fn test_parse_te_and_limits() {
        let t = parse("TE 5 5 old text");
        assert_eq!(t.text, "old text ");
        assert_eq!(t.layer(), 0);
        let t = parse("TY 0 0 5000 0 0 0 0 * x");
        assert_eq!((t.size_y, t.size_x), (MAX_SIZE, MIN_SIZE));
        let mut t = AdvText::new(DEFAULT_TEXT_FONT);
        assert!(t.parse_tokens(&tokens("TY 0 0 4 3 0 0 0")).is_err());
        assert!(t.parse_tokens(&tokens("TE 0 0")).is_err());
    }

    #[test]
    fn test_distance_horizontal_and_rotated() {
        let t = parse("TY 10 20 4 3 0 0 0 * Hello");
        assert_eq!(t.distance_to_point(12, 22), 0);
        assert_eq!(t.distance_to_point(50, 50), FAR_AWAY);

        let r = parse("TY 10 20 4 3 90 0 0 * Hello");
        assert_eq!(r.distance_to_point(12, 10), 0);
        assert_eq!(r.distance_to_point(20, 22), FAR_AWAY);
    }

    #[test]
    fn test_rotate_and_mirror() {
        let mut t = parse("TY 10 0 4 3 0 0 0 * A");
        t.rotate(true, 0, 0);
        assert_eq!(t.orientation, 90);
        assert_eq!(t.first_point(), PointG::new(0, -10));
        t.mirror(0);
        assert!(t.is_mirrored());
        t.rotate(true, 0, 0);
        assert_eq!(t.orientation, 0);
    }

    #[test]
    fn test_draw_tracks_text_box() {
        let layers = standard_layers();
        let config = DrawingConfig::default();
        let ctx = DrawContext {
            layers: &layers,
            config: &config,
            only_layer: None,
            only_pads: false,
        };
        let mut t = parse("TY 10 20 4 3 0 0 0 * Hello");
        let mut map = MapCoordinates::new();
        t.draw(&mut NullGraphics::new(), &mut map, &ctx);
        assert_eq!((map.x_min(), map.y_min()), (10, 20));
        assert_eq!((map.x_max(), map.y_max()), (27, 25));
    }

    #[test]
    fn test_export() {
        let layers = standard_layers();
        let config = DrawingConfig::default();
        let mut t = parse("TY 10 20 4 3 0 0 6 * Hi");
        let mut exp = RecordingExporter::default();
        t.export(&mut exp, &mut MapCoordinates::new(), &export_ctx(&layers, &config))
            .expect("Failed to export");
        assert_eq!(
            exp.calls,
            vec![Call::Text {
                x: 10,
                y: 20,
                text: "Hi".to_string(),
                layer: 6
            }]
        );
    }
}
