//! 矩形 `RV`（空心）与 `RP`（实心）

use std::io;

use super::{
    map_point, refresh_cache, stroke_width, DrawCache, DrawContext, ExportContext,
    GraphicPrimitive, PrimitiveBase,
};
use crate::config::check_dash_style;
use crate::error::{int_token, FidoError, Result};
use crate::export::{ExportInterface, StrokeStyle};
use crate::geometry::{point_in_rectangle, point_to_rectangle};
use crate::graphics::Graphics;
use crate::map_coordinates::MapCoordinates;
use crate::math::{PointG, RectangleG};

/// 实心图形内部的距离
const DISTANCE_IN: i32 = 1;
/// 实心图形外部的距离
const DISTANCE_OUT: i32 = 1000;

#[derive(Debug, Clone, Copy)]
struct RectCache {
    a: PointG,
    b: PointG,
    width: f32,
}

#[derive(Debug, Clone)]
pub struct Rectangle {
    base: PrimitiveBase,
    pub filled: bool,
    pub dash_style: usize,
    cache: Option<DrawCache<RectCache>>,
}

impl Rectangle {
    pub fn new(font: &str, font_size: i32) -> Self {
        Self {
            base: PrimitiveBase::new(2, true, font, font_size),
            filled: false,
            dash_style: 0,
            cache: None,
        }
    }

    /// 规整后的外包矩形（逻辑坐标）
    pub fn bounds(&self) -> RectangleG {
        RectangleG::from_corners(self.base.points[0], self.base.points[1])
    }
}

impl GraphicPrimitive for Rectangle {
    fn base(&self) -> &PrimitiveBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PrimitiveBase {
        &mut self.base
    }

    fn parse_tokens(&mut self, tokens: &[&str]) -> Result<()> {
        self.cache = None;
        let cmd = tokens.first().copied().unwrap_or("");
        if cmd != "RV" && cmd != "RP" {
            return Err(FidoError::InvalidPrimitive(format!(
                "RV/RP: unexpected command {}",
                cmd
            )));
        }
        let nn = tokens.len();
        if nn < 5 {
            return Err(FidoError::bad_arguments("RV/RP"));
        }
        let x1 = int_token(tokens[1])?;
        let y1 = int_token(tokens[2])?;
        self.base.points[0] = PointG::new(x1, y1);
        self.base.points[1] = PointG::new(int_token(tokens[3])?, int_token(tokens[4])?);
        self.base.place_text_points(x1, y1);
        if nn > 5 {
            self.base.parse_layer(tokens[5]);
        }
        self.filled = cmd == "RP";
        if nn > 7 && tokens[6] == "FCJ" {
            self.dash_style = check_dash_style(int_token(tokens[7])? as i64);
        }
        Ok(())
    }

    fn distance_to_point(&self, px: i32, py: i32) -> i32 {
        if self.base.check_text(px, py) {
            return 0;
        }
        let r = self.bounds();
        if self.filled {
            return if point_in_rectangle(r.x, r.y, r.width, r.height, px, py) {
                DISTANCE_IN
            } else {
                DISTANCE_OUT
            };
        }
        point_to_rectangle(r.x, r.y, r.width, r.height, px, py)
    }

    fn to_fcd(&self, extensions: bool) -> String {
        let (p1, p2) = (self.base.points[0], self.base.points[1]);
        let cmd = if self.filled { "RP" } else { "RV" };
        let mut s = format!(
            "{} {} {} {} {} {}\n",
            cmd, p1.x, p1.y, p2.x, p2.y, self.base.layer
        );
        let has_text = self.base.has_name() || self.base.has_value();
        if extensions && (self.dash_style > 0 || has_text) {
            s.push_str(&format!(
                "FCJ {} {}\n",
                self.dash_style,
                if has_text { 1 } else { 0 }
            ));
        }
        s.push_str(&self.base.save_text(false));
        s
    }

    fn draw(&mut self, g: &mut dyn Graphics, map: &mut MapCoordinates, ctx: &DrawContext<'_>) {
        if !self.base.select_layer(g, ctx.layers) {
            return;
        }
        self.base.draw_text(g, map, ctx.config, None);

        let (q1, q2) = (self.base.points[0], self.base.points[1]);
        let c = *refresh_cache(&mut self.cache, map.view_key(), || {
            let p1 = map_point(map, q1);
            let p2 = map_point(map, q2);
            RectCache {
                a: PointG::new(p1.x.min(p2.x), p1.y.min(p2.y)),
                b: PointG::new(p1.x.max(p2.x), p1.y.max(p2.y)),
                width: stroke_width(ctx.config.line_width, map),
            }
        });
        map.track_point(c.a.x as f64, c.a.y as f64);
        map.track_point(c.b.x as f64, c.b.y as f64);

        let (w, h) = (c.b.x - c.a.x, c.b.y - c.a.y);
        if !g.hit_clip(c.a.x, c.a.y, w + 1, h + 1) {
            return;
        }
        g.apply_stroke(c.width, self.dash_style);
        if self.filled {
            g.fill_rect(c.a.x, c.a.y, w + 1, h + 1);
        } else if w != 0 || h != 0 {
            let (a, b) = (c.a, c.b);
            g.draw_line(a.x, a.y, b.x, a.y);
            g.draw_line(b.x, a.y, b.x, b.y);
            g.draw_line(b.x, b.y, a.x, b.y);
            g.draw_line(a.x, b.y, a.x, a.y);
        }
    }

    fn export(
        &mut self,
        exp: &mut dyn ExportInterface,
        map: &mut MapCoordinates,
        ctx: &ExportContext<'_>,
    ) -> io::Result<()> {
        self.base.export_text(exp, map, None)?;
        let p1 = map_point(map, self.base.points[0]);
        let p2 = map_point(map, self.base.points[1]);
        exp.export_rectangle(
            p1,
            p2,
            self.filled,
            self.base.layer,
            &StrokeStyle {
                dash_style: self.dash_style,
                width: ctx.config.line_width * map.x_magnitude(),
            },
        )
    }

    fn intersects(&self, rect: &RectangleG, fully: bool) -> bool {
        if fully {
            return self.base.points.iter().all(|p| rect.contains(p.x, p.y));
        }
        let r = self.bounds();
        let corners = [
            PointG::new(r.x, r.y),
            PointG::new(r.x + r.width, r.y),
            PointG::new(r.x + r.width, r.y + r.height),
            PointG::new(r.x, r.y + r.height),
        ];
        (0..4).any(|i| rect.intersects_line(corners[i], corners[(i + 1) % 4]))
    }

    fn invalidate(&mut self) {
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DrawingConfig, DEFAULT_TEXT_FONT};
    use crate::layer::standard_layers;
    use crate::primitives::test_support::{export_ctx, tokens, Call, RecordingExporter};

    fn parse(line: &str) -> Rectangle {
        let mut r = Rectangle::new(DEFAULT_TEXT_FONT, 4);
        r.parse_tokens(&tokens(line)).expect("Failed to parse rectangle");
        r
    }

    #[test]
    fn test_parse_filled_and_dashed() {
        let r = parse("RP 10 10 0 30 2 FCJ 3 0");
        assert!(r.filled);
        assert_eq!(r.dash_style, 3);
        assert_eq!(r.layer(), 2);
        assert_eq!(r.bounds(), RectangleG::new(0, 10, 10, 20));
        assert_eq!(r.to_fcd(true), "RP 10 10 0 30 2\nFCJ 3 0\n");
        assert_eq!(r.to_fcd(false), "RP 10 10 0 30 2\n");
    }

    #[test]
    fn test_dash_style_clamped() {
        let r = parse("RV 0 0 10 10 0 FCJ 17 0");
        assert_eq!(r.dash_style, 4);
    }

    #[test]
    fn test_bad_arguments() {
        let mut r = Rectangle::new(DEFAULT_TEXT_FONT, 4);
        assert!(r.parse_tokens(&tokens("RV 0 0 10")).is_err());
        assert!(r.parse_tokens(&tokens("EV 0 0 10 10")).is_err());
    }

    #[test]
    fn test_distance() {
        let hollow = parse("RV 0 0 100 50 0");
        assert_eq!(hollow.distance_to_point(50, 25), 25);
        assert_eq!(hollow.distance_to_point(100, 10), 0);

        let filled = parse("RP 0 0 100 50 0");
        assert_eq!(filled.distance_to_point(50, 25), DISTANCE_IN);
        assert_eq!(filled.distance_to_point(200, 25), DISTANCE_OUT);
    }

    #[test]
    fn test_export() {
        let layers = standard_layers();
        let config = DrawingConfig::default();
        let mut r = parse("RP 0 0 20 10 3");
        let mut exp = RecordingExporter::default();
        r.export(&mut exp, &mut MapCoordinates::new(), &export_ctx(&layers, &config))
            .expect("Failed to export");
        assert_eq!(
            exp.calls,
            vec![Call::Rectangle {
                p1: PointG::new(0, 0),
                p2: PointG::new(20, 10),
                filled: true,
                layer: 3,
            }]
        );
    }

    #[test]
    fn test_intersects_edges_only() {
        let r = parse("RV 0 0 100 100 0");
        assert!(r.intersects(&RectangleG::new(90, 40, 20, 20), false));
        // 完全在内部、不接触边
        assert!(!r.intersects(&RectangleG::new(40, 40, 10, 10), false));
    }
}
