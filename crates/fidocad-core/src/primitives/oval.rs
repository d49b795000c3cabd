//! 椭圆 `EV`（空心）与 `EP`（实心）

use std::io;

use super::{
    map_point, refresh_cache, stroke_width, DrawCache, DrawContext, ExportContext,
    GraphicPrimitive, PrimitiveBase,
};
use crate::config::check_dash_style;
use crate::error::{int_token, FidoError, Result};
use crate::export::{ExportInterface, StrokeStyle};
use crate::geometry::{point_in_ellipse, point_to_ellipse};
use crate::graphics::Graphics;
use crate::map_coordinates::MapCoordinates;
use crate::math::{PointG, RectangleG};

/// 框选判定时沿椭圆周长的采样数
const PERIMETER_SAMPLES: usize = 64;

#[derive(Debug, Clone, Copy)]
struct OvalCache {
    a: PointG,
    b: PointG,
    width: f32,
}

/// 由外接矩形两个对角点定义的椭圆
#[derive(Debug, Clone)]
pub struct Oval {
    base: PrimitiveBase,
    pub filled: bool,
    pub dash_style: usize,
    cache: Option<DrawCache<OvalCache>>,
}

impl Oval {
    pub fn new(font: &str, font_size: i32) -> Self {
        Self {
            base: PrimitiveBase::new(2, true, font, font_size),
            filled: false,
            dash_style: 0,
            cache: None,
        }
    }

    pub fn bounds(&self) -> RectangleG {
        RectangleG::from_corners(self.base.points[0], self.base.points[1])
    }
}

impl GraphicPrimitive for Oval {
    fn base(&self) -> &PrimitiveBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PrimitiveBase {
        &mut self.base
    }

    fn parse_tokens(&mut self, tokens: &[&str]) -> Result<()> {
        self.cache = None;
        let cmd = tokens.first().copied().unwrap_or("");
        if cmd != "EV" && cmd != "EP" {
            return Err(FidoError::InvalidPrimitive(format!(
                "EV/EP: unexpected command {}",
                cmd
            )));
        }
        let nn = tokens.len();
        if nn < 5 {
            return Err(FidoError::bad_arguments("EV/EP"));
        }
        let x1 = int_token(tokens[1])?;
        let y1 = int_token(tokens[2])?;
        self.base.points[0] = PointG::new(x1, y1);
        self.base.points[1] = PointG::new(int_token(tokens[3])?, int_token(tokens[4])?);
        self.base.place_text_points(x1, y1);
        if nn > 5 {
            self.base.parse_layer(tokens[5]);
        }
        self.filled = cmd == "EP";
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
            let inside = point_in_ellipse(
                r.x as f64,
                r.y as f64,
                r.width as f64,
                r.height as f64,
                px as f64,
                py as f64,
            );
            return if inside { 0 } else { 1000 };
        }
        point_to_ellipse(r.x, r.y, r.width, r.height, px, py)
    }

    fn to_fcd(&self, extensions: bool) -> String {
        let (p1, p2) = (self.base.points[0], self.base.points[1]);
        let cmd = if self.filled { "EP" } else { "EV" };
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
            OvalCache {
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
            g.fill_oval(c.a.x, c.a.y, w, h);
        } else if w != 0 && h != 0 {
            g.draw_oval(c.a.x, c.a.y, w, h);
        } else {
            g.draw_line(c.a.x, c.a.y, c.b.x, c.b.y);
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
        exp.export_oval(
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
        let b = self.bounds();
        if !rect.intersects(&b) {
            return false;
        }
        let (cx, cy) = (b.x as f64 + b.width as f64 / 2.0, b.y as f64 + b.height as f64 / 2.0);
        let (ra, rb) = (b.width as f64 / 2.0, b.height as f64 / 2.0);
        (0..PERIMETER_SAMPLES).any(|i| {
            let t = i as f64 * std::f64::consts::TAU / PERIMETER_SAMPLES as f64;
            let x = (cx + ra * t.cos()).round() as i32;
            let y = (cy + rb * t.sin()).round() as i32;
            rect.contains(x, y)
        })
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

    fn parse(line: &str) -> Oval {
        let mut o = Oval::new(DEFAULT_TEXT_FONT, 4);
        o.parse_tokens(&tokens(line)).expect("Failed to parse oval");
        o
    }

    #[test]
    fn test_parse_and_serialize() {
        let o = parse("EV 0 0 40 20 1");
        assert!(!o.filled);
        assert_eq!(o.to_fcd(true), "EV 0 0 40 20 1\n");
        let o = parse("EP 0 0 40 20 1 FCJ 1 0");
        assert!(o.filled);
        assert_eq!(o.to_fcd(true), "EP 0 0 40 20 1\nFCJ 1 0\n");
    }

    #[test]
    fn test_distance() {
        let o = parse("EV 0 0 40 40 0");
        assert_eq!(o.distance_to_point(40, 20), 0);
        assert!(o.distance_to_point(20, 20) > 5);

        let f = parse("EP 0 0 40 40 0");
        assert_eq!(f.distance_to_point(20, 20), 0);
        assert_eq!(f.distance_to_point(80, 80), 1000);
    }

    #[test]
    fn test_export() {
        let layers = standard_layers();
        let config = DrawingConfig::default();
        let mut o = parse("EV 10 10 30 20 2");
        let mut exp = RecordingExporter::default();
        o.export(&mut exp, &mut MapCoordinates::new(), &export_ctx(&layers, &config))
            .expect("Failed to export");
        assert_eq!(
            exp.calls,
            vec![Call::Oval {
                p1: PointG::new(10, 10),
                p2: PointG::new(30, 20),
                filled: false,
                layer: 2,
            }]
        );
    }

    #[test]
    fn test_intersects_perimeter() {
        let o = parse("EV 0 0 100 100 0");
        assert!(o.intersects(&RectangleG::new(95, 45, 10, 10), false));
        assert!(!o.intersects(&RectangleG::new(45, 45, 10, 10), false));
        assert!(!o.intersects(&RectangleG::new(0, 0, 5, 5), false));
    }
}
