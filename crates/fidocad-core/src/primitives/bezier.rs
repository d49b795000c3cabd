//! 三次贝塞尔曲线 `BE`

use std::io;

use super::{
    map_point, stroke_width, Arrow, DrawContext, ExportContext, GraphicPrimitive, PrimitiveBase,
};
use crate::config::check_dash_style;
use crate::error::{int_token, FidoError, Result};
use crate::export::{ExportInterface, StrokeStyle};
use crate::geometry::point_to_bezier;
use crate::graphics::Graphics;
use crate::map_coordinates::MapCoordinates;
use crate::math::{PointG, RectangleG};

/// 由四个控制点定义的贝塞尔曲线
#[derive(Debug, Clone)]
pub struct Bezier {
    base: PrimitiveBase,
    pub arrow: Arrow,
    pub dash_style: usize,
}

impl Bezier {
    pub fn new(font: &str, font_size: i32) -> Self {
        Self {
            base: PrimitiveBase::new(4, true, font, font_size),
            arrow: Arrow::default(),
            dash_style: 0,
        }
    }

    fn control(&self) -> [PointG; 4] {
        let p = &self.base.points;
        [p[0], p[1], p[2], p[3]]
    }

    /// 箭头方向：取第一个与尖端不重合的控制点
    fn arrow_direction(c: &[PointG; 4], tip: usize, order: [usize; 3]) -> PointG {
        order
            .iter()
            .map(|&i| c[i])
            .find(|p| *p != c[tip])
            .unwrap_or(c[order[2]])
    }
}

impl GraphicPrimitive for Bezier {
    fn base(&self) -> &PrimitiveBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PrimitiveBase {
        &mut self.base
    }

    fn parse_tokens(&mut self, tokens: &[&str]) -> Result<()> {
        if tokens.first() != Some(&"BE") {
            return Err(FidoError::InvalidPrimitive(format!(
                "BE: unexpected command {}",
                tokens.first().unwrap_or(&"")
            )));
        }
        let nn = tokens.len();
        if nn < 9 {
            return Err(FidoError::bad_arguments("BE"));
        }
        for i in 0..4 {
            self.base.points[i] = PointG::new(
                int_token(tokens[1 + 2 * i])?,
                int_token(tokens[2 + 2 * i])?,
            );
        }
        let first = self.base.points[0];
        self.base.place_text_points(first.x, first.y);
        if nn > 9 {
            self.base.parse_layer(tokens[9]);
        }
        if nn > 10 && tokens[10] == "FCJ" {
            let i = self.arrow.parse_tokens(tokens, 11)?;
            if let Some(t) = tokens.get(i) {
                self.dash_style = check_dash_style(int_token(t)? as i64);
            }
        }
        Ok(())
    }

    fn distance_to_point(&self, px: i32, py: i32) -> i32 {
        if self.base.check_text(px, py) {
            return 0;
        }
        let c = self.control();
        let (mut p0, mut p3) = (c[0], c[3]);
        if self.arrow.is_present() {
            let mut hit = false;
            if self.arrow.at_start {
                let (inside, base) = self.arrow.contains(px, py, c[0], c[1]);
                hit |= inside;
                if self.arrow.length > 0.0 {
                    p0 = base;
                }
            }
            if self.arrow.at_end {
                let (inside, base) = self.arrow.contains(px, py, c[3], c[2]);
                hit |= inside;
                if self.arrow.length > 0.0 {
                    p3 = base;
                }
            }
            if hit {
                return 1;
            }
        }
        point_to_bezier(
            &[(p0.x, p0.y), (c[1].x, c[1].y), (c[2].x, c[2].y), (p3.x, p3.y)],
            px,
            py,
        )
    }

    fn to_fcd(&self, extensions: bool) -> String {
        let c = self.control();
        let mut s = format!(
            "BE {} {} {} {} {} {} {} {} {}\n",
            c[0].x, c[0].y, c[1].x, c[1].y, c[2].x, c[2].y, c[3].x, c[3].y, self.base.layer
        );
        let has_text = self.base.has_name() || self.base.has_value();
        if extensions && (self.arrow.is_present() || self.dash_style > 0 || has_text) {
            s.push_str(&format!(
                "FCJ {} {} {}\n",
                self.arrow.to_tokens(),
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
        let c = self.control();
        let mapped = c.map(|p| map_point(map, p));
        let (mut p0, mut p3) = (mapped[0], mapped[3]);
        self.base.draw_text(g, map, ctx.config, None);
        g.apply_stroke(stroke_width(ctx.config.line_width, map), self.dash_style);

        let mut h = 0;
        if self.arrow.is_present() {
            let sizes = self.arrow.pixel_sizes(map);
            h = sizes.1;
            if self.arrow.at_start {
                let toward = map_point(map, Self::arrow_direction(&c, 0, [1, 2, 3]));
                let base = self.arrow.draw(g, map, mapped[0], toward, sizes);
                if self.arrow.length > 0.0 {
                    p0 = base;
                }
            }
            if self.arrow.at_end {
                let toward = map_point(map, Self::arrow_direction(&c, 3, [2, 1, 0]));
                let base = self.arrow.draw(g, map, mapped[3], toward, sizes);
                if self.arrow.length > 0.0 {
                    p3 = base;
                }
            }
        }

        let curve = [p0, mapped[1], mapped[2], p3];
        let xmin = curve.iter().map(|p| p.x).min().unwrap_or(0) - h;
        let xmax = curve.iter().map(|p| p.x).max().unwrap_or(0) + h;
        let ymin = curve.iter().map(|p| p.y).min().unwrap_or(0) - h;
        let ymax = curve.iter().map(|p| p.y).max().unwrap_or(0) + h;
        let (width, height) = (xmax - xmin, ymax - ymin);
        if !g.hit_clip(xmin, ymin, width + 1, height + 1) {
            return;
        }
        if width == 0 || height == 0 {
            g.draw_line(mapped[0].x, mapped[0].y, mapped[3].x, mapped[3].y);
        } else {
            g.draw_bezier(&curve.map(PointG::to_point2));
        }
    }

    fn export(
        &mut self,
        exp: &mut dyn ExportInterface,
        map: &mut MapCoordinates,
        ctx: &ExportContext<'_>,
    ) -> io::Result<()> {
        self.base.export_text(exp, map, None)?;
        let xm = map.x_magnitude();
        let mapped = self.control().map(|p| map_point(map, p));
        exp.export_bezier(
            &mapped,
            self.base.layer,
            &self.arrow.spec(xm),
            &StrokeStyle {
                dash_style: self.dash_style,
                width: ctx.config.line_width * xm,
            },
        )
    }

    fn intersects(&self, rect: &RectangleG, fully: bool) -> bool {
        let c = self.control();
        if fully {
            return c.iter().all(|p| rect.contains(p.x, p.y));
        }
        (0..3).any(|i| rect.intersects_line(c[i], c[i + 1]))
    }

    fn invalidate(&mut self) {
        // 每次绘制都重新映射，无缓存
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DrawingConfig, DEFAULT_TEXT_FONT};
    use crate::layer::standard_layers;
    use crate::primitives::test_support::{export_ctx, tokens, Call, RecordingExporter};

    fn parse(line: &str) -> Bezier {
        let mut b = Bezier::new(DEFAULT_TEXT_FONT, 4);
        b.parse_tokens(&tokens(line)).expect("Failed to parse bezier");
        b
    }

    #[test]
    fn test_parse_and_serialize() {
        let b = parse("BE 0 0 10 20 30 20 40 0 2 FCJ 2 0 3 1 1 0");
        assert!(b.arrow.at_end && !b.arrow.at_start);
        assert_eq!(b.dash_style, 1);
        assert_eq!(b.layer(), 2);
        assert_eq!(b.base().points[4], PointG::new(5, 5));
        assert_eq!(
            b.to_fcd(true),
            "BE 0 0 10 20 30 20 40 0 2\nFCJ 2 0 3 1 1 0\n"
        );
    }

    #[test]
    fn test_bad_arguments() {
        let mut b = Bezier::new(DEFAULT_TEXT_FONT, 4);
        let err = b.parse_tokens(&tokens("BE 0 0 10 20 30 20 40")).unwrap_err();
        assert_eq!(err.to_string(), "Bad arguments on BE");
    }

    #[test]
    fn test_distance() {
        // 控制点共线时退化为直线
        let b = parse("BE 0 0 10 0 20 0 30 0 0");
        assert_eq!(b.distance_to_point(15, 0), 0);
        assert_eq!(b.distance_to_point(15, 7), 7);
    }

    #[test]
    fn test_arrow_direction_skips_coincident_points() {
        let c = [
            PointG::new(0, 0),
            PointG::new(0, 0),
            PointG::new(10, 0),
            PointG::new(20, 0),
        ];
        assert_eq!(Bezier::arrow_direction(&c, 0, [1, 2, 3]), PointG::new(10, 0));
        assert_eq!(Bezier::arrow_direction(&c, 3, [2, 1, 0]), PointG::new(10, 0));
    }

    #[test]
    fn test_export() {
        let layers = standard_layers();
        let config = DrawingConfig::default();
        let mut b = parse("BE 0 0 10 20 30 20 40 0 1");
        let mut exp = RecordingExporter::default();
        b.export(&mut exp, &mut MapCoordinates::new(), &export_ctx(&layers, &config))
            .expect("Failed to export");
        assert_eq!(
            exp.calls,
            vec![Call::Bezier {
                points: [
                    PointG::new(0, 0),
                    PointG::new(10, 20),
                    PointG::new(30, 20),
                    PointG::new(40, 0)
                ],
                layer: 1,
            }]
        );
    }
}
