//! PCB 焊盘 `PA`

use std::io;

use super::{
    refresh_cache, rotate_points, DrawCache, DrawContext, ExportContext, GraphicPrimitive,
    PrimitiveBase,
};
use crate::error::{int_token, FidoError, Result};
use crate::export::{ExportInterface, PadSpec};
use crate::geometry::point_to_point;
use crate::graphics::Graphics;
use crate::layer::Color;
use crate::map_coordinates::MapCoordinates;
use crate::math::PointG;

/// 圆角方形焊盘的圆角直径（逻辑单位）
const CORNER_DIAMETER: i32 = 5;

/// 焊盘形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadStyle {
    #[default]
    Oval,
    Square,
    RoundedSquare,
}

impl PadStyle {
    /// 未知编码按椭圆处理
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => PadStyle::Square,
            2 => PadStyle::RoundedSquare,
            _ => PadStyle::Oval,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PadCache {
    center: PointG,
    size: (i32, i32),
    corner: (i32, i32),
    hole: (i32, i32),
}

#[derive(Debug, Clone)]
pub struct PcbPad {
    base: PrimitiveBase,
    pub size_x: i32,
    pub size_y: i32,
    /// 钻孔直径
    pub hole: i32,
    /// 文件中的形状编码，原样写回
    pub style: i32,
    cache: Option<DrawCache<PadCache>>,
}

impl PcbPad {
    pub fn new(font: &str, font_size: i32) -> Self {
        Self {
            base: PrimitiveBase::new(1, true, font, font_size),
            size_x: 0,
            size_y: 0,
            hole: 0,
            style: 0,
            cache: None,
        }
    }

    pub fn shape(&self) -> PadStyle {
        PadStyle::from_code(self.style)
    }

    fn spec(&self, map: &mut MapCoordinates, only_hole: bool) -> PadSpec {
        let p = self.base.points[0];
        let (x, y) = (p.x as f64, p.y as f64);
        let (sx, sy) = (x + self.size_x as f64, y + self.size_y as f64);
        let cx = map.map_x(x, y);
        let cy = map.map_y(x, y);
        PadSpec {
            x: cx,
            y: cy,
            style: self.style,
            size_x: (map.map_x(sx, sy) - cx).abs(),
            size_y: (map.map_y(sx, sy) - cy).abs(),
            hole: (self.hole as f64 * map.x_magnitude()) as i32,
            layer: self.base.layer,
            only_hole,
        }
    }
}

impl GraphicPrimitive for PcbPad {
    fn base(&self) -> &PrimitiveBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PrimitiveBase {
        &mut self.base
    }

    fn parse_tokens(&mut self, tokens: &[&str]) -> Result<()> {
        self.cache = None;
        if tokens.first() != Some(&"PA") {
            return Err(FidoError::InvalidPrimitive(format!(
                "PA: unexpected command {}",
                tokens.first().unwrap_or(&"")
            )));
        }
        if tokens.len() < 7 {
            return Err(FidoError::bad_arguments("PA"));
        }
        let x = int_token(tokens[1])?;
        let y = int_token(tokens[2])?;
        self.base.points[0] = PointG::new(x, y);
        self.base.place_text_points(x, y);
        self.size_x = int_token(tokens[3])?;
        self.size_y = int_token(tokens[4])?;
        self.hole = int_token(tokens[5])?;
        self.style = int_token(tokens[6])?;
        if let Some(l) = tokens.get(7) {
            self.base.parse_layer(l);
        }
        Ok(())
    }

    fn distance_to_point(&self, px: i32, py: i32) -> i32 {
        if self.base.check_text(px, py) {
            return 0;
        }
        let c = self.base.points[0];
        (point_to_point(c.x, c.y, px, py) - self.size_x.min(self.size_y) / 2).max(0)
    }

    fn to_fcd(&self, extensions: bool) -> String {
        let c = self.base.points[0];
        let mut s = format!(
            "PA {} {} {} {} {} {} {}\n",
            c.x, c.y, self.size_x, self.size_y, self.hole, self.style, self.base.layer
        );
        s.push_str(&self.base.save_text(extensions));
        s
    }

    fn draw(&mut self, g: &mut dyn Graphics, map: &mut MapCoordinates, ctx: &DrawContext<'_>) {
        if !self.base.select_layer(g, ctx.layers) {
            return;
        }
        self.base.draw_text(g, map, ctx.config, None);

        let p = self.base.points[0];
        let (size_x, size_y, hole) = (self.size_x, self.size_y, self.hole);
        let c = *refresh_cache(&mut self.cache, map.view_key(), || {
            let (x, y) = (p.x as f64, p.y as f64);
            let cx = map.map_xi(x, y, false);
            let cy = map.map_yi(x, y, false);
            let mut extent = |d: (i32, i32)| {
                let (ex, ey) = (x + d.0 as f64, y + d.1 as f64);
                (
                    (cx - map.map_xi(ex, ey, false)).abs(),
                    (cy - map.map_yi(ex, ey, false)).abs(),
                )
            };
            PadCache {
                center: PointG::new(cx, cy),
                size: extent((size_x, size_y)),
                corner: extent((CORNER_DIAMETER, CORNER_DIAMETER)),
                hole: extent((hole, hole)),
            }
        });

        let (w, h) = c.size;
        let (x0, y0) = (c.center.x - w / 2, c.center.y - h / 2);
        map.track_point(x0 as f64, y0 as f64);
        map.track_point((c.center.x + w / 2) as f64, (c.center.y + h / 2) as f64);
        if !g.hit_clip(x0, y0, w, h) {
            return;
        }
        g.apply_stroke(1.0, 0);
        if ctx.only_pads {
            g.set_color(Color::WHITE);
            let (hw, hh) = c.hole;
            g.fill_oval(c.center.x - hw / 2, c.center.y - hh / 2, hw, hh);
            return;
        }
        match self.shape() {
            PadStyle::Square => g.fill_rect(x0, y0, w, h),
            PadStyle::RoundedSquare => g.fill_round_rect(x0, y0, w, h, c.corner.0, c.corner.1),
            PadStyle::Oval => g.fill_oval(x0, y0, w, h),
        }
    }

    fn export(
        &mut self,
        exp: &mut dyn ExportInterface,
        map: &mut MapCoordinates,
        ctx: &ExportContext<'_>,
    ) -> io::Result<()> {
        self.base.export_text(exp, map, None)?;
        let spec = self.spec(map, ctx.only_pads);
        exp.export_pcb_pad(&spec)
    }

    fn needs_holes(&self) -> bool {
        true
    }

    fn rotate(&mut self, ccw: bool, ix: i32, iy: i32) {
        rotate_points(&mut self.base.points, ccw, ix, iy);
        std::mem::swap(&mut self.size_x, &mut self.size_y);
        self.cache = None;
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

    fn parse(line: &str) -> PcbPad {
        let mut p = PcbPad::new(DEFAULT_TEXT_FONT, 4);
        p.parse_tokens(&tokens(line)).expect("Failed to parse PA");
        p
    }

    #[test]
    fn test_parse_and_serialize() {
        let p = parse("PA 100 50 16 8 4 2 5");
        assert_eq!((p.size_x, p.size_y, p.hole), (16, 8, 4));
        assert_eq!(p.shape(), PadStyle::RoundedSquare);
        assert_eq!(p.layer(), 5);
        assert_eq!(p.to_fcd(false), "PA 100 50 16 8 4 2 5\n");
        assert_eq!(parse("PA 0 0 1 1 1 9").shape(), PadStyle::Oval);
    }

    #[test]
    fn test_bad_arguments() {
        let mut p = PcbPad::new(DEFAULT_TEXT_FONT, 4);
        assert!(matches!(
            p.parse_tokens(&tokens("PA 0 0 10 10 2")),
            Err(FidoError::BadArguments { .. })
        ));
    }

    #[test]
    fn test_distance() {
        let p = parse("PA 0 0 10 20 2 0");
        assert_eq!(p.distance_to_point(3, 0), 0);
        assert_eq!(p.distance_to_point(20, 0), 15);
    }

    #[test]
    fn test_rotation_swaps_size() {
        let mut p = parse("PA 10 0 10 20 2 1");
        p.rotate(false, 0, 0);
        assert_eq!(p.base().points[0], PointG::new(0, 10));
        assert_eq!((p.size_x, p.size_y), (20, 10));
    }

    #[test]
    fn test_export_pad_and_hole() {
        let layers = standard_layers();
        let config = DrawingConfig::default();
        let mut p = parse("PA 10 10 6 4 2 1 3");
        let mut ctx = export_ctx(&layers, &config);
        let mut exp = RecordingExporter::default();
        p.export(&mut exp, &mut MapCoordinates::new(), &ctx)
            .expect("Failed to export");
        ctx.only_pads = true;
        p.export(&mut exp, &mut MapCoordinates::new(), &ctx)
            .expect("Failed to export");

        let expected = PadSpec {
            x: 10,
            y: 10,
            style: 1,
            size_x: 6,
            size_y: 4,
            hole: 2,
            layer: 3,
            only_hole: false,
        };
        assert_eq!(
            exp.calls,
            vec![
                Call::Pad(expected),
                Call::Pad(PadSpec {
                    only_hole: true,
                    ..expected
                }),
            ]
        );
        assert!(p.needs_holes());
    }
}
