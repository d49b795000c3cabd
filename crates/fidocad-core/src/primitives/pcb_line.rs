//! PCB 走线 `PL`

use std::io;

use super::{
    map_point, refresh_cache, DrawCache, DrawContext, ExportContext, GraphicPrimitive, PrimitiveBase,
};
use crate::error::{f64_token, int_token, FidoError, Result};
use crate::export::ExportInterface;
use crate::geometry::point_to_segment;
use crate::graphics::Graphics;
use crate::map_coordinates::MapCoordinates;
use crate::math::{round_intelligently, PointG, RectangleG};

#[derive(Debug, Clone, Copy)]
struct TrackCache {
    p1: PointG,
    p2: PointG,
    /// 外包框 (x, y, w, h)
    clip: (i32, i32, i32, i32),
    width: f32,
}

/// 有宽度的走线，两端为圆头
#[derive(Debug, Clone)]
pub struct PcbLine {
    base: PrimitiveBase,
    /// 线宽（逻辑单位）
    pub width: f64,
    cache: Option<DrawCache<TrackCache>>,
}

impl PcbLine {
    pub fn new(font: &str, font_size: i32) -> Self {
        Self {
            base: PrimitiveBase::new(2, true, font, font_size),
            width: 0.0,
            cache: None,
        }
    }

    pub fn with_points(p1: PointG, p2: PointG, width: f64, layer: usize, font: &str, font_size: i32) -> Self {
        let mut l = Self::new(font, font_size);
        l.base.points[0] = p1;
        l.base.points[1] = p2;
        l.base.place_text_points(p1.x, p1.y);
        l.base.set_layer(layer);
        l.width = width;
        l
    }
}

impl GraphicPrimitive for PcbLine {
    fn base(&self) -> &PrimitiveBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PrimitiveBase {
        &mut self.base
    }

    fn parse_tokens(&mut self, tokens: &[&str]) -> Result<()> {
        self.cache = None;
        if tokens.first() != Some(&"PL") {
            return Err(FidoError::InvalidPrimitive(format!(
                "PL: unexpected command {}",
                tokens.first().unwrap_or(&"")
            )));
        }
        if tokens.len() < 6 {
            return Err(FidoError::bad_arguments("PL"));
        }
        let x1 = int_token(tokens[1])?;
        let y1 = int_token(tokens[2])?;
        self.base.points[0] = PointG::new(x1, y1);
        self.base.points[1] = PointG::new(int_token(tokens[3])?, int_token(tokens[4])?);
        self.base.place_text_points(x1, y1);
        self.width = f64_token(tokens[5])?;
        if let Some(l) = tokens.get(6) {
            self.base.parse_layer(l);
        }
        Ok(())
    }

    fn distance_to_point(&self, px: i32, py: i32) -> i32 {
        if self.base.check_text(px, py) {
            return 0;
        }
        let (a, b) = (self.base.points[0], self.base.points[1]);
        let d = point_to_segment(a.x, a.y, b.x, b.y, px, py) as f64 - self.width / 2.0;
        (d as i32).max(0)
    }

    fn to_fcd(&self, extensions: bool) -> String {
        let (a, b) = (self.base.points[0], self.base.points[1]);
        let mut s = format!(
            "PL {} {} {} {} {} {}\n",
            a.x,
            a.y,
            b.x,
            b.y,
            round_intelligently(self.width),
            self.base.layer
        );
        s.push_str(&self.base.save_text(extensions));
        s
    }

    fn draw(&mut self, g: &mut dyn Graphics, map: &mut MapCoordinates, ctx: &DrawContext<'_>) {
        if !self.base.select_layer(g, ctx.layers) {
            return;
        }
        self.base.draw_text(g, map, ctx.config, None);

        let (q1, q2) = (self.base.points[0], self.base.points[1]);
        let width = self.width;
        let c = *refresh_cache(&mut self.cache, map.view_key(), || {
            let p1 = map_point(map, q1);
            let p2 = map_point(map, q2);
            let (x, y) = (q1.x as f64, q1.y as f64);
            let w = (map.map_xr(x, y) - map.map_xr(x + width, y + width)).abs() as f32;
            let half = w / 2.0;
            let xa = (p1.x.min(p2.x) as f32 - half) as i32;
            let ya = (p1.y.min(p2.y) as f32 - half) as i32;
            let xb = (p1.x.max(p2.x) as f32 + half) as i32;
            let yb = (p1.y.max(p2.y) as f32 + half) as i32;
            TrackCache {
                p1,
                p2,
                clip: (xa, ya, xb - xa + 1, yb - ya + 1),
                width: w,
            }
        });
        let (x, y, w, h) = c.clip;
        map.track_point(x as f64, y as f64);
        map.track_point((x + w - 1) as f64, (y + h - 1) as f64);
        if !g.hit_clip(x, y, w, h) {
            return;
        }
        g.apply_stroke(c.width, 0);
        g.draw_line(c.p1.x, c.p1.y, c.p2.x, c.p2.y);
    }

    fn export(
        &mut self,
        exp: &mut dyn ExportInterface,
        map: &mut MapCoordinates,
        _ctx: &ExportContext<'_>,
    ) -> io::Result<()> {
        self.base.export_text(exp, map, None)?;
        let a = map_point(map, self.base.points[0]);
        let b = map_point(map, self.base.points[1]);
        let width = (self.width * map.x_magnitude()) as i32;
        exp.export_pcb_line(a, b, width, self.base.layer)
    }

    fn intersects(&self, rect: &RectangleG, fully: bool) -> bool {
        let (a, b) = (self.base.points[0], self.base.points[1]);
        if fully {
            return rect.contains(a.x, a.y) && rect.contains(b.x, b.y);
        }
        rect.contains(a.x, a.y) || rect.contains(b.x, b.y) || rect.intersects_line(a, b)
    }

    fn invalidate(&mut self) {
        self.cache = None;
    }
}
