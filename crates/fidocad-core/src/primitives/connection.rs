//! 电气连接点 `SA`

use std::io;

use super::{
    refresh_cache, stroke_width, DrawCache, DrawContext, ExportContext, GraphicPrimitive,
    PrimitiveBase,
};
use crate::error::{int_token, FidoError, Result};
use crate::export::ExportInterface;
use crate::geometry::point_to_point;
use crate::graphics::Graphics;
use crate::map_coordinates::MapCoordinates;
use crate::math::PointG;

#[derive(Debug, Clone, Copy)]
struct DotCache {
    x: i32,
    y: i32,
    diameter: i32,
    width: f32,
}

/// 画成实心圆点的连接点
#[derive(Debug, Clone)]
pub struct Connection {
    base: PrimitiveBase,
    cache: Option<DrawCache<DotCache>>,
}

impl Connection {
    pub fn new(font: &str, font_size: i32) -> Self {
        Self {
            base: PrimitiveBase::new(1, true, font, font_size),
            cache: None,
        }
    }

    pub fn at(x: i32, y: i32, layer: usize, font: &str, font_size: i32) -> Self {
        let mut c = Self::new(font, font_size);
        c.base.points[0] = PointG::new(x, y);
        c.base.place_text_points(x, y);
        c.base.set_layer(layer);
        c
    }
}

impl GraphicPrimitive for Connection {
    fn base(&self) -> &PrimitiveBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PrimitiveBase {
        &mut self.base
    }

    fn parse_tokens(&mut self, tokens: &[&str]) -> Result<()> {
        self.cache = None;
        if tokens.first() != Some(&"SA") {
            return Err(FidoError::InvalidPrimitive(format!(
                "SA: unexpected command {}",
                tokens.first().unwrap_or(&"")
            )));
        }
        if tokens.len() < 3 {
            return Err(FidoError::bad_arguments("SA"));
        }
        let x = int_token(tokens[1])?;
        let y = int_token(tokens[2])?;
        self.base.points[0] = PointG::new(x, y);
        self.base.place_text_points(x, y);
        if let Some(l) = tokens.get(3) {
            self.base.parse_layer(l);
        }
        Ok(())
    }

    fn distance_to_point(&self, px: i32, py: i32) -> i32 {
        if self.base.check_text(px, py) {
            return 0;
        }
        let c = self.base.points[0];
        point_to_point(c.x, c.y, px, py) - 1
    }

    fn to_fcd(&self, extensions: bool) -> String {
        let c = self.base.points[0];
        let mut s = format!("SA {} {} {}\n", c.x, c.y, self.base.layer);
        s.push_str(&self.base.save_text(extensions));
        s
    }

    fn draw(&mut self, g: &mut dyn Graphics, map: &mut MapCoordinates, ctx: &DrawContext<'_>) {
        if !self.base.select_layer(g, ctx.layers) {
            return;
        }
        self.base.draw_text(g, map, ctx.config, None);

        let p = self.base.points[0];
        let size = ctx.config.connection_size;
        let line_width = ctx.config.line_width;
        let c = *refresh_cache(&mut self.cache, map.view_key(), || {
            let unit = |d: f64| (map.map_xr(0.0, 0.0) - map.map_xr(d, d)).abs();
            let mut nn = unit(10.0) * size / 10.0;
            // 缩得很小时适当放大，保证连接点可见
            if nn < 2.0 {
                nn = (unit(20.0) * size / 12.0).trunc();
            }
            let cx = map.map_x(p.x as f64, p.y as f64) as f64;
            let cy = map.map_y(p.x as f64, p.y as f64) as f64;
            DotCache {
                x: (cx - nn / 2.0).round() as i32,
                y: (cy - nn / 2.0).round() as i32,
                diameter: (nn.round() as i32).max(1),
                width: stroke_width(line_width, map),
            }
        });
        if !g.hit_clip(c.x, c.y, c.diameter, c.diameter) {
            return;
        }
        g.apply_stroke(c.width, 0);
        if c.diameter > 1 {
            g.fill_oval(c.x, c.y, c.diameter, c.diameter);
        } else {
            g.fill_rect(c.x, c.y, c.diameter, c.diameter);
        }
    }

    fn export(
        &mut self,
        exp: &mut dyn ExportInterface,
        map: &mut MapCoordinates,
        ctx: &ExportContext<'_>,
    ) -> io::Result<()> {
        self.base.export_text(exp, map, None)?;
        let c = self.base.points[0];
        let x = map.map_x(c.x as f64, c.y as f64);
        let y = map.map_y(c.x as f64, c.y as f64);
        exp.export_connection(
            x,
            y,
            self.base.layer,
            ctx.config.connection_size * map.x_magnitude(),
        )
    }

    fn invalidate(&mut self) {
        self.cache = None;
    }
}
