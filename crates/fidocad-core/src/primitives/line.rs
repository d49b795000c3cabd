//! 线段 `LI`

use std::io;

use super::{
    map_point, refresh_cache, stroke_width, Arrow, DrawCache, DrawContext, ExportContext,
    GraphicPrimitive, PrimitiveBase,
};
use crate::config::check_dash_style;
use crate::error::{int_token, FidoError, Result};
use crate::export::{ExportInterface, StrokeStyle};
use crate::geometry::point_to_segment;
use crate::graphics::Graphics;
use crate::map_coordinates::MapCoordinates;
use crate::math::{PointG, RectangleG};

#[derive(Debug, Clone)]
struct LineCache {
    p1: PointG,
    p2: PointG,
    /// 含箭头余量的外包框 (x, y, w, h)
    clip: (i32, i32, i32, i32),
    width: f32,
    length2: i64,
    arrow_sizes: (i32, i32),
}

/// 两点之间的线段，可带箭头与虚线
#[derive(Debug, Clone)]
pub struct Line {
    base: PrimitiveBase,
    pub arrow: Arrow,
    pub dash_style: usize,
    cache: Option<DrawCache<LineCache>>,
}

impl Line {
    pub fn new(font: &str, font_size: i32) -> Self {
        Self {
            base: PrimitiveBase::new(2, true, font, font_size),
            arrow: Arrow::default(),
            dash_style: 0,
            cache: None,
        }
    }

    /// 由两个端点创建线段
    pub fn with_points(p1: PointG, p2: PointG, layer: usize, font: &str, font_size: i32) -> Self {
        let mut l = Self::new(font, font_size);
        l.base.points[0] = p1;
        l.base.points[1] = p2;
        l.base.place_text_points(p1.x, p1.y);
        l.base.set_layer(layer);
        l
    }

    fn endpoints(&self) -> (PointG, PointG) {
        (self.base.points[0], self.base.points[1])
    }
}

impl GraphicPrimitive for Line {
    fn base(&self) -> &PrimitiveBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PrimitiveBase {
        &mut self.base
    }

    fn parse_tokens(&mut self, tokens: &[&str]) -> Result<()> {
        self.cache = None;
        if tokens.first() != Some(&"LI") {
            return Err(FidoError::InvalidPrimitive(format!(
                "LI: unexpected command {}",
                tokens.first().unwrap_or(&"")
            )));
        }
        let nn = tokens.len();
        if nn < 5 {
            return Err(FidoError::bad_arguments("LI"));
        }
        let x1 = int_token(tokens[1])?;
        let y1 = int_token(tokens[2])?;
        self.base.points[0] = PointG::new(x1, y1);
        self.base.points[1] = PointG::new(int_token(tokens[3])?, int_token(tokens[4])?);
        self.base.place_text_points(x1, y1);
        if nn > 5 {
            self.base.parse_layer(tokens[5]);
        }
        if nn > 6 && tokens[6] == "FCJ" {
            let i = self.arrow.parse_tokens(tokens, 7)?;
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
        let (p1, p2) = self.endpoints();
        if self.arrow.is_present() {
            let start = self.arrow.at_start && self.arrow.contains(px, py, p1, p2).0;
            let end = self.arrow.at_end && self.arrow.contains(px, py, p2, p1).0;
            if start || end {
                return 1;
            }
        }
        point_to_segment(p1.x, p1.y, p2.x, p2.y, px, py)
    }

    fn to_fcd(&self, extensions: bool) -> String {
        let (p1, p2) = self.endpoints();
        let has_text = self.base.has_name() || self.base.has_value();
        if !has_text && p1 == p2 {
            return String::new();
        }
        let mut s = format!("LI {} {} {} {} {}\n", p1.x, p1.y, p2.x, p2.y, self.base.layer);
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
        self.base.draw_text(g, map, ctx.config, None);

        let (q1, q2) = self.endpoints();
        let arrow = self.arrow;
        let key = map.view_key();
        let c = refresh_cache(&mut self.cache, key, || {
            let p1 = map_point(map, q1);
            let p2 = map_point(map, q2);
            let (mut xa, mut xb) = (p1.x.min(p2.x), p1.x.max(p2.x));
            let (mut ya, mut yb) = (p1.y.min(p2.y), p1.y.max(p2.y));
            let length2 = ((xb - xa) as i64).pow(2) + ((yb - ya) as i64).pow(2);
            let arrow_sizes = if arrow.is_present() {
                let sizes = arrow.pixel_sizes(map);
                let h = sizes.1.abs();
                xa -= h;
                ya -= h;
                xb += h;
                yb += h;
                sizes
            } else {
                (0, 0)
            };
            LineCache {
                p1,
                p2,
                clip: (xa, ya, xb - xa + 1, yb - ya + 1),
                width: stroke_width(ctx.config.line_width, map),
                length2,
                arrow_sizes,
            }
        })
        .clone();

        map.track_point(c.p1.x as f64, c.p1.y as f64);
        map.track_point(c.p2.x as f64, c.p2.y as f64);
        if c.length2 <= 2 {
            return;
        }
        let (x, y, w, h) = c.clip;
        if !g.hit_clip(x, y, w, h) {
            return;
        }
        g.apply_stroke(c.width, self.dash_style);

        let (mut start, mut end) = (c.p1, c.p2);
        if arrow.at_start {
            let base = arrow.draw(g, map, c.p1, c.p2, c.arrow_sizes);
            if arrow.length > 0.0 {
                start = base;
            }
        }
        if arrow.at_end {
            let base = arrow.draw(g, map, c.p2, c.p1, c.arrow_sizes);
            if arrow.length > 0.0 {
                end = base;
            }
        }
        g.draw_line(start.x, start.y, end.x, end.y);
    }

    fn export(
        &mut self,
        exp: &mut dyn ExportInterface,
        map: &mut MapCoordinates,
        ctx: &ExportContext<'_>,
    ) -> io::Result<()> {
        self.base.export_text(exp, map, None)?;
        let (p1, p2) = self.endpoints();
        let xm = map.x_magnitude();
        let a = map_point(map, p1);
        let b = map_point(map, p2);
        exp.export_line(
            a.to_point2(),
            b.to_point2(),
            self.base.layer,
            &self.arrow.spec(xm),
            &StrokeStyle {
                dash_style: self.dash_style,
                width: ctx.config.line_width * xm,
            },
        )
    }

    fn intersects(&self, rect: &RectangleG, fully: bool) -> bool {
        if fully {
            return self.base.points.iter().all(|p| rect.contains(p.x, p.y));
        }
        let (p1, p2) = self.endpoints();
        rect.intersects_line(p1, p2)
    }

    fn invalidate(&mut self) {
        self.cache = None;
    }
}
