//! 多边形 `PV`（空心）与 `PP`（实心）

use std::io;

use super::{
    map_point, refresh_cache, stroke_width, DrawCache, DrawContext, ExportContext,
    GraphicPrimitive, PrimitiveBase,
};
use crate::config::check_dash_style;
use crate::error::{int_token, FidoError, Result};
use crate::export::{ExportInterface, StrokeStyle};
use crate::geometry::{point_in_polygon, point_to_point, point_to_segment};
use crate::graphics::Graphics;
use crate::map_coordinates::MapCoordinates;
use crate::math::{PointG, RectangleG};

#[derive(Debug, Clone)]
struct PolygonCache {
    vertices: Vec<PointG>,
    min: PointG,
    width: i32,
    height: i32,
    stroke: f32,
}

/// 任意顶点数的闭合多边形
#[derive(Debug, Clone)]
pub struct Polygon {
    base: PrimitiveBase,
    pub filled: bool,
    pub dash_style: usize,
    cache: Option<DrawCache<PolygonCache>>,
}

impl Polygon {
    pub fn new(font: &str, font_size: i32) -> Self {
        Self {
            base: PrimitiveBase::new(0, true, font, font_size),
            filled: false,
            dash_style: 0,
            cache: None,
        }
    }

    pub fn vertices(&self) -> &[PointG] {
        self.base.geometry()
    }

    /// 在末尾追加顶点，文字锚点跟随最后一个顶点
    pub fn add_point(&mut self, x: i32, y: i32) {
        let n = self.base.geometry_len();
        self.base.points.insert(n, PointG::new(x, y));
        self.base.place_text_points(x, y);
        self.cache = None;
    }

    /// 把顶点插入到离 (px, py) 最近的边上
    pub fn add_point_closest(&mut self, px: i32, py: i32) {
        let v = self.vertices();
        let Some(first) = v.first() else {
            self.add_point(px, py);
            return;
        };
        let mut distance = point_to_point(first.x, first.y, px, py);
        let mut at = 0;
        for i in 0..v.len() {
            let next = (i + 1) % v.len();
            let d = point_to_segment(v[i].x, v[i].y, v[next].x, v[next].y, px, py);
            if d < distance {
                distance = d;
                at = next;
            }
        }
        self.base.points.insert(at, PointG::new(px, py));
        self.cache = None;
    }

    /// 删除距离 (x, y) 不超过 `tolerance` 的最近顶点，至少保留三个顶点
    pub fn remove_point(&mut self, x: i32, y: i32, tolerance: f64) {
        let v = self.vertices();
        if v.len() <= 3 {
            return;
        }
        let Some((index, d)) = v
            .iter()
            .enumerate()
            .map(|(i, p)| (i, point_to_point(p.x, p.y, x, y)))
            .min_by_key(|&(_, d)| d)
        else {
            return;
        };
        if d as f64 <= tolerance {
            self.base.points.remove(index);
            self.cache = None;
        }
    }
}

impl GraphicPrimitive for Polygon {
    fn base(&self) -> &PrimitiveBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PrimitiveBase {
        &mut self.base
    }

    fn parse_tokens(&mut self, tokens: &[&str]) -> Result<()> {
        self.cache = None;
        let cmd = tokens.first().copied().unwrap_or("");
        if cmd != "PP" && cmd != "PV" {
            return Err(FidoError::InvalidPrimitive(format!(
                "PP/PV: unexpected command {}",
                cmd
            )));
        }
        let nn = tokens.len();
        if nn < 6 {
            return Err(FidoError::bad_arguments("PP/PV"));
        }
        self.base.points.truncate(0);
        self.base.points.extend([PointG::default(); 2]);

        let mut j = 1;
        while j < nn - 1 {
            if j + 1 < nn - 1 && tokens[j + 1] == "FCJ" {
                break;
            }
            let x = int_token(tokens[j])?;
            let y = int_token(tokens[j + 1])?;
            self.add_point(x, y);
            j += 2;
        }
        if nn > j {
            self.base.parse_layer(tokens[j]);
            j += 1;
            if j < nn - 1 && tokens[j] == "FCJ" {
                self.dash_style = check_dash_style(int_token(tokens[j + 1])? as i64);
            }
        }
        self.filled = cmd == "PP";
        Ok(())
    }

    fn distance_to_point(&self, px: i32, py: i32) -> i32 {
        if self.base.check_text(px, py) {
            return 0;
        }
        let v = self.vertices();
        let Some(first) = v.first() else {
            return i32::MAX;
        };
        let xs: Vec<i32> = v.iter().map(|p| p.x).collect();
        let ys: Vec<i32> = v.iter().map(|p| p.y).collect();
        if self.filled && point_in_polygon(&xs, &ys, px as f64, py as f64) {
            return 0;
        }
        let mut distance = point_to_point(first.x, first.y, px, py);
        for i in 0..v.len() {
            let next = (i + 1) % v.len();
            distance = distance.min(point_to_segment(
                v[i].x, v[i].y, v[next].x, v[next].y, px, py,
            ));
        }
        distance
    }

    fn to_fcd(&self, extensions: bool) -> String {
        let mut s = String::from(if self.filled { "PP " } else { "PV " });
        for p in self.vertices() {
            s.push_str(&format!("{} {} ", p.x, p.y));
        }
        s.push_str(&format!("{}\n", self.base.layer));
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

        let src = self.base.geometry().to_vec();
        let c = refresh_cache(&mut self.cache, map.view_key(), || {
            let vertices: Vec<PointG> = src.iter().map(|p| map_point(map, *p)).collect();
            let (mut min, mut max) = (
                PointG::new(i32::MAX, i32::MAX),
                PointG::new(-i32::MAX, -i32::MAX),
            );
            for p in &vertices {
                min = PointG::new(min.x.min(p.x), min.y.min(p.y));
                max = PointG::new(max.x.max(p.x), max.y.max(p.y));
            }
            PolygonCache {
                width: max.x.saturating_sub(min.x),
                height: max.y.saturating_sub(min.y),
                vertices,
                min,
                stroke: stroke_width(ctx.config.line_width, map),
            }
        })
        .clone();
        for p in &c.vertices {
            map.track_point(p.x as f64, p.y as f64);
        }

        if !g.hit_clip(c.min.x, c.min.y, c.width, c.height) {
            return;
        }
        g.apply_stroke(c.stroke, self.dash_style);
        if self.filled && c.width >= 2 && c.height >= 2 {
            g.fill_polygon(&c.vertices);
        }
        g.draw_polygon(&c.vertices);
    }

    fn export(
        &mut self,
        exp: &mut dyn ExportInterface,
        map: &mut MapCoordinates,
        ctx: &ExportContext<'_>,
    ) -> io::Result<()> {
        self.base.export_text(exp, map, None)?;
        let vertices: Vec<_> = self
            .base
            .geometry()
            .iter()
            .map(|p| map_point(map, *p).to_point2())
            .collect();
        exp.export_polygon(
            &vertices,
            self.filled,
            self.base.layer,
            &StrokeStyle {
                dash_style: self.dash_style,
                width: ctx.config.line_width * map.x_magnitude(),
            },
        )
    }

    fn intersects(&self, rect: &RectangleG, fully: bool) -> bool {
        let v = self.vertices();
        if fully {
            return v.iter().all(|p| rect.contains(p.x, p.y));
        }
        if v.iter().any(|p| rect.contains(p.x, p.y)) {
            return true;
        }
        if (0..v.len()).any(|i| rect.intersects_line(v[i], v[(i + 1) % v.len()])) {
            return true;
        }
        // 实心多边形完全覆盖选择框
        let xs: Vec<i32> = v.iter().map(|p| p.x).collect();
        let ys: Vec<i32> = v.iter().map(|p| p.y).collect();
        let inside = |x: i32, y: i32| point_in_polygon(&xs, &ys, x as f64, y as f64);
        self.filled
            && inside(rect.x, rect.y)
            && inside(rect.x + rect.width, rect.y)
            && inside(rect.x, rect.y + rect.height)
            && inside(rect.x + rect.width, rect.y + rect.height)
    }

    fn invalidate(&mut self) {
        self.cache = None;
    }
}
