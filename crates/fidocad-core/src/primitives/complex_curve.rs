//! 自然三次样条曲线 `CV`（空心）与 `CP`（实心）
//!
//! 曲线经过所有控制点。第一个记号为 1 时曲线闭合。开曲线带箭头时，
//! 先按箭头长度把两端截短再重新求样条，使曲线止于箭头底边。

use std::io;

use super::{
    map_point, refresh_cache, stroke_width, Arrow, DrawCache, DrawContext, ExportContext,
    GraphicPrimitive, PrimitiveBase,
};
use crate::config::check_dash_style;
use crate::error::{int_token, FidoError, Result};
use crate::export::{ArrowSpec, ExportInterface, StrokeStyle};
use crate::geometry::{point_in_polygon, point_to_point, point_to_segment};
use crate::graphics::Graphics;
use crate::map_coordinates::MapCoordinates;
use crate::math::{Point2, PointG, RectangleG};
use crate::spline::{natural_cubic, natural_cubic_closed, CurveStorage, STEPS};

/// 贝塞尔控制柄长度系数
const HANDLE_WEIGHT: f64 = 0.666667;

#[derive(Debug, Clone, Default)]
struct CurveCache {
    /// 折线近似（设备坐标）
    polygon: Vec<PointG>,
    min: PointG,
    width: i32,
    height: i32,
    start: Point2,
    segments: Vec<[Point2; 3]>,
    stroke: f32,
}

#[derive(Debug, Clone)]
pub struct ComplexCurve {
    base: PrimitiveBase,
    pub filled: bool,
    pub closed: bool,
    pub arrow: Arrow,
    pub dash_style: usize,
    cache: Option<DrawCache<CurveCache>>,
}

fn round_point(p: &Point2) -> PointG {
    PointG::new(p.x.round() as i32, p.y.round() as i32)
}

impl ComplexCurve {
    pub fn new(font: &str, font_size: i32) -> Self {
        Self {
            base: PrimitiveBase::new(0, true, font, font_size),
            filled: false,
            closed: false,
            arrow: Arrow::default(),
            dash_style: 0,
            cache: None,
        }
    }

    pub fn vertices(&self) -> &[PointG] {
        self.base.geometry()
    }

    pub fn add_point(&mut self, x: i32, y: i32) {
        let n = self.base.geometry_len();
        self.base.points.insert(n, PointG::new(x, y));
        self.base.place_text_points(x, y);
        self.cache = None;
    }

    /// 在折线近似上找离 (px, py) 最近的一段，把新控制点插到对应的样条段之后
    pub fn add_point_closest(&mut self, px: i32, py: i32) {
        let Some(q) = self.sample(&MapCoordinates::new()) else {
            self.add_point(px, py);
            return;
        };
        let q: Vec<PointG> = q.points.iter().map(round_point).collect();
        let first = self.vertices()[0];
        let mut distance = point_to_point(first.x, first.y, px, py);
        let mut at = 0;
        for (i, w) in q.windows(2).enumerate() {
            let d = point_to_segment(w[0].x, w[0].y, w[1].x, w[1].y, px, py);
            if d < distance {
                distance = d;
                at = i / STEPS + 1;
            }
        }
        let at = at.min(self.base.geometry_len());
        self.base.points.insert(at, PointG::new(px, py));
        self.cache = None;
    }

    /// 删除距离 (x, y) 不超过 `tolerance` 的最近控制点，至少保留三个
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

    /// 在给定坐标系下求样条并采样
    fn sample(&self, map: &MapCoordinates) -> Option<CurveStorage> {
        let v = self.vertices();
        if v.len() < 2 {
            return None;
        }
        let mut xs: Vec<f64> = v.iter().map(|p| map.map_xr(p.x as f64, p.y as f64)).collect();
        let mut ys: Vec<f64> = v.iter().map(|p| map.map_yr(p.x as f64, p.y as f64)).collect();

        if self.closed {
            return CurveStorage::sample(&natural_cubic_closed(&xs), &natural_cubic_closed(&ys));
        }
        let mut xx = natural_cubic(&xs);
        let mut yy = natural_cubic(&ys);
        if self.arrow.is_present() {
            let sizes = self.arrow.pixel_sizes(map);
            let eval = |cx: &crate::spline::Cubic, cy: &crate::spline::Cubic, u: f64| {
                PointG::new(cx.eval(u).round() as i32, cy.eval(u).round() as i32)
            };
            if self.arrow.at_start {
                let (cx, cy) = (xx.first()?, yy.first()?);
                let b = self
                    .arrow
                    .base_point(eval(cx, cy, 0.0), eval(cx, cy, 0.05), sizes);
                if self.arrow.length > 0.0 {
                    xs[0] = b.x as f64;
                    ys[0] = b.y as f64;
                }
            }
            if self.arrow.at_end {
                let (cx, cy) = (xx.last()?, yy.last()?);
                let b = self
                    .arrow
                    .base_point(eval(cx, cy, 1.0), eval(cx, cy, 0.95), sizes);
                if self.arrow.length > 0.0 {
                    let n = xs.len() - 1;
                    xs[n] = b.x as f64;
                    ys[n] = b.y as f64;
                }
            }
            if self.arrow.length > 0.0 {
                xx = natural_cubic(&xs);
                yy = natural_cubic(&ys);
            }
        }
        CurveStorage::sample(&xx, &yy)
    }

    fn build_cache(&self, map: &mut MapCoordinates, line_width: f64) -> CurveCache {
        let stroke = stroke_width(line_width, map);
        let Some(c) = self.sample(map) else {
            return CurveCache {
                stroke,
                ..Default::default()
            };
        };
        let polygon: Vec<PointG> = c.points.iter().map(round_point).collect();
        let (mut min, mut max) = (
            PointG::new(i32::MAX, i32::MAX),
            PointG::new(-i32::MAX, -i32::MAX),
        );
        for p in &polygon {
            min = PointG::new(min.x.min(p.x), min.y.min(p.y));
            max = PointG::new(max.x.max(p.x), max.y.max(p.y));
        }

        let pp = &c.points;
        let dd = &c.derivatives;
        let segments = (0..pp.len().saturating_sub(1) / STEPS)
            .map(|j| {
                let (a, b) = (pp[j * STEPS], pp[(j + 1) * STEPS]);
                let (da, db) = (dd[j].coords, dd[j + 1].coords);
                [
                    a + da / 2.0 * HANDLE_WEIGHT,
                    b - db / 2.0 * HANDLE_WEIGHT,
                    b,
                ]
            })
            .collect();
        CurveCache {
            width: max.x - min.x,
            height: max.y - min.y,
            polygon,
            min,
            start: pp[0],
            segments,
            stroke,
        }
    }
}

impl GraphicPrimitive for ComplexCurve {
    fn base(&self) -> &PrimitiveBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PrimitiveBase {
        &mut self.base
    }

    fn parse_tokens(&mut self, tokens: &[&str]) -> Result<()> {
        self.cache = None;
        let cmd = tokens.first().copied().unwrap_or("");
        if cmd != "CP" && cmd != "CV" {
            return Err(FidoError::InvalidPrimitive(format!(
                "CP/CV: unexpected command {}",
                cmd
            )));
        }
        let nn = tokens.len();
        if nn < 6 {
            return Err(FidoError::bad_arguments("CP/CV"));
        }
        self.base.points.truncate(0);
        self.base.points.extend([PointG::default(); 2]);
        self.closed = tokens[1] == "1";

        let mut j = 2;
        while j < nn - 1 {
            if j + 1 < nn - 1 && tokens[j + 1] == "FCJ" {
                break;
            }
            let x = int_token(tokens[j])?;
            j += 1;
            if j >= nn - 1 {
                return Err(FidoError::bad_arguments("CP/CV"));
            }
            let y = int_token(tokens[j])?;
            j += 1;
            self.add_point(x, y);
        }
        if nn > j {
            self.base.parse_layer(tokens[j]);
            j += 1;
            if nn > j && tokens[j] == "FCJ" {
                let i = self.arrow.parse_tokens(tokens, j + 1)?;
                if let Some(t) = tokens.get(i) {
                    self.dash_style = check_dash_style(int_token(t)? as i64);
                }
            }
        }
        self.filled = cmd == "CP";
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
        let Some(c) = self.sample(&MapCoordinates::new()) else {
            return point_to_point(first.x, first.y, px, py);
        };
        let q: Vec<PointG> = c.points.iter().map(round_point).collect();
        let xs: Vec<i32> = q.iter().map(|p| p.x).collect();
        let ys: Vec<i32> = q.iter().map(|p| p.y).collect();
        if self.filled && point_in_polygon(&xs, &ys, px as f64, py as f64) {
            return 0;
        }
        if self.arrow.is_present() && !self.closed && q.len() > 2 {
            let start = self.arrow.at_start && self.arrow.contains(px, py, v[0], q[1]).0;
            let end = self.arrow.at_end
                && self.arrow.contains(px, py, v[v.len() - 1], q[q.len() - 2]).0;
            if start || end {
                return 1;
            }
        }
        q.windows(2)
            .map(|w| point_to_segment(w[0].x, w[0].y, w[1].x, w[1].y, px, py))
            .fold(100, i32::min)
    }

    fn to_fcd(&self, extensions: bool) -> String {
        let v = self.vertices();
        let has_text = self.base.has_name() || self.base.has_value();
        if !has_text && v.len() == 1 {
            return String::new();
        }
        let mut s = format!(
            "{} {} ",
            if self.filled { "CP" } else { "CV" },
            if self.closed { 1 } else { 0 }
        );
        for p in v {
            s.push_str(&format!("{} {} ", p.x, p.y));
        }
        s.push_str(&format!("{}\n", self.base.layer));
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

        let key = map.view_key();
        let mut slot = self.cache.take();
        let c = refresh_cache(&mut slot, key, || self.build_cache(map, ctx.config.line_width)).clone();
        self.cache = slot;

        let v = self.vertices().to_vec();
        if c.polygon.is_empty() {
            // 单点曲线画成一个点
            if let Some(p) = v.first() {
                let p = map_point(map, *p);
                g.apply_stroke(c.stroke, self.dash_style);
                g.draw_line(p.x, p.y, p.x, p.y);
            }
            return;
        }
        for p in &c.polygon {
            map.track_point(p.x as f64, p.y as f64);
        }
        g.apply_stroke(c.stroke, self.dash_style);

        if self.arrow.is_present() && !self.closed && c.polygon.len() > 2 {
            let sizes = self.arrow.pixel_sizes(map);
            if self.arrow.at_start {
                let tip = map_point(map, v[0]);
                self.arrow.draw(g, map, tip, c.polygon[1], sizes);
            }
            if self.arrow.at_end {
                let tip = map_point(map, v[v.len() - 1]);
                self.arrow
                    .draw(g, map, tip, c.polygon[c.polygon.len() - 2], sizes);
            }
        }

        if !g.hit_clip(c.min.x, c.min.y, c.width + 1, c.height + 1) {
            return;
        }
        if self.filled {
            g.draw_path(c.start, &c.segments, self.closed, true);
        }
        if c.width == 0 || c.height == 0 {
            let a = map_point(map, v[0]);
            let b = map_point(map, v[v.len() - 1]);
            g.draw_line(a.x, a.y, b.x, b.y);
        } else {
            g.draw_path(c.start, &c.segments, self.closed, false);
        }
    }

    fn export(
        &mut self,
        exp: &mut dyn ExportInterface,
        map: &mut MapCoordinates,
        ctx: &ExportContext<'_>,
    ) -> io::Result<()> {
        let v = self.vertices().to_vec();
        if v.is_empty() {
            return Ok(());
        }
        let xm = map.x_magnitude();
        let stroke = StrokeStyle {
            dash_style: self.dash_style,
            width: ctx.config.line_width * xm,
        };
        let vertices: Vec<Point2> = v
            .iter()
            .map(|p| {
                Point2::new(
                    map.map_xr(p.x as f64, p.y as f64),
                    map.map_yr(p.x as f64, p.y as f64),
                )
            })
            .collect();

        let native = exp.export_curve(
            &vertices,
            self.filled,
            self.closed,
            self.base.layer,
            &self.arrow.spec(xm),
            &stroke,
        )?;
        if !native {
            if let Some(c) = self.sample(map) {
                if self.closed {
                    exp.export_polygon(&c.points, self.filled, self.base.layer, &stroke)?;
                } else {
                    let mut phase = 0.0;
                    for w in c.points.windows(2) {
                        exp.set_dash_phase(phase as f32);
                        exp.export_line(w[0], w[1], self.base.layer, &ArrowSpec::NONE, &stroke)?;
                        phase += (w[1] - w[0]).norm();
                    }
                }

                let total = c.points.len();
                if total > 2 && !self.closed {
                    let (len, hw) = (self.arrow.length * xm, self.arrow.half_width * xm);
                    if self.arrow.at_start {
                        let tip = map_point(map, v[0]).to_point2();
                        exp.export_arrow(tip, c.points[1], len, hw, self.arrow.style)?;
                    }
                    if self.arrow.at_end {
                        let tip = map_point(map, v[v.len() - 1]).to_point2();
                        exp.export_arrow(tip, c.points[total - 2], len, hw, self.arrow.style)?;
                    }
                }
            }
        }
        self.base.export_text(exp, map, None)
    }

    fn intersects(&self, rect: &RectangleG, fully: bool) -> bool {
        let q: Vec<PointG> = match self.sample(&MapCoordinates::new()) {
            Some(c) => c.points.iter().map(round_point).collect(),
            None => self.vertices().to_vec(),
        };
        if fully {
            return q.iter().all(|p| rect.contains(p.x, p.y));
        }
        q.iter().any(|p| rect.contains(p.x, p.y))
            || q.windows(2).any(|w| rect.intersects_line(w[0], w[1]))
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

    fn parse(line: &str) -> ComplexCurve {
        let mut c = ComplexCurve::new(DEFAULT_TEXT_FONT, 4);
        c.parse_tokens(&tokens(line)).expect("Failed to parse curve");
        c
    }

    #[test]
    fn test_parse_open_and_closed() {
        let c = parse("CV 0 0 0 50 50 100 0 2");
        assert!(!c.closed && !c.filled);
        assert_eq!(c.vertices().len(), 3);
        assert_eq!(c.layer(), 2);
        assert_eq!(c.to_fcd(true), "CV 0 0 0 50 50 100 0 2\n");

        let c = parse("CP 1 0 0 50 50 100 0 3 FCJ 0 0 3 1 2 0");
        assert!(c.closed && c.filled);
        assert_eq!(c.dash_style, 2);
        assert_eq!(c.to_fcd(true), "CP 1 0 0 50 50 100 0 3\nFCJ 0 0 3 1 2 0\n");
    }

    #[test]
    fn test_parse_errors() {
        let mut c = ComplexCurve::new(DEFAULT_TEXT_FONT, 4);
        assert!(matches!(
            c.parse_tokens(&tokens("CV 0 0 0 10")),
            Err(FidoError::BadArguments { .. })
        ));
        // 缺少 y 坐标
        assert!(matches!(
            c.parse_tokens(&tokens("CV 0 0 0 10 10")),
            Err(FidoError::BadArguments { .. })
        ));
    }

    #[test]
    fn test_single_point_curve_not_saved() {
        let mut c = ComplexCurve::new(DEFAULT_TEXT_FONT, 4);
        c.add_point(10, 10);
        assert_eq!(c.to_fcd(true), "");
        assert_eq!(c.distance_to_point(13, 14), 5);
    }

    #[test]
    fn test_distance_passes_through_control_points() {
        let c = parse("CV 0 0 0 50 50 100 0 0");
        assert_eq!(c.distance_to_point(50, 50), 0);
        assert_eq!(c.distance_to_point(100, 0), 0);
        assert!(c.distance_to_point(50, 0) > 10);
    }

    #[test]
    fn test_filled_closed_curve_interior() {
        let c = parse("CP 1 0 0 100 0 100 100 0 100 0");
        assert_eq!(c.distance_to_point(50, 50), 0);
    }

    #[test]
    fn test_export_open_curve_as_segments() {
        let layers = standard_layers();
        let config = DrawingConfig::default();
        let mut c = parse("CV 0 0 0 50 50 100 0 0");
        let mut exp = RecordingExporter::default();
        c.export(&mut exp, &mut MapCoordinates::new(), &export_ctx(&layers, &config))
            .expect("Failed to export");
        let lines = exp
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Line { .. }))
            .count();
        assert_eq!(lines, 2 * STEPS);
        match exp.calls.last() {
            Some(Call::Line { p2, .. }) => assert!((*p2 - Point2::new(100.0, 0.0)).norm() < 1e-9),
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_export_closed_curve_as_polygon() {
        let layers = standard_layers();
        let config = DrawingConfig::default();
        let mut c = parse("CP 1 0 0 100 0 100 100 0 100 0");
        let mut exp = RecordingExporter::default();
        c.export(&mut exp, &mut MapCoordinates::new(), &export_ctx(&layers, &config))
            .expect("Failed to export");
        match exp.calls.as_slice() {
            [Call::Polygon { vertices, filled, .. }] => {
                assert!(*filled);
                assert_eq!(vertices.len(), 4 * STEPS + 1);
            }
            other => panic!("unexpected calls {:?}", other),
        }
    }

    #[test]
    fn test_export_arrows() {
        let layers = standard_layers();
        let config = DrawingConfig::default();
        let mut c = parse("CV 0 0 0 50 50 100 0 0 FCJ 3 0 3 1 0 0");
        let mut exp = RecordingExporter::default();
        c.export(&mut exp, &mut MapCoordinates::new(), &export_ctx(&layers, &config))
            .expect("Failed to export");
        let tips: Vec<Point2> = exp
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Arrow { tip } => Some(*tip),
                _ => None,
            })
            .collect();
        assert_eq!(tips, vec![Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)]);
    }

    #[test]
    fn test_add_and_remove_points() {
        let mut c = parse("CV 0 0 0 100 0 100 100 0");
        c.add_point_closest(50, 1);
        assert_eq!(c.vertices().len(), 4);
        assert_eq!(c.vertices()[1], PointG::new(50, 1));
        c.remove_point(50, 1, 2.0);
        assert_eq!(c.vertices().len(), 3);
    }
}
