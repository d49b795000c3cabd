//! 线段、贝塞尔与曲线共用的箭头

use crate::error::{f64_token, int_token, FidoError, Result};
use crate::export::ArrowSpec;
use crate::geometry::point_in_polygon;
use crate::graphics::Graphics;
use crate::map_coordinates::MapCoordinates;
use crate::math::{round_intelligently, Point2, PointG};

/// 在箭头尖端画一条垂直限位线
pub const ARROW_LIMITER: i32 = 0x01;
/// 空心箭头
pub const ARROW_EMPTY: i32 = 0x02;

/// 箭头设置（逻辑单位）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrow {
    pub at_start: bool,
    pub at_end: bool,
    pub style: i32,
    pub length: f64,
    pub half_width: f64,
}

impl Default for Arrow {
    fn default() -> Self {
        Self {
            at_start: false,
            at_end: false,
            style: 0,
            length: 3.0,
            half_width: 1.0,
        }
    }
}

/// 箭头的几何形状
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowShape {
    pub tip: Point2,
    pub p1: Point2,
    pub p2: Point2,
    /// 底边中点，线段在此截断
    pub base: Point2,
    pub limiter: Option<(Point2, Point2)>,
}

/// 尖端在 (x, y)、指向远离 (xc, yc) 方向的箭头
pub fn arrow_shape(x: f64, y: f64, xc: f64, yc: f64, l: f64, h: f64, style: i32) -> ArrowShape {
    let mut alpha = if x == xc {
        std::f64::consts::FRAC_PI_2 + if y - yc < 0.0 { 0.0 } else { std::f64::consts::PI }
    } else {
        ((y - yc) / (x - xc)).atan()
    };
    if x - xc <= 0.0 {
        alpha += std::f64::consts::PI;
    }
    let (sin, cos) = alpha.sin_cos();

    let base = Point2::new(x - l * cos, y - l * sin);
    let limiter = (style & ARROW_LIMITER != 0).then(|| {
        (
            Point2::new(x - h * sin, y + h * cos),
            Point2::new(x + h * sin, y - h * cos),
        )
    });
    ArrowShape {
        tip: Point2::new(x, y),
        p1: Point2::new(base.x - h * sin, base.y + h * cos),
        p2: Point2::new(base.x + h * sin, base.y - h * cos),
        base,
        limiter,
    }
}

impl Arrow {
    pub fn is_present(&self) -> bool {
        self.at_start || self.at_end
    }

    /// 序列化为 `标志 样式 长度 半宽`
    pub fn to_tokens(&self) -> String {
        let flags = (self.at_start as i32) | ((self.at_end as i32) << 1);
        format!(
            "{} {} {} {}",
            flags,
            self.style,
            round_intelligently(self.length),
            round_intelligently(self.half_width)
        )
    }

    /// 从 `start` 开始读四个记号，返回下一个记号的位置
    pub fn parse_tokens(&mut self, tokens: &[&str], start: usize) -> Result<usize> {
        if tokens.len() < start + 4 {
            return Err(FidoError::InvalidPrimitive(format!(
                "incomplete arrow description in {}",
                tokens.first().unwrap_or(&"")
            )));
        }
        let flags = int_token(tokens[start])?;
        self.at_start = flags & 0x01 != 0;
        self.at_end = flags & 0x02 != 0;
        self.style = int_token(tokens[start + 1])?;
        self.length = f64_token(tokens[start + 2])?;
        self.half_width = f64_token(tokens[start + 3])?;
        Ok(start + 4)
    }

    /// 输出坐标系下的箭头参数
    pub fn spec(&self, xm: f64) -> ArrowSpec {
        ArrowSpec {
            at_start: self.at_start,
            at_end: self.at_end,
            style: self.style,
            length: (self.length * xm) as i32,
            half_width: (self.half_width * xm) as i32,
        }
    }

    /// 映射后的 (长度, 半宽)，保留逻辑值的符号
    pub fn pixel_sizes(&self, map: &MapCoordinates) -> (i32, i32) {
        let origin = map.map_xr(0.0, 0.0).round() as i32;
        let mapped = |v: f64| {
            let d = (map.map_xr(v, v).round() as i32 - origin).abs();
            if v < 0.0 {
                -d
            } else {
                d
            }
        };
        (mapped(self.length), mapped(self.half_width))
    }

    /// 指定尺寸下箭头底边中点（取整）
    pub fn base_point(&self, tip: PointG, toward: PointG, sizes: (i32, i32)) -> PointG {
        let s = arrow_shape(
            tip.x as f64,
            tip.y as f64,
            toward.x as f64,
            toward.y as f64,
            sizes.0 as f64,
            sizes.1 as f64,
            self.style,
        );
        round_point(s.base)
    }

    /// 绘制一个箭头，返回底边中点
    pub fn draw(
        &self,
        g: &mut dyn Graphics,
        map: &mut MapCoordinates,
        tip: PointG,
        toward: PointG,
        sizes: (i32, i32),
    ) -> PointG {
        let s = arrow_shape(
            tip.x as f64,
            tip.y as f64,
            toward.x as f64,
            toward.y as f64,
            sizes.0 as f64,
            sizes.1 as f64,
            self.style,
        );
        let poly = [tip, round_point(s.p1), round_point(s.p2)];
        map.track_point(s.tip.x, s.tip.y);
        map.track_point(s.p1.x, s.p1.y);
        map.track_point(s.p2.x, s.p2.y);
        if self.style & ARROW_EMPTY == 0 {
            g.fill_polygon(&poly);
        } else {
            g.draw_polygon(&poly);
        }
        if let Some((a, b)) = s.limiter {
            let (a, b) = (round_point(a), round_point(b));
            g.draw_line(a.x, a.y, b.x, b.y);
            map.track_point(a.x as f64, a.y as f64);
            map.track_point(b.x as f64, b.y as f64);
        }
        PointG::new(s.base.x as i32, s.base.y as i32)
    }

    /// 点 (xs, ys) 是否落在逻辑坐标下的箭头三角形内
    ///
    /// 同时返回箭头底边中点，曲线据此截短。
    pub fn contains(&self, xs: i32, ys: i32, tip: PointG, toward: PointG) -> (bool, PointG) {
        let s = arrow_shape(
            tip.x as f64,
            tip.y as f64,
            toward.x as f64,
            toward.y as f64,
            self.length.round(),
            self.half_width.round(),
            self.style,
        );
        let (p1, p2) = (round_point(s.p1), round_point(s.p2));
        let inside = point_in_polygon(
            &[tip.x, p1.x, p2.x],
            &[tip.y, p1.y, p2.y],
            xs as f64,
            ys as f64,
        );
        (inside, round_point(s.base))
    }
}

fn round_point(p: Point2) -> PointG {
    PointG::new(p.x.round() as i32, p.y.round() as i32)
}
