//! 数学基础类型
//!
//! 逻辑坐标使用整数点 [`PointG`]（1 单位 = 5 mil），设备坐标与样条计算使用
//! nalgebra 的双精度点 [`Point2`]。

use serde::{Deserialize, Serialize};

/// 2D 双精度点
pub type Point2 = nalgebra::Point2<f64>;

/// 2D 双精度向量
pub type Vector2 = nalgebra::Vector2<f64>;

/// 浮点比较容差
pub const EPSILON: f64 = 1e-10;

/// 数值输出时判断"是否为整数"的容差
pub const INT_TOLERANCE: f64 = 1e-5;

/// 把 i64 中间结果截断到坐标范围
pub fn clamp_coord(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// `x` 以竖线 `x = x_pos` 为轴的镜像
pub fn mirror_coord(x: i32, x_pos: i32) -> i32 {
    clamp_coord(2 * x_pos as i64 - x as i64)
}

/// 整数逻辑坐标点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct PointG {
    pub x: i32,
    pub y: i32,
}

impl PointG {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// 转换为双精度点
    pub fn to_point2(self) -> Point2 {
        Point2::new(self.x as f64, self.y as f64)
    }
}

/// 整数尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DimensionG {
    pub width: i32,
    pub height: i32,
}

impl DimensionG {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// 轴对齐整数矩形（左上角 + 尺寸）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RectangleG {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl RectangleG {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 由两个任意顺序的角点构造
    pub fn from_corners(a: PointG, b: PointG) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(
            x,
            y,
            clamp_coord((a.x as i64 - b.x as i64).abs()),
            clamp_coord((a.y as i64 - b.y as i64).abs()),
        )
    }

    /// 右下角（可能超出 i32）
    fn far_corner(&self) -> (i64, i64) {
        (
            self.x as i64 + self.width as i64,
            self.y as i64 + self.height as i64,
        )
    }

    /// 点是否在矩形内（含边界）
    pub fn contains(&self, px: i32, py: i32) -> bool {
        let (x1, y1) = self.far_corner();
        px >= self.x && px as i64 <= x1 && py >= self.y && py as i64 <= y1
    }

    /// 两个矩形是否相交
    pub fn intersects(&self, other: &RectangleG) -> bool {
        let (ax, ay) = self.far_corner();
        let (bx, by) = other.far_corner();
        self.x as i64 <= bx && other.x as i64 <= ax && self.y as i64 <= by && other.y as i64 <= ay
    }

    /// 线段是否与矩形相交（端点在内或与任一条边相交）
    pub fn intersects_line(&self, a: PointG, b: PointG) -> bool {
        if self.contains(a.x, a.y) || self.contains(b.x, b.y) {
            return true;
        }
        let c = self.corners();
        (0..4).any(|i| segments_intersect(a, b, c[i], c[(i + 1) % 4]))
    }

    fn corners(&self) -> [PointG; 4] {
        let (x1, y1) = self.far_corner();
        let (x1, y1) = (clamp_coord(x1), clamp_coord(y1));
        [
            PointG::new(self.x, self.y),
            PointG::new(x1, self.y),
            PointG::new(x1, y1),
            PointG::new(self.x, y1),
        ]
    }
}

/// 叉积符号：-1、0、1
fn orientation(p: PointG, q: PointG, r: PointG) -> i64 {
    let v = (q.x as i64 - p.x as i64) * (r.y as i64 - p.y as i64)
        - (q.y as i64 - p.y as i64) * (r.x as i64 - p.x as i64);
    v.signum()
}

fn on_segment(p: PointG, q: PointG, r: PointG) -> bool {
    r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
}

/// 两条闭线段是否相交
pub fn segments_intersect(a1: PointG, a2: PointG, b1: PointG, b2: PointG) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    if d1 != d2 && d3 != d4 && d1 * d2 <= 0 && d3 * d4 <= 0 {
        return true;
    }
    (d1 == 0 && on_segment(b1, b2, a1))
        || (d2 == 0 && on_segment(b1, b2, a2))
        || (d3 == 0 && on_segment(a1, a2, b1))
        || (d4 == 0 && on_segment(a1, a2, b2))
}

/// 格式化数值：接近整数时输出整数形式，否则输出完整小数
pub fn round_intelligently(v: f64) -> String {
    if (v - v.round()).abs() < INT_TOLERANCE {
        format!("{}", v.round() as i64)
    } else {
        format!("{}", v)
    }
}

/// 解析整数记号
pub fn parse_int(token: &str) -> Option<i32> {
    token.parse::<i32>().ok()
}

/// 解析浮点记号
pub fn parse_f64(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}
