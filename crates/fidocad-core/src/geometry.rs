//! 几何距离工具
//!
//! 用于图元拾取的点到各类几何的距离与包含测试。所有远距离结果都截断为
//! [`MIN_DISTANCE`]，拾取逻辑只关心近处的精确值。

/// 超出此范围的距离统一返回该值
pub const MIN_DISTANCE: i32 = 100;

/// 贝塞尔曲线近似所用的线段数
pub const MAX_BEZIER_SEGMENTS: usize = 10;

/// 两点距离（浮点）
pub fn point_to_point_f(xa: f64, ya: f64, xb: f64, yb: f64) -> f64 {
    let m = MIN_DISTANCE as f64;
    if (xa - xb).abs() < m || (ya - yb).abs() < m {
        ((xa - xb).powi(2) + (ya - yb).powi(2)).sqrt()
    } else {
        m
    }
}

/// 两点距离（整数）
pub fn point_to_point(xa: i32, ya: i32, xb: i32, yb: i32) -> i32 {
    point_to_point_f(xa as f64, ya as f64, xb as f64, yb as f64) as i32
}

/// 点 (x, y) 到线段 a-b 的距离（浮点）
pub fn point_to_segment_f(xa: f64, ya: f64, xb: f64, yb: f64, x: f64, y: f64) -> f64 {
    let m = MIN_DISTANCE as f64;
    if x < xa.min(xb) - m || x > xa.max(xb) + m {
        return m;
    }
    if y < ya.min(yb) - m || y > ya.max(yb) + m {
        return m;
    }

    let dx = xb - xa;
    let dy = yb - ya;
    if dx == 0.0 && dy == 0.0 {
        return ((x - xa).powi(2) + (y - ya).powi(2)).sqrt();
    }

    let t = ((x - xa) * dx + (y - ya) * dy) / (dx * dx + dy * dy);
    let (ex, ey) = if t < 0.0 {
        (x - xa, y - ya)
    } else if t > 1.0 {
        (x - xb, y - yb)
    } else {
        (x - (xa + t * dx), y - (ya + t * dy))
    };
    (ex * ex + ey * ey).sqrt()
}

/// 点 (x, y) 到线段 a-b 的距离（整数，投影参数以千分之一为单位）
pub fn point_to_segment(xa: i32, ya: i32, xb: i32, yb: i32, x: i32, y: i32) -> i32 {
    segment_distance(
        xa as i64, ya as i64, xb as i64, yb as i64, x as i64, y as i64,
    )
}

/// 端点可超出 i32 范围（矩形的对角由左上角加宽高得到）
fn segment_distance(xa: i64, ya: i64, xb: i64, yb: i64, x: i64, y: i64) -> i32 {
    let m = MIN_DISTANCE as i64;
    if x < xa.min(xb) - m || x > xa.max(xb) + m {
        return MIN_DISTANCE;
    }
    if y < ya.min(yb) - m || y > ya.max(yb) + m {
        return MIN_DISTANCE;
    }

    // 坐标差的平方超出 i64
    let (xa, ya, xb, yb, x, y) = (
        xa as i128, ya as i128, xb as i128, yb as i128, x as i128, y as i128,
    );
    if xa == xb && ya == yb {
        return isqrt((x - xa).pow(2) + (y - ya).pow(2));
    }

    let dx = xb - xa;
    let dy = yb - ya;
    let t = 1000 * ((x - xa) * dx + (y - ya) * dy) / (dx * dx + dy * dy);
    let (ex, ey) = if t < 0 {
        (x - xa, y - ya)
    } else if t > 1000 {
        (x - xb, y - yb)
    } else {
        (x - (xa + t * dx / 1000), y - (ya + t * dy / 1000))
    };
    isqrt(ex * ex + ey * ey)
}

fn isqrt(v: i128) -> i32 {
    (v as f64).sqrt() as i32
}

/// 偶奇规则的点在多边形内测试
pub fn point_in_polygon(xp: &[i32], yp: &[i32], x: f64, y: f64) -> bool {
    let n = xp.len().min(yp.len());
    if n == 0 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (xp[i] as f64, yp[i] as f64);
        let (xj, yj) = (xp[j] as f64, yp[j] as f64);
        if ((yi <= y && y < yj) || (yj <= y && y < yi)) && x < (xj - xi) * (y - yi) / (yj - yi) + xi
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// 点是否在外接矩形为 (ex, ey, w, h) 的椭圆内
pub fn point_in_ellipse(ex: f64, ey: f64, w: f64, h: f64, px: f64, py: f64) -> bool {
    let dx = (px - (ex + w / 2.0)).abs();
    let dy = (py - (ey + h / 2.0)).abs();
    if dx > w / 2.0 || dy > h / 2.0 {
        return false;
    }
    4.0 * dx * dx / w / w + 4.0 * dy * dy / h / h < 1.0
}

/// 点到椭圆边界的近似距离，退化椭圆按线段处理
pub fn point_to_ellipse_f(ex: f64, ey: f64, w: f64, h: f64, px: f64, py: f64) -> f64 {
    if w == 0.0 {
        return point_to_segment_f(ex, ey, ex, ey + h, px, py);
    }
    if h == 0.0 {
        return point_to_segment_f(ex, ey, ex + w, ey, px, py);
    }
    let dx = (px - (ex + w / 2.0)).abs();
    let dy = (py - (ey + h / 2.0)).abs();
    let l = (dx * dx / w / w + dy * dy / h / h) * 4.0;
    (l - 1.0).abs() * w.min(h) / 4.0
}

pub fn point_to_ellipse(ex: i32, ey: i32, w: i32, h: i32, px: i32, py: i32) -> i32 {
    point_to_ellipse_f(
        ex as f64, ey as f64, w as f64, h as f64, px as f64, py as f64,
    )
    .round() as i32
}

/// 点是否在矩形 (ex, ey, w, h) 内（含边界）
pub fn point_in_rectangle(ex: i32, ey: i32, w: i32, h: i32, px: i32, py: i32) -> bool {
    let (ex, ey, px, py) = (ex as i64, ey as i64, px as i64, py as i64);
    !(ex > px || px > ex + w as i64 || ey > py || py > ey + h as i64)
}

/// 点到矩形四条边的最小距离
pub fn point_to_rectangle(ex: i32, ey: i32, w: i32, h: i32, px: i32, py: i32) -> i32 {
    let (x0, y0, px, py) = (ex as i64, ey as i64, px as i64, py as i64);
    let (x1, y1) = (x0 + w as i64, y0 + h as i64);
    let d1 = segment_distance(x0, y0, x1, y0, px, py);
    let d2 = segment_distance(x1, y0, x1, y1, px, py);
    let d3 = segment_distance(x1, y1, x0, y1, px, py);
    let d4 = segment_distance(x0, y1, x0, y0, px, py);
    d1.min(d2).min(d3.min(d4))
}

/// 点到三次贝塞尔曲线的距离（折线近似）
pub fn point_to_bezier(p: &[(i32, i32); 4], px: i32, py: i32) -> i32 {
    let mut xs = [0i32; MAX_BEZIER_SEGMENTS + 1];
    let mut ys = [0i32; MAX_BEZIER_SEGMENTS + 1];

    for i in 0..=MAX_BEZIER_SEGMENTS {
        let u = i as f64 / MAX_BEZIER_SEGMENTS as f64;
        let umu = 1.0 - u;
        let b0 = umu * umu * umu;
        let b1 = 3.0 * u * umu * umu;
        let b2 = 3.0 * u * u * umu;
        let b3 = u * u * u;
        xs[i] = (p[0].0 as f64 * b0 + p[1].0 as f64 * b1 + p[2].0 as f64 * b2 + p[3].0 as f64 * b3)
            as i32;
        ys[i] = (p[0].1 as f64 * b0 + p[1].1 as f64 * b1 + p[2].1 as f64 * b2 + p[3].1 as f64 * b3)
            as i32;
    }

    (0..MAX_BEZIER_SEGMENTS)
        .map(|j| point_to_segment(xs[j], ys[j], xs[j + 1], ys[j + 1], px, py))
        .min()
        .unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_midpoint_is_zero() {
        assert_eq!(point_to_segment(0, 0, 100, 100, 50, 50), 0);
        assert!(point_to_segment_f(0.0, 0.0, 10.0, 0.0, 5.0, 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_segment_far_point_is_clamped() {
        assert_eq!(point_to_segment(0, 0, 10, 0, 500, 0), MIN_DISTANCE);
        // 投影落在端点之外时取端点距离
        assert_eq!(point_to_segment(0, 0, 10, 0, 13, 4), 5);
    }

    #[test]
    fn test_point_in_polygon() {
        let xs = [0, 10, 10, 0];
        let ys = [0, 0, 10, 10];
        assert!(point_in_polygon(&xs, &ys, 5.0, 5.0));
        assert!(!point_in_polygon(&xs, &ys, 15.0, 5.0));
    }

    #[test]
    fn test_ellipse_distance() {
        // 圆心处距离为 min(w,h)/4
        assert_eq!(point_to_ellipse(0, 0, 20, 20, 10, 10), 5);
        // 边界上为 0
        assert_eq!(point_to_ellipse(0, 0, 20, 20, 20, 10), 0);
        assert!(point_in_ellipse(0.0, 0.0, 20.0, 10.0, 10.0, 5.0));
        assert!(!point_in_ellipse(0.0, 0.0, 20.0, 10.0, 1.0, 1.0));
    }

    #[test]
    fn test_extreme_coordinates() {
        assert_eq!(point_to_segment(-2147483600, 0, 0, 0, 0, 5), 5);
        assert_eq!(point_to_segment(i32::MIN, 0, i32::MAX, 0, 0, 3), 3);
        assert_eq!(point_to_segment(i32::MAX, i32::MAX, i32::MAX, i32::MAX, 0, 0), MIN_DISTANCE);
        assert_eq!(point_to_rectangle(i32::MAX - 10, 0, 20, 20, i32::MAX, 10), 10);
        assert!(point_in_rectangle(i32::MAX - 10, 0, 20, 20, i32::MAX, 10));
    }

    #[test]
    fn test_bezier_straight() {
        let p = [(0, 0), (10, 0), (20, 0), (30, 0)];
        assert_eq!(point_to_bezier(&p, 15, 0), 0);
        assert_eq!(point_to_bezier(&p, 15, 7), 7);
    }
}
