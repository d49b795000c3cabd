//! 自然三次样条
//!
//! 对每个坐标轴分别求解三对角（开曲线）或循环三对角（闭曲线）方程组，
//! 得到逐段的三次多项式。每段在 u=0 与 u=1 处精确经过相邻两个控制点。

use crate::math::Point2;

/// 每段三次曲线的折线近似步数
pub const STEPS: usize = 24;

/// 单段三次多项式 `a + b u + c u² + d u³`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cubic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    /// 起点导数
    pub d1: f64,
    /// 终点导数
    pub d2: f64,
}

impl Cubic {
    fn from_derivatives(x0: f64, x1: f64, d0: f64, d1: f64) -> Self {
        Self {
            a: x0,
            b: d0,
            c: 3.0 * (x1 - x0) - 2.0 * d0 - d1,
            d: 2.0 * (x0 - x1) + d0 + d1,
            d1: d0,
            d2: d1,
        }
    }

    /// Horner 法求值
    pub fn eval(&self, u: f64) -> f64 {
        ((self.d * u + self.c) * u + self.b) * u + self.a
    }
}

/// 开曲线：n+1 个点得到 n 段
pub fn natural_cubic(x: &[f64]) -> Vec<Cubic> {
    if x.len() < 2 {
        return Vec::new();
    }
    let n = x.len() - 1;
    let mut gamma = vec![0.0; n + 1];
    let mut delta = vec![0.0; n + 1];
    let mut dd = vec![0.0; n + 1];

    gamma[0] = 0.5;
    for i in 1..n {
        gamma[i] = 1.0 / (4.0 - gamma[i - 1]);
    }
    gamma[n] = 1.0 / (2.0 - gamma[n - 1]);

    delta[0] = 3.0 * (x[1] - x[0]) * gamma[0];
    for i in 1..n {
        delta[i] = (3.0 * (x[i + 1] - x[i - 1]) - delta[i - 1]) * gamma[i];
    }
    delta[n] = (3.0 * (x[n] - x[n - 1]) - delta[n - 1]) * gamma[n];

    dd[n] = delta[n];
    for i in (0..n).rev() {
        dd[i] = delta[i] - gamma[i] * dd[i + 1];
    }

    (0..n)
        .map(|i| Cubic::from_derivatives(x[i], x[i + 1], dd[i], dd[i + 1]))
        .collect()
}

/// 闭曲线：n+1 个点得到 n+1 段，最后一段回到起点
pub fn natural_cubic_closed(x: &[f64]) -> Vec<Cubic> {
    if x.len() < 2 {
        return Vec::new();
    }
    let n = x.len() - 1;
    let mut w = vec![0.0; n + 1];
    let mut v = vec![0.0; n + 1];
    let mut y = vec![0.0; n + 1];
    let mut dd = vec![0.0; n + 1];

    let mut z = 0.25;
    w[1] = z;
    v[1] = z;
    y[0] = z * 3.0 * (x[1] - x[n]);
    let mut hh = 4.0;
    let mut ff = 3.0 * (x[0] - x[n - 1]);
    let mut gg = 1.0;

    for k in 1..n {
        z = 1.0 / (4.0 - v[k]);
        v[k + 1] = z;
        w[k + 1] = -z * w[k];
        y[k] = z * (3.0 * (x[k + 1] - x[k - 1]) - y[k - 1]);
        hh -= gg * w[k];
        ff -= gg * y[k - 1];
        gg *= -v[k];
    }
    hh -= (gg + 1.0) * (v[n] + w[n]);
    y[n] = ff - (gg + 1.0) * y[n - 1];

    dd[n] = y[n] / hh;
    dd[n - 1] = y[n - 1] - (v[n] + w[n]) * dd[n];
    for k in (0..n.saturating_sub(1)).rev() {
        dd[k] = y[k] - v[k + 1] * dd[k + 1] - w[k + 1] * dd[n];
    }

    let mut cc: Vec<Cubic> = (0..n)
        .map(|k| Cubic::from_derivatives(x[k], x[k + 1], dd[k], dd[k + 1]))
        .collect();
    cc.push(Cubic::from_derivatives(x[n], x[0], dd[n], dd[0]));
    cc
}

/// 曲线的折线近似与各控制点处的导数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurveStorage {
    /// 折线顶点：起点加每段 STEPS 个点
    pub points: Vec<Point2>,
    /// 每段起点的导数，最后附加末点导数
    pub derivatives: Vec<Point2>,
}

impl CurveStorage {
    /// 对两轴的样条采样
    pub fn sample(xx: &[Cubic], yy: &[Cubic]) -> Option<Self> {
        let (first_x, first_y) = (xx.first()?, yy.first()?);
        let (last_x, last_y) = (xx.last()?, yy.last()?);

        let mut c = CurveStorage {
            points: Vec::with_capacity(xx.len() * STEPS + 1),
            derivatives: Vec::with_capacity(xx.len() + 1),
        };
        c.points.push(Point2::new(first_x.eval(0.0), first_y.eval(0.0)));
        for (cx, cy) in xx.iter().zip(yy) {
            c.derivatives.push(Point2::new(cx.d1, cy.d1));
            for j in 1..=STEPS {
                let u = j as f64 / STEPS as f64;
                c.points.push(Point2::new(cx.eval(u), cy.eval(u)));
            }
        }
        c.derivatives.push(Point2::new(last_x.d2, last_y.d2));
        Some(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_interpolates(x: &[f64], cc: &[Cubic], closed: bool) {
        for (i, c) in cc.iter().enumerate() {
            let next = if closed && i + 1 == x.len() { 0 } else { i + 1 };
            assert!((c.eval(0.0) - x[i]).abs() < 1e-9, "segment {} start", i);
            assert!((c.eval(1.0) - x[next]).abs() < 1e-9, "segment {} end", i);
        }
    }

    #[test]
    fn test_open_spline_passes_through_points() {
        let x = [0.0, 10.0, 5.0, 30.0, 22.0];
        let cc = natural_cubic(&x);
        assert_eq!(cc.len(), x.len() - 1);
        assert_interpolates(&x, &cc, false);
        // 相邻段在连接点处一阶导数连续
        for w in cc.windows(2) {
            assert!((w[0].d2 - w[1].d1).abs() < 1e-12);
        }
    }

    #[test]
    fn test_closed_spline_passes_through_points() {
        let x = [0.0, 40.0, 35.0, -5.0];
        let cc = natural_cubic_closed(&x);
        assert_eq!(cc.len(), x.len());
        assert_interpolates(&x, &cc, true);
    }

    #[test]
    fn test_two_point_closed_spline() {
        let cc = natural_cubic_closed(&[0.0, 10.0]);
        assert_eq!(cc.len(), 2);
        assert_interpolates(&[0.0, 10.0], &cc, true);
    }

    #[test]
    fn test_straight_line_stays_straight() {
        let x = [0.0, 10.0, 20.0];
        let cc = natural_cubic(&x);
        assert!((cc[0].eval(0.5) - 5.0).abs() < 1e-9);
        assert!(natural_cubic(&[1.0]).is_empty());
    }

    #[test]
    fn test_sample_point_count() {
        let xx = natural_cubic(&[0.0, 10.0, 20.0]);
        let yy = natural_cubic(&[0.0, 5.0, 0.0]);
        let c = CurveStorage::sample(&xx, &yy).expect("Failed to sample");
        assert_eq!(c.points.len(), 2 * STEPS + 1);
        assert_eq!(c.derivatives.len(), 3);
        assert!((c.points[STEPS] - Point2::new(10.0, 5.0)).norm() < 1e-9);
        assert!(CurveStorage::sample(&[], &[]).is_none());
    }
}
