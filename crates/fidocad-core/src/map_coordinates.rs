//! 逻辑坐标到设备坐标的映射
//!
//! 普通图纸使用 `x * xm + xc` 的线性映射；宏内部的坐标先平移 -100，再按
//! 四个方向与镜像标志旋转。每次整数映射都会更新外包框，用于计算图像尺寸。

use serde::{Deserialize, Serialize};

/// 最小缩放倍率
pub const MIN_MAGNITUDE: f64 = 0.25;

/// 最大缩放倍率
pub const MAX_MAGNITUDE: f64 = 100.0;

/// 宏坐标系原点偏移
const MACRO_OFFSET: f64 = 100.0;

/// 可保存/恢复的映射状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MapState {
    x_center: f64,
    y_center: f64,
    x_magnitude: f64,
    y_magnitude: f64,
    orientation: i32,
    mirror: bool,
    is_macro: bool,
    snap_active: bool,
    x_min: i32,
    x_max: i32,
    y_min: i32,
    y_max: i32,
    x_grid_step: i32,
    y_grid_step: i32,
}

/// 坐标映射器
#[derive(Debug, Clone)]
pub struct MapCoordinates {
    state: MapState,
    stack: Vec<MapState>,
}

impl Default for MapCoordinates {
    fn default() -> Self {
        Self::new()
    }
}

impl MapCoordinates {
    pub fn new() -> Self {
        Self {
            state: MapState {
                x_center: 0.0,
                y_center: 0.0,
                x_magnitude: 1.0,
                y_magnitude: 1.0,
                orientation: 0,
                mirror: false,
                is_macro: false,
                snap_active: true,
                x_min: i32::MAX,
                x_max: i32::MIN,
                y_min: i32::MAX,
                y_max: i32::MIN,
                x_grid_step: 5,
                y_grid_step: 5,
            },
            stack: Vec::new(),
        }
    }

    /// 宏展开用的子坐标系：继承缩放，原点位于宏插入点的设备坐标
    pub fn for_macro(parent: &MapCoordinates, x: i32, y: i32, orientation: i32, mirror: bool) -> Self {
        let mut m = Self::new();
        m.set_x_magnitude(parent.x_magnitude());
        m.set_y_magnitude(parent.y_magnitude());
        m.set_x_center(parent.map_xr(x as f64, y as f64));
        m.set_y_center(parent.map_yr(x as f64, y as f64));
        m.set_orientation((orientation + parent.orientation()) % 4);
        m.state.mirror = mirror ^ parent.mirror();
        m.state.is_macro = true;
        m
    }

    // ===== 状态栈 =====

    /// 保存当前状态
    pub fn push(&mut self) {
        self.stack.push(self.state.clone());
    }

    /// 恢复最近一次保存的状态
    pub fn pop(&mut self) {
        match self.stack.pop() {
            Some(s) => self.state = s,
            None => tracing::warn!("Cannot pop the coordinate state out of an empty stack"),
        }
    }

    // ===== 属性 =====

    pub fn set_orientation(&mut self, o: i32) {
        self.state.orientation = o.clamp(0, 3);
    }

    pub fn orientation(&self) -> i32 {
        self.state.orientation
    }

    pub fn set_mirror(&mut self, mirror: bool) {
        self.state.mirror = mirror;
    }

    pub fn mirror(&self) -> bool {
        self.state.mirror
    }

    pub fn set_macro(&mut self, is_macro: bool) {
        self.state.is_macro = is_macro;
    }

    pub fn is_macro(&self) -> bool {
        self.state.is_macro
    }

    pub fn set_snap(&mut self, s: bool) {
        self.state.snap_active = s;
    }

    pub fn snap(&self) -> bool {
        self.state.snap_active
    }

    /// 设置 X 方向栅格步长，非正值被忽略
    pub fn set_x_grid_step(&mut self, step: i32) {
        if step > 0 {
            self.state.x_grid_step = step;
        }
    }

    pub fn set_y_grid_step(&mut self, step: i32) {
        if step > 0 {
            self.state.y_grid_step = step;
        }
    }

    pub fn x_grid_step(&self) -> i32 {
        self.state.x_grid_step
    }

    pub fn y_grid_step(&self) -> i32 {
        self.state.y_grid_step
    }

    pub fn x_magnitude(&self) -> f64 {
        self.state.x_magnitude
    }

    pub fn y_magnitude(&self) -> f64 {
        self.state.y_magnitude
    }

    /// 设置 X 缩放倍率，绝对值被限制在 [MIN_MAGNITUDE, MAX_MAGNITUDE]
    pub fn set_x_magnitude(&mut self, m: f64) {
        self.state.x_magnitude = clamp_magnitude(m);
    }

    pub fn set_y_magnitude(&mut self, m: f64) {
        self.state.y_magnitude = clamp_magnitude(m);
    }

    pub fn set_magnitudes(&mut self, xm: f64, ym: f64) {
        self.set_x_magnitude(xm);
        self.set_y_magnitude(ym);
    }

    /// 不做范围检查地设置缩放倍率
    pub fn set_magnitudes_no_check(&mut self, xm: f64, ym: f64) {
        self.state.x_magnitude = xm;
        self.state.y_magnitude = ym;
    }

    pub fn x_center(&self) -> f64 {
        self.state.x_center
    }

    pub fn y_center(&self) -> f64 {
        self.state.y_center
    }

    pub fn set_x_center(&mut self, c: f64) {
        self.state.x_center = c;
    }

    pub fn set_y_center(&mut self, c: f64) {
        self.state.y_center = c;
    }

    // ===== 外包框追踪 =====

    pub fn x_min(&self) -> i32 {
        self.state.x_min
    }

    pub fn x_max(&self) -> i32 {
        self.state.x_max
    }

    pub fn y_min(&self) -> i32 {
        self.state.y_min
    }

    pub fn y_max(&self) -> i32 {
        self.state.y_max
    }

    pub fn reset_min_max(&mut self) {
        self.state.x_min = i32::MAX;
        self.state.y_min = i32::MAX;
        self.state.x_max = i32::MIN;
        self.state.y_max = i32::MIN;
    }

    /// 是否已追踪到至少一个点
    pub fn has_tracked(&self) -> bool {
        self.state.x_min <= self.state.x_max && self.state.y_min <= self.state.y_max
    }

    /// 将任意设备坐标点计入外包框
    pub fn track_point(&mut self, xp: f64, yp: f64) {
        let s = &mut self.state;
        if yp < s.y_min as f64 {
            s.y_min = yp as i32;
        }
        if yp > s.y_max as f64 {
            s.y_max = yp as i32;
        }
        if xp < s.x_min as f64 {
            s.x_min = xp as i32;
        }
        if xp > s.x_max as f64 {
            s.x_max = xp as i32;
        }
    }

    // ===== 映射 =====

    /// 映射 X 并追踪
    pub fn map_x(&mut self, xc: f64, yc: f64) -> i32 {
        self.map_xi(xc, yc, true)
    }

    /// 映射 Y 并追踪
    pub fn map_y(&mut self, xc: f64, yc: f64) -> i32 {
        self.map_yi(xc, yc, true)
    }

    pub fn map_xi(&mut self, xc: f64, yc: f64, track: bool) -> i32 {
        let v = round_half_up(self.map_xr(xc, yc));
        if track {
            self.state.x_min = self.state.x_min.min(v);
            self.state.x_max = self.state.x_max.max(v);
        }
        v
    }

    pub fn map_yi(&mut self, xc: f64, yc: f64, track: bool) -> i32 {
        let v = round_half_up(self.map_yr(xc, yc));
        if track {
            self.state.y_min = self.state.y_min.min(v);
            self.state.y_max = self.state.y_max.max(v);
        }
        v
    }

    /// 映射 X（不取整、不追踪）
    pub fn map_xr(&self, xc: f64, yc: f64) -> f64 {
        let s = &self.state;
        let vx = if s.is_macro {
            let xc = xc - MACRO_OFFSET;
            let yc = yc - MACRO_OFFSET;
            match (s.mirror, s.orientation) {
                (false, 1) => -yc * s.y_magnitude,
                (false, 2) => -xc * s.x_magnitude,
                (false, 3) => yc * s.y_magnitude,
                (false, _) => xc * s.x_magnitude,
                (true, 1) => yc * s.y_magnitude,
                (true, 2) => xc * s.x_magnitude,
                (true, 3) => -yc * s.y_magnitude,
                (true, _) => -xc * s.x_magnitude,
            }
        } else {
            xc * s.x_magnitude
        };
        vx + s.x_center
    }

    /// 映射 Y（不取整、不追踪）
    pub fn map_yr(&self, xc: f64, yc: f64) -> f64 {
        let s = &self.state;
        let vy = if s.is_macro {
            let xc = xc - MACRO_OFFSET;
            let yc = yc - MACRO_OFFSET;
            match s.orientation {
                1 => xc * s.x_magnitude,
                2 => -yc * s.y_magnitude,
                3 => -xc * s.x_magnitude,
                _ => yc * s.y_magnitude,
            }
        } else {
            yc * s.y_magnitude
        };
        vy + s.y_center
    }

    // ===== 反映射 =====

    pub fn unmap_x_nosnap(&self, x: i32) -> i32 {
        round_half_up((x as f64 - self.state.x_center) / self.state.x_magnitude)
    }

    pub fn unmap_y_nosnap(&self, y: i32) -> i32 {
        round_half_up((y as f64 - self.state.y_center) / self.state.y_magnitude)
    }

    /// 反映射 X，启用捕捉时对齐到栅格
    pub fn unmap_x_snap(&self, x: i32) -> i32 {
        let xc = self.unmap_x_nosnap(x);
        if self.state.snap_active {
            snap_to(xc, self.state.x_grid_step)
        } else {
            xc
        }
    }

    pub fn unmap_y_snap(&self, y: i32) -> i32 {
        let yc = self.unmap_y_nosnap(y);
        if self.state.snap_active {
            snap_to(yc, self.state.y_grid_step)
        } else {
            yc
        }
    }

    /// 缓存失效判定用的视图签名
    pub fn view_key(&self) -> ViewKey {
        ViewKey {
            x_center: self.state.x_center,
            y_center: self.state.y_center,
            x_magnitude: self.state.x_magnitude,
            y_magnitude: self.state.y_magnitude,
            orientation: self.state.orientation,
            mirror: self.state.mirror,
            is_macro: self.state.is_macro,
        }
    }
}

/// 影响设备坐标的映射参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewKey {
    x_center: f64,
    y_center: f64,
    x_magnitude: f64,
    y_magnitude: f64,
    orientation: i32,
    mirror: bool,
    is_macro: bool,
}

fn clamp_magnitude(m: f64) -> f64 {
    if m.abs() < MIN_MAGNITUDE {
        MIN_MAGNITUDE
    } else if m.abs() > MAX_MAGNITUDE {
        MAX_MAGNITUDE
    } else {
        m
    }
}

fn snap_to(v: i32, step: i32) -> i32 {
    round_half_up(v as f64 / step as f64) * step
}

/// 半数向正无穷取整：-2.5 得 -2
fn round_half_up(v: f64) -> i32 {
    (v + 0.5).floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_unmap_roundtrip() {
        let mut m = MapCoordinates::new();
        m.set_magnitudes(2.5, 2.5);
        m.set_x_center(17.0);
        m.set_y_center(-4.0);
        for &(x, y) in &[(0, 0), (13, -7), (250, 125), (-60, 33)] {
            let px = m.map_x(x as f64, y as f64);
            let py = m.map_y(x as f64, y as f64);
            assert_eq!(m.unmap_x_nosnap(px), x);
            assert_eq!(m.unmap_y_nosnap(py), y);
        }
    }

    #[test]
    fn test_roundtrip_under_every_orientation() {
        for mirror in [false, true] {
            for o in 0..4 {
                let mut m = MapCoordinates::new();
                m.set_orientation(o);
                m.set_mirror(mirror);
                m.set_magnitudes(1.5, 1.5);
                m.set_x_center(-31.0);
                m.set_y_center(12.0);
                for &(x, y) in &[(0, 0), (7, -3), (-45, 90), (1000, -1000)] {
                    let px = m.map_x(x as f64, y as f64);
                    let py = m.map_y(x as f64, y as f64);
                    assert_eq!(m.unmap_x_nosnap(px), x, "o={} mirror={}", o, mirror);
                    assert_eq!(m.unmap_y_nosnap(py), y, "o={} mirror={}", o, mirror);
                }
            }
        }
    }

    #[test]
    fn test_half_values_round_up() {
        let mut m = MapCoordinates::new();
        m.set_x_center(-3.0);
        m.set_y_center(0.5);
        assert_eq!(m.map_x(0.5, 0.0), -2);
        assert_eq!(m.map_y(0.0, -3.0), -2);
        assert_eq!(m.map_x(1.0, 0.0), -2);
        m.set_x_center(0.0);
        m.set_magnitudes(2.0, 2.0);
        assert_eq!(m.unmap_x_nosnap(-5), -2);
        assert_eq!(m.unmap_x_nosnap(5), 3);
        m.set_x_grid_step(10);
        assert_eq!(m.unmap_x_snap(-30), -10);
    }

    #[test]
    fn test_macro_orientations_are_invertible() {
        // 在每个方向与镜像组合下，映射都应是保距的，并能被反解
        for mirror in [false, true] {
            for o in 0..4 {
                let mut m = MapCoordinates::new();
                m.set_macro(true);
                m.set_mirror(mirror);
                m.set_orientation(o);
                m.set_magnitudes(3.0, 3.0);

                let (x, y) = (117.0, 94.0);
                let vx = (m.map_xr(x, y) - m.x_center()) / 3.0;
                let vy = (m.map_yr(x, y) - m.y_center()) / 3.0;
                let (lx, ly) = (x - 100.0, y - 100.0);

                let (rx, ry) = match o {
                    0 => (vx, vy),
                    1 => (vy, -vx),
                    2 => (-vx, -vy),
                    _ => (-vy, vx),
                };
                let rx = if mirror {
                    match o {
                        1 | 3 => rx,
                        _ => -rx,
                    }
                } else {
                    rx
                };
                let ry = if mirror && (o == 1 || o == 3) { -ry } else { ry };
                assert!((rx - lx).abs() < 1e-9, "o={} mirror={}", o, mirror);
                assert!((ry - ly).abs() < 1e-9, "o={} mirror={}", o, mirror);
            }
        }
    }

    #[test]
    fn test_magnitude_clamped() {
        let mut m = MapCoordinates::new();
        m.set_magnitudes(0.01, 1000.0);
        assert_eq!(m.x_magnitude(), MIN_MAGNITUDE);
        assert_eq!(m.y_magnitude(), MAX_MAGNITUDE);
        m.set_magnitudes_no_check(0.01, 0.01);
        assert_eq!(m.x_magnitude(), 0.01);
    }

    #[test]
    fn test_snap() {
        let mut m = MapCoordinates::new();
        m.set_x_grid_step(10);
        m.set_x_grid_step(-3);
        assert_eq!(m.x_grid_step(), 10);
        assert_eq!(m.unmap_x_snap(14), 10);
        assert_eq!(m.unmap_x_snap(16), 20);
        m.set_snap(false);
        assert_eq!(m.unmap_x_snap(16), 16);
    }

    #[test]
    fn test_tracking_and_stack() {
        let mut m = MapCoordinates::new();
        assert!(!m.has_tracked());
        m.map_x(10.0, 0.0);
        m.map_y(0.0, -5.0);
        m.map_x(-3.0, 0.0);
        m.map_y(0.0, 8.0);
        assert_eq!((m.x_min(), m.x_max(), m.y_min(), m.y_max()), (-3, 10, -5, 8));

        m.push();
        m.set_orientation(7);
        assert_eq!(m.orientation(), 3);
        m.pop();
        assert_eq!(m.orientation(), 0);
        // 空栈弹出不改变状态
        m.pop();
        assert_eq!(m.x_max(), 10);
    }
}
