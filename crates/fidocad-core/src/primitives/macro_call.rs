//! 宏调用 `MC`
//!
//! 宏在解析时按库中的描述展开成一组图元，坐标保存在宏自身的局部坐标系里
//! （插入点对应局部坐标 (100, 100)）。绘制与导出时通过
//! [`MapCoordinates::for_macro`] 建立子坐标系。

use std::io;
use std::sync::Arc;

use super::{
    select_by_handles, DrawContext, ExportContext, GraphicPrimitive, Primitive, PrimitiveBase,
};
use crate::drawing::draw_primitives;
use crate::error::{int_token, FidoError, Result};
use crate::export::{export_primitives, ExportInterface, MacroSpec};
use crate::graphics::Graphics;
use crate::library::Library;
use crate::map_coordinates::MapCoordinates;
use crate::math::{mirror_coord, PointG};
use crate::parser::parse_macro_contents;

/// 宏嵌套的最大层数，防止库中出现自引用
pub const MAX_MACRO_DEPTH: usize = 16;

/// 局部坐标系中插入点的位置
const LOCAL_ORIGIN: i32 = 100;

#[derive(Debug, Clone)]
pub struct MacroCall {
    base: PrimitiveBase,
    /// 0..3，每步 90°
    pub orientation: i32,
    pub mirror: bool,
    key: String,
    description: String,
    library: Arc<Library>,
    contents: Vec<Primitive>,
    already_exported: bool,
    depth: usize,
}

impl MacroCall {
    pub fn new(library: Arc<Library>, font: &str, font_size: i32) -> Self {
        Self::with_depth(library, font, font_size, 0)
    }

    pub(crate) fn with_depth(library: Arc<Library>, font: &str, font_size: i32, depth: usize) -> Self {
        Self {
            base: PrimitiveBase::new(1, true, font, font_size),
            orientation: 0,
            mirror: false,
            key: String::new(),
            description: String::new(),
            library,
            contents: Vec::new(),
            already_exported: false,
            depth,
        }
    }

    /// 宏键（小写）
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 展开后的图元
    pub fn contents(&self) -> &[Primitive] {
        &self.contents
    }

    /// 把图纸坐标转换到宏的局部坐标
    fn to_local(&self, px: i32, py: i32) -> (i32, i32) {
        let o = self.base.points[0];
        let (dx, dy) = (px - o.x, py - o.y);
        let (vx, vy) = match (self.mirror, self.orientation) {
            (false, 1) => (dy, -dx),
            (false, 2) => (-dx, -dy),
            (false, 3) => (-dy, dx),
            (false, _) => (dx, dy),
            (true, 1) => (dy, dx),
            (true, 2) => (dx, -dy),
            (true, 3) => (-dy, -dx),
            (true, _) => (-dx, dy),
        };
        (vx + LOCAL_ORIGIN, vy + LOCAL_ORIGIN)
    }

    fn child_map(&self, map: &MapCoordinates) -> MapCoordinates {
        let o = self.base.points[0];
        MapCoordinates::for_macro(map, o.x, o.y, self.orientation, self.mirror)
    }
}

impl GraphicPrimitive for MacroCall {
    fn base(&self) -> &PrimitiveBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PrimitiveBase {
        &mut self.base
    }

    fn parse_tokens(&mut self, tokens: &[&str]) -> Result<()> {
        if tokens.first() != Some(&"MC") {
            return Err(FidoError::InvalidPrimitive(format!(
                "MC: unexpected command {}",
                tokens.first().unwrap_or(&"")
            )));
        }
        if tokens.len() < 6 {
            return Err(FidoError::bad_arguments("MC"));
        }
        let x = int_token(tokens[1])?;
        let y = int_token(tokens[2])?;
        self.base.points[0] = PointG::new(x, y);
        if let (Some(n), Some(v)) = (self.base.name_index(), self.base.value_index()) {
            self.base.points[n] = PointG::new(x + 10, y + 10);
            self.base.points[v] = PointG::new(x + 10, y + 5);
        }
        self.orientation = int_token(tokens[3])?.rem_euclid(4);
        self.mirror = int_token(tokens[4])? == 1;
        // 宏键中可能含有空格
        self.key = tokens[5..].join(" ").to_lowercase();

        let Some(desc) = self.library.get(&self.key) else {
            return Err(FidoError::UnrecognizedMacro(self.key.clone()));
        };
        if self.depth >= MAX_MACRO_DEPTH {
            return Err(FidoError::MacroTooDeep(MAX_MACRO_DEPTH));
        }
        self.description = desc.description.clone();
        self.contents = parse_macro_contents(
            &self.description,
            &self.library,
            &self.base.font,
            self.base.font_size,
            self.depth + 1,
        );
        self.already_exported = false;
        Ok(())
    }

    fn distance_to_point(&self, px: i32, py: i32) -> i32 {
        if self.base.check_text(px, py) {
            return 0;
        }
        let (vx, vy) = self.to_local(px, py);
        self.contents
            .iter()
            .map(|p| p.distance_to_point(vx, vy))
            .min()
            .unwrap_or(i32::MAX)
    }

    fn to_fcd(&self, extensions: bool) -> String {
        let o = self.base.points[0];
        let mut s = format!(
            "MC {} {} {} {} {}\n",
            o.x,
            o.y,
            self.orientation,
            if self.mirror { 1 } else { 0 },
            self.key
        );
        s.push_str(&self.base.save_text(extensions));
        s
    }

    fn draw(&mut self, g: &mut dyn Graphics, map: &mut MapCoordinates, ctx: &DrawContext<'_>) {
        // 宏本身总在第 0 层，其文字按图层选择颜色
        self.base.layer = 0;
        if !ctx.only_pads && self.base.select_layer(g, ctx.layers) {
            self.base.draw_text(g, map, ctx.config, ctx.only_layer);
        }

        let mut child = self.child_map(map);
        let selected = self.base.selected;
        for p in self.contents.iter_mut() {
            p.base_mut().selected = selected;
        }
        draw_primitives(&mut self.contents, g, &mut child, ctx);

        if child.has_tracked() {
            map.track_point(child.x_min() as f64, child.y_min() as f64);
            map.track_point(child.x_max() as f64, child.y_max() as f64);
        }
    }

    fn export(
        &mut self,
        exp: &mut dyn ExportInterface,
        map: &mut MapCoordinates,
        ctx: &ExportContext<'_>,
    ) -> io::Result<()> {
        if self.already_exported {
            return Ok(());
        }
        let o = self.base.points[0];
        let (Some(ni), Some(vi)) = (self.base.name_index(), self.base.value_index()) else {
            return Ok(());
        };
        let fs = self.base.font_size as f64;
        let handled = exp.export_macro(&MacroSpec {
            x: map.map_x(o.x as f64, o.y as f64),
            y: map.map_y(o.x as f64, o.y as f64),
            mirrored: self.mirror,
            orientation: self.orientation * 90,
            key: &self.key,
            description: &self.description,
            name: &self.base.name,
            name_pos: self.base.points[ni],
            value: &self.base.value,
            value_pos: self.base.points[vi],
            font: &self.base.font,
            font_size: (map.map_yr(fs, fs) - map.map_yr(0.0, 0.0)) as i32,
            library: &self.library,
        })?;
        if handled {
            self.already_exported = true;
            return Ok(());
        }

        let mut child = self.child_map(map);
        export_primitives(&mut self.contents, exp, &mut child, ctx)?;
        if !ctx.only_pads {
            self.base.export_text(exp, map, ctx.only_layer)?;
        }
        Ok(())
    }

    fn contains_layer(&self, l: usize) -> bool {
        self.contents.iter().any(|p| p.contains_layer(l))
    }

    fn max_layer(&self) -> usize {
        self.contents.iter().map(|p| p.max_layer()).max().unwrap_or(0)
    }

    fn needs_holes(&self) -> bool {
        self.contents.iter().any(|p| p.needs_holes())
    }

    fn is_macro(&self) -> bool {
        true
    }

    fn reset_export(&mut self) {
        self.already_exported = false;
        for p in self.contents.iter_mut() {
            p.reset_export();
        }
    }

    fn rotate(&mut self, ccw: bool, ix: i32, iy: i32) {
        super::rotate_points(&mut self.base.points, ccw, ix, iy);
        self.orientation = if ccw {
            (self.orientation + 3) % 4
        } else {
            (self.orientation + 1) % 4
        };
        self.invalidate();
    }

    fn mirror(&mut self, x_pos: i32) {
        for p in self.base.points.iter_mut() {
            p.x = mirror_coord(p.x, x_pos);
        }
        self.mirror = !self.mirror;
        self.invalidate();
    }

    /// 空宏（库中无内容）不可框选
    fn select_rect(&mut self, x: i32, y: i32, w: i32, h: i32) -> bool {
        if self.contents.is_empty() {
            return false;
        }
        select_by_handles(&mut self.base, x, y, w, h)
    }

    fn invalidate(&mut self) {
        for p in self.contents.iter_mut() {
            p.invalidate();
        }
    }
}
