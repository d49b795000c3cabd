//! 图纸模型
//!
//! 持有图元、图层表与宏库。插入后按图层做稳定排序，同时统计实际用到的
//! 图层，绘制与导出据此逐层遍历。

use std::sync::Arc;

use crate::config::DrawingConfig;
use crate::layer::{standard_layers, LayerDesc, MAX_LAYERS};
use crate::library::Library;
use crate::primitives::{GraphicPrimitive, Primitive, DEFAULT_FONT_SIZE};

#[derive(Debug, Clone)]
pub struct DrawingModel {
    pub primitives: Vec<Primitive>,
    pub layers: Vec<LayerDesc>,
    pub library: Arc<Library>,
    pub config: DrawingConfig,
    /// 名称/数值文字的字体
    pub text_font: String,
    pub text_font_size: i32,
    /// 只绘制/导出焊盘钻孔
    pub draw_only_pads: bool,
    /// 只绘制/导出该图层
    pub draw_only_layer: Option<usize>,
    layers_used: [bool; MAX_LAYERS],
    max_layer: usize,
}

impl Default for DrawingModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingModel {
    pub fn new() -> Self {
        Self::with_library(Arc::new(Library::new()))
    }

    pub fn with_library(library: Arc<Library>) -> Self {
        let config = DrawingConfig::default();
        Self {
            primitives: Vec::new(),
            layers: standard_layers(),
            library,
            text_font: config.default_text_font.clone(),
            text_font_size: DEFAULT_FONT_SIZE,
            config,
            draw_only_pads: false,
            draw_only_layer: None,
            layers_used: [false; MAX_LAYERS],
            max_layer: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// 删除所有图元，图层与配置保持不变
    pub fn clear(&mut self) {
        self.primitives.clear();
        self.layers_used = [false; MAX_LAYERS];
        self.max_layer = 0;
    }

    /// 替换宏库；已展开的宏不受影响，需重新解析图纸
    pub fn set_library(&mut self, library: Arc<Library>) {
        self.library = library;
    }

    pub fn add_primitive(&mut self, p: Primitive, sort: bool) {
        self.primitives.push(p);
        if sort {
            self.sort_primitive_layers();
        }
    }

    /// 按图层稳定排序，并重新统计用到的图层
    pub fn sort_primitive_layers(&mut self) {
        self.primitives.sort_by_key(|p| p.layer());
        self.layers_used = [false; MAX_LAYERS];
        self.max_layer = 0;
        for p in &self.primitives {
            self.max_layer = self.max_layer.max(p.max_layer());
            for (l, used) in self.layers_used.iter_mut().enumerate() {
                if !*used && p.contains_layer(l) {
                    *used = true;
                }
            }
        }
    }

    /// 图纸中用到的最大图层号
    pub fn max_layer(&self) -> usize {
        self.max_layer
    }

    /// 图纸中是否有图元位于图层 `l`（宏内部的图元也计入）
    pub fn contains_layer(&self, l: usize) -> bool {
        self.layers_used.get(l).copied().unwrap_or(false)
    }

    /// 设置名称/数值文字的字体，应用到所有图元
    pub fn set_text_font(&mut self, font: &str, size: i32) {
        self.text_font = font.to_string();
        self.text_font_size = size.max(1);
        for p in self.primitives.iter_mut() {
            p.base_mut().set_font(font, size);
            p.invalidate();
        }
    }

    /// 使所有缓存失效（图层或配置改变后调用）
    pub fn invalidate_all(&mut self) {
        for p in self.primitives.iter_mut() {
            p.invalidate();
        }
    }

    /// 选中图元的数量
    pub fn selected_count(&self) -> usize {
        self.primitives.iter().filter(|p| p.base().selected).count()
    }

    pub fn deselect_all(&mut self) {
        for p in self.primitives.iter_mut() {
            p.base_mut().selected = false;
        }
    }

    /// 距离点 (px, py) 最近的图元及其距离
    pub fn nearest(&self, px: i32, py: i32) -> Option<(usize, i32)> {
        self.primitives
            .iter()
            .enumerate()
            .filter(|(_, p)| self.layers.get(p.layer()).map_or(true, |l| l.visible))
            .map(|(i, p)| (i, p.distance_to_point(px, py)))
            .min_by_key(|&(_, d)| d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TEXT_FONT;
    use crate::math::PointG;
    use crate::primitives::{Connection, Line};

    fn line(layer: usize) -> Primitive {
        Primitive::Line(Line::with_points(
            PointG::new(0, 0),
            PointG::new(10, 0),
            layer,
            DEFAULT_TEXT_FONT,
            4,
        ))
    }

    #[test]
    fn test_sort_is_stable_by_layer() {
        let mut model = DrawingModel::new();
        model.add_primitive(line(3), false);
        model.add_primitive(line(1), false);
        model.add_primitive(
            Primitive::Connection(Connection::at(5, 5, 1, DEFAULT_TEXT_FONT, 4)),
            false,
        );
        model.add_primitive(line(0), true);

        let layers: Vec<usize> = model.primitives.iter().map(|p| p.layer()).collect();
        assert_eq!(layers, vec![0, 1, 1, 3]);
        assert_eq!(model.primitives[1].type_name(), "Line");
        assert_eq!(model.primitives[2].type_name(), "Connection");
        assert_eq!(model.max_layer(), 3);
        assert!(model.contains_layer(1));
        assert!(!model.contains_layer(2));
    }

    #[test]
    fn test_nearest_skips_hidden_layers() {
        let mut model = DrawingModel::new();
        model.add_primitive(line(0), false);
        model.add_primitive(line(2), true);
        assert!(model.nearest(5, 0).is_some());
        model.layers[0].visible = false;
        assert_eq!(model.nearest(5, 0), Some((1, 0)));
    }

    #[test]
    fn test_set_text_font() {
        let mut model = DrawingModel::new();
        model.add_primitive(line(0), true);
        model.set_text_font("Arial", 0);
        assert_eq!(model.text_font_size, 1);
        assert_eq!(model.primitives[0].base().font, "Arial");
        model.clear();
        assert!(model.is_empty());
    }
}
