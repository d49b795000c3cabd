//! 绘制驱动与图纸尺寸
//!
//! 图元按图层从低到高绘制，焊盘钻孔最后单独一遍绘制。图纸尺寸通过在
//! [`NullGraphics`] 上完整绘制一次、读取映射器追踪到的外包框得到。

use crate::graphics::{Graphics, NullGraphics};
use crate::layer::MAX_LAYERS;
use crate::map_coordinates::{MapCoordinates, MIN_MAGNITUDE};
use crate::math::{DimensionG, PointG};
use crate::model::DrawingModel;
use crate::primitives::{DrawContext, GraphicPrimitive, Primitive};

/// 绘制整张图纸
///
/// 除只画钻孔的情况外，绘制前会清空映射器的外包框，绘制后可从中读出
/// 图纸的设备坐标范围。
pub fn draw_model(model: &mut DrawingModel, g: &mut dyn Graphics, map: &mut MapCoordinates) {
    if !model.draw_only_pads {
        map.reset_min_max();
    }
    let ctx = DrawContext {
        layers: &model.layers,
        config: &model.config,
        only_layer: model.draw_only_layer,
        only_pads: model.draw_only_pads,
    };
    draw_primitives(&mut model.primitives, g, map, &ctx);
}

/// 按上下文绘制一组图元；宏展开时递归调用
pub fn draw_primitives(
    primitives: &mut [Primitive],
    g: &mut dyn Graphics,
    map: &mut MapCoordinates,
    ctx: &DrawContext<'_>,
) {
    if !ctx.only_pads {
        let passes = match ctx.only_layer {
            Some(l) => l..l + 1,
            None => 0..MAX_LAYERS,
        };
        for l in passes {
            let pass = DrawContext {
                only_layer: Some(l),
                ..*ctx
            };
            for p in primitives.iter_mut() {
                if p.contains_layer(l) {
                    p.draw(g, map, &pass);
                }
            }
        }
    }

    let need_holes = ctx.only_pads || primitives.iter().any(|p| p.needs_holes());
    // 单层绘制（宏内部）不画钻孔，由最外层统一处理
    if need_holes && (ctx.only_pads || ctx.only_layer.is_none()) {
        let holes = DrawContext {
            only_pads: true,
            only_layer: None,
            ..*ctx
        };
        for p in primitives.iter_mut().filter(|p| p.needs_holes()) {
            p.draw(g, map, &holes);
        }
    }
}

/// 计算图纸的尺寸与原点（设备坐标）
///
/// `count_min` 为 true 时尺寸为外包框大小，否则从坐标原点算起。宽高至少为 1。
pub fn image_size(model: &mut DrawingModel, unit_per_pixel: f64, count_min: bool) -> (DimensionG, PointG) {
    let mut map = MapCoordinates::new();
    map.set_magnitudes(unit_per_pixel, unit_per_pixel);
    map.set_x_center(0.0);
    map.set_y_center(0.0);

    model.invalidate_all();
    let only_pads = std::mem::replace(&mut model.draw_only_pads, false);
    draw_model(model, &mut NullGraphics::new(), &mut map);
    model.draw_only_pads = only_pads;
    model.invalidate_all();

    if !map.has_tracked() {
        return (DimensionG::new(1, 1), PointG::new(0, 0));
    }
    let (width, height) = if count_min {
        (map.x_max() - map.x_min(), map.y_max() - map.y_min())
    } else {
        (map.x_max(), map.y_max())
    };
    (
        DimensionG::new(width.max(1), height.max(1)),
        PointG::new(map.x_min(), map.y_min()),
    )
}

/// 计算使图纸恰好放入 `size_x` × `size_y` 区域的映射
///
/// 缩放取两个方向中较小者，四舍五入到两位小数，下限为最小缩放。
pub fn calculate_zoom_to_fit(
    model: &mut DrawingModel,
    size_x: i32,
    size_y: i32,
    count_min: bool,
) -> MapCoordinates {
    let (d, origin) = image_size(model, 1.0, count_min);
    let origin = if count_min { origin } else { PointG::new(0, 0) };
    let max_x = (d.width + 1) as f64;
    let max_y = (d.height + 1) as f64;

    let zoom_x = size_x as f64 / max_x;
    let zoom_y = size_y as f64 / max_y;
    let z = ((zoom_x.min(zoom_y) * 100.0).round() / 100.0).max(MIN_MAGNITUDE);

    let mut map = MapCoordinates::new();
    map.set_magnitudes_no_check(z, z);
    let z = map.y_magnitude();
    // 平移使外包框左上角落在设备原点
    map.set_x_center(-origin.x as f64 * z);
    map.set_y_center(-origin.y as f64 * z);
    map
}
