//! 导出接口与导出驱动
//!
//! 每个图元在导出时调用 [`ExportInterface`] 中对应的方法，坐标均已映射到
//! 输出坐标系。[`export_header`] 与 [`export_drawing`] 负责按图层顺序遍历
//! 整个图纸，最后单独输出焊盘的钻孔，保证孔总在最上层。

use std::io;

use crate::drawing::image_size;
use crate::layer::LayerDesc;
use crate::library::Library;
use crate::map_coordinates::MapCoordinates;
use crate::math::{DimensionG, Point2, PointG};
use crate::model::DrawingModel;
use crate::primitives::{ExportContext, GraphicPrimitive, Primitive};

/// 导出图像的总留白（逻辑单位），两侧各一半
pub const EXPORT_BORDER: i32 = 6;

/// 箭头参数（输出坐标系下的长度）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrowSpec {
    pub at_start: bool,
    pub at_end: bool,
    pub style: i32,
    pub length: i32,
    pub half_width: i32,
}

impl ArrowSpec {
    pub const NONE: ArrowSpec = ArrowSpec {
        at_start: false,
        at_end: false,
        style: 0,
        length: 0,
        half_width: 0,
    };
}

/// 线型：虚线样式与线宽
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StrokeStyle {
    pub dash_style: usize,
    pub width: f64,
}

/// 高级文字
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec<'a> {
    pub x: i32,
    pub y: i32,
    pub size_x: i32,
    pub size_y: i32,
    pub font: &'a str,
    pub bold: bool,
    pub mirrored: bool,
    pub italic: bool,
    /// 角度（度）
    pub orientation: i32,
    pub layer: usize,
    pub text: &'a str,
}

/// PCB 焊盘
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadSpec {
    pub x: i32,
    pub y: i32,
    /// 0: 椭圆，1: 方形，2: 圆角方形
    pub style: i32,
    pub size_x: i32,
    pub size_y: i32,
    /// 钻孔直径
    pub hole: i32,
    pub layer: usize,
    /// 只输出钻孔
    pub only_hole: bool,
}

/// 宏调用
#[derive(Debug, Clone)]
pub struct MacroSpec<'a> {
    pub x: i32,
    pub y: i32,
    pub mirrored: bool,
    /// 角度（度）
    pub orientation: i32,
    pub key: &'a str,
    pub description: &'a str,
    pub name: &'a str,
    pub name_pos: PointG,
    pub value: &'a str,
    pub value_pos: PointG,
    pub font: &'a str,
    pub font_size: i32,
    pub library: &'a Library,
}

/// 导出目标
///
/// 具体格式（PDF、SVG……）实现这个 trait。`export_macro` 与 `export_curve`
/// 默认返回 `false`，表示由调用方把宏展开成图元、把曲线拆成折线。
pub trait ExportInterface {
    /// 导出开始，写文件头
    fn export_start(&mut self, total_size: DimensionG, layers: &[LayerDesc], grid: i32) -> io::Result<()>;

    /// 导出结束，写文件尾
    fn export_end(&mut self) -> io::Result<()>;

    /// 虚线长度的缩放系数
    fn set_dash_unit(&mut self, unit: f64);

    /// 虚线相位（输出单位）
    fn set_dash_phase(&mut self, phase: f32);

    fn export_adv_text(&mut self, text: &TextSpec<'_>) -> io::Result<()>;

    fn export_bezier(
        &mut self,
        points: &[PointG; 4],
        layer: usize,
        arrows: &ArrowSpec,
        stroke: &StrokeStyle,
    ) -> io::Result<()>;

    fn export_connection(&mut self, x: i32, y: i32, layer: usize, size: f64) -> io::Result<()>;

    fn export_line(
        &mut self,
        p1: Point2,
        p2: Point2,
        layer: usize,
        arrows: &ArrowSpec,
        stroke: &StrokeStyle,
    ) -> io::Result<()>;

    /// 返回 `true` 表示宏已整体导出
    fn export_macro(&mut self, _spec: &MacroSpec<'_>) -> io::Result<bool> {
        Ok(false)
    }

    fn export_oval(
        &mut self,
        p1: PointG,
        p2: PointG,
        filled: bool,
        layer: usize,
        stroke: &StrokeStyle,
    ) -> io::Result<()>;

    fn export_pcb_line(&mut self, p1: PointG, p2: PointG, width: i32, layer: usize) -> io::Result<()>;

    fn export_pcb_pad(&mut self, pad: &PadSpec) -> io::Result<()>;

    fn export_polygon(
        &mut self,
        vertices: &[Point2],
        filled: bool,
        layer: usize,
        stroke: &StrokeStyle,
    ) -> io::Result<()>;

    /// 返回 `true` 表示曲线已原生导出
    fn export_curve(
        &mut self,
        _vertices: &[Point2],
        _filled: bool,
        _closed: bool,
        _layer: usize,
        _arrows: &ArrowSpec,
        _stroke: &StrokeStyle,
    ) -> io::Result<bool> {
        Ok(false)
    }

    fn export_rectangle(
        &mut self,
        p1: PointG,
        p2: PointG,
        filled: bool,
        layer: usize,
        stroke: &StrokeStyle,
    ) -> io::Result<()>;

    /// 输出箭头，返回箭头底边中点（线段应在此处截断）
    fn export_arrow(
        &mut self,
        tip: Point2,
        toward: Point2,
        length: f64,
        half_width: f64,
        style: i32,
    ) -> io::Result<Point2>;
}

/// 导出选项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    /// 导出隐藏图层
    pub export_invisible: bool,
    /// 真实尺寸：每逻辑单位对应的输出单位
    pub unit_per_pixel: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            export_invisible: false,
            unit_per_pixel: 1.0,
        }
    }
}

/// 写导出头：计算图像尺寸（含留白）并调用 `export_start`
///
/// 返回的映射器已平移到图像原点，可直接传给 [`export_drawing`]。
pub fn export_header(
    model: &mut DrawingModel,
    exp: &mut dyn ExportInterface,
    options: &ExportOptions,
    grid: i32,
) -> io::Result<MapCoordinates> {
    let mag = options.unit_per_pixel;
    let (size, origin) = image_size(model, 1.0, true);
    let total = DimensionG::new(
        ((size.width + EXPORT_BORDER) as f64 * mag) as i32,
        ((size.height + EXPORT_BORDER) as f64 * mag) as i32,
    );

    let mut map = MapCoordinates::new();
    map.set_magnitudes_no_check(mag, mag);
    map.set_x_center((EXPORT_BORDER / 2 - origin.x) as f64 * mag);
    map.set_y_center((EXPORT_BORDER / 2 - origin.y) as f64 * mag);

    exp.set_dash_unit(mag);
    exp.export_start(total, &model.layers, grid)?;
    Ok(map)
}

/// 导出整张图纸：逐层输出，最后一遍输出钻孔
pub fn export_drawing(
    model: &mut DrawingModel,
    exp: &mut dyn ExportInterface,
    export_invisible: bool,
    map: &mut MapCoordinates,
) -> io::Result<()> {
    let layers = model.layers.clone();
    let config = model.config.clone();
    export_primitives(
        &mut model.primitives,
        exp,
        map,
        &ExportContext {
            layers: &layers,
            config: &config,
            only_layer: model.draw_only_layer,
            only_pads: model.draw_only_pads,
            export_invisible,
        },
    )?;
    for p in model.primitives.iter_mut() {
        p.reset_export();
    }
    tracing::debug!("Exported {} primitives", model.primitives.len());
    Ok(())
}

/// 按导出上下文遍历一组图元；宏展开时递归调用
pub fn export_primitives(
    primitives: &mut [Primitive],
    exp: &mut dyn ExportInterface,
    map: &mut MapCoordinates,
    ctx: &ExportContext<'_>,
) -> io::Result<()> {
    if !ctx.only_pads {
        match ctx.only_layer {
            Some(l) => export_layer(primitives, exp, map, ctx, l)?,
            None => {
                for l in 0..ctx.layers.len() {
                    export_layer(primitives, exp, map, ctx, l)?;
                }
            }
        }
    }

    // 钻孔最后输出
    if ctx.only_pads || ctx.only_layer.is_none() {
        let holes = ExportContext {
            only_pads: true,
            ..*ctx
        };
        for p in primitives.iter_mut() {
            if p.needs_holes() && (p.is_macro() || is_exportable(p.layer(), ctx)) {
                p.export(exp, map, &holes)?;
            }
            p.reset_export();
        }
    }
    Ok(())
}

fn export_layer(
    primitives: &mut [Primitive],
    exp: &mut dyn ExportInterface,
    map: &mut MapCoordinates,
    ctx: &ExportContext<'_>,
    layer: usize,
) -> io::Result<()> {
    let pass = ExportContext {
        only_layer: Some(layer),
        ..*ctx
    };
    for p in primitives.iter_mut() {
        // 宏内部的图元各自检查图层可见性
        if p.is_macro() || (p.layer() == layer && is_exportable(layer, ctx)) {
            p.export(exp, map, &pass)?;
        }
    }
    Ok(())
}

fn is_exportable(layer: usize, ctx: &ExportContext<'_>) -> bool {
    ctx.export_invisible || ctx.layers.get(layer).map_or(true, |l| l.visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParserActions;
    use crate::primitives::test_support::{Call, RecordingExporter};

    fn model(text: &str) -> DrawingModel {
        let mut m = DrawingModel::new();
        ParserActions::new(&mut m)
            .parse_string(text)
            .expect("Failed to parse drawing");
        m
    }

    #[test]
    fn test_line_exported_in_place() {
        let mut m = model("LI 0 0 100 100 0\n");
        let mut exp = RecordingExporter::default();
        export_drawing(&mut m, &mut exp, false, &mut MapCoordinates::new())
            .expect("Failed to export");
        assert_eq!(exp.calls.len(), 1);
        let Call::Line { p1, p2, layer, arrows, dash } = &exp.calls[0] else {
            panic!("expected a line, got {:?}", exp.calls[0]);
        };
        assert_eq!((*p1, *p2), (Point2::new(0.0, 0.0), Point2::new(100.0, 100.0)));
        assert_eq!((*layer, *dash), (0, 0));
        assert!(!arrows.at_start && !arrows.at_end);
    }

    #[test]
    fn test_layers_in_order_and_holes_last() {
        let mut m = model("PA 10 10 6 6 2 0 2\nLI 0 0 10 0 1\nSA 5 5 0\n");
        let mut exp = RecordingExporter::default();
        export_drawing(&mut m, &mut exp, false, &mut MapCoordinates::new())
            .expect("Failed to export");
        assert_eq!(exp.calls.len(), 4);
        assert!(matches!(exp.calls[0], Call::Connection { layer: 0, .. }));
        assert!(matches!(exp.calls[1], Call::Line { layer: 1, .. }));
        assert!(matches!(exp.calls[2], Call::Pad(PadSpec { only_hole: false, .. })));
        assert!(matches!(exp.calls[3], Call::Pad(PadSpec { only_hole: true, .. })));
    }

    #[test]
    fn test_invisible_layers() {
        let mut m = model("LI 0 0 10 0 0\nLI 0 0 10 0 3\n");
        m.layers[3].visible = false;
        let mut exp = RecordingExporter::default();
        export_drawing(&mut m, &mut exp, false, &mut MapCoordinates::new())
            .expect("Failed to export");
        assert_eq!(exp.calls.len(), 1);

        let mut exp = RecordingExporter::default();
        export_drawing(&mut m, &mut exp, true, &mut MapCoordinates::new())
            .expect("Failed to export");
        assert_eq!(exp.calls.len(), 2);
    }

    #[test]
    fn test_header_adds_border() {
        struct SizeProbe(Option<DimensionG>, f64);
        impl ExportInterface for SizeProbe {
            fn export_start(&mut self, s: DimensionG, _l: &[LayerDesc], _g: i32) -> io::Result<()> {
                self.0 = Some(s);
                Ok(())
            }
            fn export_end(&mut self) -> io::Result<()> {
                Ok(())
            }
            fn set_dash_unit(&mut self, unit: f64) {
                self.1 = unit;
            }
            fn set_dash_phase(&mut self, _p: f32) {}
            fn export_adv_text(&mut self, _t: &TextSpec<'_>) -> io::Result<()> {
                Ok(())
            }
            fn export_bezier(&mut self, _p: &[PointG; 4], _l: usize, _a: &ArrowSpec, _s: &StrokeStyle) -> io::Result<()> {
                Ok(())
            }
            fn export_connection(&mut self, _x: i32, _y: i32, _l: usize, _s: f64) -> io::Result<()> {
                Ok(())
            }
            fn export_line(&mut self, _a: Point2, _b: Point2, _l: usize, _r: &ArrowSpec, _s: &StrokeStyle) -> io::Result<()> {
                Ok(())
            }
            fn export_oval(&mut self, _a: PointG, _b: PointG, _f: bool, _l: usize, _s: &StrokeStyle) -> io::Result<()> {
                Ok(())
            }
            fn export_pcb_line(&mut self, _a: PointG, _b: PointG, _w: i32, _l: usize) -> io::Result<()> {
                Ok(())
            }
            fn export_pcb_pad(&mut self, _p: &PadSpec) -> io::Result<()> {
                Ok(())
            }
            fn export_polygon(&mut self, _v: &[Point2], _f: bool, _l: usize, _s: &StrokeStyle) -> io::Result<()> {
                Ok(())
            }
            fn export_rectangle(&mut self, _a: PointG, _b: PointG, _f: bool, _l: usize, _s: &StrokeStyle) -> io::Result<()> {
                Ok(())
            }
            fn export_arrow(&mut self, tip: Point2, _t: Point2, _l: f64, _h: f64, _s: i32) -> io::Result<Point2> {
                Ok(tip)
            }
        }

        let mut m = model("LI 10 10 110 60 0\n");
        let mut probe = SizeProbe(None, 0.0);
        let options = ExportOptions {
            unit_per_pixel: 2.0,
            ..Default::default()
        };
        let map = export_header(&mut m, &mut probe, &options, 5).expect("Failed to write header");
        assert_eq!(probe.0, Some(DimensionG::new(212, 112)));
        assert_eq!(probe.1, 2.0);
        // 图纸左上角落在留白之后
        assert_eq!(map.map_xr(10.0, 10.0), 6.0);
    }

    #[test]
    fn test_export_options_compare() {
        let options = ExportOptions::default();
        assert_eq!(
            options,
            ExportOptions {
                export_invisible: false,
                unit_per_pixel: 1.0,
            }
        );
        let scaled = ExportOptions {
            unit_per_pixel: 0.5,
            ..options
        };
        assert_ne!(options, scaled);
    }
}
