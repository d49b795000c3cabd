//! SVG 导出
//!
//! 每个图元直接写成一个 SVG 元素，颜色取自所在图层。

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use fidocad_core::config::DrawingConfig;
use fidocad_core::export::{ArrowSpec, ExportInterface, PadSpec, StrokeStyle, TextSpec};
use fidocad_core::layer::{Color, LayerDesc};
use fidocad_core::math::{DimensionG, Point2, PointG};
use fidocad_core::primitives::{arrow_shape, ARROW_EMPTY};

use crate::error::FileError;
use crate::util::num;

const THIN_LINE: f64 = 0.33;

/// 圆角焊盘的圆角半径
const PAD_CORNER: f64 = 2.5;

pub struct SvgExporter<W: Write> {
    out: W,
    layers: Vec<LayerDesc>,
    dash_patterns: Vec<Vec<f32>>,
    dash_arrays: Vec<String>,
    dash_phase: f32,
    current_phase: Option<f32>,
    /// 箭头颜色跟随所属图元
    arrow_color: Color,
}

impl SvgExporter<BufWriter<File>> {
    pub fn create(path: &Path, config: &DrawingConfig) -> Result<Self, FileError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), config))
    }
}

impl<W: Write> SvgExporter<W> {
    pub fn new(out: W, config: &DrawingConfig) -> Self {
        let mut exporter = Self {
            out,
            layers: Vec::new(),
            dash_patterns: config.dash.clone(),
            dash_arrays: Vec::new(),
            dash_phase: 0.0,
            current_phase: None,
            arrow_color: Color::BLACK,
        };
        exporter.set_dash_unit(1.0);
        exporter
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn layer_color(&self, layer: usize) -> Color {
        self.layers.get(layer).map_or(Color::BLACK, |l| l.color)
    }

    fn fill(c: Color, filled: bool) -> String {
        if filled {
            format!("fill=\"{}\"", c.to_hex())
        } else {
            "fill=\"none\"".to_string()
        }
    }

    /// 写描边样式并闭合元素
    fn close_with_style(&mut self, c: Color, width: f64, dash_style: usize, fill: &str) -> io::Result<()> {
        write!(self.out, "style=\"stroke:{}", c.to_hex())?;
        if dash_style > 0 {
            if let Some(array) = self.dash_arrays.get(dash_style) {
                write!(self.out, ";stroke-dasharray:{}", array)?;
            }
        }
        if self.current_phase != Some(self.dash_phase) {
            self.current_phase = Some(self.dash_phase);
            write!(self.out, ";stroke-dashoffset:{}", num(self.dash_phase as f64))?;
        }
        writeln!(
            self.out,
            ";stroke-width:{};stroke-linecap:round;fill-rule:evenodd\" {}/>",
            num(width),
            fill
        )
    }

    fn arrow_ends(
        &mut self,
        start: Point2,
        end: Point2,
        toward_start: Point2,
        toward_end: Point2,
        layer: usize,
        arrows: &ArrowSpec,
    ) -> io::Result<(Point2, Point2)> {
        self.arrow_color = self.layer_color(layer);
        let (l, h) = (arrows.length as f64, arrows.half_width as f64);
        let mut s = start;
        let mut e = end;
        if arrows.at_start {
            let base = self.export_arrow(start, toward_start, l, h, arrows.style)?;
            if arrows.length > 0 {
                s = base;
            }
        }
        if arrows.at_end {
            let base = self.export_arrow(end, toward_end, l, h, arrows.style)?;
            if arrows.length > 0 {
                e = base;
            }
        }
        Ok((s, e))
    }
}

impl<W: Write> ExportInterface for SvgExporter<W> {
    fn export_start(&mut self, total_size: DimensionG, layers: &[LayerDesc], _grid: i32) -> io::Result<()> {
        self.layers = layers.to_vec();
        self.current_phase = None;
        writeln!(
            self.out,
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>"
        )?;
        writeln!(
            self.out,
            "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">"
        )?;
        writeln!(
            self.out,
            "<svg width=\"{}\" height=\"{}\" version=\"1.1\" xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">",
            total_size.width, total_size.height
        )?;
        writeln!(
            self.out,
            "<!-- Created by fidocad {} -->",
            env!("CARGO_PKG_VERSION")
        )
    }

    fn export_end(&mut self) -> io::Result<()> {
        writeln!(self.out, "</svg>")?;
        self.out.flush()?;
        tracing::info!("SVG export finished");
        Ok(())
    }

    fn set_dash_unit(&mut self, unit: f64) {
        self.dash_arrays = self
            .dash_patterns
            .iter()
            .map(|pattern| {
                pattern
                    .iter()
                    .map(|&d| num(d as f64 * unit / 2.0))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect();
    }

    fn set_dash_phase(&mut self, phase: f32) {
        self.dash_phase = phase;
    }

    fn export_adv_text(&mut self, t: &TextSpec<'_>) -> io::Result<()> {
        if t.text.is_empty() {
            return Ok(());
        }
        let c = self.layer_color(t.layer);
        let size_y = t.size_y.max(1) as f64;
        let mut x_scale = t.size_x as f64 / 22.0 / size_y * 38.0;
        write!(self.out, "<g transform=\"translate({},{})", t.x, t.y)?;
        if t.orientation != 0 {
            let alpha = if t.mirrored { t.orientation } else { -t.orientation };
            write!(self.out, " rotate({})", alpha)?;
        }
        if t.mirrored {
            x_scale = -x_scale;
        }
        write!(self.out, " scale({},1)\">", num(x_scale))?;
        write!(
            self.out,
            "<text x=\"0\" y=\"{}\" font-family=\"{}\" font-size=\"{}\"",
            num(size_y),
            escape_xml(t.font),
            num(size_y)
        )?;
        if t.italic {
            write!(self.out, " font-style=\"italic\"")?;
        }
        if t.bold {
            write!(self.out, " font-weight=\"bold\"")?;
        }
        writeln!(
            self.out,
            " fill=\"{}\">{}</text></g>",
            c.to_hex(),
            escape_xml(t.text)
        )
    }

    fn export_bezier(
        &mut self,
        points: &[PointG; 4],
        layer: usize,
        arrows: &ArrowSpec,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        let p = points.map(PointG::to_point2);
        let (start, end) = self.arrow_ends(p[0], p[3], p[1], p[2], layer, arrows)?;
        write!(
            self.out,
            "<path d=\"M {},{} C {},{} {},{} {},{}\" ",
            num(start.x),
            num(start.y),
            num(p[1].x),
            num(p[1].y),
            num(p[2].x),
            num(p[2].y),
            num(end.x),
            num(end.y)
        )?;
        let c = self.layer_color(layer);
        self.close_with_style(c, stroke.width, stroke.dash_style, "fill=\"none\"")
    }

    fn export_connection(&mut self, x: i32, y: i32, layer: usize, size: f64) -> io::Result<()> {
        let c = self.layer_color(layer);
        writeln!(
            self.out,
            "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" style=\"stroke:{};stroke-width:{}\" fill=\"{}\"/>",
            x,
            y,
            num(size / 2.0),
            c.to_hex(),
            THIN_LINE,
            c.to_hex()
        )
    }

    fn export_line(
        &mut self,
        p1: Point2,
        p2: Point2,
        layer: usize,
        arrows: &ArrowSpec,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        let (start, end) = self.arrow_ends(p1, p2, p2, p1, layer, arrows)?;
        write!(
            self.out,
            "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" ",
            num(start.x),
            num(start.y),
            num(end.x),
            num(end.y)
        )?;
        let c = self.layer_color(layer);
        self.close_with_style(c, stroke.width, stroke.dash_style, "fill=\"none\"")
    }

    fn export_oval(
        &mut self,
        p1: PointG,
        p2: PointG,
        filled: bool,
        layer: usize,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        let c = self.layer_color(layer);
        write!(
            self.out,
            "<ellipse cx=\"{}\" cy=\"{}\" rx=\"{}\" ry=\"{}\" ",
            num((p1.x + p2.x) as f64 / 2.0),
            num((p1.y + p2.y) as f64 / 2.0),
            num((p2.x - p1.x).abs() as f64 / 2.0),
            num((p2.y - p1.y).abs() as f64 / 2.0)
        )?;
        self.close_with_style(c, stroke.width, stroke.dash_style, &Self::fill(c, filled))
    }

    fn export_pcb_line(&mut self, p1: PointG, p2: PointG, width: i32, layer: usize) -> io::Result<()> {
        let c = self.layer_color(layer);
        writeln!(
            self.out,
            "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" style=\"stroke:{};stroke-linejoin:round;stroke-linecap:round;stroke-width:{}\"/>",
            p1.x,
            p1.y,
            p2.x,
            p2.y,
            c.to_hex(),
            width
        )
    }

    fn export_pcb_pad(&mut self, pad: &PadSpec) -> io::Result<()> {
        if pad.only_hole {
            return writeln!(
                self.out,
                "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" style=\"stroke:white;stroke-width:{}\" fill=\"white\"/>",
                pad.x,
                pad.y,
                num(pad.hole as f64 / 2.0),
                THIN_LINE
            );
        }
        let hex = self.layer_color(pad.layer).to_hex();
        let (sx, sy) = (pad.size_x as f64, pad.size_y as f64);
        let (x0, y0) = (pad.x as f64 - sx / 2.0, pad.y as f64 - sy / 2.0);
        match pad.style {
            1 | 2 => {
                let r = if pad.style == 2 { PAD_CORNER } else { 0.0 };
                writeln!(
                    self.out,
                    "<rect x=\"{}\" y=\"{}\" rx=\"{r}\" ry=\"{r}\" width=\"{}\" height=\"{}\" style=\"stroke:{};stroke-width:{}\" fill=\"{}\"/>",
                    num(x0),
                    num(y0),
                    num(sx),
                    num(sy),
                    hex,
                    THIN_LINE,
                    hex,
                    r = num(r)
                )
            }
            _ => writeln!(
                self.out,
                "<ellipse cx=\"{}\" cy=\"{}\" rx=\"{}\" ry=\"{}\" style=\"stroke:{};stroke-width:{}\" fill=\"{}\"/>",
                pad.x,
                pad.y,
                num(sx / 2.0),
                num(sy / 2.0),
                hex,
                THIN_LINE,
                hex
            ),
        }
    }

    fn export_polygon(
        &mut self,
        vertices: &[Point2],
        filled: bool,
        layer: usize,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        if vertices.is_empty() {
            return Ok(());
        }
        let c = self.layer_color(layer);
        let points: Vec<String> = vertices
            .iter()
            .map(|v| format!("{},{}", num(v.x), num(v.y)))
            .collect();
        write!(self.out, "<polygon points=\"{}\" ", points.join(" "))?;
        self.close_with_style(c, stroke.width, stroke.dash_style, &Self::fill(c, filled))
    }

    fn export_rectangle(
        &mut self,
        p1: PointG,
        p2: PointG,
        filled: bool,
        layer: usize,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        let c = self.layer_color(layer);
        write!(
            self.out,
            "<rect x=\"{}\" y=\"{}\" rx=\"0\" ry=\"0\" width=\"{}\" height=\"{}\" ",
            p1.x.min(p2.x),
            p1.y.min(p2.y),
            (p2.x - p1.x).abs(),
            (p2.y - p1.y).abs()
        )?;
        self.close_with_style(c, stroke.width, stroke.dash_style, &Self::fill(c, filled))
    }

    fn export_arrow(
        &mut self,
        tip: Point2,
        toward: Point2,
        length: f64,
        half_width: f64,
        style: i32,
    ) -> io::Result<Point2> {
        let shape = arrow_shape(tip.x, tip.y, toward.x, toward.y, length, half_width, style);
        let c = self.arrow_color;
        write!(
            self.out,
            "<polygon points=\"{},{} {},{} {},{}\" ",
            num(shape.tip.x),
            num(shape.tip.y),
            num(shape.p1.x),
            num(shape.p1.y),
            num(shape.p2.x),
            num(shape.p2.y)
        )?;
        let fill = Self::fill(c, style & ARROW_EMPTY == 0);
        self.close_with_style(c, THIN_LINE, 0, &fill)?;
        if let Some((a, b)) = shape.limiter {
            write!(
                self.out,
                "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" ",
                num(a.x),
                num(a.y),
                num(b.x),
                num(b.y)
            )?;
            self.close_with_style(c, THIN_LINE, 0, "fill=\"none\"")?;
        }
        Ok(shape.base)
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fidocad_core::export::{export_drawing, export_header, ExportOptions};
    use fidocad_core::model::DrawingModel;
    use fidocad_core::parser::ParserActions;

    fn render(text: &str) -> String {
        let mut model = DrawingModel::new();
        ParserActions::new(&mut model)
            .parse_string(text)
            .expect("Failed to parse drawing");
        let mut exp = SvgExporter::new(Vec::new(), &model.config);
        let mut map = export_header(&mut model, &mut exp, &ExportOptions::default(), 5)
            .expect("Failed to write header");
        export_drawing(&mut model, &mut exp, false, &mut map).expect("Failed to export");
        exp.export_end().expect("Failed to finish");
        String::from_utf8(exp.into_inner()).expect("SVG output is not UTF-8")
    }

    #[test]
    fn test_document_structure() {
        let svg = render("LI 0 0 100 50 2\n");
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("<svg width=\"106\" height=\"56\""));
        assert!(svg.contains("<line x1=\"3\" y1=\"3\" x2=\"103\" y2=\"53\" style=\"stroke:#ff0000"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_pad_hole_drawn_last() {
        let svg = render("PA 20 20 10 10 4 1 0\n");
        let rect = svg.find("<rect").expect("Missing pad");
        let hole = svg.find("fill=\"white\"").expect("Missing hole");
        assert!(rect < hole);
    }

    #[test]
    fn test_text_is_escaped() {
        let svg = render("TY 10 10 4 3 0 0 0 Arial a<b&c\n");
        assert!(svg.contains(">a&lt;b&amp;c</text>"));
    }

    #[test]
    fn test_dashed_line() {
        let svg = render("LI 0 0 100 0 0\nFCJ 0 0 3 2 2 0\n");
        assert!(svg.contains("stroke-dasharray:1,1"));
    }
}
