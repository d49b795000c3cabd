//! Encapsulated PostScript 导出
//!
//! 坐标系在文件头里翻转为 y 向下，之后直接使用输出坐标。椭圆通过文件头
//! 定义的 `ellipse` 过程绘制。

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

/// 输出单位与 PostScript 点（1/72 英寸）之比
const RES_MULT: f64 = 200.0 / 72.0;

const THIN_LINE: f64 = 0.33;

/// 圆角焊盘的圆角半径
const PAD_CORNER: f64 = 4.0;

/// 以 (x, y) 为中心、xrad/yrad 为半径画椭圆弧
const ELLIPSE_PROC: &str = "\
/ellipsedict 8 dict def
ellipsedict /mtrx matrix put
/ellipse
   { ellipsedict begin
     /endangle exch def
     /startangle exch def
     /yrad exch def
     /xrad exch def
     /y exch def
     /x exch def
     /savematrix mtrx currentmatrix def
     x y translate
     xrad yrad scale
     0 0 1 startangle endangle arc
     savematrix setmatrix
     end
   } def
";

pub struct EpsExporter<W: Write> {
    out: W,
    layers: Vec<LayerDesc>,
    dash_patterns: Vec<Vec<f32>>,
    /// 已按单位缩放的 `[a b ...]` 数组
    dash_arrays: Vec<String>,
    dash_phase: f32,
    current_dash: Option<(usize, f32)>,
    current_color: Option<Color>,
    current_width: Option<f64>,
    arrow_color: Color,
}

impl EpsExporter<BufWriter<File>> {
    pub fn create(path: &Path, config: &DrawingConfig) -> Result<Self, FileError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), config))
    }
}

impl<W: Write> EpsExporter<W> {
    pub fn new(out: W, config: &DrawingConfig) -> Self {
        let mut exporter = Self {
            out,
            layers: Vec::new(),
            dash_patterns: config.dash.clone(),
            dash_arrays: Vec::new(),
            dash_phase: 0.0,
            current_dash: None,
            current_color: None,
            current_width: None,
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

    /// 颜色或线宽变化时才输出；`width` 为 `None` 时保留当前线宽
    fn check_color_and_width(&mut self, c: Color, width: Option<f64>) -> io::Result<()> {
        if self.current_color != Some(c) {
            let (r, g, b) = c.to_unit_rgb();
            writeln!(self.out, "  {} {} {} setrgbcolor", num(r), num(g), num(b))?;
            self.current_color = Some(c);
        }
        if let Some(w) = width.filter(|&w| w > 0.0) {
            if self.current_width != Some(w) {
                writeln!(self.out, "  {} setlinewidth", num(w))?;
                self.current_width = Some(w);
            }
        }
        Ok(())
    }

    fn register_dash(&mut self, dash_style: usize) -> io::Result<()> {
        let state = (dash_style, self.dash_phase);
        if self.current_dash == Some(state) {
            return Ok(());
        }
        self.current_dash = Some(state);
        match self.dash_arrays.get(dash_style).filter(|_| dash_style > 0) {
            Some(array) => writeln!(self.out, "{} {} setdash", array, num(self.dash_phase as f64)),
            None => writeln!(self.out, "[] 0 setdash"),
        }
    }

    fn stroke_setup(&mut self, layer: usize, stroke: &StrokeStyle) -> io::Result<()> {
        let c = self.layer_color(layer);
        self.check_color_and_width(c, Some(stroke.width))?;
        self.register_dash(stroke.dash_style)
    }

    fn paint(&mut self, filled: bool) -> io::Result<()> {
        writeln!(self.out, "{}", if filled { "fill" } else { "stroke" })
    }

    fn ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64) -> io::Result<()> {
        writeln!(self.out, "newpath")?;
        writeln!(
            self.out,
            "{} {} {} {} 0 360 ellipse",
            num(cx),
            num(cy),
            num(rx),
            num(ry)
        )
    }

    fn round_rect(&mut self, x: f64, y: f64, w: f64, h: f64, r: f64) -> io::Result<()> {
        let (x1, y1) = (x + w, y + h);
        writeln!(self.out, "newpath")?;
        writeln!(self.out, "{} {} moveto", num(x + r), num(y))?;
        writeln!(self.out, "{} {} lineto", num(x1 - r), num(y))?;
        writeln!(self.out, "{x1} {y} {x1} {y} {x1} {} curveto", num(y + r), x1 = num(x1), y = num(y))?;
        writeln!(self.out, "{} {} lineto", num(x1), num(y1 - r))?;
        writeln!(self.out, "{x1} {y1} {x1} {y1} {} {y1} curveto", num(x1 - r), x1 = num(x1), y1 = num(y1))?;
        writeln!(self.out, "{} {} lineto", num(x + r), num(y1))?;
        writeln!(self.out, "{x} {y1} {x} {y1} {x} {} curveto", num(y1 - r), x = num(x), y1 = num(y1))?;
        writeln!(self.out, "{} {} lineto", num(x), num(y + r))?;
        writeln!(self.out, "{x} {y} {x} {y} {} {y} curveto", num(x + r), x = num(x), y = num(y))?;
        writeln!(self.out, "closepath")
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

impl<W: Write> ExportInterface for EpsExporter<W> {
    fn export_start(&mut self, total_size: DimensionG, layers: &[LayerDesc], _grid: i32) -> io::Result<()> {
        self.layers = layers.to_vec();
        self.current_color = None;
        self.current_width = None;
        self.current_dash = None;

        let width = total_size.width as f64 / RES_MULT;
        let height = total_size.height as f64 / RES_MULT;
        writeln!(self.out, "%!PS-Adobe-3.0 EPSF-3.0")?;
        writeln!(self.out, "%%Pages: 0")?;
        writeln!(
            self.out,
            "%%BoundingBox: -1 -1 {} {}",
            (width + 1.0) as i32,
            (height + 1.0) as i32
        )?;
        writeln!(self.out, "%%Creator: fidocad {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(
            self.out,
            "%%CreationDate: {}",
            chrono::Local::now().format("%Y/%m/%d %H:%M:%S")
        )?;
        writeln!(self.out, "%%EndComments")?;
        write!(self.out, "{}", ELLIPSE_PROC)?;
        writeln!(self.out, "0 {} translate", num(height))?;
        writeln!(self.out, "{} {} scale", num(1.0 / RES_MULT), num(-1.0 / RES_MULT))
    }

    fn export_end(&mut self) -> io::Result<()> {
        writeln!(self.out, "%%EOF")?;
        self.out.flush()?;
        tracing::info!("EPS export finished");
        Ok(())
    }

    fn set_dash_unit(&mut self, unit: f64) {
        self.dash_arrays = self
            .dash_patterns
            .iter()
            .map(|pattern| {
                let items: Vec<String> = pattern
                    .iter()
                    .map(|&d| num(d as f64 * unit / 2.0))
                    .collect();
                format!("[{}]", items.join(" "))
            })
            .collect();
        self.current_dash = None;
    }

    fn set_dash_phase(&mut self, phase: f32) {
        self.dash_phase = phase;
    }

    fn export_adv_text(&mut self, t: &TextSpec<'_>) -> io::Result<()> {
        if t.text.is_empty() {
            return Ok(());
        }
        let c = self.layer_color(t.layer);
        self.check_color_and_width(c, None)?;

        let size_x = t.size_x.max(1);
        let font_size = (size_x as f64 * 12.0 / 7.0 + 0.5) as i32;
        let bold = if t.bold { "-Bold" } else { "" };
        writeln!(
            self.out,
            "/{}{} findfont\n{} scalefont\nsetfont",
            ps_font_name(t.font),
            bold,
            font_size
        )?;
        writeln!(self.out, "newpath")?;
        writeln!(self.out, "{} {} moveto", t.x, t.y)?;
        writeln!(self.out, "gsave")?;
        if t.orientation != 0 {
            let alpha = if t.mirrored { t.orientation } else { -t.orientation };
            writeln!(self.out, "  {} rotate", alpha)?;
        }
        if t.mirrored {
            writeln!(self.out, "  -1 -1 scale")?;
        } else {
            writeln!(self.out, "  1 -1 scale")?;
        }
        // 标准字形的高宽比不需要拉伸
        let ratio = if t.size_y / size_x == 1 {
            1.0
        } else {
            t.size_y as f64 / size_x as f64 * 22.0 / 40.0
        };
        writeln!(self.out, "  1 {} scale", num(ratio))?;
        writeln!(self.out, "  0 {} rmoveto", num(-(font_size as f64) * 0.8))?;
        self.check_color_and_width(c, Some(THIN_LINE))?;
        writeln!(self.out, "  ({}) show", escape_ps(t.text))?;
        writeln!(self.out, "grestore")
    }

    fn export_bezier(
        &mut self,
        points: &[PointG; 4],
        layer: usize,
        arrows: &ArrowSpec,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        self.stroke_setup(layer, stroke)?;
        let p = points.map(PointG::to_point2);
        let (start, end) = self.arrow_ends(p[0], p[3], p[1], p[2], layer, arrows)?;
        self.register_dash(stroke.dash_style)?;
        writeln!(self.out, "newpath")?;
        writeln!(self.out, "{} {} moveto", num(start.x), num(start.y))?;
        writeln!(
            self.out,
            "{} {} {} {} {} {} curveto stroke",
            num(p[1].x),
            num(p[1].y),
            num(p[2].x),
            num(p[2].y),
            num(end.x),
            num(end.y)
        )
    }

    fn export_connection(&mut self, x: i32, y: i32, layer: usize, size: f64) -> io::Result<()> {
        let c = self.layer_color(layer);
        self.check_color_and_width(c, Some(THIN_LINE))?;
        self.ellipse(x as f64, y as f64, size / 2.0, size / 2.0)?;
        self.paint(true)
    }

    fn export_line(
        &mut self,
        p1: Point2,
        p2: Point2,
        layer: usize,
        arrows: &ArrowSpec,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        self.stroke_setup(layer, stroke)?;
        let (start, end) = self.arrow_ends(p1, p2, p2, p1, layer, arrows)?;
        self.register_dash(stroke.dash_style)?;
        writeln!(
            self.out,
            "{} {} moveto {} {} lineto stroke",
            num(start.x),
            num(start.y),
            num(end.x),
            num(end.y)
        )
    }

    fn export_oval(
        &mut self,
        p1: PointG,
        p2: PointG,
        filled: bool,
        layer: usize,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        self.stroke_setup(layer, stroke)?;
        let (a, b) = (p1.to_point2(), p2.to_point2());
        self.ellipse(
            (a.x + b.x) / 2.0,
            (a.y + b.y) / 2.0,
            (b.x - a.x).abs() / 2.0,
            (b.y - a.y).abs() / 2.0,
        )?;
        self.paint(filled)
    }

    fn export_pcb_line(&mut self, p1: PointG, p2: PointG, width: i32, layer: usize) -> io::Result<()> {
        let c = self.layer_color(layer);
        self.check_color_and_width(c, Some(width as f64))?;
        self.register_dash(0)?;
        writeln!(self.out, "1 setlinecap")?;
        writeln!(
            self.out,
            "{} {} moveto {} {} lineto stroke",
            p1.x, p1.y, p2.x, p2.y
        )
    }

    fn export_pcb_pad(&mut self, pad: &PadSpec) -> io::Result<()> {
        if pad.only_hole {
            self.check_color_and_width(Color::WHITE, Some(THIN_LINE))?;
            let r = pad.hole as f64 / 2.0;
            self.ellipse(pad.x as f64, pad.y as f64, r, r)?;
            return self.paint(true);
        }
        let c = self.layer_color(pad.layer);
        self.check_color_and_width(c, Some(THIN_LINE))?;
        let (sx, sy) = (pad.size_x as f64, pad.size_y as f64);
        let (x0, y0) = (pad.x as f64 - sx / 2.0, pad.y as f64 - sy / 2.0);
        match pad.style {
            2 => self.round_rect(x0, y0, sx, sy, PAD_CORNER)?,
            1 => {
                writeln!(self.out, "newpath")?;
                writeln!(self.out, "{} {} moveto", num(x0), num(y0))?;
                writeln!(self.out, "{} {} lineto", num(x0 + sx), num(y0))?;
                writeln!(self.out, "{} {} lineto", num(x0 + sx), num(y0 + sy))?;
                writeln!(self.out, "{} {} lineto", num(x0), num(y0 + sy))?;
                writeln!(self.out, "closepath")?;
            }
            _ => self.ellipse(pad.x as f64, pad.y as f64, sx / 2.0, sy / 2.0)?,
        }
        self.paint(true)
    }

    fn export_polygon(
        &mut self,
        vertices: &[Point2],
        filled: bool,
        layer: usize,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        let Some((first, rest)) = vertices.split_first() else {
            return Ok(());
        };
        self.stroke_setup(layer, stroke)?;
        writeln!(self.out, "newpath")?;
        writeln!(self.out, "{} {} moveto", num(first.x), num(first.y))?;
        for v in rest {
            writeln!(self.out, "{} {} lineto", num(v.x), num(v.y))?;
        }
        writeln!(self.out, "closepath")?;
        self.paint(filled)
    }

    fn export_rectangle(
        &mut self,
        p1: PointG,
        p2: PointG,
        filled: bool,
        layer: usize,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        self.stroke_setup(layer, stroke)?;
        writeln!(self.out, "newpath")?;
        writeln!(self.out, "{} {} moveto", p1.x, p1.y)?;
        writeln!(self.out, "{} {} lineto", p2.x, p1.y)?;
        writeln!(self.out, "{} {} lineto", p2.x, p2.y)?;
        writeln!(self.out, "{} {} lineto", p1.x, p2.y)?;
        writeln!(self.out, "closepath")?;
        self.paint(filled)
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
        self.check_color_and_width(c, None)?;
        // 箭头始终实线
        self.register_dash(0)?;
        writeln!(self.out, "newpath")?;
        writeln!(self.out, "{} {} moveto", num(shape.tip.x), num(shape.tip.y))?;
        writeln!(self.out, "{} {} lineto", num(shape.p1.x), num(shape.p1.y))?;
        writeln!(self.out, "{} {} lineto", num(shape.p2.x), num(shape.p2.y))?;
        writeln!(self.out, "closepath")?;
        self.paint(style & ARROW_EMPTY == 0)?;
        if let Some((a, b)) = shape.limiter {
            writeln!(
                self.out,
                "{} {} moveto\n{} {} lineto\nstroke",
                num(a.x),
                num(a.y),
                num(b.x),
                num(b.y)
            )?;
        }
        Ok(shape.base)
    }
}

/// PostScript 字体名不能含空格
fn ps_font_name(font: &str) -> String {
    font.split_whitespace().collect::<Vec<_>>().join("-")
}

/// 转义 PostScript 字符串中的括号与反斜杠
fn escape_ps(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '(' | ')' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
