//! PDF 导出
//!
//! 输出单页的 PDF 1.4 文件。绘图指令先写入内存中的内容流，`export_end`
//! 时按编号依次写出 16 个对象，交叉引用表中的偏移量取自计数写入器记录的
//! 实际字节位置。
//!
//! 对象布局：
//! - 1: 文档信息
//! - 2: ProcSet
//! - 3: Catalog
//! - 4: 页面与资源
//! - 5: 页面树（含 MediaBox）
//! - 6, 7, 9..=15: 九个 Type1 字体 F1..F9
//! - 8: 内容流
//! - 16: 字体编码

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

/// 设备单位到 PDF 点的换算（200 dpi → 72 dpi）
const RES_MULT: f64 = 200.0 / 72.0;

/// 页面四周的留白（点）
const PAGE_BORDER: f64 = 5.0;

/// 对象总数（不含 0 号空闲项）
const OBJECT_COUNT: usize = 16;

/// 连接点、焊盘、文字使用的细线宽
const THIN_LINE: f64 = 0.33;

/// 圆角焊盘的圆角半径
const PAD_CORNER: f64 = 4.0;

/// 用四段三次贝塞尔逼近四分之一椭圆的控制系数
const KAPPA: f64 = 0.552_284_75;

/// F1..F9 依次对应的对象编号
const FONT_OBJECTS: [usize; 9] = [6, 7, 9, 10, 11, 12, 13, 14, 15];

/// F1..F8 的标准字体名，F9 为用户字体
const BASE_FONTS: [&str; 8] = [
    "Courier",
    "Courier-Bold",
    "Times-Roman",
    "Times-Bold",
    "Helvetica",
    "Helvetica-Bold",
    "Symbol",
    "Symbol",
];

/// 记录已写出字节数的写入器
#[derive(Debug)]
pub struct CountingWriter<W: Write> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    /// 已写出的字节数
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// PDF 导出器
pub struct PdfExporter<W: Write> {
    out: CountingWriter<W>,
    /// 内容流
    content: String,
    layers: Vec<LayerDesc>,
    dash_patterns: Vec<Vec<f32>>,
    /// 按当前缩放展开好的虚线数组
    dash_arrays: Vec<String>,
    dash_phase: f32,
    media_box: (i32, i32),
    current_color: Option<Color>,
    current_width: Option<f64>,
    current_dash: Option<(usize, f32)>,
    user_font: Option<String>,
    author: String,
}

impl PdfExporter<BufWriter<File>> {
    /// 创建导出到文件的导出器
    pub fn create(path: &Path, config: &DrawingConfig) -> Result<Self, FileError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), config))
    }
}

impl<W: Write> PdfExporter<W> {
    pub fn new(writer: W, config: &DrawingConfig) -> Self {
        let author = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        let mut exporter = Self {
            out: CountingWriter::new(writer),
            content: String::new(),
            layers: Vec::new(),
            dash_patterns: config.dash.clone(),
            dash_arrays: Vec::new(),
            dash_phase: 0.0,
            media_box: (0, 0),
            current_color: None,
            current_width: None,
            current_dash: None,
            user_font: None,
            author,
        };
        exporter.set_dash_unit(1.0);
        exporter
    }

    /// 取回底层写入器
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn layer_color(&self, layer: usize) -> Color {
        self.layers.get(layer).map_or(Color::BLACK, |l| l.color)
    }

    fn check_color_and_width(&mut self, c: Color, width: f64) {
        if self.current_color != Some(c) {
            let (r, g, b) = c.to_unit_rgb();
            let rgb = format!("{} {} {}", num(r), num(g), num(b));
            self.content.push_str(&format!("  {rgb} rg\n  {rgb} RG\n"));
            self.current_color = Some(c);
        }
        if self.current_width != Some(width) {
            self.content.push_str(&format!("  {} w\n", num(width)));
            self.current_width = Some(width);
        }
    }

    fn register_dash(&mut self, style: usize) {
        if self.current_dash == Some((style, self.dash_phase)) {
            return;
        }
        self.current_dash = Some((style, self.dash_phase));
        match self.dash_arrays.get(style) {
            Some(array) if style > 0 => {
                self.content
                    .push_str(&format!("{} {} d\n", array, num(self.dash_phase as f64)));
            }
            _ => self.content.push_str("[] 0 d\n"),
        }
    }

    fn stroke_setup(&mut self, layer: usize, stroke: &StrokeStyle) {
        let c = self.layer_color(layer);
        self.check_color_and_width(c, stroke.width);
        self.register_dash(stroke.dash_style);
    }

    /// 三次贝塞尔逼近的椭圆路径
    fn ellipse(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, filled: bool) {
        let (cx, cy) = ((x1 + x2) / 2.0, (y1 + y2) / 2.0);
        let (rx, ry) = ((x2 - x1).abs() / 2.0, (y2 - y1).abs() / 2.0);
        let (kx, ky) = (rx * KAPPA, ry * KAPPA);
        let s = &mut self.content;
        s.push_str(&format!("  {} {} m\n", num(cx + rx), num(cy)));
        let quarters = [
            [(cx + rx, cy + ky), (cx + kx, cy + ry), (cx, cy + ry)],
            [(cx - kx, cy + ry), (cx - rx, cy + ky), (cx - rx, cy)],
            [(cx - rx, cy - ky), (cx - kx, cy - ry), (cx, cy - ry)],
            [(cx + kx, cy - ry), (cx + rx, cy - ky), (cx + rx, cy)],
        ];
        for q in quarters {
            s.push_str(&format!(
                "  {} {} {} {} {} {} c\n",
                num(q[0].0),
                num(q[0].1),
                num(q[1].0),
                num(q[1].1),
                num(q[2].0),
                num(q[2].1)
            ));
        }
        s.push_str(if filled { "  f\n" } else { "  s\n" });
    }

    fn round_rect(&mut self, x1: f64, y1: f64, w: f64, h: f64, r: f64, filled: bool) {
        let (x2, y2) = (x1 + w, y1 + h);
        let s = &mut self.content;
        s.push_str(&format!("{} {} m\n", num(x1 + r), num(y1)));
        s.push_str(&format!("{} {} l\n", num(x2 - r), num(y1)));
        s.push_str(&format!("{} {} {} {} y\n", num(x2), num(y1), num(x2), num(y1 + r)));
        s.push_str(&format!("{} {} l\n", num(x2), num(y2 - r)));
        s.push_str(&format!("{} {} {} {} y\n", num(x2), num(y2), num(x2 - r), num(y2)));
        s.push_str(&format!("{} {} l\n", num(x1 + r), num(y2)));
        s.push_str(&format!("{} {} {} {} y\n", num(x1), num(y2), num(x1), num(y2 - r)));
        s.push_str(&format!("{} {} l\n", num(x1), num(y1 + r)));
        s.push_str(&format!("{} {} {} {} y\n", num(x1), num(y1), num(x1 + r), num(y1)));
        s.push_str(if filled { "  f\n" } else { "  s\n" });
    }

    /// 按字体族与粗体选择字体资源
    fn select_font(&mut self, font: &str, bold: bool) -> &'static str {
        let pick = |regular, heavy| if bold { heavy } else { regular };
        match font {
            "Courier" | "Courier New" => pick("/F1", "/F2"),
            "Times" | "Times New Roman" | "Times Roman" => pick("/F3", "/F4"),
            "Helvetica" | "Arial" => pick("/F5", "/F6"),
            "Symbol" => pick("/F7", "/F8"),
            _ => {
                if self.user_font.is_none() {
                    tracing::warn!("Font '{}' is not a standard PDF font", font);
                }
                self.user_font = Some(font.to_string());
                "/F9"
            }
        }
    }

    /// 按坐标截断线端并画箭头
    fn arrow_ends(
        &mut self,
        start: Point2,
        end: Point2,
        toward_start: Point2,
        toward_end: Point2,
        arrows: &ArrowSpec,
    ) -> io::Result<(Point2, Point2)> {
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

    fn font_object(&self, index: usize) -> String {
        let base = match BASE_FONTS.get(index) {
            Some(name) => (*name).to_string(),
            None => self
                .user_font
                .as_deref()
                .map(pdf_name)
                .unwrap_or_else(|| "Helvetica".to_string()),
        };
        format!(
            "  <<   /Type /Font\n    /Subtype /Type1\n    /BaseFont /{}\n    /Encoding 16 0 R\n  >>\n",
            base
        )
    }

    fn object_body(&self, n: usize) -> String {
        match n {
            1 => format!(
                "<<\n  /Creator (fidocad {})\n  /Author ({})\n  /Producer (FidoCadJ)\n  /CreationDate (D:{})\n>>\n",
                env!("CARGO_PKG_VERSION"),
                pdf_string(&self.author),
                chrono::Local::now().format("%Y%m%d%H%M%S")
            ),
            2 => "[ /PDF /Text ]\n".to_string(),
            3 => "<<\n  /Pages 5 0 R\n  /Type /Catalog\n>>\n".to_string(),
            4 => {
                let fonts: String = FONT_OBJECTS
                    .iter()
                    .enumerate()
                    .map(|(i, obj)| format!("  /F{} {} 0 R\n", i + 1, obj))
                    .collect();
                format!(
                    "<<\n  /Type /Page\n  /Parent 5 0 R\n  /Resources <<\n  /Font <<\n{}>>\n/ProcSet 2 0 R\n>>\n  /Contents 8 0 R\n>>\n",
                    fonts
                )
            }
            5 => format!(
                "  <</Kids [4 0 R ]\n    /Count 1\n    /Type /Pages\n    /MediaBox [ 0 0 {} {} ]\n  >>\n",
                self.media_box.0, self.media_box.1
            ),
            8 => format!(
                "  <<\n    /Length {}\n  >>\nstream\n{}endstream\n",
                self.content.len(),
                self.content
            ),
            16 => "   <<  /Type /Encoding\n    /BaseEncoding /WinAnsiEncoding\n  >>\n".to_string(),
            _ => {
                let index = FONT_OBJECTS.iter().position(|&o| o == n).unwrap_or(0);
                self.font_object(index)
            }
        }
    }
}

impl<W: Write> ExportInterface for PdfExporter<W> {
    fn export_start(&mut self, total_size: DimensionG, layers: &[LayerDesc], _grid: i32) -> io::Result<()> {
        self.layers = layers.to_vec();
        self.content.clear();
        self.current_color = None;
        self.current_width = None;
        self.current_dash = None;
        self.media_box = (
            (total_size.width as f64 / RES_MULT + 1.0 + PAGE_BORDER) as i32,
            (total_size.height as f64 / RES_MULT + 1.0 + PAGE_BORDER) as i32,
        );
        // 翻转 y 轴，原点移到左上角
        self.content.push_str(&format!(
            "   1 0 0 1 0 {}  cm\n",
            num(total_size.height as f64 / RES_MULT + PAGE_BORDER)
        ));
        self.content.push_str(&format!(
            "  {} 0  0 {} 0 0  cm\n",
            1.0 / RES_MULT,
            -1.0 / RES_MULT
        ));
        self.content.push_str("1 J\n");
        Ok(())
    }

    fn export_end(&mut self) -> io::Result<()> {
        let mut offsets = [0u64; OBJECT_COUNT + 1];
        self.out.write_all(b"%PDF-1.4\n")?;
        for (n, offset) in offsets.iter_mut().enumerate().skip(1) {
            *offset = self.out.count();
            let body = self.object_body(n);
            write!(self.out, "{} 0 obj\n{}endobj\n", n, body)?;
        }

        let xref = self.out.count();
        write!(self.out, "xref\n0 {}\n0000000000 65535 f \n", OBJECT_COUNT + 1)?;
        for offset in &offsets[1..] {
            write!(self.out, "{:010} 00000 n \n", offset)?;
        }
        write!(
            self.out,
            "trailer\n<<\n  /Size {}\n  /Root 3 0 R\n  /Info 1 0 R\n>>\nstartxref\n{}\n%%EOF\n",
            OBJECT_COUNT + 1,
            xref
        )?;
        self.out.flush()?;
        tracing::info!(
            "PDF export finished: {} content bytes, {} bytes total",
            self.content.len(),
            self.out.count()
        );
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
    }

    fn set_dash_phase(&mut self, phase: f32) {
        self.dash_phase = phase;
    }

    fn export_adv_text(&mut self, t: &TextSpec<'_>) -> io::Result<()> {
        if t.text.is_empty() {
            return Ok(());
        }
        let c = self.layer_color(t.layer);
        self.check_color_and_width(c, THIN_LINE);
        let size_x = t.size_x.max(1);
        let ys = (size_x as f64 * 12.0 / 7.0 + 0.5) as i32;
        let font = self.select_font(t.font, t.bold);

        let s = &mut self.content;
        s.push_str("BT\n");
        s.push_str(&format!("{} {} Tf\n", font, ys));
        s.push_str("q\n");
        s.push_str(&format!("  1 0 0 1 {} {} cm\n", t.x, t.y));
        if t.orientation != 0 {
            let deg = if t.mirrored { t.orientation } else { -t.orientation };
            let (sin, cos) = (deg as f64).to_radians().sin_cos();
            s.push_str(&format!(
                "  {} {} {} {} 0 0 cm\n",
                num(cos),
                num(sin),
                num(-sin),
                num(cos)
            ));
        }
        s.push_str(if t.mirrored {
            "  -1 0 0 -1 0 0 cm\n"
        } else {
            "  1 0 0 -1 0 0 cm\n"
        });
        let ratio = if t.size_y / size_x == 1 {
            1.0
        } else {
            t.size_y as f64 / size_x as f64 * 22.0 / 40.0
        };
        s.push_str(&format!(
            "  1 0 0 {} 0 {} cm\n",
            num(ratio),
            num(-ys as f64 * ratio * 0.8)
        ));
        s.push_str(&format!("<{}> Tj\n", hex_text(t.text)));
        s.push_str("Q\nET\n");
        Ok(())
    }

    fn export_bezier(
        &mut self,
        points: &[PointG; 4],
        layer: usize,
        arrows: &ArrowSpec,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        self.stroke_setup(layer, stroke);
        let p = points.map(PointG::to_point2);
        let (start, end) = self.arrow_ends(p[0], p[3], p[1], p[2], arrows)?;
        self.content.push_str(&format!(
            "{} {} m \n{} {} {} {} {} {} c S\n",
            start.x.round(),
            start.y.round(),
            p[1].x,
            p[1].y,
            p[2].x,
            p[2].y,
            end.x.round(),
            end.y.round()
        ));
        Ok(())
    }

    fn export_connection(&mut self, x: i32, y: i32, layer: usize, size: f64) -> io::Result<()> {
        let c = self.layer_color(layer);
        self.check_color_and_width(c, THIN_LINE);
        let (x, y, r) = (x as f64, y as f64, size / 2.0);
        self.ellipse(x - r, y - r, x + r, y + r, true);
        Ok(())
    }

    fn export_line(
        &mut self,
        p1: Point2,
        p2: Point2,
        layer: usize,
        arrows: &ArrowSpec,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        self.stroke_setup(layer, stroke);
        let (start, end) = self.arrow_ends(p1, p2, p2, p1, arrows)?;
        self.content.push_str(&format!(
            "  {} {} m {} {} l S\n",
            num(start.x),
            num(start.y),
            num(end.x),
            num(end.y)
        ));
        Ok(())
    }

    fn export_oval(
        &mut self,
        p1: PointG,
        p2: PointG,
        filled: bool,
        layer: usize,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        self.stroke_setup(layer, stroke);
        self.ellipse(p1.x as f64, p1.y as f64, p2.x as f64, p2.y as f64, filled);
        Ok(())
    }

    fn export_pcb_line(&mut self, p1: PointG, p2: PointG, width: i32, layer: usize) -> io::Result<()> {
        let c = self.layer_color(layer);
        self.check_color_and_width(c, width as f64);
        self.register_dash(0);
        self.content
            .push_str(&format!("  {} {} m {} {} l S\n", p1.x, p1.y, p2.x, p2.y));
        Ok(())
    }

    fn export_pcb_pad(&mut self, pad: &PadSpec) -> io::Result<()> {
        let (x, y) = (pad.x as f64, pad.y as f64);
        let (sx, sy) = (pad.size_x as f64, pad.size_y as f64);
        if pad.only_hole {
            self.check_color_and_width(Color::WHITE, THIN_LINE);
            let r = pad.hole as f64 / 2.0;
            self.ellipse(x - r, y - r, x + r, y + r, true);
            return Ok(());
        }

        let c = self.layer_color(pad.layer);
        self.check_color_and_width(c, THIN_LINE);
        match pad.style {
            2 => self.round_rect(x - sx / 2.0, y - sy / 2.0, sx, sy, PAD_CORNER, true),
            1 => {
                let (x1, y1) = (x - sx / 2.0, y - sy / 2.0);
                self.content.push_str(&format!(
                    "{} {} m\n{} {} l\n{} {} l\n{} {} l\nf\n",
                    num(x1),
                    num(y1),
                    num(x1 + sx),
                    num(y1),
                    num(x1 + sx),
                    num(y1 + sy),
                    num(x1),
                    num(y1 + sy)
                ));
            }
            _ => self.ellipse(x - sx / 2.0, y - sy / 2.0, x + sx / 2.0, y + sy / 2.0, true),
        }
        Ok(())
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
        self.stroke_setup(layer, stroke);
        self.content
            .push_str(&format!("  {} {} m\n", num(first.x), num(first.y)));
        for v in rest {
            self.content
                .push_str(&format!("  {} {} l\n", num(v.x), num(v.y)));
        }
        self.content
            .push_str(if filled { "  f*\n" } else { "  s\n" });
        Ok(())
    }

    fn export_rectangle(
        &mut self,
        p1: PointG,
        p2: PointG,
        filled: bool,
        layer: usize,
        stroke: &StrokeStyle,
    ) -> io::Result<()> {
        self.stroke_setup(layer, stroke);
        self.content.push_str(&format!(
            "  {} {} m\n  {} {} l\n  {} {} l\n  {} {} l\n",
            p1.x, p1.y, p2.x, p1.y, p2.x, p2.y, p1.x, p2.y
        ));
        self.content
            .push_str(if filled { "f\n" } else { "s\n" });
        Ok(())
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
        let s = &mut self.content;
        s.push_str(&format!("{} {} m\n", num(shape.tip.x), num(shape.tip.y)));
        s.push_str(&format!("{} {} l\n", num(shape.p1.x), num(shape.p1.y)));
        s.push_str(&format!("{} {} l\n", num(shape.p2.x), num(shape.p2.y)));
        s.push_str(if style & ARROW_EMPTY == 0 { "  f*\n" } else { "  s\n" });
        if let Some((a, b)) = shape.limiter {
            s.push_str(&format!(
                "{} {} m\n{} {} l S\n",
                num(a.x),
                num(a.y),
                num(b.x),
                num(b.y)
            ));
        }
        Ok(shape.base)
    }
}

/// 文字按 WinAnsi 编码为十六进制串，编码表以外的字符替换为 `?`
fn hex_text(text: &str) -> String {
    text.chars()
        .map(|ch| {
            let code = ch as u32;
            let byte = match code {
                0x20..=0x7E | 0xA0..=0xFF => code,
                _ => u32::from(b'?'),
            };
            format!("{:02x}", byte)
        })
        .collect()
}

/// 转义 PDF 字符串中的括号与反斜杠
fn pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '(' | ')' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// PDF 名称不允许空白
fn pdf_name(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_graphic() && *c != '/').collect()
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
        let mut exp = PdfExporter::new(Vec::new(), &model.config);
        let mut map = export_header(&mut model, &mut exp, &ExportOptions::default(), 5)
            .expect("Failed to write header");
        export_drawing(&mut model, &mut exp, false, &mut map).expect("Failed to export");
        exp.export_end().expect("Failed to finish");
        String::from_utf8(exp.into_inner()).expect("PDF output is not UTF-8")
    }

    #[test]
    fn test_xref_offsets_match_objects() {
        let pdf = render("LI 10 10 100 50 0\nTY 20 20 4 3 0 0 2 Helvetica Hello\nPA 40 40 10 10 4 2 1\n");
        let xref_at = pdf.find("xref\n").expect("Missing xref");
        let lines: Vec<&str> = pdf[xref_at..].lines().collect();
        assert_eq!(lines[1], "0 17");
        for n in 1..=OBJECT_COUNT {
            let entry = lines[2 + n];
            let offset: usize = entry[..10].parse().expect("Bad xref offset");
            assert!(
                pdf[offset..].starts_with(&format!("{} 0 obj\n", n)),
                "object {} not at offset {}",
                n,
                offset
            );
        }

        let start = pdf.rfind("startxref\n").expect("Missing startxref") + "startxref\n".len();
        let value: usize = pdf[start..]
            .lines()
            .next()
            .and_then(|l| l.parse().ok())
            .expect("Bad startxref");
        assert_eq!(value, xref_at);
        assert!(pdf.ends_with("%%EOF\n"));
    }

    #[test]
    fn test_stream_length() {
        let pdf = render("LI 0 0 100 100 0\n");
        let len_at = pdf.find("/Length ").expect("Missing length") + "/Length ".len();
        let len: usize = pdf[len_at..]
            .split_whitespace()
            .next()
            .and_then(|t| t.parse().ok())
            .expect("Bad length");
        let body = pdf.find("stream\n").expect("Missing stream") + "stream\n".len();
        assert!(pdf[body + len..].starts_with("endstream"));
    }

    #[test]
    fn test_color_emitted_on_change_only() {
        let pdf = render("LI 0 0 10 0 0\nLI 0 5 10 5 0\nLI 0 9 10 9 2\n");
        assert_eq!(pdf.matches(" RG\n").count(), 2);
        assert!(pdf.contains("  1 0 0 RG\n"));
        assert_eq!(pdf.matches(" w\n").count(), 1);
    }

    #[test]
    fn test_text_font_selection() {
        let mut exp = PdfExporter::new(Vec::new(), &DrawingConfig::default());
        exp.export_start(DimensionG::new(100, 100), &fidocad_core::layer::standard_layers(), 5)
            .expect("Failed to start");
        let spec = TextSpec {
            x: 0,
            y: 0,
            size_x: 7,
            size_y: 10,
            font: "Arial",
            bold: true,
            mirrored: false,
            italic: false,
            orientation: 0,
            layer: 0,
            text: "A(b)",
        };
        exp.export_adv_text(&spec).expect("Failed to export text");
        exp.export_adv_text(&TextSpec { font: "Comic", bold: false, ..spec.clone() })
            .expect("Failed to export text");
        assert!(exp.content.contains("/F6 12 Tf\n"));
        assert!(exp.content.contains("<41286229> Tj\n"));
        assert!(exp.content.contains("/F9 12 Tf\n"));
        assert_eq!(exp.user_font.as_deref(), Some("Comic"));
    }

    #[test]
    fn test_dash_pattern_scaled() {
        let mut exp = PdfExporter::new(Vec::new(), &DrawingConfig::default());
        exp.set_dash_unit(2.0);
        assert_eq!(exp.dash_arrays[1], "[5 5]");
        exp.register_dash(1);
        exp.register_dash(1);
        exp.register_dash(0);
        assert_eq!(exp.content, "[5 5] 0 d\n[] 0 d\n");
    }

    #[test]
    fn test_arrow_base_returned() {
        let mut exp = PdfExporter::new(Vec::new(), &DrawingConfig::default());
        let base = exp
            .export_arrow(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 3.0, 1.0, 0)
            .expect("Failed to export arrow");
        assert!((base.x - 3.0).abs() < 1e-9 && base.y.abs() < 1e-9);
        assert!(exp.content.ends_with("  f*\n"));
    }

    #[test]
    fn test_hex_text() {
        assert_eq!(hex_text("é€"), "e93f");
        assert_eq!(pdf_string("a(b)\\"), "a\\(b\\)\\\\");
    }
}
