//! 图纸文本格式的解析与序列化
//!
//! 文本按行切分为记号。大多数图元命令后面可以跟一行 `FCJ` 扩展，因此读到
//! 这些命令时先暂存，等看到下一行再决定如何构造图元。扩展行的最后一个记号
//! 为 `1`（或 `MC`/`PL`/`PA`/`SA` 后的裸 `FCJ`）时，随后的两行 `TY` 是该图元的
//! 名称与数值。

use std::sync::Arc;

use crate::error::{FidoError, Result};
use crate::layer::{standard_layers, Color};
use crate::library::Library;
use crate::math::{parse_f64, parse_int, round_intelligently};
use crate::model::DrawingModel;
use crate::primitives::{
    AdvText, Bezier, ComplexCurve, Connection, GraphicPrimitive, Line, MacroCall, Oval, PcbLine,
    PcbPad, Polygon, Primitive, Rectangle,
};

/// 两个浮点配置值视为相等的容差
const CONFIG_TOLERANCE: f64 = 1e-5;

/// 构造图元时需要的环境
struct ReaderEnv<'a> {
    library: &'a Arc<Library>,
    font: &'a str,
    font_size: i32,
    depth: usize,
    select_new: bool,
}

/// 等待名称/数值 `TY` 行的图元
struct AwaitingText {
    primitive: Primitive,
    name_read: bool,
}

/// 逐行读取的结果
#[derive(Default)]
struct ReadOutput {
    primitives: Vec<Primitive>,
    /// `FJC` 配置行（含行号）
    config: Vec<(usize, Vec<String>)>,
}

/// 逐行解析的状态机
struct CommandReader<'a> {
    env: ReaderEnv<'a>,
    strict: bool,
    /// 暂存的图元命令及其行号，等待可能的 FCJ 行
    pending: Option<(usize, Vec<String>)>,
    awaiting: Option<AwaitingText>,
    out: ReadOutput,
}

impl<'a> CommandReader<'a> {
    fn new(env: ReaderEnv<'a>, strict: bool) -> Self {
        Self {
            env,
            strict,
            pending: None,
            awaiting: None,
            out: ReadOutput::default(),
        }
    }

    fn run(mut self, text: &str) -> Result<ReadOutput> {
        for (i, line) in text.lines().enumerate() {
            let line_num = i + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            let r = self.line(line_num, &tokens);
            self.check(r)?;
        }
        let r = self.flush_pending();
        self.check(r)?;
        self.flush_awaiting();
        Ok(self.out)
    }

    /// 严格模式下返回错误，否则记录并跳过该行
    fn check(&self, r: Result<()>) -> Result<()> {
        match r {
            Ok(()) => Ok(()),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                tracing::warn!("Skipping unreadable input: {}", e);
                Ok(())
            }
        }
    }

    fn line(&mut self, line_num: usize, tokens: &[&str]) -> Result<()> {
        if tokens[0] == "FCJ" {
            return self.extension(tokens);
        }
        // 暂存命令出错时当前行仍需处理
        let flushed = self.flush_pending();
        self.check(flushed)?;

        match tokens[0] {
            "FJC" => {
                self.out
                    .config
                    .push((line_num, tokens.iter().map(|t| t.to_string()).collect()));
            }
            "LI" | "BE" | "MC" | "RV" | "RP" | "EV" | "EP" | "PV" | "PP" | "CV" | "CP" | "PL"
            | "PA" | "SA" => {
                self.flush_awaiting();
                self.pending = Some((line_num, tokens.iter().map(|t| t.to_string()).collect()));
            }
            "TE" => {
                self.flush_awaiting();
                let mut t = AdvText::new(self.env.font);
                t.parse_tokens(tokens).map_err(|e| e.at_line(line_num))?;
                self.add(Primitive::AdvText(t));
            }
            "TY" => self.text_line(line_num, tokens)?,
            // [FIDOCAD] 头以及未知命令
            _ => {}
        }
        Ok(())
    }

    /// 处理 FCJ 扩展行
    fn extension(&mut self, tokens: &[&str]) -> Result<()> {
        let Some((line_num, old)) = self.pending.take() else {
            return Ok(());
        };
        let old: Vec<&str> = old.iter().map(String::as_str).collect();
        match old[0] {
            "MC" | "PL" | "PA" | "SA" => {
                let p = self.build(&old).map_err(|e| e.at_line(line_num))?;
                self.awaiting = Some(AwaitingText {
                    primitive: p,
                    name_read: false,
                });
            }
            cmd => {
                let combined: Vec<&str> = old.iter().chain(tokens.iter()).copied().collect();
                let p = self.build(&combined).map_err(|e| e.at_line(line_num))?;
                let min_tokens = if matches!(cmd, "LI" | "BE") { 6 } else { 3 };
                let has_text = combined.len() > min_tokens && combined.last() == Some(&"1");
                if has_text {
                    self.awaiting = Some(AwaitingText {
                        primitive: p,
                        name_read: false,
                    });
                } else {
                    self.add(p);
                }
            }
        }
        Ok(())
    }

    /// TY 行：图元的名称/数值，或独立的文字
    fn text_line(&mut self, line_num: usize, tokens: &[&str]) -> Result<()> {
        if let Some(mut a) = self.awaiting.take() {
            let base = a.primitive.base_mut();
            if !a.name_read {
                base.set_name(tokens).map_err(|e| e.at_line(line_num))?;
                a.name_read = true;
                self.awaiting = Some(a);
            } else {
                base.set_value(tokens).map_err(|e| e.at_line(line_num))?;
                self.add(a.primitive);
            }
            return Ok(());
        }
        let mut t = AdvText::new(self.env.font);
        t.parse_tokens(tokens).map_err(|e| e.at_line(line_num))?;
        self.add(Primitive::AdvText(t));
        Ok(())
    }

    /// 没有 FCJ 跟随的暂存命令直接构造
    fn flush_pending(&mut self) -> Result<()> {
        let Some((line_num, old)) = self.pending.take() else {
            return Ok(());
        };
        let old: Vec<&str> = old.iter().map(String::as_str).collect();
        let p = self.build(&old).map_err(|e| e.at_line(line_num))?;
        self.add(p);
        Ok(())
    }

    /// 名称/数值行缺失时，图元仍然保留
    fn flush_awaiting(&mut self) {
        if let Some(a) = self.awaiting.take() {
            self.add(a.primitive);
        }
    }

    fn add(&mut self, mut p: Primitive) {
        p.base_mut().selected = self.env.select_new;
        self.out.primitives.push(p);
    }

    fn build(&self, tokens: &[&str]) -> Result<Primitive> {
        let env = &self.env;
        let (font, size) = (env.font, env.font_size);
        let mut p = match tokens[0] {
            "LI" => Primitive::Line(Line::new(font, size)),
            "BE" => Primitive::Bezier(Bezier::new(font, size)),
            "RV" | "RP" => Primitive::Rectangle(Rectangle::new(font, size)),
            "EV" | "EP" => Primitive::Oval(Oval::new(font, size)),
            "PV" | "PP" => Primitive::Polygon(Polygon::new(font, size)),
            "CV" | "CP" => Primitive::ComplexCurve(ComplexCurve::new(font, size)),
            "PL" => Primitive::PcbLine(PcbLine::new(font, size)),
            "PA" => Primitive::PcbPad(PcbPad::new(font, size)),
            "SA" => Primitive::Connection(Connection::new(font, size)),
            "MC" => Primitive::Macro(Box::new(MacroCall::with_depth(
                Arc::clone(env.library),
                font,
                size,
                env.depth,
            ))),
            other => return Err(FidoError::InvalidPrimitive(other.to_string())),
        };
        p.parse_tokens(tokens)?;
        Ok(p)
    }
}

/// 解析宏的内容（宽松模式），结果按图层排序
pub(crate) fn parse_macro_contents(
    text: &str,
    library: &Arc<Library>,
    font: &str,
    font_size: i32,
    depth: usize,
) -> Vec<Primitive> {
    let env = ReaderEnv {
        library,
        font,
        font_size,
        depth,
        select_new: false,
    };
    // 宽松模式不会返回错误
    let mut primitives = CommandReader::new(env, false)
        .run(text)
        .map(|o| o.primitives)
        .unwrap_or_default();
    primitives.sort_by_key(|p| p.layer());
    primitives
}

/// 读取一个宏库文件的文本
pub fn read_library(text: &str, stem: &str) -> Result<Library> {
    let mut lib = Library::new();
    lib.read(text, stem)?;
    Ok(lib)
}

/// 图纸模型上的解析与序列化操作
pub struct ParserActions<'a> {
    model: &'a mut DrawingModel,
}

impl<'a> ParserActions<'a> {
    pub fn new(model: &'a mut DrawingModel) -> Self {
        Self { model }
    }

    /// 清空图纸并解析文本，遇到第一处错误即返回
    pub fn parse_string(&mut self, text: &str) -> Result<()> {
        self.model.clear();
        self.add_string(text, false, true)
    }

    /// 清空图纸并解析文本，跳过无法解析的行
    pub fn parse_string_lenient(&mut self, text: &str) {
        self.model.clear();
        if let Err(e) = self.add_string(text, false, false) {
            tracing::warn!("Lenient parse failed: {}", e);
        }
    }

    /// 把文本中的图元追加到图纸
    pub fn add_string(&mut self, text: &str, select_new: bool, strict: bool) -> Result<()> {
        let library = Arc::clone(&self.model.library);
        let font = self.model.text_font.clone();
        let env = ReaderEnv {
            library: &library,
            font: &font,
            font_size: self.model.text_font_size,
            depth: 0,
            select_new,
        };
        let out = CommandReader::new(env, strict).run(text)?;

        for (line_num, tokens) in &out.config {
            let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
            let r = self.apply_config(&tokens).map_err(|e| e.at_line(*line_num));
            match r {
                Ok(()) => {}
                Err(e) if strict => return Err(e),
                Err(e) => tracing::warn!("Skipping unreadable configuration: {}", e),
            }
        }
        let count = out.primitives.len();
        for p in out.primitives {
            self.model.add_primitive(p, false);
        }
        self.model.sort_primitive_layers();
        tracing::debug!("Added {} primitives to the drawing", count);
        Ok(())
    }

    /// 处理 `FJC` 配置行
    fn apply_config(&mut self, tokens: &[&str]) -> Result<()> {
        let bad = || FidoError::bad_arguments("FJC");
        let number = |i: usize| tokens.get(i).and_then(|t| parse_f64(t)).ok_or_else(bad);
        let layer_index = |i: usize| {
            tokens
                .get(i)
                .and_then(|t| parse_int(t))
                .filter(|&n| n >= 0)
                .map(|n| n as usize)
                .ok_or_else(bad)
        };

        let config = &mut self.model.config;
        match tokens.get(1).copied() {
            Some("C") => {
                let v = number(2)?;
                if v > 0.0 {
                    config.connection_size = v;
                }
            }
            Some("A") => {
                let v = number(2)?;
                if v > 0.0 {
                    config.line_width = v;
                }
            }
            Some("B") => {
                let v = number(2)?;
                if v > 0.0 {
                    config.line_width_circles = v;
                }
            }
            Some("L") => {
                let n = layer_index(2)?;
                let rgb = tokens.get(3).and_then(|t| parse_int(t)).ok_or_else(bad)?;
                let alpha = number(4)? as f32;
                if let Some(l) = self.model.layers.get_mut(n) {
                    l.color = Color::from_rgb(rgb as u32);
                    l.alpha = alpha;
                    l.modified = true;
                }
            }
            Some("N") => {
                let n = layer_index(2)?;
                if let Some(l) = self.model.layers.get_mut(n) {
                    l.description = tokens[3..].join(" ");
                    l.modified = true;
                }
            }
            _ => return Err(bad()),
        }
        self.model.invalidate_all();
        Ok(())
    }

    /// 序列化整张图纸
    pub fn get_text(&self, extensions: bool) -> String {
        let mut s = self.register_configuration(extensions);
        for p in &self.model.primitives {
            s.push_str(&p.to_fcd(extensions));
        }
        s
    }

    /// 与默认值不同的配置写成 `FJC` 行；不使用扩展时为空
    pub fn register_configuration(&self, extensions: bool) -> String {
        let mut s = String::new();
        if !extensions {
            return s;
        }
        let config = &self.model.config;
        let defaults = crate::config::DrawingConfig::default();

        if (config.connection_size - defaults.connection_size).abs() > CONFIG_TOLERANCE {
            s.push_str(&format!("FJC C {}\n", round_intelligently(config.connection_size)));
        }
        let standard = standard_layers();
        for (i, l) in self.model.layers.iter().enumerate() {
            if !l.modified {
                continue;
            }
            s.push_str(&format!("FJC L {} {} {}\n", i, l.color.to_argb_i32(), l.alpha));
            let default_name = standard.get(i).map(|d| d.description.as_str());
            if default_name != Some(l.description.as_str()) {
                s.push_str(&format!("FJC N {} {}\n", i, l.description));
            }
        }
        if (config.line_width - defaults.line_width).abs() > CONFIG_TOLERANCE {
            s.push_str(&format!("FJC A {}\n", round_intelligently(config.line_width)));
        }
        if (config.line_width_circles - defaults.line_width_circles).abs() > CONFIG_TOLERANCE {
            s.push_str(&format!("FJC B {}\n", round_intelligently(config.line_width_circles)));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIB: &str = "[FIDOLIB Test]\n\
        {Parts}\n\
        [RES Resistor]\n\
        RV 100 98 120 102 0\n\
        LI 95 100 100 100 0\n\
        LI 120 100 125 100 0\n\
        PA 95 100 6 6 2 0 1\n";

    fn model_with_library() -> DrawingModel {
        let lib = read_library(LIB, crate::library::STANDARD_LIBRARY_STEM)
            .expect("Failed to read library");
        DrawingModel::with_library(Arc::new(lib))
    }

    fn parse(text: &str) -> DrawingModel {
        let mut model = model_with_library();
        ParserActions::new(&mut model)
            .parse_string(text)
            .expect("Failed to parse drawing");
        model
    }

    #[test]
    fn test_plain_primitives() {
        let model = parse("[FIDOCAD]\nLI 0 0 100 100 0\nRV 10 10 20 20 2\nSA 5 5 0\n");
        assert_eq!(model.primitives.len(), 3);
        let names: Vec<&str> = model.primitives.iter().map(|p| p.type_name()).collect();
        assert_eq!(names, vec!["Line", "Connection", "Rectangle"]);
    }

    #[test]
    fn test_extension_with_name_and_value() {
        let text = "LI 0 0 50 0 1\n\
                    FCJ 0 0 3 1 2 1\n\
                    TY 5 5 4 3 0 0 1 * R1\n\
                    TY 5 10 4 3 0 0 1 * 10k\n\
                    MC 40 40 0 0 res\n\
                    FCJ\n\
                    TY 50 50 4 3 0 0 0 * R2\n\
                    TY 50 55 4 3 0 0 0 * 4k7\n";
        let model = parse(text);
        assert_eq!(model.primitives.len(), 2);
        let mc = &model.primitives[0];
        assert!(mc.is_macro());
        assert_eq!((mc.base().name.as_str(), mc.base().value.as_str()), ("R2", "4k7"));
        let li = &model.primitives[1];
        assert_eq!(li.base().name, "R1");
        assert_eq!(li.base().value, "10k");
        assert!(li.to_fcd(true).starts_with("LI 0 0 50 0 1\nFCJ 0 0 3 1 2 1\n"));
    }

    #[test]
    fn test_extension_without_text() {
        let model = parse("RP 0 0 10 10 0\nFCJ 2 0\nTY 0 0 4 3 0 0 0 * free\n");
        assert_eq!(model.primitives.len(), 2);
        let rect = model
            .primitives
            .iter()
            .find(|p| p.type_name() == "Rectangle")
            .expect("Failed to find rectangle");
        assert_eq!(rect.to_fcd(true), "RP 0 0 10 10 0\nFCJ 2 0\n");
        assert!(model.primitives.iter().any(|p| p.type_name() == "AdvText"));
    }

    #[test]
    fn test_primitive_missing_text_is_kept() {
        let model = parse("SA 10 10 0\nFCJ\nLI 0 0 10 0 0\n");
        assert_eq!(model.primitives.len(), 2);
    }

    #[test]
    fn test_strict_and_lenient() {
        let mut model = model_with_library();
        let err = ParserActions::new(&mut model)
            .parse_string("LI 0 0 10 10 0\nLI 0 0 x 10 0\n")
            .unwrap_err();
        assert!(matches!(err, FidoError::AtLine { line: 2, .. }));

        ParserActions::new(&mut model)
            .parse_string_lenient("LI 0 0 10 10 0\nLI 0 0 x 10 0\nMC 0 0 0 0 missing\nSA 1 1 0\n");
        assert_eq!(model.primitives.len(), 2);
    }

    #[test]
    fn test_macro_expansion_sorted_by_layer() {
        let model = parse("MC 100 100 0 0 res\n");
        let Primitive::Macro(m) = &model.primitives[0] else {
            panic!("expected a macro");
        };
        let layers: Vec<usize> = m.contents().iter().map(|p| p.layer()).collect();
        assert_eq!(layers, vec![0, 0, 0, 1]);
        assert!(model.contains_layer(1));
        assert!(model.primitives[0].needs_holes());
    }

    #[test]
    fn test_configuration_lines() {
        let text = "FJC C 1.5\nFJC L 3 -16744448 0.5\nFJC N 3 My layer\nFJC A 0.35\nLI 0 0 10 0 3\n";
        let mut model = parse(text);
        assert_eq!(model.config.connection_size, 1.5);
        assert_eq!(model.config.line_width, 0.35);
        assert_eq!(model.layers[3].color, Color::new(0, 128, 0));
        assert_eq!(model.layers[3].description, "My layer");
        assert!(model.layers[3].modified);

        let actions = ParserActions::new(&mut model);
        assert_eq!(
            actions.register_configuration(true),
            "FJC C 1.5\nFJC L 3 -16744448 0.5\nFJC N 3 My layer\nFJC A 0.35\n"
        );
        assert_eq!(actions.register_configuration(false), "");
        assert_eq!(actions.get_text(false), "LI 0 0 10 0 3\n");
    }

    #[test]
    fn test_round_trip_preserves_geometry() {
        let text = "LI 0 0 100 100 0\n\
                    BE 0 0 10 10 20 10 30 0 2\n\
                    RP 10 10 40 30 1\n\
                    EV 5 5 25 15 3\n\
                    PP 0 0 10 0 10 10 4\n\
                    CV 1 0 0 20 20 40 0 5\n\
                    PL 0 0 50 0 2.5 6\n\
                    PA 10 10 6 6 2 1 7\n\
                    SA 10 10 0\n\
                    TY 0 0 4 3 0 1 2 * hello world\n\
                    LI 0 50 100 50 1\n\
                    FCJ 3 1 4 2 2 1\n\
                    TY 5 55 4 3 0 0 1 * R1\n\
                    TY 5 60 4 3 0 0 1 * 10k\n\
                    BE 0 0 10 20 30 20 40 0 2\n\
                    FCJ 2 0 3 1 1 0\n\
                    RV 0 0 10 10 0\n\
                    FCJ 3 0\n\
                    MC 40 40 1 0 res\n\
                    FCJ\n\
                    TY 50 50 4 3 0 0 0 * R2\n\
                    TY 50 55 4 3 0 0 0 * 4k7\n";
        let first = parse(text);
        let saved = ParserActions::new(&mut first.clone()).get_text(true);
        let second = parse(&saved);
        assert_eq!(first.primitives.len(), second.primitives.len());
        for (a, b) in first.primitives.iter().zip(&second.primitives) {
            assert_eq!(a.type_name(), b.type_name());
            assert_eq!(a.layer(), b.layer());
            assert_eq!(a.base().geometry(), b.base().geometry());
            // 箭头、线型、名称和值都在扩展行里
            assert_eq!(a.to_fcd(true), b.to_fcd(true));
        }

        assert!(saved.contains("LI 0 50 100 50 1\nFCJ 3 1 4 2 2 1\n"));
        assert!(saved.contains("BE 0 0 10 20 30 20 40 0 2\nFCJ 2 0 3 1 1 0\n"));
        assert!(saved.contains("RV 0 0 10 10 0\nFCJ 3 0\n"));
        let named = |m: &DrawingModel, name: &str| {
            m.primitives
                .iter()
                .find(|p| p.base().name == name)
                .map(|p| (p.type_name(), p.base().value.clone()))
        };
        assert_eq!(named(&second, "R1"), Some(("Line", "10k".to_string())));
        assert_eq!(named(&second, "R2"), Some(("Macro", "4k7".to_string())));
    }

    #[test]
    fn test_add_string_selects_new() {
        let mut model = parse("LI 0 0 10 0 0\n");
        ParserActions::new(&mut model)
            .add_string("SA 5 5 0\n", true, true)
            .expect("Failed to add");
        assert_eq!(model.primitives.len(), 2);
        assert_eq!(model.selected_count(), 1);
    }
}
