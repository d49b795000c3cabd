//! 宏库
//!
//! 宏以小写键索引。非标准库中的宏键带有文件名前缀（`stem.key`）。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FidoError, Result};

/// 标准库的文件名，其宏键不加前缀
pub const STANDARD_LIBRARY_STEM: &str = "FCDstdlib";

/// 宏描述
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MacroDesc {
    /// 显示名称
    pub name: String,
    /// 唯一键（小写）
    pub key: String,
    /// 宏内容：一段图纸文本
    pub description: String,
    pub category: String,
    /// 所属库的名称（`[FIDOLIB ...]`）
    pub library: String,
    /// 库文件名（不含扩展名）；标准库为空
    pub filename: String,
    /// 0: 宏，1: 分类，2: 库
    pub level: u8,
}

impl MacroDesc {
    pub fn new(key: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            key: key.to_string(),
            ..Default::default()
        }
    }

    /// 按层级返回用于显示的名称
    pub fn display_name(&self) -> &str {
        match self.level {
            1 => self.category.trim(),
            2 => self.library.trim(),
            _ => self.name.trim(),
        }
    }
}

/// 宏库：键到宏描述的有序映射
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Library {
    macros: BTreeMap<String, MacroDesc>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// 按键查找，键不区分大小写
    pub fn get(&self, key: &str) -> Option<&MacroDesc> {
        self.macros.get(&key.to_lowercase())
    }

    pub fn insert(&mut self, desc: MacroDesc) {
        self.macros.insert(desc.key.clone(), desc);
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacroDesc> {
        self.macros.values()
    }

    /// 合并另一个库，同名宏被覆盖
    pub fn merge(&mut self, other: Library) {
        self.macros.extend(other.macros);
    }

    /// 所有分类名（去重、有序）
    pub fn categories(&self) -> Vec<&str> {
        let mut c: Vec<&str> = self.macros.values().map(|m| m.category.as_str()).collect();
        c.sort_unstable();
        c.dedup();
        c
    }

    /// 读取一个库文件的文本并加入本库，返回读入的宏数量
    ///
    /// `stem` 为文件名（不含扩展名）。标准库的宏键不加前缀。
    pub fn read(&mut self, text: &str, stem: &str) -> Result<usize> {
        let prefix = if stem == STANDARD_LIBRARY_STEM { "" } else { stem };
        let mut library_name = String::new();
        let mut category = String::new();
        let mut current: Option<MacroDesc> = None;
        let mut count = 0;

        for line in text.lines() {
            let line = line.trim();
            if line.len() <= 1 {
                continue;
            }
            if let Some(rest) = line.strip_prefix('{') {
                let Some(end) = rest.find('}') else {
                    return Err(FidoError::Library(
                        "Category non terminated with }.".to_string(),
                    ));
                };
                category = rest[..end].trim().to_string();
                continue;
            }
            if let Some(rest) = line.strip_prefix('[') {
                let Some(end) = rest.find(']') else {
                    return Err(FidoError::Library(
                        "Macro name non terminated with ].".to_string(),
                    ));
                };
                let header = &rest[..end];
                let (key, long_name) = match header.find(' ') {
                    Some(i) => (&header[..i], &header[i..]),
                    None => (header, ""),
                };
                if key == "FIDOLIB" {
                    library_name = long_name.trim().to_string();
                    continue;
                }
                if let Some(done) = current.take() {
                    self.insert(done);
                    count += 1;
                }
                let key = if prefix.is_empty() {
                    key.to_lowercase()
                } else {
                    format!("{}.{}", prefix, key).to_lowercase()
                };
                current = Some(MacroDesc {
                    name: long_name.to_string(),
                    key,
                    category: category.clone(),
                    library: library_name.clone(),
                    filename: prefix.to_string(),
                    ..Default::default()
                });
                continue;
            }
            if let Some(m) = current.as_mut() {
                m.description.push('\n');
                m.description.push_str(line);
            }
        }
        if let Some(done) = current.take() {
            self.insert(done);
            count += 1;
        }
        tracing::debug!("Read {} macros from library '{}'", count, stem);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIB: &str = "[FIDOLIB Test library]\n\
        {Passive}\n\
        [RES Resistor]\n\
        LI 100 100 110 100 0\n\
        RV 110 98 120 102 0\n\
        [CAP Capacitor]\n\
        LI 100 100 105 100 0\n\
        {Active}\n\
        [DIODE Diode]\n\
        PV 100 95 100 105 105 100 0\n";

    #[test]
    fn test_read_with_prefix() {
        let mut lib = Library::new();
        assert_eq!(lib.read(LIB, "mylib").expect("Failed to read library"), 3);
        let res = lib.get("mylib.res").expect("Failed to find resistor");
        assert_eq!(res.name.trim(), "Resistor");
        assert_eq!(res.category, "Passive");
        assert_eq!(res.library, "Test library");
        assert_eq!(res.filename, "mylib");
        assert_eq!(res.description, "\nLI 100 100 110 100 0\nRV 110 98 120 102 0");
        assert_eq!(lib.get("MYLIB.DIODE").map(|m| m.category.as_str()), Some("Active"));
        assert_eq!(lib.categories(), vec!["Active", "Passive"]);
    }

    #[test]
    fn test_standard_library_has_no_prefix() {
        let mut lib = Library::new();
        lib.read(LIB, STANDARD_LIBRARY_STEM).expect("Failed to read library");
        assert!(lib.get("res").is_some());
        assert!(lib.get("fcdstdlib.res").is_none());
    }

    #[test]
    fn test_unterminated_headers() {
        let mut lib = Library::new();
        assert!(matches!(lib.read("{Broken\n", "x"), Err(FidoError::Library(_))));
        assert!(matches!(lib.read("[KEY broken\n", "x"), Err(FidoError::Library(_))));
    }

    #[test]
    fn test_display_name_by_level() {
        let mut m = MacroDesc::new("k", " Name ");
        m.category = "Cat".to_string();
        assert_eq!(m.display_name(), "Name");
        m.level = 1;
        assert_eq!(m.display_name(), "Cat");
    }
}
