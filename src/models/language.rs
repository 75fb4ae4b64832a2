//! 文档语言
//!
//! 英文是默认语言（文件保持原名），中文是次要语言（文件名带 `_zh` 后缀）。

use std::fmt;

/// 可本地化的界面文本：(属性名, 中文, 英文)
const LOCALIZED_LABELS: &[(&str, &str, &str)] = &[
    ("placeholder", "搜索文档", "Search documentation"),
    ("aria-label", "搜索文档", "Search documentation"),
    ("aria-label", "导航菜单", "Navigation menu"),
    ("aria-label", "移动版导航菜单", "Mobile navigation menu"),
    ("aria-label", "页面导航", "Page navigation"),
    ("aria-label", "页脚", "Footer"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Zh,
    En,
}

impl Language {
    /// 默认语言（合并后保持原文件名）
    pub const DEFAULT: Language = Language::En;
    /// 次要语言（合并后添加后缀）
    pub const SECONDARY: Language = Language::Zh;
    /// 单个版本内的构建顺序
    pub const BUILD_ORDER: [Language; 2] = [Language::Zh, Language::En];

    pub fn tag(self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }

    /// 文件名后缀
    pub fn file_suffix(self) -> &'static str {
        match self {
            Language::Zh => "_zh",
            Language::En => "",
        }
    }

    /// 主文档名（不带扩展名）
    pub fn master_doc(self) -> String {
        format!("index{}", self.file_suffix())
    }

    /// 主索引源文件名
    pub fn index_filename(self) -> String {
        format!("{}.rst", self.master_doc())
    }

    /// 编译器语言参数
    pub fn compiler_locale(self) -> &'static str {
        match self {
            Language::Zh => "zh_CN",
            Language::En => "en",
        }
    }

    /// HTML `lang` 属性值
    pub fn html_lang(self) -> &'static str {
        match self {
            Language::Zh => "zh-CN",
            Language::En => "en",
        }
    }

    /// 进程 locale 环境变量值
    pub fn process_locale(self) -> &'static str {
        match self {
            Language::Zh => "zh_CN.UTF-8",
            Language::En => "en_US.UTF-8",
        }
    }

    /// 编译时排除的文档模式
    pub fn exclude_pattern(self) -> &'static str {
        match self {
            Language::Zh => "*.md",
            Language::En => "*_zh.md",
        }
    }

    /// 另一种语言
    pub fn other(self) -> Language {
        match self {
            Language::Zh => Language::En,
            Language::En => Language::Zh,
        }
    }

    /// (属性名, 其他语言文本, 本语言文本) 列表，用于替换界面文本
    pub fn label_substitutions(self) -> Vec<(&'static str, &'static str, &'static str)> {
        LOCALIZED_LABELS
            .iter()
            .map(|&(attr, zh, en)| match self {
                Language::Zh => (attr, en, zh),
                Language::En => (attr, zh, en),
            })
            .collect()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}
