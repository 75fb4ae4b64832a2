//! HTML 语言修复
//!
//! 纯文本变换：修正 `lang` 属性、界面文本和站内链接，使一个文件内的所有链接
//! 都指向同一语言的页面。

use regex::{Captures, Regex};

use crate::models::Language;

/// 不需要改写的链接前缀
const EXTERNAL_PREFIXES: &[&str] = &[
    "http:",
    "https:",
    "//",
    "mailto:",
    "javascript:",
    "data:",
    "#",
];

/// HTML 语言修复器，持有编译好的正则
#[derive(Debug, Clone)]
pub struct HtmlLocalizer {
    href: Regex,
    lang: Regex,
}

impl HtmlLocalizer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            href: Regex::new(r#"href="([^"]*)""#)?,
            lang: Regex::new(r#"\blang="(en|zh-CN)""#)?,
        })
    }

    /// 对一个 HTML 文件的内容做完整的语言修复
    pub fn localize(&self, content: &str, language: Language) -> String {
        let content = self.fix_lang_attribute(content, language);
        let content = substitute_labels(&content, language);
        self.rewrite_links(&content, language)
    }

    fn fix_lang_attribute(&self, content: &str, language: Language) -> String {
        let replacement = format!(r#"lang="{}""#, language.html_lang());
        self.lang
            .replace_all(content, replacement.as_str())
            .into_owned()
    }

    /// 改写站内链接
    ///
    /// 次要语言：`page.html` → `page_zh.html`，`dir/` → `dir/index_zh.html`；
    /// 默认语言：`page_zh.html` → `page.html`。锚点与查询参数保留。
    pub fn rewrite_links(&self, content: &str, language: Language) -> String {
        self.href
            .replace_all(content, |caps: &Captures| {
                format!(r#"href="{}""#, rewrite_target(&caps[1], language))
            })
            .into_owned()
    }
}

/// 合并后文件名：次要语言在扩展名前插入后缀，已带后缀的保持不变
pub fn localized_file_name(file_name: &str, language: Language) -> String {
    let suffix = language.file_suffix();
    match file_name.strip_suffix(".html") {
        Some(stem) if !suffix.is_empty() && !stem.ends_with(suffix) => {
            format!("{}{}.html", stem, suffix)
        }
        _ => file_name.to_string(),
    }
}

pub fn is_markup(file_name: &str) -> bool {
    file_name.ends_with(".html")
}

fn substitute_labels(content: &str, language: Language) -> String {
    language
        .label_substitutions()
        .into_iter()
        .fold(content.to_string(), |acc, (attr, from, to)| {
            acc.replace(
                &format!(r#"{}="{}""#, attr, from),
                &format!(r#"{}="{}""#, attr, to),
            )
        })
}

fn rewrite_target(target: &str, language: Language) -> String {
    if target.is_empty() || EXTERNAL_PREFIXES.iter().any(|p| target.starts_with(p)) {
        return target.to_string();
    }

    let split_at = target.find(['#', '?']).unwrap_or(target.len());
    let (path, rest) = target.split_at(split_at);
    let suffix = Language::SECONDARY.file_suffix();
    let secondary_tail = format!("{}.html", suffix);

    let path = if language == Language::SECONDARY {
        if path.ends_with('/') {
            format!("{}index{}", path, secondary_tail)
        } else if path.ends_with(".html") && !path.ends_with(&secondary_tail) {
            localized_file_name(path, language)
        } else {
            path.to_string()
        }
    } else {
        match path.strip_suffix(&secondary_tail) {
            Some(stem) => format!("{}.html", stem),
            None => path.to_string(),
        }
    };
    format!("{}{}", path, rest)
}
