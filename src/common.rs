// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 属性容器模块
//!
//! 表单元素、表单本身以及 HTML 表格共享的属性处理逻辑：
//! 1. 解析形如 `class="a" disabled size=10` 的属性字符串；
//! 2. 维护“小写属性名 → 字符串值”的有序映射；
//! 3. 以兼容实体方案转义后重新渲染为标记文本。

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

use crate::util::{escape_html, unescape_html};

lazy_static! {
    /// 属性名（允许非 ASCII 字符），可选的 `=值`，值可以带单/双引号或不带引号。
    static ref ATTRIBUTE_RE: Regex = Regex::new(
        r#"((?:[A-Za-z_:]|[^\x00-\x7F])(?:[A-Za-z0-9_:.\-]|[^\x00-\x7F])*)(?:[ \n\t\r]+)?(?:=(?:[ \n\t\r]+)?("[^"]*"|'[^']*'|[^ \n\t\r]*))?"#
    )
    .expect("attribute pattern");
}

/// 有序的 HTML 属性集合。
///
/// 属性名总是被规范化为小写，因此不会出现重复键。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    map: IndexMap<String, String>,
    tab_offset: usize,
    comment: Option<String>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析属性字符串。无值的属性（如 `disabled`）以自身名称作为值。
    pub fn parse(source: &str) -> Self {
        let mut attributes = Self::new();
        for caps in ATTRIBUTE_RE.captures_iter(source) {
            let name = caps[1].trim().to_lowercase();
            let value = match caps.get(2) {
                None => name.clone(),
                Some(raw) => {
                    let raw = raw.as_str();
                    let unquoted = if raw.len() >= 2
                        && ((raw.starts_with('"') && raw.ends_with('"'))
                            || (raw.starts_with('\'') && raw.ends_with('\'')))
                    {
                        &raw[1..raw.len() - 1]
                    } else {
                        raw.trim()
                    };
                    unescape_html(unquoted)
                }
            };
            attributes.map.insert(name, value);
        }
        attributes
    }

    /// 由名值对构建；名称为空时按布尔属性处理（`("", "checked")` → `checked="checked"`）。
    pub fn from_pairs<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> Self {
        let mut attributes = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            if key.is_empty() {
                let flag = value.as_ref().to_lowercase();
                attributes.map.insert(flag.clone(), flag);
            } else {
                attributes
                    .map
                    .insert(key.to_lowercase(), value.as_ref().to_string());
            }
        }
        attributes
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(&name.to_lowercase())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.map.insert(name.to_lowercase(), value.to_string());
    }

    /// 合并另一组属性，已有属性被覆盖，新属性追加在末尾。
    pub fn update(&mut self, other: &Attributes) {
        for (key, value) in &other.map {
            self.map.insert(key.clone(), value.clone());
        }
    }

    /// 删除属性并保持其余属性的顺序。
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.map.shift_remove(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 渲染为 ` name="value"` 序列，值做 HTML 转义。
    pub fn to_html(&self) -> String {
        render_pairs(self.iter())
    }

    /// 渲染时排除若干属性（由元素自行输出的属性，例如 `value`）。
    pub fn to_html_without(&self, skip: &[&str]) -> String {
        render_pairs(self.iter().filter(|(k, _)| !skip.contains(k)))
    }

    pub fn tab_offset(&self) -> usize {
        self.tab_offset
    }

    pub fn set_tab_offset(&mut self, offset: usize) {
        self.tab_offset = offset;
    }

    /// 当前缩进对应的制表符
    pub fn tabs(&self) -> String {
        "\t".repeat(self.tab_offset)
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: &str) {
        self.comment = Some(comment.to_string());
    }
}

fn render_pairs<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_html(value));
        out.push('"');
    }
    out
}

impl From<&str> for Attributes {
    fn from(source: &str) -> Self {
        Attributes::parse(source)
    }
}

impl From<String> for Attributes {
    fn from(source: String) -> Self {
        Attributes::parse(&source)
    }
}

impl<K: AsRef<str>, V: AsRef<str>> From<Vec<(K, V)>> for Attributes {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Attributes::from_pairs(&pairs)
    }
}

impl<K: AsRef<str>, V: AsRef<str>, const N: usize> From<[(K, V); N]> for Attributes {
    fn from(pairs: [(K, V); N]) -> Self {
        Attributes::from_pairs(&pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_and_bare() {
        let attrs = Attributes::parse(r#"CLASS="big red" size=10 title='x y' disabled"#);
        assert_eq!(attrs.get("class"), Some("big red"));
        assert_eq!(attrs.get("size"), Some("10"));
        assert_eq!(attrs.get("title"), Some("x y"));
        assert_eq!(attrs.get("disabled"), Some("disabled"));
        assert_eq!(attrs.len(), 4);
    }

    #[test]
    fn test_parse_spaces_around_equals() {
        let attrs = Attributes::parse("onclick = \"go()\"   id=main");
        assert_eq!(attrs.get("onclick"), Some("go()"));
        assert_eq!(attrs.get("id"), Some("main"));
    }

    #[test]
    fn test_names_are_lowercase() {
        let mut attrs = Attributes::from_pairs(&[("ID", "a"), ("", "Checked")]);
        assert_eq!(attrs.get("id"), Some("a"));
        assert_eq!(attrs.get("checked"), Some("checked"));
        attrs.set("Id", "b");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("ID"), Some("b"));
    }

    #[test]
    fn test_render_escapes_values() {
        let attrs = Attributes::from_pairs(&[("value", "a \"b\" & <c>")]);
        assert_eq!(attrs.to_html(), r#" value="a &quot;b&quot; &amp; &lt;c&gt;""#);
    }

    #[test]
    fn test_reparse_unescapes() {
        let attrs = Attributes::from_pairs(&[("title", "x & \"y\"")]);
        let reparsed = Attributes::parse(&attrs.to_html());
        assert_eq!(reparsed.get("title"), Some("x & \"y\""));
    }

    #[test]
    fn test_update_and_remove_keep_order() {
        let mut attrs = Attributes::parse("a=1 b=2 c=3");
        attrs.update(&Attributes::parse("b=20 d=4"));
        assert_eq!(attrs.to_html(), r#" a="1" b="20" c="3" d="4""#);
        assert_eq!(attrs.remove("B"), Some("20".to_string()));
        assert_eq!(attrs.to_html(), r#" a="1" c="3" d="4""#);
        assert_eq!(attrs.to_html_without(&["c"]), r#" a="1" d="4""#);
    }

    #[test]
    fn test_tabs_and_comment() {
        let mut attrs = Attributes::new();
        attrs.set_tab_offset(2);
        attrs.set_comment("note");
        assert_eq!(attrs.tabs(), "\t\t");
        assert_eq!(attrs.comment(), Some("note"));
    }
}
