// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 模板替换式的 HTML 渲染器。
//!
//! 模板中可用的占位符：
//! - 元素模板：`{label}`、`{element}`、`{error}`、`{label_N}`，以及
//!   `<!-- BEGIN required -->…<!-- END required -->`、`<!-- BEGIN error -->…<!-- END error -->`、
//!   `<!-- BEGIN label_N -->…<!-- END label_N -->` 条件块；
//! - 表单模板：`{attributes}`、`{hidden}`、`{content}`；
//! - 标题模板：`{header}`；必填说明模板：`{requiredNote}`；
//! - 组包裹模板：`{content}`。

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::element::{Element, Group, Header, Html};
use crate::renderer::{FormInfo, Renderer};

const HEADER_TEMPLATE: &str = "\n\t<tr>\n\t\t<td style=\"white-space: nowrap; background-color: #CCCCCC;\" align=\"left\" valign=\"top\" colspan=\"2\"><b>{header}</b></td>\n\t</tr>";
const ELEMENT_TEMPLATE: &str = "\n\t<tr>\n\t\t<td align=\"right\" valign=\"top\"><!-- BEGIN required --><span style=\"color: #ff0000\">*</span><!-- END required --><b>{label}</b></td>\n\t\t<td valign=\"top\" align=\"left\"><!-- BEGIN error --><span style=\"color: #ff0000\">{error}</span><br /><!-- END error -->\t{element}</td>\n\t</tr>";
const FORM_TEMPLATE: &str = "\n<form{attributes}>\n<div>\n{hidden}<table border=\"0\">\n{content}\n</table>\n</div>\n</form>";
const REQUIRED_NOTE_TEMPLATE: &str = "\n\t<tr>\n\t\t<td></td>\n\t<td align=\"left\" valign=\"top\">{requiredNote}</td>\n\t</tr>";

lazy_static! {
    static ref REQUIRED_BLOCK: Regex =
        Regex::new(r"(?s)<!-- BEGIN required -->.*?<!-- END required -->").unwrap();
    static ref ERROR_BLOCK: Regex =
        Regex::new(r"(?s)<!-- BEGIN error -->.*?<!-- END error -->").unwrap();
}

/// 正在渲染的组
#[derive(Debug, Clone, Default)]
struct GroupFrame {
    template: String,
    element_template: String,
    wrap: String,
    elements: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DefaultRenderer {
    html: String,
    hidden_html: String,
    header_template: String,
    element_template: String,
    form_template: String,
    required_note_template: String,
    /// 按元素名覆盖的元素模板
    templates: HashMap<String, String>,
    /// 组内每个子元素的模板
    group_element_templates: HashMap<String, String>,
    /// 包裹整组子元素的模板
    group_wraps: HashMap<String, String>,
    groups: Vec<GroupFrame>,
}

impl Default for DefaultRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultRenderer {
    pub fn new() -> Self {
        Self {
            html: String::new(),
            hidden_html: String::new(),
            header_template: HEADER_TEMPLATE.to_string(),
            element_template: ELEMENT_TEMPLATE.to_string(),
            form_template: FORM_TEMPLATE.to_string(),
            required_note_template: REQUIRED_NOTE_TEMPLATE.to_string(),
            templates: HashMap::new(),
            group_element_templates: HashMap::new(),
            group_wraps: HashMap::new(),
            groups: Vec::new(),
        }
    }

    /// 渲染结果。未经过 `finish_form`（例如单独渲染一个组）时隐藏字段放在最前面。
    pub fn to_html(&self) -> String {
        format!("{}{}", self.hidden_html, self.html)
    }

    /// `element` 为 `None` 时替换全局元素模板，否则只对该名称的元素生效。
    pub fn set_element_template(&mut self, template: &str, element: Option<&str>) {
        match element {
            None => self.element_template = template.to_string(),
            Some(name) => {
                self.templates.insert(name.to_string(), template.to_string());
            }
        }
    }

    pub fn set_header_template(&mut self, template: &str) {
        self.header_template = template.to_string();
    }

    /// 只对某个名称的标题生效的模板
    pub fn set_named_header_template(&mut self, template: &str, header: &str) {
        self.templates.insert(header.to_string(), template.to_string());
    }

    pub fn set_form_template(&mut self, template: &str) {
        self.form_template = template.to_string();
    }

    pub fn set_required_note_template(&mut self, template: &str) {
        self.required_note_template = template.to_string();
    }

    pub fn set_group_template(&mut self, template: &str, group: &str) {
        self.group_wraps.insert(group.to_string(), template.to_string());
    }

    pub fn set_group_element_template(&mut self, template: &str, group: &str) {
        self.group_element_templates
            .insert(group.to_string(), template.to_string());
    }

    /// 只保留元素本身，去掉表格布局
    pub fn clear_all_templates(&mut self) {
        self.set_element_template("{element}", None);
        self.set_form_template("\n\t<form{attributes}>{content}\n\t</form>\n");
        self.set_required_note_template("");
        self.templates.clear();
    }

    fn prepare_template(&self, name: &str, labels: &[String], required: bool, error: Option<&str>) -> String {
        let template = self
            .templates
            .get(name)
            .filter(|_| !name.is_empty())
            .unwrap_or(&self.element_template);
        let first = labels.first().map(String::as_str).unwrap_or("");
        let mut html = template.replace("{label}", first);
        html = toggle_required(&html, required);
        html = match error {
            Some(error) => html
                .replace("{error}", error)
                .replace("<!-- BEGIN error -->", "")
                .replace("<!-- END error -->", ""),
            None => ERROR_BLOCK.replace_all(&html, "").into_owned(),
        };
        for (i, text) in labels.iter().enumerate().skip(1) {
            let key = i + 1;
            html = html
                .replace(&format!("{{label_{}}}", key), text)
                .replace(&format!("<!-- BEGIN label_{} -->", key), "")
                .replace(&format!("<!-- END label_{} -->", key), "");
        }
        if html.contains("{label_") {
            html = strip_label_blocks(&html);
        }
        html
    }
}

fn toggle_required(html: &str, required: bool) -> String {
    if required {
        html.replace("<!-- BEGIN required -->", "")
            .replace("<!-- END required -->", "")
    } else {
        REQUIRED_BLOCK.replace_all(html, "").into_owned()
    }
}

/// 删除没有对应标签文字的 `label_N` 条件块（连同两侧空白）
fn strip_label_blocks(html: &str) -> String {
    const BEGIN: &str = "<!-- BEGIN label_";
    let mut out = html.to_string();
    let mut from = 0;
    while let Some(offset) = out[from..].find(BEGIN) {
        let start = from + offset;
        let key_start = start + BEGIN.len();
        let Some(key_len) = out[key_start..].find(" -->") else {
            break;
        };
        let key = out[key_start..key_start + key_len].to_string();
        let end_marker = format!("<!-- END label_{} -->", key);
        let Some(end) = out[key_start..].rfind(&end_marker) else {
            from = key_start;
            continue;
        };
        let mut block_start = start;
        while block_start > 0 && out[..block_start].ends_with(char::is_whitespace) {
            block_start -= out[..block_start].chars().next_back().map_or(1, char::len_utf8);
        }
        let mut block_end = key_start + end + end_marker.len();
        while let Some(c) = out[block_end..].chars().next().filter(|c| c.is_whitespace()) {
            block_end += c.len_utf8();
        }
        out.replace_range(block_start..block_end, "");
        from = block_start;
    }
    out
}

impl Renderer for DefaultRenderer {
    fn start_form(&mut self, _form: &FormInfo) {
        self.html.clear();
        self.hidden_html.clear();
        self.groups.clear();
    }

    fn finish_form(&mut self, form: &FormInfo) {
        if form.shows_required_note() {
            self.html.push_str(
                &self
                    .required_note_template
                    .replace("{requiredNote}", &form.required_note),
            );
        }
        let mut html = self
            .form_template
            .replace("{attributes}", &form.attributes.to_html());
        if html.contains("{hidden}") {
            html = html.replace("{hidden}", &self.hidden_html);
        } else {
            self.html.push_str(&self.hidden_html);
        }
        self.hidden_html.clear();
        self.html = html.replace("{content}", &self.html);
    }

    fn render_header(&mut self, header: &Header) {
        let name = header.name();
        let template = self
            .templates
            .get(name)
            .filter(|_| !name.is_empty())
            .unwrap_or(&self.header_template);
        let html = template.replace("{header}", &header.to_html());
        self.html.push_str(&html);
    }

    fn render_element(&mut self, element: &dyn Element, required: bool, error: Option<&str>) {
        let Some(frame) = self.groups.last_mut() else {
            let html = self.prepare_template(element.name(), element.labels(), required, error);
            let html = html.replace("{element}", &element.to_html());
            self.html.push_str(&html);
            return;
        };
        if frame.element_template.is_empty() {
            frame.elements.push(element.to_html());
        } else {
            let label = element.label().unwrap_or("");
            let html = toggle_required(&frame.element_template.replace("{label}", label), required);
            frame.elements.push(html.replace("{element}", &element.to_html()));
        }
    }

    fn render_hidden(&mut self, element: &dyn Element) {
        self.hidden_html.push_str(&element.to_html());
        self.hidden_html.push('\n');
    }

    fn render_html(&mut self, html: &Html) {
        let rendered = html.to_html();
        match self.groups.last_mut() {
            Some(frame) => frame.elements.push(rendered),
            None => self.html.push_str(&rendered),
        }
    }

    fn start_group(&mut self, group: &Group, required: bool, error: Option<&str>) {
        let name = group.name();
        let frame = GroupFrame {
            template: self.prepare_template(name, group.labels(), required, error),
            element_template: self
                .group_element_templates
                .get(name)
                .cloned()
                .unwrap_or_default(),
            wrap: self.group_wraps.get(name).cloned().unwrap_or_default(),
            elements: Vec::new(),
        };
        self.groups.push(frame);
    }

    fn finish_group(&mut self, group: &Group) {
        let Some(frame) = self.groups.pop() else {
            return;
        };
        let mut html = group.join(&frame.elements);
        if !frame.wrap.is_empty() {
            html = frame.wrap.replace("{content}", &html);
        }
        let html = frame.template.replace("{element}", &html);
        match self.groups.last_mut() {
            // 嵌套组作为外层组的一个子元素
            Some(outer) => outer.elements.push(html),
            None => self.html.push_str(&html),
        }
    }
}
