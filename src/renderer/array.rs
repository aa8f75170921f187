// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 把表单渲染为嵌套的数据结构，字段名与模板引擎的约定保持一致，
//! 可以直接序列化为 JSON。

use indexmap::IndexMap;
use serde_derive::Serialize;

use crate::element::{Element, Group, Header, Html};
use crate::renderer::{FormInfo, Renderer};
use crate::value::Value;

/// 单个元素的渲染结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElementArray {
    pub name: String,
    pub value: Option<Value>,
    #[serde(rename = "type")]
    pub element_type: String,
    pub frozen: bool,
    pub label: Option<String>,
    /// 第二个及以后的标签，键为 `label_2`、`label_3` …
    #[serde(flatten)]
    pub extra_labels: IndexMap<String, String>,
    pub required: bool,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// 组的分隔符
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<Vec<String>>,
    /// 组的子元素
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements: Option<Vec<ElementArray>>,
    /// 非组元素的 HTML
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// 由标题开始的一节
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionArray {
    pub header: String,
    pub name: String,
    pub elements: Vec<ElementArray>,
}

/// 整个表单的渲染结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormArray {
    pub frozen: bool,
    pub attributes: String,
    #[serde(rename = "requirednote")]
    pub required_note: String,
    pub errors: IndexMap<String, String>,
    pub hidden: String,
    /// 第一个标题之前的元素
    pub elements: Vec<ElementArray>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<SectionArray>,
}

#[derive(Debug, Clone, Default)]
pub struct ArrayRenderer {
    form: FormArray,
    /// 隐藏字段拼成一段 HTML，而不是作为普通元素输出
    collect_hidden: bool,
    /// 多个标签拆成 `label`、`label_2` …；关闭时只输出第一个标签
    static_labels: bool,
    styles: IndexMap<String, String>,
    groups: Vec<ElementArray>,
}

impl ArrayRenderer {
    pub fn new(collect_hidden: bool, static_labels: bool) -> Self {
        Self {
            collect_hidden,
            static_labels,
            ..Self::default()
        }
    }

    /// 为指定名称的元素附加样式名
    pub fn set_element_style(&mut self, name: &str, style: &str) {
        self.styles.insert(name.to_string(), style.to_string());
    }

    pub fn to_array(&self) -> &FormArray {
        &self.form
    }

    pub fn into_array(self) -> FormArray {
        self.form
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.form)
    }

    fn element_to_array(&self, element: &dyn Element, required: bool, error: Option<&str>) -> ElementArray {
        let labels = element.labels();
        let mut extra_labels = IndexMap::new();
        if self.static_labels {
            for (i, text) in labels.iter().enumerate().skip(1) {
                extra_labels.insert(format!("label_{}", i + 1), text.clone());
            }
        }
        let is_group = element.element_type() == "group";
        ElementArray {
            name: element.name().to_string(),
            value: element.value(),
            element_type: element.element_type().to_string(),
            frozen: element.is_frozen(),
            label: labels.first().cloned(),
            extra_labels,
            required,
            error: error.map(str::to_string),
            style: self.styles.get(element.name()).cloned(),
            separator: None,
            elements: is_group.then(Vec::new),
            html: (!is_group).then(|| element.to_html()),
        }
    }

    fn store(&mut self, item: ElementArray) {
        if let Some(group) = self.groups.last_mut() {
            group.elements.get_or_insert_with(Vec::new).push(item);
        } else if let Some(section) = self.form.sections.last_mut() {
            section.elements.push(item);
        } else {
            self.form.elements.push(item);
        }
    }
}

impl Renderer for ArrayRenderer {
    fn start_form(&mut self, form: &FormInfo) {
        self.form = FormArray {
            frozen: form.frozen,
            attributes: form.attributes.to_html(),
            required_note: if form.shows_required_note() {
                form.required_note.clone()
            } else {
                String::new()
            },
            errors: form.errors.clone(),
            ..FormArray::default()
        };
        self.groups.clear();
    }

    fn finish_form(&mut self, _form: &FormInfo) {}

    fn render_header(&mut self, header: &Header) {
        self.form.sections.push(SectionArray {
            header: header.to_html(),
            name: header.name().to_string(),
            elements: Vec::new(),
        });
    }

    fn render_element(&mut self, element: &dyn Element, required: bool, error: Option<&str>) {
        let item = self.element_to_array(element, required, error);
        self.store(item);
    }

    fn render_hidden(&mut self, element: &dyn Element) {
        if self.collect_hidden {
            self.form.hidden.push_str(&element.to_html());
            self.form.hidden.push('\n');
        } else {
            self.render_element(element, false, None);
        }
    }

    fn render_html(&mut self, _html: &Html) {}

    fn start_group(&mut self, group: &Group, required: bool, error: Option<&str>) {
        let mut item = self.element_to_array(group, required, error);
        item.elements = Some(Vec::new());
        item.html = None;
        item.separator = group.separators().map(<[String]>::to_vec);
        self.groups.push(item);
    }

    fn finish_group(&mut self, _group: &Group) {
        if let Some(item) = self.groups.pop() {
            self.store(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Attributes;
    use crate::element::{Hidden, Text};

    fn info() -> FormInfo {
        FormInfo {
            name: "f".to_string(),
            attributes: Attributes::parse(r#"method="post""#),
            has_required: true,
            required_note: "note".to_string(),
            errors: [("email".to_string(), "bad".to_string())].into_iter().collect(),
            ..FormInfo::default()
        }
    }

    #[test]
    fn test_sections_and_groups() {
        let mut r = ArrayRenderer::new(true, true);
        r.start_form(&info());
        r.render_hidden(&Hidden::new("token", "t", ""));
        r.render_element(&Text::new("q", "Query", ""), false, None);
        r.render_header(&Header::new("contact", "Contact"));
        let mut text = Text::new("email", "Email", "");
        text.base_mut().labels.push("work".to_string());
        r.render_element(&text, true, Some("bad"));
        let mut group = Group::new(
            "name",
            "Name",
            vec![Box::new(Text::new("first", "", ""))],
            Some(" "),
            true,
        );
        group.accept(&mut r, false, None).unwrap();
        r.finish_form(&info());

        let form = r.to_array();
        assert_eq!(form.required_note, "note");
        assert!(form.hidden.contains(r#"name="token""#));
        assert_eq!(form.elements.len(), 1);
        assert_eq!(form.sections.len(), 1);
        let section = &form.sections[0];
        assert_eq!(section.name, "contact");
        assert_eq!(section.elements[0].extra_labels.get("label_2").map(String::as_str), Some("work"));
        assert_eq!(section.elements[0].error.as_deref(), Some("bad"));
        let group = &section.elements[1];
        assert_eq!(group.element_type, "group");
        assert_eq!(group.separator, Some(vec![" ".to_string()]));
        let children = group.elements.as_ref().unwrap();
        assert_eq!(children[0].name, "name[first]");
    }

    #[test]
    fn test_json_output() {
        let mut r = ArrayRenderer::new(false, false);
        r.start_form(&info());
        r.render_hidden(&Hidden::new("token", "t", ""));
        r.finish_form(&info());
        let json: serde_json::Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();
        assert_eq!(json["elements"][0]["type"], "hidden");
        assert_eq!(json["elements"][0]["value"], "t");
        assert_eq!(json["requirednote"], "note");
        assert_eq!(json["errors"]["email"], "bad");
        assert!(json.get("sections").is_none());
    }
}
