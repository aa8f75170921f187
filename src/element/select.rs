// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 下拉列表（单选 / 多选）。

use crate::common::Attributes;
use crate::element::input::label_list;
use crate::element::{hidden_input, Element, ElementArgs, ElementBase, FormContext};
use crate::exception::Result;
use crate::util::escape_html;
use crate::value::Value;

/// 一个 `<option>`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub text: String,
    pub attributes: Attributes,
}

impl SelectOption {
    pub fn value(&self) -> &str {
        self.attributes.get("value").unwrap_or("")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Select {
    base: ElementBase,
    options: Vec<SelectOption>,
    selected: Vec<String>,
}

impl Select {
    /// `options` 为（值, 显示文字）对
    pub fn new<V: AsRef<str>, T: AsRef<str>>(
        name: &str,
        label: &str,
        options: &[(V, T)],
        attributes: impl Into<Attributes>,
    ) -> Self {
        let mut select = Self {
            base: ElementBase::new(name, label_list(label), attributes.into()),
            ..Self::default()
        };
        select.load_options(options);
        select
    }

    pub fn add_option(&mut self, text: &str, value: &str, attributes: Option<Attributes>) {
        let mut attributes = attributes.unwrap_or_default();
        attributes.set("value", value);
        if attributes.contains("selected") {
            attributes.remove("selected");
            self.selected.push(value.to_string());
        }
        self.options.push(SelectOption {
            text: text.to_string(),
            attributes,
        });
    }

    pub fn load_options<V: AsRef<str>, T: AsRef<str>>(&mut self, options: &[(V, T)]) {
        for (value, text) in options {
            self.add_option(text.as_ref(), value.as_ref(), None);
        }
    }

    /// 清空选项与已选值
    pub fn clear_options(&mut self) {
        self.options.clear();
        self.selected.clear();
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn is_multiple(&self) -> bool {
        self.base.attributes.contains("multiple")
    }

    pub fn set_multiple(&mut self, multiple: bool) {
        if multiple {
            self.base.attributes.set("multiple", "multiple");
        } else {
            self.base.attributes.remove("multiple");
        }
    }

    pub fn set_size(&mut self, size: usize) {
        self.base.attributes.set("size", &size.to_string());
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value() == value)
    }

    /// 多选列表提交时名称带 `[]` 后缀
    fn private_name(&self) -> String {
        let name = self.name();
        if self.is_multiple() && !name.ends_with("[]") {
            format!("{}[]", name)
        } else {
            name.to_string()
        }
    }

    /// 已选且存在于选项中的值
    fn valid_selection(&self) -> Vec<&String> {
        self.selected.iter().filter(|v| self.has_option(v)).collect()
    }
}

impl Element for Select {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn element_type(&self) -> &'static str {
        "select"
    }

    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        *self = Select::new(&args.text_or(0, ""), "", &args.options(2), args.attrs(3));
        self.base.labels = args.labels(1);
        Ok(())
    }

    /// 单选为字符串，多选为列表；没有有效选择时没有值
    fn value(&self) -> Option<Value> {
        let selection = self.valid_selection();
        if selection.is_empty() {
            None
        } else if self.is_multiple() {
            Some(Value::list(selection.into_iter().cloned()))
        } else {
            Some(Value::from(selection[0]))
        }
    }

    /// 多选列表接受逗号分隔的字符串
    fn set_value(&mut self, value: &Value) {
        self.selected = match value {
            Value::Str(s) if self.is_multiple() => s.split(',').map(|v| v.trim().to_string()).collect(),
            Value::Str(s) => vec![s.clone()],
            Value::Map(m) => m.values().map(|v| v.text().to_string()).collect(),
            Value::File(_) => Vec::new(),
        };
    }

    fn editable_html(&self) -> String {
        let tabs = self.base.attributes.tabs();
        let mut attributes = self.base.attributes.clone();
        if self.is_multiple() {
            attributes.set("name", &self.private_name());
        }
        let mut html = format!("{}<select{}>\n", tabs, attributes.to_html());
        for option in &self.options {
            let mut option_attrs = option.attributes.clone();
            if self.selected.iter().any(|v| v == option.value()) {
                option_attrs.set("selected", "selected");
            }
            html.push_str(&format!(
                "{}\t<option{}>{}</option>\n",
                tabs,
                option_attrs.to_html(),
                escape_html(&option.text)
            ));
        }
        html.push_str(&tabs);
        html.push_str("</select>");
        html
    }

    /// 显示选中项的文字，每个选中值对应一个隐藏字段
    fn frozen_html(&self) -> String {
        let chosen: Vec<(&str, &str)> = self
            .selected
            .iter()
            .filter_map(|v| {
                self.options
                    .iter()
                    .find(|o| o.value() == v.as_str())
                    .map(|o| (v.as_str(), o.text.as_str()))
            })
            .collect();
        let mut html = if chosen.is_empty() {
            "&nbsp;".to_string()
        } else {
            chosen
                .iter()
                .map(|(_, text)| escape_html(text))
                .collect::<Vec<_>>()
                .join("<br />")
        };
        if self.base.persist_freeze {
            let name = self.private_name();
            let id = if chosen.len() == 1 {
                self.base.attributes.get("id")
            } else {
                None
            };
            for (value, _) in &chosen {
                html.push_str(&hidden_input(&name, value, id));
            }
        }
        html
    }

    /// 已提交的多选列表即使为空也不回退到默认值
    fn update_value(&mut self, ctx: &FormContext) -> Result<()> {
        let name = self.name().to_string();
        let mut value = ctx
            .constants
            .lookup(&name)
            .or_else(|| ctx.submitted.lookup(&name))
            .cloned();
        if value.is_none() && (!ctx.is_submitted || !self.is_multiple()) {
            value = ctx.defaults.lookup(&name).cloned();
        }
        if let Some(value) = value {
            self.set_value(&value);
        }
        Ok(())
    }

    /// 丢弃不在选项中的提交值
    fn export_value(&mut self, submitted: &Value, assoc: bool) -> Result<Option<Value>> {
        let candidates: Vec<String> = match submitted.lookup(self.name()) {
            Some(v) => v.items().into_iter().map(|v| v.text().to_string()).collect(),
            None => self.valid_selection().into_iter().cloned().collect(),
        };
        let clean: Vec<String> = if self.options.is_empty() {
            candidates
        } else {
            candidates.into_iter().filter(|v| self.has_option(v)).collect()
        };
        let value = if clean.is_empty() {
            None
        } else if self.is_multiple() {
            Some(Value::list(clean))
        } else {
            Some(Value::from(clean[0].as_str()))
        };
        Ok(self.prepare_value(value, assoc))
    }
}
