// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use crate::common::Attributes;
use crate::element::input::label_list;
use crate::element::{Element, ElementArgs, ElementBase};
use crate::exception::Result;
use crate::util::{escape_html, nl2br};
use crate::value::Value;

/// 多行文本框
#[derive(Debug, Clone, Default)]
pub struct Textarea {
    base: ElementBase,
    value: String,
}

impl Textarea {
    pub fn new(name: &str, label: &str, attributes: impl Into<Attributes>) -> Self {
        Self {
            base: ElementBase::new(name, label_list(label), attributes.into()),
            value: String::new(),
        }
    }

    pub fn set_rows(&mut self, rows: usize) {
        self.base.attributes.set("rows", &rows.to_string());
    }

    pub fn set_cols(&mut self, cols: usize) {
        self.base.attributes.set("cols", &cols.to_string());
    }
}

impl Element for Textarea {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn element_type(&self) -> &'static str {
        "textarea"
    }

    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        self.base = ElementBase::new(&args.text_or(0, ""), args.labels(1), args.attrs(2));
        self.value.clear();
        Ok(())
    }

    fn value(&self) -> Option<Value> {
        Some(Value::from(self.value.as_str()))
    }

    fn set_value(&mut self, value: &Value) {
        self.value = value.text().to_string();
    }

    fn editable_html(&self) -> String {
        format!(
            "{}<textarea{}>{}</textarea>",
            self.base.attributes.tabs(),
            self.base.attributes.to_html(),
            escape_html(&self.value)
        )
    }

    /// `wrap="off"` 时保留排版，否则把换行转成 `<br />`
    fn frozen_html(&self) -> String {
        let value = escape_html(&self.value);
        let html = if self.base.attributes.get("wrap") == Some("off") {
            format!("<pre>{}</pre>\n", value)
        } else {
            nl2br(&value) + "\n"
        };
        html + &self.base.persistent_data(self.value().as_ref())
    }
}
