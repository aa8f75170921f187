// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 可选中的元素：复选框、带隐藏回退值的复选框、单选按钮。
//!
//! 未选中的复选框不会出现在浏览器提交的数据里，因此这一族元素在表单已提交时
//! 把“缺失”当作“未选中”，而不是回退到默认值。

use crate::common::Attributes;
use crate::element::input::{input_html, label_list};
use crate::element::{hidden_input, Element, ElementArgs, ElementBase, FormContext};
use crate::exception::Result;
use crate::value::Value;

fn checkable_base(kind: &str, name: &str, labels: Vec<String>, attributes: Attributes) -> ElementBase {
    let mut base = ElementBase::new(name, labels, attributes);
    base.attributes.set("type", kind);
    base.ensure_id();
    base
}

fn set_checked(base: &mut ElementBase, checked: bool) {
    if checked {
        base.attributes.set("checked", "checked");
    } else {
        base.attributes.remove("checked");
    }
}

/// 选项文字：可编辑时包在指向元素 id 的 `<label>` 里
fn text_html(base: &ElementBase, text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else if base.frozen {
        text.to_string()
    } else {
        format!(
            "<label for=\"{}\">{}</label>",
            base.attributes.get("id").unwrap_or(""),
            text
        )
    }
}

/// 复选框
#[derive(Debug, Clone, Default)]
pub struct Checkbox {
    base: ElementBase,
    text: String,
}

impl Checkbox {
    pub fn new(name: &str, label: &str, text: &str, attributes: impl Into<Attributes>) -> Self {
        Self {
            base: checkable_base("checkbox", name, label_list(label), attributes.into()),
            text: text.to_string(),
        }
    }

    pub fn is_checked(&self) -> bool {
        self.base.attributes.contains("checked")
    }

    pub fn set_checked(&mut self, checked: bool) {
        set_checked(&mut self.base, checked);
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Element for Checkbox {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn element_type(&self) -> &'static str {
        "checkbox"
    }

    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        *self = Checkbox::new(&args.text_or(0, ""), "", &args.text_or(2, ""), args.attrs(3));
        self.base.labels = args.labels(1);
        Ok(())
    }

    /// 选中时为 `"1"`，未选中时没有值
    fn value(&self) -> Option<Value> {
        self.is_checked().then(|| Value::from(true))
    }

    fn set_value(&mut self, value: &Value) {
        self.set_checked(value.is_truthy());
    }

    fn editable_html(&self) -> String {
        input_html(&self.base)
    }

    fn to_html(&self) -> String {
        let core = if self.base.frozen {
            self.frozen_html()
        } else {
            self.editable_html()
        };
        core + &text_html(&self.base, &self.text)
    }

    fn frozen_html(&self) -> String {
        if self.is_checked() {
            "<tt>[x]</tt>".to_string() + &self.base.persistent_data(self.value().as_ref())
        } else {
            "<tt>[ ]</tt>".to_string()
        }
    }

    fn update_value(&mut self, ctx: &FormContext) -> Result<()> {
        if let Some(value) = ctx.checkable_value(self.name()) {
            self.set_value(&value);
        }
        Ok(())
    }

    fn export_value(&mut self, submitted: &Value, assoc: bool) -> Result<Option<Value>> {
        let value = submitted.lookup(self.name()).cloned().or_else(|| self.value());
        Ok(self.prepare_value(value, assoc))
    }
}

/// 附带隐藏回退值的复选框：未选中时也会提交 `values.0`。
#[derive(Debug, Clone)]
pub struct AdvCheckbox {
    base: ElementBase,
    text: String,
    values: (String, String),
}

impl Default for AdvCheckbox {
    fn default() -> Self {
        Self {
            base: ElementBase::default(),
            text: String::new(),
            values: (String::new(), "1".to_string()),
        }
    }
}

impl AdvCheckbox {
    pub fn new(name: &str, label: &str, text: &str, attributes: impl Into<Attributes>) -> Self {
        let mut checkbox = Self {
            base: checkable_base("checkbox", name, label_list(label), attributes.into()),
            text: text.to_string(),
            ..Self::default()
        };
        checkbox.base.attributes.set("value", "1");
        checkbox
    }

    /// 设置（未选中值, 选中值）
    pub fn set_values(&mut self, unchecked: &str, checked: &str) {
        let was_checked = self.is_checked();
        self.values = (unchecked.to_string(), checked.to_string());
        self.base.attributes.set("value", checked);
        set_checked(&mut self.base, was_checked);
    }

    pub fn values(&self) -> (&str, &str) {
        (&self.values.0, &self.values.1)
    }

    pub fn is_checked(&self) -> bool {
        self.base.attributes.contains("checked")
    }

    pub fn set_checked(&mut self, checked: bool) {
        set_checked(&mut self.base, checked);
    }

    fn current(&self) -> &str {
        if self.is_checked() {
            &self.values.1
        } else {
            &self.values.0
        }
    }
}

impl Element for AdvCheckbox {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn element_type(&self) -> &'static str {
        "advcheckbox"
    }

    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        *self = AdvCheckbox::new(&args.text_or(0, ""), "", &args.text_or(2, ""), args.attrs(3));
        self.base.labels = args.labels(1);
        if let Some(Value::Map(values)) = args.value(4) {
            let mut it = values.values().map(|v| v.text().to_string());
            if let (Some(off), Some(on)) = (it.next(), it.next()) {
                self.set_values(&off, &on);
            }
        }
        Ok(())
    }

    fn value(&self) -> Option<Value> {
        Some(Value::from(self.current()))
    }

    fn set_value(&mut self, value: &Value) {
        let checked = value.text() == self.values.1;
        self.set_checked(checked);
    }

    /// 隐藏字段在前，浏览器只在复选框选中时用它的值覆盖回退值
    fn editable_html(&self) -> String {
        hidden_input(self.name(), &self.values.0, None) + &input_html(&self.base)
    }

    fn to_html(&self) -> String {
        let core = if self.base.frozen {
            self.frozen_html()
        } else {
            self.editable_html()
        };
        core + &text_html(&self.base, &self.text)
    }

    fn frozen_html(&self) -> String {
        let mark = if self.is_checked() { "<tt>[x]</tt>" } else { "<tt>[ ]</tt>" };
        mark.to_string() + &self.base.persistent_data(self.value().as_ref())
    }

    fn update_value(&mut self, ctx: &FormContext) -> Result<()> {
        if let Some(value) = ctx.checkable_value(self.name()) {
            self.set_value(&value);
        }
        Ok(())
    }

    /// 只导出两个约定值之一
    fn export_value(&mut self, submitted: &Value, assoc: bool) -> Result<Option<Value>> {
        let value = match submitted.lookup(self.name()) {
            None => self.value(),
            Some(v) if v.text() == self.values.0 || v.text() == self.values.1 => Some(v.clone()),
            Some(_) => None,
        };
        Ok(self.prepare_value(value, assoc))
    }
}

/// 单选按钮。同名的多个单选按钮作为重复元素加入表单。
#[derive(Debug, Clone, Default)]
pub struct Radio {
    base: ElementBase,
    text: String,
}

impl Radio {
    pub fn new(name: &str, label: &str, text: &str, value: &str, attributes: impl Into<Attributes>) -> Self {
        let mut radio = Self {
            base: checkable_base("radio", name, label_list(label), attributes.into()),
            text: text.to_string(),
        };
        radio.base.attributes.set("value", value);
        radio
    }

    /// 按钮自身代表的值，与是否选中无关
    pub fn radio_value(&self) -> &str {
        self.base.attributes.get("value").unwrap_or("")
    }

    pub fn is_checked(&self) -> bool {
        self.base.attributes.contains("checked")
    }

    pub fn set_checked(&mut self, checked: bool) {
        set_checked(&mut self.base, checked);
    }
}

impl Element for Radio {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn element_type(&self) -> &'static str {
        "radio"
    }

    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        *self = Radio::new(
            &args.text_or(0, ""),
            "",
            &args.text_or(2, ""),
            &args.text_or(3, ""),
            args.attrs(4),
        );
        self.base.labels = args.labels(1);
        Ok(())
    }

    /// 选中时为按钮自身的值
    fn value(&self) -> Option<Value> {
        self.is_checked().then(|| Value::from(self.radio_value()))
    }

    /// 比较后设置：只有值与按钮自身的值相同时才选中
    fn set_value(&mut self, value: &Value) {
        let checked = value.as_str() == Some(self.radio_value());
        self.set_checked(checked);
    }

    fn editable_html(&self) -> String {
        input_html(&self.base)
    }

    fn to_html(&self) -> String {
        let core = if self.base.frozen {
            self.frozen_html()
        } else {
            self.editable_html()
        };
        core + &text_html(&self.base, &self.text)
    }

    fn frozen_html(&self) -> String {
        if self.is_checked() {
            "<tt>(x)</tt>".to_string() + &self.base.persistent_data(self.value().as_ref())
        } else {
            "<tt>( )</tt>".to_string()
        }
    }

    fn update_value(&mut self, ctx: &FormContext) -> Result<()> {
        if let Some(value) = ctx.checkable_value(self.name()) {
            self.set_value(&value);
        }
        Ok(())
    }

    fn export_value(&mut self, submitted: &Value, assoc: bool) -> Result<Option<Value>> {
        let value = match submitted.lookup(self.name()) {
            None => self.value(),
            Some(v) if v.as_str() == Some(self.radio_value()) => Some(v.clone()),
            Some(_) => None,
        };
        Ok(self.prepare_value(value, assoc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted_ctx(submitted: Value, defaults: Value) -> FormContext {
        FormContext {
            submitted,
            defaults,
            is_submitted: true,
            ..FormContext::default()
        }
    }

    #[test]
    fn test_checkbox_defaults_when_not_submitted() {
        let mut cb = Checkbox::new("agree", "Agree", "I agree", "");
        let ctx = FormContext {
            defaults: Value::map([("agree", "1")]),
            ..FormContext::default()
        };
        cb.update_value(&ctx).unwrap();
        assert!(cb.is_checked());
    }

    #[test]
    fn test_checkbox_absent_on_submit_means_unchecked() {
        let mut cb = Checkbox::new("agree", "Agree", "", "");
        let ctx = submitted_ctx(Value::map([("other", "x")]), Value::map([("agree", "1")]));
        cb.update_value(&ctx).unwrap();
        assert!(!cb.is_checked());
        assert_eq!(cb.value(), None);
    }

    #[test]
    fn test_checkbox_render_with_label() {
        let mut cb = Checkbox::new("agree", "", "Yes", "id=agree_box");
        cb.set_checked(true);
        let html = cb.to_html();
        assert!(html.contains(r#"type="checkbox""#));
        assert!(html.contains(r#"checked="checked""#));
        assert!(html.ends_with(r#"<label for="agree_box">Yes</label>"#));
        cb.freeze();
        cb.set_persistent_freeze(false);
        assert_eq!(cb.to_html(), "<tt>[x]</tt>Yes");
    }

    #[test]
    fn test_radio_compare_and_set() {
        let mut a = Radio::new("color", "", "Red", "red", "");
        let mut b = Radio::new("color", "", "Blue", "blue", "");
        a.set_value(&Value::from("blue"));
        b.set_value(&Value::from("blue"));
        assert!(!a.is_checked());
        assert!(b.is_checked());
        assert_eq!(b.value(), Some(Value::from("blue")));
        assert_eq!(a.value(), None);
    }

    #[test]
    fn test_radio_export_filters_foreign_value() {
        let mut a = Radio::new("color", "", "", "red", "");
        let posted = Value::map([("color", "blue")]);
        assert_eq!(a.export_value(&posted, false).unwrap(), None);
        let posted = Value::map([("color", "red")]);
        assert_eq!(a.export_value(&posted, false).unwrap(), Some(Value::from("red")));
    }

    #[test]
    fn test_advcheckbox_values() {
        let mut adv = AdvCheckbox::new("news", "", "Newsletter", "");
        adv.set_values("no", "yes");
        assert_eq!(adv.value(), Some(Value::from("no")));
        adv.set_value(&Value::from("yes"));
        assert!(adv.is_checked());
        assert_eq!(
            adv.export_value(&Value::empty(), true).unwrap(),
            Some(Value::map([("news", "yes")]))
        );
        let bogus = Value::map([("news", "maybe")]);
        assert_eq!(adv.export_value(&bogus, false).unwrap(), None);
        let html = adv.editable_html();
        assert!(html.starts_with(r#"<input type="hidden" name="news" value="no" />"#));
        assert!(html.contains(r#"value="yes""#));
    }
}
