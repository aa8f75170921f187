// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! `<input>` 一族的单行元素：文本框、密码框、隐藏字段与各种按钮。

use crate::common::Attributes;
use crate::element::{Element, ElementArgs, ElementBase};
use crate::exception::Result;
use crate::renderer::Renderer;
use crate::value::Value;

/// 值保存在 `value` 属性里的 `<input>` 元素的公共实现
macro_rules! input_element {
    ($ty:ident, $kind:literal, { $($extra:tt)* }) => {
        impl Element for $ty {
            fn base(&self) -> &ElementBase {
                &self.base
            }

            fn base_mut(&mut self) -> &mut ElementBase {
                &mut self.base
            }

            fn element_type(&self) -> &'static str {
                $kind
            }

            fn value(&self) -> Option<Value> {
                self.base.attributes.get("value").map(Value::from)
            }

            fn set_value(&mut self, value: &Value) {
                self.base.attributes.set("value", value.text());
            }

            fn editable_html(&self) -> String {
                input_html(&self.base)
            }

            $($extra)*
        }
    };
}

fn input_base(kind: &str, name: &str, labels: Vec<String>, attributes: Attributes) -> ElementBase {
    let mut base = ElementBase::new(name, labels, attributes);
    base.attributes.set("type", kind);
    base
}

pub(crate) fn input_html(base: &ElementBase) -> String {
    format!("{}<input{} />", base.attributes.tabs(), base.attributes.to_html())
}

/// 单行文本框
#[derive(Debug, Clone, Default)]
pub struct Text {
    base: ElementBase,
}

impl Text {
    pub fn new(name: &str, label: &str, attributes: impl Into<Attributes>) -> Self {
        Self {
            base: input_base("text", name, label_list(label), attributes.into()),
        }
    }
}

input_element!(Text, "text", {
    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        self.base = input_base("text", &args.text_or(0, ""), args.labels(1), args.attrs(2));
        Ok(())
    }
});

/// 密码框，冻结后不显示明文
#[derive(Debug, Clone, Default)]
pub struct Password {
    base: ElementBase,
}

impl Password {
    pub fn new(name: &str, label: &str, attributes: impl Into<Attributes>) -> Self {
        Self {
            base: input_base("password", name, label_list(label), attributes.into()),
        }
    }
}

input_element!(Password, "password", {
    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        self.base = input_base("password", &args.text_or(0, ""), args.labels(1), args.attrs(2));
        Ok(())
    }

    fn frozen_html(&self) -> String {
        let value = self.value();
        let shown = match value.as_ref().map(Value::text) {
            Some(v) if !v.is_empty() => "**********",
            _ => "&nbsp;",
        };
        shown.to_string() + &self.base.persistent_data(value.as_ref())
    }
});

/// 隐藏字段。不可冻结，渲染时交给渲染器单独收集。
#[derive(Debug, Clone, Default)]
pub struct Hidden {
    base: ElementBase,
}

impl Hidden {
    pub fn new(name: &str, value: &str, attributes: impl Into<Attributes>) -> Self {
        let mut base = input_base("hidden", name, Vec::new(), attributes.into());
        base.attributes.set("value", value);
        Self { base }
    }
}

input_element!(Hidden, "hidden", {
    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        *self = Hidden::new(&args.text_or(0, ""), &args.text_or(1, ""), args.attrs(2));
        Ok(())
    }

    fn freeze(&mut self) -> bool {
        false
    }

    fn accept(&mut self, renderer: &mut dyn Renderer, _required: bool, _error: Option<&str>) -> Result<()> {
        renderer.render_hidden(&*self);
        Ok(())
    }
});

/// 提交按钮，只有被点击时才出现在导出值中
#[derive(Debug, Clone, Default)]
pub struct Submit {
    base: ElementBase,
}

impl Submit {
    pub fn new(name: &str, value: &str, attributes: impl Into<Attributes>) -> Self {
        Self {
            base: button_base("submit", name, value, attributes.into()),
        }
    }
}

fn button_base(kind: &str, name: &str, value: &str, attributes: Attributes) -> ElementBase {
    let mut base = input_base(kind, name, Vec::new(), attributes);
    if !value.is_empty() {
        base.attributes.set("value", value);
    }
    base
}

input_element!(Submit, "submit", {
    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        self.base = button_base("submit", &args.text_or(0, ""), &args.text_or(1, ""), args.attrs(2));
        Ok(())
    }

    fn freeze(&mut self) -> bool {
        false
    }

    fn export_value(&mut self, submitted: &Value, assoc: bool) -> Result<Option<Value>> {
        let value = submitted.lookup(self.name()).cloned();
        Ok(self.prepare_value(value, assoc))
    }
});

/// 重置按钮，从不导出值
#[derive(Debug, Clone, Default)]
pub struct Reset {
    base: ElementBase,
}

impl Reset {
    pub fn new(name: &str, value: &str, attributes: impl Into<Attributes>) -> Self {
        Self {
            base: button_base("reset", name, value, attributes.into()),
        }
    }
}

input_element!(Reset, "reset", {
    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        self.base = button_base("reset", &args.text_or(0, ""), &args.text_or(1, ""), args.attrs(2));
        Ok(())
    }

    fn freeze(&mut self) -> bool {
        false
    }

    fn export_value(&mut self, _submitted: &Value, _assoc: bool) -> Result<Option<Value>> {
        Ok(None)
    }
});

/// 普通按钮，从不导出值
#[derive(Debug, Clone, Default)]
pub struct Button {
    base: ElementBase,
}

impl Button {
    pub fn new(name: &str, value: &str, attributes: impl Into<Attributes>) -> Self {
        Self {
            base: button_base("button", name, value, attributes.into()),
        }
    }
}

input_element!(Button, "button", {
    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        self.base = button_base("button", &args.text_or(0, ""), &args.text_or(1, ""), args.attrs(2));
        Ok(())
    }

    fn freeze(&mut self) -> bool {
        false
    }

    fn export_value(&mut self, _submitted: &Value, _assoc: bool) -> Result<Option<Value>> {
        Ok(None)
    }
});

/// 图片按钮，浏览器以 `name[x]`/`name[y]` 形式提交点击坐标
#[derive(Debug, Clone, Default)]
pub struct Image {
    base: ElementBase,
}

impl Image {
    pub fn new(name: &str, src: &str, attributes: impl Into<Attributes>) -> Self {
        let mut base = input_base("image", name, Vec::new(), attributes.into());
        base.attributes.set("src", src);
        Self { base }
    }

    pub fn set_source(&mut self, src: &str) {
        self.base.attributes.set("src", src);
    }
}

input_element!(Image, "image", {
    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        *self = Image::new(&args.text_or(0, ""), &args.text_or(1, ""), args.attrs(2));
        Ok(())
    }

    fn freeze(&mut self) -> bool {
        false
    }

    fn export_value(&mut self, submitted: &Value, assoc: bool) -> Result<Option<Value>> {
        let value = submitted.lookup(self.name()).cloned();
        Ok(self.prepare_value(value, assoc))
    }
});

pub(crate) fn label_list(label: &str) -> Vec<String> {
    if label.is_empty() {
        Vec::new()
    } else {
        vec![label.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_render_and_value() {
        let mut text = Text::new("email", "Email", "size=30");
        text.set_value(&Value::from("a\"b"));
        let html = text.to_html();
        assert!(html.starts_with("<input"));
        assert!(html.contains(r#"name="email""#));
        assert!(html.contains(r#"type="text""#));
        assert!(html.contains(r#"value="a&quot;b""#));
        assert!(html.ends_with(" />"));
    }

    #[test]
    fn test_text_frozen_persists_value() {
        let mut text = Text::new("city", "City", "");
        text.set_value(&Value::from("Oslo"));
        assert!(text.freeze());
        assert_eq!(
            text.to_html(),
            r#"Oslo<input type="hidden" name="city" value="Oslo" />"#
        );
        text.set_persistent_freeze(false);
        assert_eq!(text.to_html(), "Oslo");
        text.set_value(&Value::from(""));
        assert_eq!(text.to_html(), "&nbsp;");
    }

    #[test]
    fn test_password_frozen_masks() {
        let mut pw = Password::new("pw", "Password", "");
        pw.set_value(&Value::from("secret"));
        pw.set_persistent_freeze(false);
        pw.freeze();
        assert_eq!(pw.to_html(), "**********");
    }

    #[test]
    fn test_buttons_refuse_freeze() {
        assert!(!Submit::new("go", "Go", "").freeze());
        assert!(!Reset::new("r", "Reset", "").freeze());
        assert!(!Button::new("b", "Click", "").freeze());
        assert!(!Hidden::new("h", "1", "").freeze());
        assert!(!Image::new("i", "/a.png", "").freeze());
    }

    #[test]
    fn test_submit_exports_only_when_clicked() {
        let mut submit = Submit::new("go", "Go", "");
        assert_eq!(submit.export_value(&Value::empty(), false).unwrap(), None);
        let posted = Value::map([("go", "Go")]);
        assert_eq!(
            submit.export_value(&posted, true).unwrap(),
            Some(Value::map([("go", "Go")]))
        );
        let mut reset = Reset::new("r", "Reset", "");
        assert_eq!(reset.export_value(&Value::map([("r", "Reset")]), false).unwrap(), None);
    }

    #[test]
    fn test_create_from_args() {
        let mut hidden = Hidden::default();
        hidden
            .create(&crate::element_args!["token", "abc"])
            .unwrap();
        assert_eq!(hidden.name(), "token");
        assert_eq!(hidden.value(), Some(Value::from("abc")));
        assert_eq!(hidden.element_type(), "hidden");
    }
}
