// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 不参与提交的展示型元素：静态文本、分节标题、原样 HTML 与链接。

use crate::common::Attributes;
use crate::element::input::label_list;
use crate::element::{Element, ElementArgs, ElementBase, FormContext};
use crate::exception::Result;
use crate::renderer::Renderer;
use crate::value::Value;

/// 静态元素共有的部分：文字内容、不导出值、值只来自常量和默认值
macro_rules! static_element {
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
                None
            }

            /// 设置值即替换显示的文字
            fn set_value(&mut self, value: &Value) {
                self.text = value.text().to_string();
            }

            fn frozen_html(&self) -> String {
                self.editable_html()
            }

            fn update_value(&mut self, ctx: &FormContext) -> Result<()> {
                if let Some(value) = ctx.static_value(self.name()) {
                    self.set_value(&value);
                }
                Ok(())
            }

            fn export_value(&mut self, _submitted: &Value, _assoc: bool) -> Result<Option<Value>> {
                Ok(None)
            }

            $($extra)*
        }
    };
}

/// 静态文本
#[derive(Debug, Clone, Default)]
pub struct Static {
    base: ElementBase,
    text: String,
}

impl Static {
    pub fn new(name: &str, label: &str, text: &str) -> Self {
        Self {
            base: ElementBase::new(name, label_list(label), Attributes::new()),
            text: text.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

static_element!(Static, "static", {
    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        *self = Static::new(&args.text_or(0, ""), "", &args.text_or(2, ""));
        self.base.labels = args.labels(1);
        Ok(())
    }

    fn editable_html(&self) -> String {
        self.base.attributes.tabs() + &self.text
    }
});

/// 分节标题，渲染器据此开始新的一节
#[derive(Debug, Clone, Default)]
pub struct Header {
    base: ElementBase,
    text: String,
}

impl Header {
    pub fn new(name: &str, text: &str) -> Self {
        Self {
            base: ElementBase::new(name, Vec::new(), Attributes::new()),
            text: text.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

static_element!(Header, "header", {
    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        *self = Header::new(&args.text_or(0, ""), &args.text_or(1, ""));
        Ok(())
    }

    fn editable_html(&self) -> String {
        self.text.clone()
    }

    fn accept(&mut self, renderer: &mut dyn Renderer, _required: bool, _error: Option<&str>) -> Result<()> {
        renderer.render_header(&*self);
        Ok(())
    }
});

/// 原样输出的 HTML 片段
#[derive(Debug, Clone, Default)]
pub struct Html {
    base: ElementBase,
    text: String,
}

impl Html {
    pub fn new(text: &str) -> Self {
        Self {
            base: ElementBase::default(),
            text: text.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

static_element!(Html, "html", {
    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        *self = Html::new(&args.text_or(0, ""));
        Ok(())
    }

    fn editable_html(&self) -> String {
        self.text.clone()
    }

    fn accept(&mut self, renderer: &mut dyn Renderer, _required: bool, _error: Option<&str>) -> Result<()> {
        renderer.render_html(&*self);
        Ok(())
    }
});

/// 超链接
#[derive(Debug, Clone, Default)]
pub struct Link {
    base: ElementBase,
    text: String,
}

impl Link {
    pub fn new(name: &str, label: &str, href: &str, text: &str, attributes: impl Into<Attributes>) -> Self {
        let mut base = ElementBase::new(name, label_list(label), attributes.into());
        base.attributes.set("href", href);
        Self {
            base,
            text: text.to_string(),
        }
    }

    pub fn set_href(&mut self, href: &str) {
        self.base.attributes.set("href", href);
    }
}

static_element!(Link, "link", {
    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        *self = Link::new(
            &args.text_or(0, ""),
            "",
            &args.text_or(2, ""),
            &args.text_or(3, ""),
            args.attrs(4),
        );
        self.base.labels = args.labels(1);
        Ok(())
    }

    fn editable_html(&self) -> String {
        format!(
            "{}<a{}>{}</a>",
            self.base.attributes.tabs(),
            self.base.attributes.to_html(),
            self.text
        )
    }
});
