// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 渲染器模块
//!
//! 渲染器是遍历表单元素树的访问者。表单先调用 `start_form`，随后每个元素通过
//! `Element::accept` 把自己交给渲染器（组会再把子元素逐个交给它），最后调用
//! `finish_form`。
//!
//! - [`DefaultRenderer`]：基于模板替换输出 HTML 表格布局；
//! - [`ArrayRenderer`]：输出可序列化的结构，供模板引擎或 JSON 接口使用。

use indexmap::IndexMap;

use crate::common::Attributes;
use crate::element::{Element, Group, Header, Html};

pub mod array;
pub mod default;

pub use array::{ArrayRenderer, ElementArray, FormArray, SectionArray};
pub use default::DefaultRenderer;

/// 渲染开始与结束时表单提供给渲染器的快照
#[derive(Debug, Clone, Default)]
pub struct FormInfo {
    pub name: String,
    pub attributes: Attributes,
    /// 表单中是否有必填字段
    pub has_required: bool,
    /// 表单是否被整体冻结
    pub frozen: bool,
    pub required_note: String,
    pub errors: IndexMap<String, String>,
}

impl FormInfo {
    /// 有必填字段且表单未整体冻结时才需要显示必填说明
    pub fn shows_required_note(&self) -> bool {
        self.has_required && !self.frozen
    }
}

/// 表单渲染访问者
pub trait Renderer {
    fn start_form(&mut self, form: &FormInfo);
    fn finish_form(&mut self, form: &FormInfo);
    fn render_header(&mut self, header: &Header);
    fn render_element(&mut self, element: &dyn Element, required: bool, error: Option<&str>);
    fn render_hidden(&mut self, element: &dyn Element);
    fn render_html(&mut self, html: &Html);
    fn start_group(&mut self, group: &Group, required: bool, error: Option<&str>);
    fn finish_group(&mut self, group: &Group);
}
