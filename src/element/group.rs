// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 元素组
//!
//! 组把若干子元素当作一个整体加入表单。开启 `append_name` 时，子元素在每次
//! 取值、导出、事件处理与渲染期间被临时改名为 `组名[子名]`（子名为空时用序号），
//! 操作结束后由 [`QualifiedNames`] 的 `Drop` 还原，错误提前返回与 panic 都不会
//! 留下被改过名的子元素。

use std::ops::{Deref, DerefMut};

use log::warn;

use crate::common::Attributes;
use crate::element::input::label_list;
use crate::element::{Element, ElementArgs, ElementBase, FormContext, FormEvent};
use crate::exception::Result;
use crate::renderer::{DefaultRenderer, Renderer};
use crate::value::Value;

/// 子元素改名的作用域守卫
pub(crate) struct QualifiedNames<'a> {
    children: &'a mut Vec<Box<dyn Element>>,
    saved: Option<Vec<String>>,
}

impl<'a> QualifiedNames<'a> {
    pub(crate) fn new(children: &'a mut Vec<Box<dyn Element>>, group: &str, append_name: bool) -> Self {
        let saved = if append_name {
            let saved: Vec<String> = children.iter().map(|c| c.name().to_string()).collect();
            for (i, child) in children.iter_mut().enumerate() {
                child.set_name(&qualified_name(group, &saved[i], i));
            }
            Some(saved)
        } else {
            None
        };
        Self { children, saved }
    }
}

impl Deref for QualifiedNames<'_> {
    type Target = Vec<Box<dyn Element>>;

    fn deref(&self) -> &Self::Target {
        self.children
    }
}

impl DerefMut for QualifiedNames<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.children
    }
}

impl Drop for QualifiedNames<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            for (child, name) in self.children.iter_mut().zip(saved) {
                child.set_name(&name);
            }
        }
    }
}

fn qualified_name(group: &str, child: &str, index: usize) -> String {
    if child.is_empty() {
        format!("{}[{}]", group, index)
    } else {
        format!("{}[{}]", group, child)
    }
}

fn child_key(child: &dyn Element, index: usize) -> String {
    if child.name().is_empty() {
        index.to_string()
    } else {
        child.name().to_string()
    }
}

/// 元素组
#[derive(Debug, Clone)]
pub struct Group {
    pub(crate) base: ElementBase,
    children: Vec<Box<dyn Element>>,
    separator: Option<Vec<String>>,
    append_name: bool,
    required: Vec<String>,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            base: ElementBase::default(),
            children: Vec::new(),
            separator: None,
            append_name: true,
            required: Vec::new(),
        }
    }
}

impl Group {
    pub fn new(
        name: &str,
        label: &str,
        children: Vec<Box<dyn Element>>,
        separator: Option<&str>,
        append_name: bool,
    ) -> Self {
        Self {
            base: ElementBase::new(name, label_list(label), Attributes::new()),
            children,
            separator: separator.map(|s| vec![s.to_string()]),
            append_name,
            required: Vec::new(),
        }
    }

    pub fn children(&self) -> &[Box<dyn Element>] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Box<dyn Element>> {
        &mut self.children
    }

    pub fn set_children(&mut self, children: Vec<Box<dyn Element>>) {
        self.children = children;
    }

    pub fn append_name(&self) -> bool {
        self.append_name
    }

    pub fn set_append_name(&mut self, append_name: bool) {
        self.append_name = append_name;
    }

    /// 多个分隔符依次循环使用
    pub fn set_separators(&mut self, separators: Vec<String>) {
        self.separator = Some(separators);
    }

    pub fn separators(&self) -> Option<&[String]> {
        self.separator.as_deref()
    }

    /// 用分隔符连接已渲染的子元素，未设置分隔符时使用 `&nbsp;`
    pub fn join(&self, parts: &[String]) -> String {
        match &self.separator {
            None => parts.join("&nbsp;"),
            Some(seps) if seps.is_empty() => parts.concat(),
            Some(seps) => {
                let mut html = String::new();
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        html.push_str(&seps[(i - 1) % seps.len()]);
                    }
                    html.push_str(part);
                }
                html
            }
        }
    }

    /// 子元素在表单中的完整名称；`key` 可以是子元素名或序号。
    pub fn element_name(&self, key: &str) -> Option<String> {
        let index = self
            .children
            .iter()
            .position(|c| !c.name().is_empty() && c.name() == key)
            .or_else(|| key.parse::<usize>().ok().filter(|i| *i < self.children.len()))?;
        let own = child_key(self.children[index].as_ref(), index);
        if self.append_name {
            Some(qualified_name(self.name(), &own, index))
        } else {
            Some(own)
        }
    }

    /// 所有子元素类型相同时返回该类型，否则为 `mixed`
    pub fn group_type(&self) -> &'static str {
        let mut kinds = self.children.iter().map(|c| c.element_type());
        match kinds.next() {
            None => "group",
            Some(first) if kinds.all(|k| k == first) => first,
            Some(_) => "mixed",
        }
    }

    /// 渲染时标记为必填的子元素完整名称
    pub fn required_children(&self) -> &[String] {
        &self.required
    }

    pub fn add_required_child(&mut self, name: &str) {
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }

    /// 全部子元素的完整名称
    pub fn qualified_child_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for (i, child) in self.children.iter().enumerate() {
            let own = child_key(child.as_ref(), i);
            let name = if self.append_name {
                qualified_name(self.name(), &own, i)
            } else {
                own
            };
            names.push(name);
        }
        names
    }

    fn qualified(&mut self) -> QualifiedNames<'_> {
        let name = self.base.name().to_string();
        QualifiedNames::new(&mut self.children, &name, self.append_name)
    }
}

impl Element for Group {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn element_type(&self) -> &'static str {
        "group"
    }

    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        *self = Group::new(
            &args.text_or(0, ""),
            "",
            args.elements(2),
            args.text(3),
            args.flag(4, true),
        );
        self.base.labels = args.labels(1);
        Ok(())
    }

    /// 以子元素名（或序号）为键的映射；未选中的复选框与单选按钮不计入。
    fn value(&self) -> Option<Value> {
        let mut map = indexmap::IndexMap::new();
        for (i, child) in self.children.iter().enumerate() {
            if let Some(v) = child.value() {
                map.insert(child_key(child.as_ref(), i), v);
            }
        }
        (!map.is_empty()).then_some(Value::Map(map))
    }

    fn set_value(&mut self, value: &Value) {
        let append_name = self.append_name;
        let ctx = FormContext::default();
        let originals: Vec<String> = self.children.iter().map(|c| c.name().to_string()).collect();
        let mut children = self.qualified();
        for (i, child) in children.iter_mut().enumerate() {
            let slice = if append_name {
                match value {
                    Value::Map(m) => {
                        let key = if originals[i].is_empty() {
                            i.to_string()
                        } else {
                            originals[i].clone()
                        };
                        m.get(&key)
                    }
                    other => Some(other),
                }
            } else {
                value.lookup(&originals[i])
            };
            if let Some(slice) = slice {
                if let Err(e) = child.on_event(&FormEvent::SetGroupValue(slice), &ctx) {
                    warn!("组 {} 下发值失败: {}", originals[i], e);
                }
            }
        }
    }

    fn editable_html(&self) -> String {
        let mut group = self.clone();
        let mut renderer = DefaultRenderer::new();
        renderer.set_element_template("{element}", None);
        match group.accept(&mut renderer, false, None) {
            Ok(()) => renderer.to_html(),
            Err(e) => {
                warn!("渲染组 {} 失败: {}", self.name(), e);
                String::new()
            }
        }
    }

    /// 子元素各自冻结，组只负责拼接
    fn frozen_html(&self) -> String {
        self.editable_html()
    }

    fn freeze(&mut self) -> bool {
        self.base.frozen = true;
        for child in &mut self.children {
            child.freeze();
        }
        true
    }

    fn unfreeze(&mut self) {
        self.base.frozen = false;
        for child in &mut self.children {
            child.unfreeze();
        }
    }

    fn set_persistent_freeze(&mut self, persist: bool) {
        self.base.persist_freeze = persist;
        for child in &mut self.children {
            child.set_persistent_freeze(persist);
        }
    }

    fn update_value(&mut self, ctx: &FormContext) -> Result<()> {
        let mut children = self.qualified();
        for child in children.iter_mut() {
            child.on_event(&FormEvent::UpdateValue, ctx)?;
        }
        Ok(())
    }

    /// 按完整名称导出每个子元素；`assoc` 时递归合并，否则以子元素名为键。
    fn export_value(&mut self, submitted: &Value, assoc: bool) -> Result<Option<Value>> {
        let keys: Vec<String> = self
            .children
            .iter()
            .enumerate()
            .map(|(i, c)| child_key(c.as_ref(), i))
            .collect();
        let mut exported: Option<Value> = None;
        let mut children = self.qualified();
        for (i, child) in children.iter_mut().enumerate() {
            if let Some(v) = child.export_value(submitted, assoc)? {
                let acc = exported.get_or_insert_with(Value::empty);
                if assoc {
                    acc.merge(&v);
                } else if let Some(map) = acc.as_map_mut() {
                    map.insert(keys[i].clone(), v);
                }
            }
        }
        Ok(exported)
    }

    fn accept(&mut self, renderer: &mut dyn Renderer, required: bool, error: Option<&str>) -> Result<()> {
        renderer.start_group(&*self, required, error);
        let required_children = self.required.clone();
        {
            let mut children = self.qualified();
            for child in children.iter_mut() {
                let child_required =
                    !child.is_frozen() && required_children.iter().any(|r| r == child.name());
                child.accept(renderer, child_required, None)?;
            }
        }
        renderer.finish_group(&*self);
        Ok(())
    }

    fn as_group(&self) -> Option<&Group> {
        Some(self)
    }

    fn as_group_mut(&mut self) -> Option<&mut Group> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Checkbox, Text};
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn name_group() -> Group {
        Group::new(
            "person",
            "Name",
            vec![
                Box::new(Text::new("first", "", "")),
                Box::new(Text::new("last", "", "")),
                Box::new(Text::new("", "", "")),
            ],
            Some(" "),
            true,
        )
    }

    fn child_names(group: &Group) -> Vec<String> {
        group.children().iter().map(|c| c.name().to_string()).collect()
    }

    /// 处理值时一定失败或 panic 的元素
    #[derive(Debug, Clone, Default)]
    struct Faulty {
        base: ElementBase,
        panics: bool,
    }

    impl Element for Faulty {
        fn base(&self) -> &ElementBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut ElementBase {
            &mut self.base
        }
        fn element_type(&self) -> &'static str {
            "faulty"
        }
        fn create(&mut self, _args: &ElementArgs) -> Result<()> {
            Ok(())
        }
        fn value(&self) -> Option<Value> {
            None
        }
        fn set_value(&mut self, _value: &Value) {}
        fn editable_html(&self) -> String {
            String::new()
        }
        fn update_value(&mut self, _ctx: &FormContext) -> Result<()> {
            if self.panics {
                panic!("boom");
            }
            Err(crate::exception::Exception::ElementFailure("boom".to_string()))
        }
    }

    #[test]
    fn test_children_renamed_during_update() {
        let mut group = name_group();
        let ctx = FormContext {
            defaults: Value::map([(
                "person",
                Value::map([("first", "Ada"), ("last", "Lovelace"), ("2", "x")]),
            )]),
            ..FormContext::default()
        };
        group.update_value(&ctx).unwrap();
        assert_eq!(child_names(&group), vec!["first", "last", ""]);
        assert_eq!(
            group.value(),
            Some(Value::map([("first", "Ada"), ("last", "Lovelace"), ("2", "x")]))
        );
    }

    #[test]
    fn test_names_restored_after_error() {
        let mut group = name_group();
        group.children_mut().insert(
            1,
            Box::new(Faulty {
                base: ElementBase::new("bad", vec![], Attributes::new()),
                panics: false,
            }),
        );
        assert!(group.update_value(&FormContext::default()).is_err());
        assert_eq!(child_names(&group), vec!["first", "bad", "last", ""]);
    }

    #[test]
    fn test_names_restored_after_panic() {
        let mut group = name_group();
        group.children_mut().push(Box::new(Faulty {
            base: ElementBase::new("bad", vec![], Attributes::new()),
            panics: true,
        }));
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _ = group.update_value(&FormContext::default());
        }));
        assert!(result.is_err());
        assert_eq!(child_names(&group), vec!["first", "last", "", "bad"]);
    }

    #[test]
    fn test_render_uses_qualified_names_and_separator() {
        let mut group = name_group();
        group.set_value(&Value::map([("first", "Ada")]));
        let html = group.to_html();
        assert!(html.contains(r#"name="person[first]""#));
        assert!(html.contains(r#"name="person[last]""#));
        assert!(html.contains(r#"name="person[2]""#));
        assert!(html.contains(r#"value="Ada""#));
        assert_eq!(html.matches("> <").count(), 2);
        assert_eq!(child_names(&group), vec!["first", "last", ""]);
    }

    #[test]
    fn test_export_assoc_and_plain() {
        let mut group = name_group();
        let posted = Value::map([("person", Value::map([("first", "Ada"), ("last", "L")]))]);
        let assoc = group.export_value(&posted, true).unwrap().unwrap();
        assert_eq!(assoc.lookup("person[first]"), Some(&Value::from("Ada")));
        let plain = group.export_value(&posted, false).unwrap().unwrap();
        assert_eq!(plain.lookup("first"), Some(&Value::from("Ada")));
        assert_eq!(plain.lookup("last"), Some(&Value::from("L")));
    }

    #[test]
    fn test_group_helpers() {
        let mut group = Group::new(
            "opts",
            "",
            vec![
                Box::new(Checkbox::new("a", "", "A", "")),
                Box::new(Checkbox::new("b", "", "B", "")),
            ],
            None,
            true,
        );
        assert_eq!(group.group_type(), "checkbox");
        assert_eq!(group.element_name("b"), Some("opts[b]".to_string()));
        assert_eq!(group.element_name("0"), Some("opts[a]".to_string()));
        assert_eq!(group.element_name("zz"), None);
        group.set_value(&Value::map([("b", "1")]));
        assert_eq!(group.value(), Some(Value::map([("b", "1")])));
        assert_eq!(group.join(&["x".into(), "y".into()]), "x&nbsp;y");
        group.set_separators(vec!["|".into(), "/".into()]);
        assert_eq!(group.join(&["1".into(), "2".into(), "3".into(), "4".into()]), "1|2/3|4");
    }

    #[test]
    fn test_freeze_propagates() {
        let mut group = name_group();
        group.freeze();
        assert!(group.children().iter().all(|c| c.is_frozen()));
        group.unfreeze();
        assert!(group.children().iter().all(|c| !c.is_frozen()));
    }
}
