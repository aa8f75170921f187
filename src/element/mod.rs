// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 表单元素模块
//!
//! 所有表单元素都实现 [`Element`] 特性：
//! - 通过 [`FormEvent`] 与所属表单交互（值解析、按类型名创建、组值下发）；
//! - 在“可编辑”与“冻结”两种状态之间切换，冻结时输出只读表示；
//! - 通过 [`Renderer`] 访问者把自身交给渲染器。
//!
//! 元素类型注册表 [`ElementRegistry`] 把类型名映射到构造函数，进程级默认表由
//! `lazy_static` 构建一次，表单需要自定义类型时按写时复制得到自己的副本。

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lazy_static::lazy_static;
use log::debug;

use crate::common::Attributes;
use crate::exception::{Exception, Result};
use crate::param::FormMethod;
use crate::renderer::Renderer;
use crate::util::escape_html;
use crate::value::Value;

pub mod checkbox;
pub mod date;
pub mod file;
pub mod group;
pub mod hierselect;
pub mod input;
pub mod misc;
pub mod select;
pub mod textarea;

pub use checkbox::{AdvCheckbox, Checkbox, Radio};
pub use date::Date;
pub use file::{is_uploaded_file, move_uploaded_file, File};
pub use group::Group;
pub use hierselect::HierSelect;
pub use input::{Button, Hidden, Image, Password, Reset, Submit, Text};
pub use misc::{Header, Html, Link, Static};
pub use select::Select;
pub use textarea::Textarea;

/// 表单向元素派发的事件
#[derive(Debug, Clone, Copy)]
pub enum FormEvent<'a> {
    /// 按“常量 > 提交值 > 默认值”解析并设置自身的值
    UpdateValue,
    /// 按类型名创建后加入表单：先 `CreateElement` 再 `UpdateValue`
    AddElement(&'a ElementArgs),
    /// 用位置参数重新构造自身
    CreateElement(&'a ElementArgs),
    /// 父组把属于本元素的那一部分值下发下来
    SetGroupValue(&'a Value),
}

/// 元素解析值时可见的表单状态
#[derive(Debug, Clone, Default)]
pub struct FormContext {
    pub constants: Value,
    pub defaults: Value,
    pub submitted: Value,
    pub files: Value,
    pub is_submitted: bool,
    pub method: FormMethod,
}

impl FormContext {
    /// 常量 > 提交值 > 默认值
    pub fn standard_value(&self, name: &str) -> Option<Value> {
        self.constants
            .lookup(name)
            .or_else(|| self.submitted.lookup(name))
            .or_else(|| self.defaults.lookup(name))
            .cloned()
    }

    /// 复选框一族：表单已提交时只看提交值，缺失即视为未选中（返回空串）。
    pub fn checkable_value(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.constants.lookup(name) {
            return Some(v.clone());
        }
        if self.is_submitted {
            Some(self.submitted.lookup(name).cloned().unwrap_or_else(|| Value::from("")))
        } else {
            self.defaults.lookup(name).cloned()
        }
    }

    /// 静态元素不接受提交值
    pub fn static_value(&self, name: &str) -> Option<Value> {
        self.constants
            .lookup(name)
            .or_else(|| self.defaults.lookup(name))
            .cloned()
    }

    pub fn file_value(&self, name: &str) -> Option<Value> {
        self.files.lookup(name).cloned()
    }
}

/// 工厂构造元素时使用的一个位置参数
#[derive(Debug, Clone)]
pub enum ElementArg {
    Text(String),
    Labels(Vec<String>),
    Attrs(Attributes),
    Options(Vec<(String, String)>),
    Elements(Vec<Box<dyn Element>>),
    Value(Value),
    Flag(bool),
    /// 占位，使用该位置的默认值
    Skip,
}

impl From<&str> for ElementArg {
    fn from(s: &str) -> Self {
        ElementArg::Text(s.to_string())
    }
}

impl From<String> for ElementArg {
    fn from(s: String) -> Self {
        ElementArg::Text(s)
    }
}

impl From<Attributes> for ElementArg {
    fn from(a: Attributes) -> Self {
        ElementArg::Attrs(a)
    }
}

impl From<bool> for ElementArg {
    fn from(b: bool) -> Self {
        ElementArg::Flag(b)
    }
}

impl From<Value> for ElementArg {
    fn from(v: Value) -> Self {
        ElementArg::Value(v)
    }
}

impl From<Vec<Box<dyn Element>>> for ElementArg {
    fn from(children: Vec<Box<dyn Element>>) -> Self {
        ElementArg::Elements(children)
    }
}

impl From<Vec<(&str, &str)>> for ElementArg {
    fn from(options: Vec<(&str, &str)>) -> Self {
        ElementArg::Options(
            options
                .into_iter()
                .map(|(v, t)| (v.to_string(), t.to_string()))
                .collect(),
        )
    }
}

/// 元素构造函数的位置参数列表，缺失的位置由各元素的默认值补齐。
#[derive(Debug, Clone, Default)]
pub struct ElementArgs(Vec<ElementArg>);

/// 以表达式列表构造 [`ElementArgs`]
#[macro_export]
macro_rules! element_args {
    ($($arg:expr),* $(,)?) => {
        $crate::element::ElementArgs::new()$(.arg($arg))*
    };
}

impl ElementArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, arg: impl Into<ElementArg>) -> Self {
        self.0.push(arg.into());
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn get(&self, i: usize) -> Option<&ElementArg> {
        match self.0.get(i) {
            Some(ElementArg::Skip) | None => None,
            other => other,
        }
    }

    pub fn text(&self, i: usize) -> Option<&str> {
        match self.get(i)? {
            ElementArg::Text(s) => Some(s),
            ElementArg::Value(Value::Str(s)) => Some(s),
            ElementArg::Labels(l) => l.first().map(String::as_str),
            _ => None,
        }
    }

    pub fn text_or(&self, i: usize, default: &str) -> String {
        self.text(i).unwrap_or(default).to_string()
    }

    pub fn labels(&self, i: usize) -> Vec<String> {
        match self.get(i) {
            Some(ElementArg::Labels(l)) => l.clone(),
            Some(ElementArg::Text(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// 属性参数：既可以是已解析的属性集合，也可以是属性字符串。
    pub fn attrs(&self, i: usize) -> Attributes {
        match self.get(i) {
            Some(ElementArg::Attrs(a)) => a.clone(),
            Some(ElementArg::Text(s)) => Attributes::parse(s),
            _ => Attributes::new(),
        }
    }

    pub fn options(&self, i: usize) -> Vec<(String, String)> {
        match self.get(i) {
            Some(ElementArg::Options(o)) => o.clone(),
            Some(ElementArg::Value(Value::Map(m))) => m
                .iter()
                .map(|(k, v)| (k.clone(), v.text().to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn elements(&self, i: usize) -> Vec<Box<dyn Element>> {
        match self.get(i) {
            Some(ElementArg::Elements(e)) => e.clone(),
            _ => Vec::new(),
        }
    }

    pub fn value(&self, i: usize) -> Option<Value> {
        match self.get(i)? {
            ElementArg::Value(v) => Some(v.clone()),
            ElementArg::Text(s) => Some(Value::from(s.as_str())),
            _ => None,
        }
    }

    pub fn flag(&self, i: usize, default: bool) -> bool {
        match self.get(i) {
            Some(ElementArg::Flag(b)) => *b,
            Some(ElementArg::Text(s)) => !s.is_empty() && s != "0",
            _ => default,
        }
    }
}

/// 所有元素共有的状态
#[derive(Debug, Clone, Default)]
pub struct ElementBase {
    pub labels: Vec<String>,
    pub attributes: Attributes,
    pub frozen: bool,
    pub persist_freeze: bool,
}

impl ElementBase {
    pub fn new(name: &str, labels: Vec<String>, attributes: Attributes) -> Self {
        let mut base = Self {
            labels,
            attributes,
            frozen: false,
            persist_freeze: true,
        };
        base.set_name(name);
        base
    }

    /// 名称保存在 `name` 属性中，空名称不输出该属性。
    pub fn name(&self) -> &str {
        self.attributes.get("name").unwrap_or("")
    }

    pub fn set_name(&mut self, name: &str) {
        if name.is_empty() {
            self.attributes.remove("name");
        } else {
            self.attributes.set("name", name);
        }
    }

    /// 为需要 `<label for>` 的元素生成唯一 id。
    pub fn ensure_id(&mut self) {
        if !self.attributes.contains("id") {
            let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
            self.attributes.set("id", &format!("qf_{:06x}", id));
        }
    }

    /// 冻结后携带值的隐藏字段
    pub fn persistent_data(&self, value: Option<&Value>) -> String {
        if !self.persist_freeze {
            return String::new();
        }
        let Some(value) = value else {
            return String::new();
        };
        let name = self.name();
        let id = self.attributes.get("id");
        match value {
            Value::Map(m) => m
                .values()
                .map(|v| hidden_input(&format!("{}[]", name), v.text(), None))
                .collect(),
            other => hidden_input(name, other.text(), id),
        }
    }
}

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

pub(crate) fn hidden_input(name: &str, value: &str, id: Option<&str>) -> String {
    let mut attrs = Attributes::from_pairs(&[("type", "hidden"), ("name", name), ("value", value)]);
    if let Some(id) = id {
        attrs.set("id", id);
    }
    format!("<input{} />", attrs.to_html())
}

/// 类型转换辅助，由覆盖所有元素的通用实现提供。
pub trait ElementCast {
    fn as_element(&self) -> &dyn Element;
    fn as_element_mut(&mut self) -> &mut dyn Element;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn box_clone(&self) -> Box<dyn Element>;
}

impl<T: Element + Clone + 'static> ElementCast for T {
    fn as_element(&self) -> &dyn Element {
        self
    }

    fn as_element_mut(&mut self) -> &mut dyn Element {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn box_clone(&self) -> Box<dyn Element> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Element> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// 表单元素
pub trait Element: ElementCast + fmt::Debug {
    fn base(&self) -> &ElementBase;
    fn base_mut(&mut self) -> &mut ElementBase;

    /// 类型名，例如 `text`、`checkbox`、`group`
    fn element_type(&self) -> &'static str;

    /// 用位置参数重新构造自身
    fn create(&mut self, args: &ElementArgs) -> Result<()>;

    fn value(&self) -> Option<Value>;
    fn set_value(&mut self, value: &Value);

    /// 可编辑状态下的标记
    fn editable_html(&self) -> String;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn set_name(&mut self, name: &str) {
        self.base_mut().set_name(name);
    }

    fn label(&self) -> Option<&str> {
        self.base().labels.first().map(String::as_str)
    }

    fn labels(&self) -> &[String] {
        &self.base().labels
    }

    fn set_label(&mut self, label: &str) {
        self.base_mut().labels = vec![label.to_string()];
    }

    fn attributes(&self) -> &Attributes {
        &self.base().attributes
    }

    fn update_attributes(&mut self, attributes: &Attributes) {
        self.base_mut().attributes.update(attributes);
    }

    fn to_html(&self) -> String {
        if self.is_frozen() {
            self.frozen_html()
        } else {
            self.editable_html()
        }
    }

    /// 冻结状态下的只读表示：转义后的值，空值显示 `&nbsp;`。
    fn frozen_html(&self) -> String {
        let value = self.value();
        let text = value.as_ref().map(Value::text).unwrap_or("");
        let shown = if text.is_empty() {
            "&nbsp;".to_string()
        } else {
            escape_html(text)
        };
        shown + &self.base().persistent_data(value.as_ref())
    }

    /// 冻结元素；不可冻结的元素返回 `false`。
    fn freeze(&mut self) -> bool {
        self.base_mut().frozen = true;
        true
    }

    fn unfreeze(&mut self) {
        self.base_mut().frozen = false;
    }

    fn is_frozen(&self) -> bool {
        self.base().frozen
    }

    fn set_persistent_freeze(&mut self, persist: bool) {
        self.base_mut().persist_freeze = persist;
    }

    fn persistent_freeze(&self) -> bool {
        self.base().persist_freeze
    }

    /// 按表单状态解析自身的值
    fn update_value(&mut self, ctx: &FormContext) -> Result<()> {
        if let Some(value) = ctx.standard_value(self.name()) {
            self.set_value(&value);
        }
        Ok(())
    }

    fn on_event(&mut self, event: &FormEvent, ctx: &FormContext) -> Result<()> {
        match event {
            FormEvent::UpdateValue => self.update_value(ctx),
            FormEvent::CreateElement(args) => self.create(args),
            FormEvent::AddElement(args) => {
                self.create(args)?;
                self.update_value(ctx)
            }
            FormEvent::SetGroupValue(value) => {
                self.set_value(value);
                Ok(())
            }
        }
    }

    /// 导出值：优先使用提交值，否则使用当前值；`assoc` 时包装为以名称为路径的映射。
    fn export_value(&mut self, submitted: &Value, assoc: bool) -> Result<Option<Value>> {
        let value = submitted.lookup(self.name()).cloned().or_else(|| self.value());
        Ok(self.prepare_value(value, assoc))
    }

    fn prepare_value(&self, value: Option<Value>, assoc: bool) -> Option<Value> {
        let value = value?;
        if assoc {
            Some(crate::value::wrap_in_path(self.name(), value))
        } else {
            Some(value)
        }
    }

    fn accept(&mut self, renderer: &mut dyn Renderer, required: bool, error: Option<&str>) -> Result<()> {
        renderer.render_element(self.as_element(), required, error);
        Ok(())
    }

    fn as_group(&self) -> Option<&Group> {
        None
    }

    fn as_group_mut(&mut self) -> Option<&mut Group> {
        None
    }
}

impl dyn Element {
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// 构造一个空白元素，随后由 `CreateElement` 事件填充
pub type ElementFactory = fn() -> Box<dyn Element>;

/// 类型名到构造函数的映射
#[derive(Clone, Default)]
pub struct ElementRegistry {
    factories: HashMap<String, ElementFactory>,
}

impl fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ElementRegistry").field("types", &names).finish()
    }
}

fn boxed<T: Element + Default + Clone + 'static>() -> Box<dyn Element> {
    Box::new(T::default())
}

lazy_static! {
    /// 内置元素类型
    static ref DEFAULT_ELEMENTS: Arc<ElementRegistry> = {
        let mut registry = ElementRegistry::default();
        registry.register("text", boxed::<Text>);
        registry.register("password", boxed::<Password>);
        registry.register("hidden", boxed::<Hidden>);
        registry.register("textarea", boxed::<Textarea>);
        registry.register("checkbox", boxed::<Checkbox>);
        registry.register("advcheckbox", boxed::<AdvCheckbox>);
        registry.register("radio", boxed::<Radio>);
        registry.register("select", boxed::<Select>);
        registry.register("submit", boxed::<Submit>);
        registry.register("reset", boxed::<Reset>);
        registry.register("button", boxed::<Button>);
        registry.register("image", boxed::<Image>);
        registry.register("file", boxed::<File>);
        registry.register("static", boxed::<Static>);
        registry.register("header", boxed::<Header>);
        registry.register("html", boxed::<Html>);
        registry.register("link", boxed::<Link>);
        registry.register("group", boxed::<Group>);
        registry.register("hierselect", boxed::<HierSelect>);
        registry.register("date", boxed::<Date>);
        Arc::new(registry)
    };
}

impl ElementRegistry {
    /// 进程级共享的默认注册表
    pub fn shared() -> Arc<ElementRegistry> {
        Arc::clone(&DEFAULT_ELEMENTS)
    }

    pub fn register(&mut self, type_name: &str, factory: ElementFactory) {
        debug!("注册元素类型 {}", type_name);
        self.factories.insert(type_name.to_lowercase(), factory);
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.factories.contains_key(&type_name.to_lowercase())
    }

    /// 创建空白元素，不触发任何事件
    pub fn instantiate(&self, type_name: &str) -> Result<Box<dyn Element>> {
        let factory = self
            .factories
            .get(&type_name.to_lowercase())
            .ok_or_else(|| Exception::UnregisteredElementType(type_name.to_string()))?;
        Ok(factory())
    }

    /// 按类型名创建元素并以位置参数构造
    pub fn create(&self, type_name: &str, args: &ElementArgs) -> Result<Box<dyn Element>> {
        let mut element = self.instantiate(type_name)?;
        element.on_event(&FormEvent::CreateElement(args), &FormContext::default())?;
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element_args;

    #[test]
    fn test_registry_creates_by_type() {
        let registry = ElementRegistry::shared();
        let el = registry
            .create("text", &element_args!["email", "Email", "size=30"])
            .unwrap();
        assert_eq!(el.element_type(), "text");
        assert_eq!(el.name(), "email");
        assert_eq!(el.label(), Some("Email"));
        assert_eq!(el.attributes().get("size"), Some("30"));
    }

    #[test]
    fn test_registry_missing_args_use_defaults() {
        let el = ElementRegistry::shared()
            .create("text", &ElementArgs::new())
            .unwrap();
        assert_eq!(el.name(), "");
        assert_eq!(el.label(), None);
    }

    #[test]
    fn test_registry_unknown_type() {
        let err = ElementRegistry::shared()
            .create("colorpicker", &ElementArgs::new())
            .unwrap_err();
        assert_eq!(err, Exception::UnregisteredElementType("colorpicker".to_string()));
    }

    #[test]
    fn test_context_precedence() {
        let ctx = FormContext {
            constants: Value::map([("c", "const")]),
            submitted: Value::map([("c", "sub"), ("s", "sub")]),
            defaults: Value::map([("c", "def"), ("s", "def"), ("d", "def")]),
            is_submitted: true,
            ..FormContext::default()
        };
        assert_eq!(ctx.standard_value("c"), Some(Value::from("const")));
        assert_eq!(ctx.standard_value("s"), Some(Value::from("sub")));
        assert_eq!(ctx.standard_value("d"), Some(Value::from("def")));
        assert_eq!(ctx.static_value("s"), Some(Value::from("def")));
        assert_eq!(ctx.checkable_value("d"), Some(Value::from("")));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let mut a = ElementBase::new("a", vec![], Attributes::new());
        let mut b = ElementBase::new("b", vec![], Attributes::new());
        a.ensure_id();
        b.ensure_id();
        let (ia, ib) = (a.attributes.get("id").unwrap(), b.attributes.get("id").unwrap());
        assert!(ia.starts_with("qf_") && ib.starts_with("qf_"));
        assert_ne!(ia, ib);
    }
}
