// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 表单模块
//!
//! [`Form`] 按加入顺序保存元素，并维护两张索引：
//! - `element_index`：名称 → 第一个同名元素（主元素）的下标；
//! - `duplicate_index`：名称 → 其余同名同类型元素的下标。
//!
//! 任何插入或删除都会同步平移两张索引中的下标，使其始终与元素列表一一对应。
//!
//! 值有四层：常量、提交值、默认值、上传文件，由 [`FormContext`] 统一保存并在
//! 派发 [`FormEvent`] 时交给元素解析。校验相关的接口在 [`validate`] 子模块中。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, info};

use crate::common::Attributes;
use crate::config::FormOptions;
use crate::element::{Element, ElementArgs, ElementFactory, ElementRegistry, FormContext, FormEvent, Group, Hidden};
use crate::exception::{Exception, Result};
use crate::param::{FormMethod, ALL_ELEMENTS, DEFAULT_REQUIRED_NOTE, TRACK_SUBMIT_PREFIX};
use crate::renderer::{DefaultRenderer, FormInfo, Renderer};
use crate::rule::{RuleBinding, RuleRegistry};
use crate::value::Value;

pub mod validate;

pub use validate::{ChildRule, FormRule, RuleDescriptor};

/// 默认的上传大小上限（2 MiB）
const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;

static ANONYMOUS_GROUPS: AtomicUsize = AtomicUsize::new(1);

/// 一次请求携带的数据
#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// 查询字符串参数
    pub get: Value,
    /// 请求体中的表单字段
    pub post: Value,
    /// 上传文件，按字段名组织成与 `post` 相同形状的树
    pub files: Value,
}

impl Submission {
    /// 解析 `application/x-www-form-urlencoded` 文本，字段名支持方括号路径
    pub fn parse_query(query: &str) -> Value {
        let mut values = Value::empty();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = crate::util::urldecode(name);
            let value = crate::util::urldecode(value);
            values.assign(&name, Value::from(value));
        }
        values
    }
}

/// 表单构造器
#[derive(Debug, Clone)]
pub struct FormBuilder {
    name: String,
    method: FormMethod,
    action: String,
    target: String,
    attributes: Attributes,
    track_submit: bool,
    required_note: String,
    max_file_size: u64,
    submission: Submission,
}

impl FormBuilder {
    pub fn method(mut self, method: FormMethod) -> Self {
        self.method = method;
        self
    }

    pub fn action(mut self, action: &str) -> Self {
        self.action = action.to_string();
        self
    }

    pub fn target(mut self, target: &str) -> Self {
        self.target = target.to_string();
        self
    }

    pub fn attributes(mut self, attributes: impl Into<Attributes>) -> Self {
        self.attributes = attributes.into();
        self
    }

    /// 只有请求中带有 `_qf__<表单名>` 字段时才认为表单已提交
    pub fn track_submit(mut self, track: bool) -> Self {
        self.track_submit = track;
        self
    }

    pub fn submission(mut self, submission: Submission) -> Self {
        self.submission = submission;
        self
    }

    /// 采用配置文件中的表单选项
    pub fn options(mut self, options: &FormOptions) -> Self {
        self.method = options.method();
        self.track_submit = options.track_submit();
        self.required_note = options.required_note().to_string();
        self.max_file_size = options.max_file_size();
        self
    }

    pub fn build(self) -> Result<Form> {
        let marker = self.track_submit.then(|| format!("{}{}", TRACK_SUBMIT_PREFIX, self.name));
        let mut form = self.assemble();
        if let Some(marker) = marker {
            form.add_element(Box::new(Hidden::new(&marker, "", "")))?;
        }
        debug!("表单 {} 已创建，提交状态：{}", form.name, form.ctx.is_submitted);
        Ok(form)
    }

    fn assemble(self) -> Form {
        let method = self.method.to_string();
        let mut attributes = self.attributes;
        attributes.update(&Attributes::from_pairs(&[
            ("action", self.action.as_str()),
            ("method", method.as_str()),
            ("name", self.name.as_str()),
            ("id", self.name.as_str()),
        ]));
        if !self.target.is_empty() {
            attributes.set("target", &self.target);
        }

        let marker = format!("{}{}", TRACK_SUBMIT_PREFIX, self.name);
        let Submission { get, post, files } = self.submission;
        let marked = get.lookup(&marker).is_some() || post.lookup(&marker).is_some();
        let mut ctx = FormContext {
            method: self.method,
            ..FormContext::default()
        };
        if !self.track_submit || marked {
            ctx.submitted = match self.method {
                FormMethod::Get => get,
                FormMethod::Post => post,
            };
            ctx.files = files;
            if let Some(map) = ctx.submitted.as_map_mut() {
                map.shift_remove(&marker);
            }
            ctx.is_submitted = !ctx.submitted.is_empty() || !ctx.files.is_empty();
        }

        Form {
            name: self.name,
            attributes,
            elements: Vec::new(),
            element_index: HashMap::new(),
            duplicate_index: HashMap::new(),
            ctx,
            rules: IndexMap::new(),
            form_rules: Vec::new(),
            errors: IndexMap::new(),
            required: Vec::new(),
            required_note: self.required_note,
            freeze_all: false,
            max_file_size: self.max_file_size,
            element_types: ElementRegistry::shared(),
            rule_registry: RuleRegistry::shared(),
        }
    }
}

/// HTML 表单
pub struct Form {
    name: String,
    attributes: Attributes,
    elements: Vec<Box<dyn Element>>,
    element_index: HashMap<String, usize>,
    duplicate_index: HashMap<String, Vec<usize>>,
    ctx: FormContext,
    rules: IndexMap<String, Vec<RuleDescriptor>>,
    form_rules: Vec<FormRule>,
    errors: IndexMap<String, String>,
    required: Vec<String>,
    required_note: String,
    freeze_all: bool,
    max_file_size: u64,
    element_types: Arc<ElementRegistry>,
    rule_registry: Arc<RuleRegistry>,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("name", &self.name)
            .field("elements", &self.elements.len())
            .field("submitted", &self.ctx.is_submitted)
            .field("errors", &self.errors)
            .finish()
    }
}

/// 把同名元素的值合并：一个值原样返回，多个值组成列表
fn combine(acc: Option<Value>, next: Value) -> Option<Value> {
    match acc {
        None => Some(next),
        Some(mut list @ Value::Map(_)) => {
            list.set_path(&[""], next);
            Some(list)
        }
        Some(first) => Some(Value::list([first, next])),
    }
}

impl Form {
    pub fn builder(name: &str) -> FormBuilder {
        FormBuilder {
            name: name.to_string(),
            method: FormMethod::Post,
            action: String::new(),
            target: String::new(),
            attributes: Attributes::new(),
            track_submit: false,
            required_note: DEFAULT_REQUIRED_NOTE.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            submission: Submission::default(),
        }
    }

    /// 不追踪提交标记的表单
    pub fn new(name: &str, method: FormMethod, submission: Submission) -> Self {
        Self::builder(name)
            .method(method)
            .submission(submission)
            .assemble()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn update_attributes(&mut self, attributes: &Attributes) {
        self.attributes.update(attributes);
    }

    pub fn method(&self) -> FormMethod {
        self.ctx.method
    }

    pub fn is_submitted(&self) -> bool {
        self.ctx.is_submitted
    }

    pub fn context(&self) -> &FormContext {
        &self.ctx
    }

    // ---- 元素类型与规则登记 ----

    /// 为本表单登记元素类型，不影响其他表单
    pub fn register_element_type(&mut self, type_name: &str, factory: ElementFactory) {
        Arc::make_mut(&mut self.element_types).register(type_name, factory);
    }

    pub fn is_type_registered(&self, type_name: &str) -> bool {
        self.element_types.is_registered(type_name)
    }

    /// 为本表单登记校验规则，不影响其他表单
    pub fn register_rule(&mut self, name: &str, binding: RuleBinding) {
        Arc::make_mut(&mut self.rule_registry).register(name, binding);
    }

    pub fn is_rule_registered(&self, name: &str) -> bool {
        self.rule_registry.is_registered(name)
    }

    // ---- 元素管理 ----

    /// 按类型名创建元素，不加入表单
    pub fn create_element(&self, type_name: &str, args: &ElementArgs) -> Result<Box<dyn Element>> {
        self.element_types.create(type_name, args)
    }

    /// 加入一个已构造的元素：先按表单状态解析它的值，再检查重名
    pub fn add_element(&mut self, mut element: Box<dyn Element>) -> Result<&mut dyn Element> {
        self.check_file_upload(element.as_ref())?;
        element.on_event(&FormEvent::UpdateValue, &self.ctx)?;
        self.push_element(element)
    }

    /// 按类型名创建元素并加入表单
    pub fn add_element_by_type(&mut self, type_name: &str, args: &ElementArgs) -> Result<&mut dyn Element> {
        let mut element = self.element_types.instantiate(type_name)?;
        element.on_event(&FormEvent::AddElement(args), &self.ctx)?;
        self.check_file_upload(element.as_ref())?;
        self.push_element(element)
    }

    /// 加入一组元素；名称为空时生成匿名组名，并且不给子元素加前缀
    pub fn add_group(
        &mut self,
        elements: Vec<Box<dyn Element>>,
        name: &str,
        label: &str,
        separator: Option<&str>,
        append_name: bool,
    ) -> Result<&mut dyn Element> {
        let (name, append_name) = if name.is_empty() {
            let n = ANONYMOUS_GROUPS.fetch_add(1, Ordering::Relaxed);
            (format!("qf_group_{}", n), false)
        } else {
            (name.to_string(), append_name)
        };
        let group = Group::new(&name, label, elements, separator, append_name);
        self.add_element(Box::new(group))
    }

    fn check_file_upload(&mut self, element: &dyn Element) -> Result<()> {
        if element.element_type() != "file" {
            return Ok(());
        }
        if self.ctx.method == FormMethod::Get {
            return Err(Exception::FileInGetForm(element.name().to_string()));
        }
        self.attributes.set("enctype", "multipart/form-data");
        self.set_max_file_size(0)
    }

    /// 同名元素只能是同一类型，否则拒绝加入且表单保持不变
    fn check_duplicate(&self, element: &dyn Element) -> Result<bool> {
        let name = element.name();
        if name.is_empty() {
            return Ok(false);
        }
        match self.element_index.get(name) {
            None => Ok(false),
            Some(&index) if self.elements[index].element_type() == element.element_type() => Ok(true),
            Some(_) => Err(Exception::DuplicateElement(name.to_string())),
        }
    }

    fn push_element(&mut self, mut element: Box<dyn Element>) -> Result<&mut dyn Element> {
        let duplicate = self.check_duplicate(element.as_ref())?;
        if self.freeze_all {
            element.freeze();
        }
        let index = self.elements.len();
        let name = element.name().to_string();
        self.elements.push(element);
        self.index_element(name, index, duplicate);
        self.errors.clear();
        Ok(self.elements[index].as_mut())
    }

    fn index_element(&mut self, name: String, index: usize, duplicate: bool) {
        if name.is_empty() {
            return;
        }
        if duplicate {
            debug!("元素 {} 作为重复元素加入，下标 {}", name, index);
            self.duplicate_index.entry(name).or_default().push(index);
        } else {
            self.element_index.insert(name, index);
        }
    }

    /// 平移所有不小于 `from` 的下标
    fn shift_indices(&mut self, from: usize, up: bool) {
        let shift = |i: &mut usize| {
            if *i >= from {
                if up {
                    *i += 1;
                } else {
                    *i -= 1;
                }
            }
        };
        self.element_index.values_mut().for_each(shift);
        for list in self.duplicate_index.values_mut() {
            list.iter_mut().for_each(shift);
        }
    }

    /// 把元素插到名为 `before` 的元素前面
    pub fn insert_element_before(&mut self, mut element: Box<dyn Element>, before: &str) -> Result<&mut dyn Element> {
        if self.duplicate_index.get(before).is_some_and(|d| !d.is_empty()) {
            return Err(Exception::AmbiguousElement(before.to_string()));
        }
        let target = *self
            .element_index
            .get(before)
            .ok_or_else(|| Exception::ElementNotFound(before.to_string()))?;
        let duplicate = self.check_duplicate(element.as_ref())?;
        self.check_file_upload(element.as_ref())?;
        element.on_event(&FormEvent::UpdateValue, &self.ctx)?;
        if self.freeze_all {
            element.freeze();
        }

        self.shift_indices(target, true);
        let name = element.name().to_string();
        self.elements.insert(target, element);
        self.index_element(name, target, duplicate);
        self.errors.clear();
        Ok(self.elements[target].as_mut())
    }

    /// 删除主元素；第一个重复元素（若有）成为新的主元素。
    ///
    /// `remove_rules` 时一并删除该名称（以及组内子元素）的规则、错误与必填标记。
    pub fn remove_element(&mut self, name: &str, remove_rules: bool) -> Result<Box<dyn Element>> {
        let index = self
            .element_index
            .remove(name)
            .ok_or_else(|| Exception::ElementNotFound(name.to_string()))?;
        if let Some(dups) = self.duplicate_index.get_mut(name) {
            if !dups.is_empty() {
                let promoted = dups.remove(0);
                self.element_index.insert(name.to_string(), promoted);
            }
            if dups.is_empty() {
                self.duplicate_index.remove(name);
            }
        }
        let element = self.elements.remove(index);
        self.shift_indices(index + 1, false);

        if remove_rules {
            self.required.retain(|r| r != name);
            self.rules.shift_remove(name);
            if let Some(group) = element.as_group() {
                for child in group.qualified_child_names() {
                    self.rules.shift_remove(&child);
                    self.required.retain(|r| *r != child);
                }
            }
        }
        self.errors.clear();
        info!("元素 {} 已从表单 {} 中删除", name, self.name);
        Ok(element)
    }

    pub fn element_exists(&self, name: &str) -> bool {
        self.element_index.contains_key(name)
    }

    pub fn get_element(&self, name: &str) -> Result<&dyn Element> {
        let index = self
            .element_index
            .get(name)
            .ok_or_else(|| Exception::ElementNotFound(name.to_string()))?;
        Ok(self.elements[*index].as_ref())
    }

    pub fn get_element_mut(&mut self, name: &str) -> Result<&mut dyn Element> {
        let index = *self
            .element_index
            .get(name)
            .ok_or_else(|| Exception::ElementNotFound(name.to_string()))?;
        Ok(self.elements[index].as_mut())
    }

    pub fn get_element_type(&self, name: &str) -> Option<&'static str> {
        self.get_element(name).ok().map(|e| e.element_type())
    }

    /// 主元素下标
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.element_index.get(name).copied()
    }

    /// 重复元素下标
    pub fn duplicate_indices(&self, name: &str) -> &[usize] {
        self.duplicate_index.get(name).map_or(&[], Vec::as_slice)
    }

    /// 按加入顺序遍历全部元素（包括重复元素）
    pub fn elements(&self) -> impl Iterator<Item = &dyn Element> {
        self.elements.iter().map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// 元素当前的值；存在重复元素时合并为列表
    pub fn get_element_value(&self, name: &str) -> Result<Option<Value>> {
        let mut value = self.get_element(name)?.value();
        for &index in self.duplicate_indices(name) {
            if let Some(v) = self.elements[index].value() {
                value = combine(value, v);
            }
        }
        Ok(value)
    }

    /// 同时更新同名的全部元素
    pub fn update_element_attr(&mut self, names: &[&str], attributes: &Attributes) -> Result<()> {
        for name in names {
            let primary = *self
                .element_index
                .get(*name)
                .ok_or_else(|| Exception::ElementNotFound(name.to_string()))?;
            let mut indices = vec![primary];
            indices.extend_from_slice(self.duplicate_indices(name));
            for index in indices {
                self.elements[index].update_attributes(attributes);
            }
        }
        Ok(())
    }

    // ---- 值 ----

    /// 合并默认值并让所有元素重新解析值
    pub fn set_defaults(&mut self, defaults: Value, filter: Option<&dyn Fn(&str) -> String>) -> Result<()> {
        let defaults = match filter {
            Some(f) => defaults.map_strings(f),
            None => defaults,
        };
        self.ctx.defaults.merge(&defaults);
        self.update_values()
    }

    /// 合并常量值；常量优先于提交值与默认值
    pub fn set_constants(&mut self, constants: Value, filter: Option<&dyn Fn(&str) -> String>) -> Result<()> {
        let constants = match filter {
            Some(f) => constants.map_strings(f),
            None => constants,
        };
        self.ctx.constants.merge(&constants);
        self.update_values()
    }

    fn update_values(&mut self) -> Result<()> {
        for element in &mut self.elements {
            element.on_event(&FormEvent::UpdateValue, &self.ctx)?;
        }
        Ok(())
    }

    /// 对提交值应用过滤函数；`target` 为 `__ALL__` 时作用于全部提交值
    pub fn apply_filter(&mut self, target: &str, filter: &dyn Fn(&str) -> String) {
        if target == ALL_ELEMENTS {
            self.ctx.submitted = self.ctx.submitted.map_strings(filter);
            return;
        }
        if let Some(value) = self.get_submit_value(target) {
            self.ctx.submitted.assign(target, value.map_strings(filter));
        }
    }

    /// 提交的值；上传文件与同名字段合并，`append_name` 为假的组由子元素的值拼出
    pub fn get_submit_value(&self, name: &str) -> Option<Value> {
        let posted = self.ctx.submitted.lookup(name);
        let file = self.ctx.files.lookup(name);
        let value = match (posted, file) {
            (Some(p @ Value::Map(_)), Some(f @ Value::Map(_))) => {
                let mut merged = p.clone();
                merged.merge(f);
                Some(merged)
            }
            (Some(p), _) => Some(p.clone()),
            (None, Some(f)) => Some(f.clone()),
            (None, None) => None,
        };
        if value.is_some() {
            return value;
        }
        let element = self.get_element(name).ok()?;
        if element.element_type() == "file" {
            return element.value();
        }
        let group = element.as_group().filter(|g| !g.append_name())?;
        let mut collected = Value::empty();
        for child in group.qualified_child_names() {
            if child == name {
                continue;
            }
            if let Some(v) = self.get_submit_value(&child) {
                collected.assign(&child, v);
            }
        }
        (!collected.is_empty()).then_some(collected)
    }

    /// 全部提交值；`merge_files` 时把上传文件合并进来
    pub fn get_submit_values(&self, merge_files: bool) -> Value {
        let mut values = self.ctx.submitted.clone();
        if merge_files {
            values.merge(&self.ctx.files);
        }
        values
    }

    /// 导出单个元素的值，存在重复元素时合并为列表
    pub fn export_value(&mut self, name: &str) -> Result<Option<Value>> {
        let primary = *self
            .element_index
            .get(name)
            .ok_or_else(|| Exception::ElementNotFound(name.to_string()))?;
        let submitted = &self.ctx.submitted;
        let mut value = self.elements[primary].export_value(submitted, false)?;
        let dups = self.duplicate_index.get(name).cloned().unwrap_or_default();
        for index in dups {
            if let Some(v) = self.elements[index].export_value(submitted, false)? {
                value = combine(value, v);
            }
        }
        Ok(value)
    }

    /// 导出值。`names` 为空时导出全部元素并按名称路径合并成一棵树
    pub fn export_values(&mut self, names: Option<&[&str]>) -> Result<Value> {
        let mut values = Value::empty();
        match names {
            None => {
                for element in &mut self.elements {
                    if let Some(v @ Value::Map(_)) = element.export_value(&self.ctx.submitted, true)? {
                        values.merge(&v);
                    }
                }
            }
            Some(names) => {
                for name in names {
                    if let Some(v) = self.export_value(name)? {
                        values.assign(name, v);
                    }
                }
            }
        }
        Ok(values)
    }

    /// 把（可选地合并了上传文件的）提交值交给回调处理
    pub fn process<R>(&self, callback: impl FnOnce(&Value) -> R, merge_files: bool) -> R {
        callback(&self.get_submit_values(merge_files))
    }

    // ---- 冻结 ----

    /// 冻结整个表单，之后加入的元素也会被冻结
    pub fn freeze_all(&mut self) {
        self.freeze_all = true;
        for element in &mut self.elements {
            element.freeze();
        }
    }

    /// 冻结指定名称的元素（包括重复元素）
    pub fn freeze(&mut self, names: &[&str]) -> Result<()> {
        if let Some(missing) = names.iter().find(|n| !self.element_exists(n)) {
            return Err(Exception::ElementNotFound(missing.to_string()));
        }
        for element in &mut self.elements {
            if names.contains(&element.name()) {
                element.freeze();
            }
        }
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze_all
    }

    // ---- 错误与必填 ----

    /// 设置或清除（`None`）元素的错误信息
    pub fn set_element_error(&mut self, name: &str, message: Option<&str>) {
        match message {
            Some(m) if !m.is_empty() => {
                self.errors.insert(name.to_string(), m.to_string());
            }
            _ => {
                self.errors.shift_remove(name);
            }
        }
    }

    pub fn get_element_error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn errors(&self) -> &IndexMap<String, String> {
        &self.errors
    }

    pub fn is_element_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    pub(crate) fn mark_required(&mut self, name: &str) {
        if !self.is_element_required(name) {
            self.required.push(name.to_string());
        }
    }

    pub fn set_required_note(&mut self, note: &str) {
        self.required_note = note.to_string();
    }

    pub fn required_note(&self) -> &str {
        &self.required_note
    }

    /// 设置上传大小上限并同步到 `MAX_FILE_SIZE` 隐藏字段；`0` 表示保持当前上限
    pub fn set_max_file_size(&mut self, bytes: u64) -> Result<()> {
        if bytes > 0 {
            self.max_file_size = bytes;
        }
        let size = self.max_file_size.to_string();
        if self.element_exists("MAX_FILE_SIZE") {
            self.get_element_mut("MAX_FILE_SIZE")?
                .update_attributes(&Attributes::from_pairs(&[("value", size.as_str())]));
        } else {
            self.add_element(Box::new(Hidden::new("MAX_FILE_SIZE", &size, "")))?;
        }
        Ok(())
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    // ---- 渲染 ----

    fn info(&self) -> FormInfo {
        FormInfo {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            has_required: !self.required.is_empty(),
            frozen: self.freeze_all,
            required_note: self.required_note.clone(),
            errors: self.errors.clone(),
        }
    }

    /// 让渲染器访问整个表单
    pub fn accept(&mut self, renderer: &mut dyn Renderer) -> Result<()> {
        let info = self.info();
        renderer.start_form(&info);
        for element in &mut self.elements {
            let name = element.name().to_string();
            let required = !element.is_frozen() && self.required.contains(&name);
            let error = self.errors.get(&name).map(String::as_str);
            element.accept(renderer, required, error)?;
        }
        renderer.finish_form(&info);
        Ok(())
    }

    /// 用默认渲染器输出 HTML
    pub fn to_html(&mut self) -> Result<String> {
        let mut renderer = DefaultRenderer::new();
        self.accept(&mut renderer)?;
        Ok(renderer.to_html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Checkbox, File, Radio, Select, Text};
    use crate::element_args;

    fn posted(values: Value) -> Form {
        Form::new(
            "f",
            FormMethod::Post,
            Submission {
                post: values,
                ..Submission::default()
            },
        )
    }

    #[test]
    fn test_builder_attributes_and_submission() {
        let form = Form::builder("login")
            .method(FormMethod::Get)
            .action("/login")
            .target("_top")
            .submission(Submission {
                get: Value::map([("user", "ada")]),
                post: Value::map([("ignored", "x")]),
                ..Submission::default()
            })
            .build()
            .unwrap();
        assert!(form.is_submitted());
        assert_eq!(form.attributes().get("method"), Some("get"));
        assert_eq!(form.attributes().get("action"), Some("/login"));
        assert_eq!(form.attributes().get("target"), Some("_top"));
        assert_eq!(form.get_submit_value("user"), Some(Value::from("ada")));
        assert_eq!(form.get_submit_value("ignored"), None);
    }

    #[test]
    fn test_track_submit_marker() {
        let unmarked = Form::builder("signup")
            .track_submit(true)
            .submission(Submission {
                post: Value::map([("email", "a@b.c")]),
                ..Submission::default()
            })
            .build()
            .unwrap();
        assert!(!unmarked.is_submitted());
        assert!(unmarked.element_exists("_qf__signup"));

        let marked = Form::builder("signup")
            .track_submit(true)
            .submission(Submission {
                post: Value::map([("email", "a@b.c"), ("_qf__signup", "")]),
                ..Submission::default()
            })
            .build()
            .unwrap();
        assert!(marked.is_submitted());
        assert_eq!(marked.get_submit_value("_qf__signup"), None);
    }

    #[test]
    fn test_add_by_type_resolves_value() {
        let mut form = posted(Value::map([("city", "Oslo")]));
        form.add_element_by_type("text", &element_args!["city", "City"]).unwrap();
        assert_eq!(form.get_element_value("city").unwrap(), Some(Value::from("Oslo")));
        assert!(matches!(
            form.add_element_by_type("spinner", &element_args!["x"]),
            Err(Exception::UnregisteredElementType(_))
        ));
    }

    #[test]
    fn test_duplicates_and_incompatible_names() {
        let mut form = posted(Value::empty());
        form.add_element(Box::new(Text::new("tag", "", ""))).unwrap();
        form.add_element(Box::new(Text::new("tag", "", ""))).unwrap();
        assert_eq!(form.len(), 2);
        assert_eq!(form.duplicate_indices("tag"), &[1]);
        let err = form
            .add_element(Box::new(Checkbox::new("tag", "", "", "")))
            .unwrap_err();
        assert_eq!(err, Exception::DuplicateElement("tag".to_string()));
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn test_duplicate_radio_values_combine() {
        let mut form = posted(Value::map([("size", "m")]));
        for v in ["s", "m", "l"] {
            form.add_element(Box::new(Radio::new("size", "", v, v, ""))).unwrap();
        }
        assert_eq!(form.get_element_value("size").unwrap(), Some(Value::from("m")));
        assert_eq!(form.export_value("size").unwrap(), Some(Value::from("m")));
    }

    #[test]
    fn test_insert_before_and_remove_keep_indices_contiguous() {
        let mut form = posted(Value::empty());
        for name in ["a", "b", "c"] {
            form.add_element(Box::new(Text::new(name, "", ""))).unwrap();
        }
        form.insert_element_before(Box::new(Text::new("x", "", "")), "b").unwrap();
        let names: Vec<&str> = form.elements().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "x", "b", "c"]);
        assert_eq!(form.index_of("b"), Some(2));
        assert_eq!(form.index_of("c"), Some(3));

        form.remove_element("a", true).unwrap();
        assert_eq!(form.index_of("x"), Some(0));
        assert_eq!(form.index_of("c"), Some(2));
        assert!(matches!(
            form.insert_element_before(Box::new(Text::new("y", "", "")), "nope"),
            Err(Exception::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_remove_promotes_duplicate() {
        let mut form = posted(Value::empty());
        form.add_element(Box::new(Text::new("t", "", "class=first"))).unwrap();
        form.add_element(Box::new(Text::new("u", "", ""))).unwrap();
        form.add_element(Box::new(Text::new("t", "", "class=second"))).unwrap();
        assert!(matches!(
            form.insert_element_before(Box::new(Text::new("z", "", "")), "t"),
            Err(Exception::AmbiguousElement(_))
        ));
        form.remove_element("t", false).unwrap();
        assert_eq!(form.index_of("t"), Some(1));
        assert_eq!(form.get_element("t").unwrap().attributes().get("class"), Some("second"));
        assert!(form.duplicate_indices("t").is_empty());
    }

    #[test]
    fn test_file_upload_rules() {
        let mut get_form = Form::new("g", FormMethod::Get, Submission::default());
        assert_eq!(
            get_form.add_element(Box::new(File::new("doc", "", ""))).unwrap_err(),
            Exception::FileInGetForm("doc".to_string())
        );
        let mut form = posted(Value::empty());
        form.add_element(Box::new(File::new("doc", "", ""))).unwrap();
        assert_eq!(form.attributes().get("enctype"), Some("multipart/form-data"));
        assert_eq!(
            form.get_element_value("MAX_FILE_SIZE").unwrap(),
            Some(Value::from("2097152"))
        );
        form.set_max_file_size(1024).unwrap();
        assert_eq!(
            form.get_element_value("MAX_FILE_SIZE").unwrap(),
            Some(Value::from("1024"))
        );
    }

    #[test]
    fn test_defaults_constants_and_filters() {
        let mut form = posted(Value::map([("name", "  Ada  ")]));
        form.add_element(Box::new(Text::new("name", "", ""))).unwrap();
        form.add_element(Box::new(Text::new("role", "", ""))).unwrap();
        form.set_defaults(Value::map([("role", "user"), ("name", "nobody")]), None)
            .unwrap();
        assert_eq!(form.get_element_value("name").unwrap(), Some(Value::from("  Ada  ")));
        assert_eq!(form.get_element_value("role").unwrap(), Some(Value::from("user")));

        let upper = |s: &str| s.to_uppercase();
        form.set_constants(Value::map([("role", "admin")]), Some(&upper)).unwrap();
        assert_eq!(form.get_element_value("role").unwrap(), Some(Value::from("ADMIN")));

        form.apply_filter("name", &|s: &str| s.trim().to_string());
        assert_eq!(form.get_submit_value("name"), Some(Value::from("Ada")));
        assert_eq!(form.export_value("name").unwrap(), Some(Value::from("Ada")));
    }

    #[test]
    fn test_export_values_tree() {
        let mut form = posted(Value::map([
            ("user", Value::map([("first", "Ada"), ("last", "L")])),
            ("colors", Value::list(["red"])),
        ]));
        form.add_element(Box::new(Text::new("user[first]", "", ""))).unwrap();
        form.add_element(Box::new(Text::new("user[last]", "", ""))).unwrap();
        let mut colors = Select::new("colors", "", &[("red", "Red"), ("blue", "Blue")], "");
        colors.set_multiple(true);
        form.add_element(Box::new(colors)).unwrap();
        let all = form.export_values(None).unwrap();
        assert_eq!(all.lookup("user[first]"), Some(&Value::from("Ada")));
        assert_eq!(all.lookup("user[last]"), Some(&Value::from("L")));
        assert_eq!(all.lookup("colors[0]"), Some(&Value::from("red")));

        let some = form.export_values(Some(&["user[last]"])).unwrap();
        assert_eq!(some.lookup("user[last]"), Some(&Value::from("L")));
        assert_eq!(some.lookup("user[first]"), None);
    }

    #[test]
    fn test_freeze_and_render() {
        let mut form = posted(Value::map([("city", "Oslo")]));
        form.add_element(Box::new(Text::new("city", "City", ""))).unwrap();
        form.add_element(Box::new(Text::new("zip", "Zip", ""))).unwrap();
        form.freeze(&["city"]).unwrap();
        assert!(form.get_element("city").unwrap().is_frozen());
        assert!(!form.get_element("zip").unwrap().is_frozen());
        assert!(form.freeze(&["nope"]).is_err());

        let html = form.to_html().unwrap();
        assert!(html.contains("Oslo"));
        assert!(html.contains(r#"type="hidden""#));
        assert!(html.contains("<b>Zip</b>"));

        form.freeze_all();
        form.add_element(Box::new(Text::new("late", "", ""))).unwrap();
        assert!(form.get_element("late").unwrap().is_frozen());
    }

    #[test]
    fn test_process_merges_files() {
        let form = Form::new(
            "f",
            FormMethod::Post,
            Submission {
                post: Value::map([("a", "1")]),
                files: Value::map([(
                    "doc",
                    Value::File(crate::value::UploadedFile::missing()),
                )]),
                ..Submission::default()
            },
        );
        let keys = form.process(|v| v.as_map().map(|m| m.len()).unwrap_or(0), true);
        assert_eq!(keys, 2);
        let keys = form.process(|v| v.as_map().map(|m| m.len()).unwrap_or(0), false);
        assert_eq!(keys, 1);
    }

    #[test]
    fn test_parse_query() {
        let v = Submission::parse_query("a=1&user%5Bname%5D=Ada+L&tags[]=x&tags[]=y&flag");
        assert_eq!(v.lookup("a"), Some(&Value::from("1")));
        assert_eq!(v.lookup("user[name]"), Some(&Value::from("Ada L")));
        assert_eq!(v.lookup("tags[1]"), Some(&Value::from("y")));
        assert_eq!(v.lookup("flag"), Some(&Value::from("")));
    }
}
