// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 规则的登记与表单校验。
//!
//! 校验失败不是异常：失败信息写入表单的错误表，`validate` 只在配置错误或
//! 整表规则误用时返回 `Err`。

use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, info};

use crate::exception::{Exception, Result};
use crate::form::Form;
use crate::rule::{compile_pattern, RuleFormat, RuleRegistry};
use crate::value::{UploadError, Value};

/// 整表规则：参数为提交值与上传文件，失败时返回 `元素名 → 错误信息`
pub type FormRule = Box<dyn Fn(&Value, &Value) -> std::result::Result<(), IndexMap<String, String>>>;

/// 登记在某个目标上的一条规则
#[derive(Debug, Clone)]
pub struct RuleDescriptor {
    pub rule_type: String,
    pub format: RuleFormat,
    pub message: String,
    /// 依赖规则的其余元素，按顺序附加在目标值之后
    pub dependent: Vec<String>,
    /// 组规则要求至少通过的子值个数
    pub howmany: Option<usize>,
    /// 组内子元素规则所属的组，失败信息记在组名下
    pub group: Option<String>,
}

/// `add_group_rules` 中针对单个子元素的规则
#[derive(Debug, Clone)]
pub struct ChildRule {
    pub message: String,
    pub rule_type: String,
    pub format: RuleFormat,
}

impl ChildRule {
    pub fn new(message: &str, rule_type: &str, format: impl Into<RuleFormat>) -> Self {
        Self {
            message: message.to_string(),
            rule_type: rule_type.to_string(),
            format: format.into(),
        }
    }
}

fn marks_required(rule_type: &str) -> bool {
    rule_type == "required" || rule_type == "uploadedfile"
}

/// 非必填元素遇到这些值时跳过校验
fn is_empty_submission(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::Str(s)) => s.is_empty(),
        Some(Value::File(f)) => f.error == UploadError::NoFile,
        Some(Value::Map(_)) => false,
    }
}

impl Form {
    /// 为元素登记规则
    pub fn add_rule(&mut self, element: &str, message: &str, rule_type: &str, format: impl Into<RuleFormat>) -> Result<()> {
        self.push_rule(&[element], message, rule_type, format.into(), false)
    }

    /// 与 `add_rule` 相同，但不检查元素是否存在
    pub fn add_rule_force(&mut self, element: &str, message: &str, rule_type: &str, format: impl Into<RuleFormat>) -> Result<()> {
        self.push_rule(&[element], message, rule_type, format.into(), true)
    }

    /// 依赖规则：`elements[0]` 为目标，规则收到 `[目标值, 其余元素的值…]`
    pub fn add_dependent_rule(
        &mut self,
        elements: &[&str],
        message: &str,
        rule_type: &str,
        format: impl Into<RuleFormat>,
    ) -> Result<()> {
        self.push_rule(elements, message, rule_type, format.into(), false)
    }

    fn push_rule(&mut self, elements: &[&str], message: &str, rule_type: &str, format: RuleFormat, force: bool) -> Result<()> {
        let Some((target, dependent)) = elements.split_first() else {
            return Err(Exception::ElementNotFound(String::new()));
        };
        if !force {
            if let Some(missing) = elements.iter().find(|e| !self.element_exists(e)) {
                return Err(Exception::ElementNotFound(missing.to_string()));
            }
        }
        let format = self.prepare_format(rule_type, format)?;
        if marks_required(rule_type) {
            self.mark_required(target);
        }
        self.rules
            .entry(target.to_string())
            .or_default()
            .push(RuleDescriptor {
                rule_type: rule_type.to_string(),
                format,
                message: message.to_string(),
                dependent: dependent.iter().map(|d| d.to_string()).collect(),
                howmany: None,
                group: None,
            });
        debug!("为 {} 登记规则 {}", target, rule_type);
        Ok(())
    }

    /// 检查规则是否登记，并预先编译正则参数
    fn prepare_format(&self, rule_type: &str, format: RuleFormat) -> Result<RuleFormat> {
        if !self.rule_registry.is_registered(rule_type) {
            return Err(Exception::UnregisteredRule(rule_type.to_string()));
        }
        match (rule_type, format) {
            ("regex" | "filename", RuleFormat::Text(source)) => Ok(RuleFormat::Pattern(compile_pattern(&source)?)),
            (_, format) => Ok(format),
        }
    }

    /// 对整个组登记一条规则。
    ///
    /// `howmany` 为 0 时要求全部子值通过；单选按钮组的 `required` 只要求一个。
    pub fn add_group_rule(
        &mut self,
        group: &str,
        message: &str,
        rule_type: &str,
        format: impl Into<RuleFormat>,
        howmany: usize,
    ) -> Result<()> {
        let element = self.get_element(group)?;
        let format = self.prepare_format(rule_type, format.into())?;
        let howmany = match element.as_group() {
            Some(g) if howmany == 0 => {
                if rule_type == "required" && g.group_type() == "radio" {
                    1
                } else {
                    g.children().len()
                }
            }
            _ => howmany,
        };
        if rule_type == "required" {
            self.mark_required(group);
        }
        self.rules
            .entry(group.to_string())
            .or_default()
            .push(RuleDescriptor {
                rule_type: rule_type.to_string(),
                format,
                message: message.to_string(),
                dependent: Vec::new(),
                howmany: (howmany > 0).then_some(howmany),
                group: None,
            });
        Ok(())
    }

    /// 为组内的子元素分别登记规则，子元素以名称或序号指定；
    /// 失败信息记在组名下。全部子元素都必填时整个组也标为必填。
    pub fn add_group_rules(&mut self, group: &str, rules: Vec<(&str, Vec<ChildRule>)>) -> Result<()> {
        let child_count = self
            .get_element(group)?
            .as_group()
            .ok_or_else(|| Exception::NotAGroup(group.to_string()))?
            .children()
            .len();
        let mut required = 0;
        for (key, child_rules) in rules {
            let name = self
                .get_element(group)?
                .as_group()
                .and_then(|g| g.element_name(key))
                .ok_or_else(|| Exception::ElementNotFound(format!("{}[{}]", group, key)))?;
            for rule in child_rules {
                let format = self.prepare_format(&rule.rule_type, rule.format)?;
                if marks_required(&rule.rule_type) {
                    if let Some(g) = self.get_element_mut(group)?.as_group_mut() {
                        g.add_required_child(&name);
                    }
                    self.mark_required(&name);
                    required += 1;
                }
                self.rules
                    .entry(name.clone())
                    .or_default()
                    .push(RuleDescriptor {
                        rule_type: rule.rule_type,
                        format,
                        message: rule.message,
                        dependent: Vec::new(),
                        howmany: None,
                        group: Some(group.to_string()),
                    });
            }
        }
        if required > 0 && required == child_count {
            self.mark_required(group);
        }
        Ok(())
    }

    /// 登记整表规则
    pub fn add_form_rule<F>(&mut self, rule: F)
    where
        F: Fn(&Value, &Value) -> std::result::Result<(), IndexMap<String, String>> + 'static,
    {
        self.form_rules.push(Box::new(rule));
    }

    /// 已登记在某个目标上的规则
    pub fn rules_for(&self, target: &str) -> &[RuleDescriptor] {
        self.rules.get(target).map_or(&[], Vec::as_slice)
    }

    /// 执行全部规则。未提交的表单不运行任何规则并返回 `false`。
    pub fn validate(&mut self) -> Result<bool> {
        self.errors.clear();
        if !self.ctx.is_submitted {
            return Ok(false);
        }
        let registry = Arc::clone(&self.rule_registry);
        for (target, rules) in &self.rules {
            let value = self.get_submit_value(target);
            for rule in rules {
                let group_failed = rule.group.as_ref().is_some_and(|g| self.errors.contains_key(g));
                if group_failed || self.errors.contains_key(target) {
                    break;
                }
                if !self.is_element_required(target) && is_empty_submission(value.as_ref()) {
                    break;
                }
                if !self.check_rule(&registry, rule, value.as_ref())? {
                    debug!("{} 未通过规则 {}", target, rule.rule_type);
                    let key = rule.group.clone().unwrap_or_else(|| target.clone());
                    self.errors.insert(key, rule.message.clone());
                }
            }
        }

        for rule in &self.form_rules {
            if let Err(messages) = rule(&self.ctx.submitted, &self.ctx.files) {
                if messages.is_empty() {
                    return Err(Exception::InvalidFormRule);
                }
                for (name, message) in messages {
                    self.errors.entry(name).or_insert(message);
                }
            }
        }
        info!("表单 {} 校验完成，错误数：{}", self.name, self.errors.len());
        Ok(self.errors.is_empty())
    }

    fn check_rule(&self, registry: &RuleRegistry, rule: &RuleDescriptor, value: Option<&Value>) -> Result<bool> {
        let value = value.cloned().unwrap_or_else(|| Value::from(""));
        let name = rule.rule_type.as_str();
        if !rule.dependent.is_empty() {
            let mut values = vec![value];
            for other in &rule.dependent {
                values.push(self.get_submit_value(other).unwrap_or_else(|| Value::from("")));
            }
            return Ok(registry.validate(name, &Value::list(values), &rule.format, true)? > 0);
        }
        match (&value, rule.howmany) {
            (_, Some(howmany)) => {
                let passed = registry.validate(name, &value, &rule.format, false)?;
                Ok(passed > 0 && passed >= howmany)
            }
            (Value::Map(items), None) if items.is_empty() => {
                Ok(registry.validate(name, &Value::from(""), &rule.format, false)? > 0)
            }
            (Value::Map(items), None) => {
                let passed = registry.validate(name, &value, &rule.format, false)?;
                Ok(passed == items.len())
            }
            (_, None) => Ok(registry.validate(name, &value, &rule.format, false)? > 0),
        }
    }
}
