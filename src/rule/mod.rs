// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 校验规则模块
//!
//! 规则是无状态的谓词 `validate(value, format) -> bool`，按名称登记在
//! [`RuleRegistry`] 中。登记方式有三种：
//! - 规则对象（实现 [`Rule`] 特性）；
//! - 正则表达式，值的字符串形式匹配即通过；
//! - 回调函数。
//!
//! 内置规则表由 `lazy_static` 构建一次并共享，表单登记自定义规则时通过
//! `Arc::make_mut` 得到自己的副本，不影响其他表单。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::exception::{Exception, Result};
use crate::value::Value;

pub mod builtin;

/// 校验回调
pub type RuleFn = Arc<dyn Fn(&Value, &RuleFormat) -> bool + Send + Sync>;

/// 规则参数
#[derive(Clone, Default)]
pub enum RuleFormat {
    #[default]
    None,
    Text(String),
    Number(u64),
    Range(u64, u64),
    List(Vec<String>),
    /// 已编译的正则表达式
    Pattern(Regex),
    Callback(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
}

impl fmt::Debug for RuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleFormat::None => write!(f, "None"),
            RuleFormat::Text(t) => f.debug_tuple("Text").field(t).finish(),
            RuleFormat::Number(n) => f.debug_tuple("Number").field(n).finish(),
            RuleFormat::Range(a, b) => f.debug_tuple("Range").field(a).field(b).finish(),
            RuleFormat::List(l) => f.debug_tuple("List").field(l).finish(),
            RuleFormat::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            RuleFormat::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

impl From<&str> for RuleFormat {
    fn from(s: &str) -> Self {
        RuleFormat::Text(s.to_string())
    }
}

impl From<u64> for RuleFormat {
    fn from(n: u64) -> Self {
        RuleFormat::Number(n)
    }
}

impl From<(u64, u64)> for RuleFormat {
    fn from((min, max): (u64, u64)) -> Self {
        RuleFormat::Range(min, max)
    }
}

impl RuleFormat {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        RuleFormat::Callback(Arc::new(f))
    }

    /// 数字参数；文字参数按十进制解析
    pub fn number(&self) -> Option<u64> {
        match self {
            RuleFormat::Number(n) => Some(*n),
            RuleFormat::Text(t) => t.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            RuleFormat::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// 把 `/pattern/flags` 形式的表达式编译为正则；不带分隔符时按原样编译。
///
/// 支持的修饰符：`i`、`m`、`s`、`x`、`u`（`u` 为默认行为，忽略）。
pub fn compile_pattern(source: &str) -> Result<Regex> {
    let invalid = |e: regex::Error| Exception::InvalidRuleFormat(format!("{}: {}", source, e));
    let Some(body) = source.strip_prefix('/') else {
        return Regex::new(source).map_err(invalid);
    };
    let Some(close) = body.rfind('/') else {
        return Regex::new(source).map_err(invalid);
    };
    let (pattern, flags) = (&body[..close], &body[close + 1..]);
    let mut inline = String::new();
    for flag in flags.chars() {
        match flag {
            'i' | 'm' | 's' | 'x' => inline.push(flag),
            'u' => {}
            other => {
                return Err(Exception::InvalidRuleFormat(format!(
                    "{}: unsupported modifier '{}'",
                    source, other
                )))
            }
        }
    }
    let pattern = pattern.replace("\\/", "/");
    let full = if inline.is_empty() {
        pattern
    } else {
        format!("(?{}){}", inline, pattern)
    };
    Regex::new(&full).map_err(invalid)
}

/// 校验规则
pub trait Rule: Send + Sync + fmt::Debug {
    fn validate(&self, value: &Value, format: &RuleFormat) -> bool;
}

/// 规则的登记方式
#[derive(Clone)]
pub enum RuleBinding {
    Object(Arc<dyn Rule>),
    Regex(Regex),
    Callback(RuleFn),
}

impl fmt::Debug for RuleBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleBinding::Object(rule) => f.debug_tuple("Object").field(rule).finish(),
            RuleBinding::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            RuleBinding::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

impl RuleBinding {
    fn check(&self, value: &Value, format: &RuleFormat) -> bool {
        match self {
            RuleBinding::Object(rule) => rule.validate(value, format),
            RuleBinding::Regex(re) => value.as_str().is_some_and(|s| re.is_match(s)),
            RuleBinding::Callback(f) => f(value, format),
        }
    }
}

/// 规则名到规则的映射
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, RuleBinding>,
}

lazy_static! {
    static ref DEFAULT_RULES: Arc<RuleRegistry> = {
        let mut registry = RuleRegistry::default();
        builtin::register_all(&mut registry);
        Arc::new(registry)
    };
}

impl RuleRegistry {
    /// 进程级共享的内置规则表
    pub fn shared() -> Arc<RuleRegistry> {
        Arc::clone(&DEFAULT_RULES)
    }

    pub fn register(&mut self, name: &str, binding: RuleBinding) {
        debug!("注册校验规则 {}", name);
        self.rules.insert(name.to_string(), binding);
    }

    pub fn register_rule(&mut self, name: &str, rule: impl Rule + 'static) {
        self.register(name, RuleBinding::Object(Arc::new(rule)));
    }

    /// 以正则表达式登记规则，表达式可以带 `/…/flags` 分隔符
    pub fn register_regex(&mut self, name: &str, pattern: &str) -> Result<()> {
        let re = compile_pattern(pattern)?;
        self.register(name, RuleBinding::Regex(re));
        Ok(())
    }

    pub fn register_callback<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&Value, &RuleFormat) -> bool + Send + Sync + 'static,
    {
        self.register(name, RuleBinding::Callback(Arc::new(f)));
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&RuleBinding> {
        self.rules
            .get(name)
            .ok_or_else(|| Exception::UnregisteredRule(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 执行规则，返回通过的个数。
    ///
    /// 映射值且 `multiple` 为假时逐个子值校验并计数；否则把整个值交给规则，
    /// 通过计 1，失败计 0。
    pub fn validate(&self, name: &str, value: &Value, format: &RuleFormat, multiple: bool) -> Result<usize> {
        let binding = self.get(name)?;
        let passed = match value {
            Value::Map(items) if !multiple => items
                .values()
                .filter(|item| binding.check(item, format))
                .count(),
            other => usize::from(binding.check(other, format)),
        };
        Ok(passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_pattern_with_delimiters() {
        let re = compile_pattern("/^[a-z]+$/i").unwrap();
        assert!(re.is_match("ABC"));
        let re = compile_pattern(r"/^a\/b$/").unwrap();
        assert!(re.is_match("a/b"));
        let re = compile_pattern("^x+$").unwrap();
        assert!(re.is_match("xxx"));
    }

    #[test]
    fn test_compile_pattern_errors() {
        assert!(matches!(
            compile_pattern("/(/"),
            Err(Exception::InvalidRuleFormat(_))
        ));
        assert!(matches!(
            compile_pattern("/a/e"),
            Err(Exception::InvalidRuleFormat(_))
        ));
    }

    #[test]
    fn test_validate_counts_map_items() {
        let registry = RuleRegistry::shared();
        let values = Value::map([("0", "12"), ("1", "x"), ("2", "7")]);
        assert_eq!(
            registry.validate("numeric", &values, &RuleFormat::None, false).unwrap(),
            2
        );
        assert_eq!(
            registry.validate("numeric", &Value::from("3.5"), &RuleFormat::None, false).unwrap(),
            1
        );
    }

    #[test]
    fn test_unregistered_rule() {
        let err = RuleRegistry::shared()
            .validate("nope", &Value::from(""), &RuleFormat::None, false)
            .unwrap_err();
        assert_eq!(err, Exception::UnregisteredRule("nope".to_string()));
    }

    #[test]
    fn test_per_form_copy_does_not_touch_shared() {
        let mut local = RuleRegistry::shared();
        Arc::make_mut(&mut local).register_callback("even", |v, _| {
            v.text().parse::<u32>().map_or(false, |n| n % 2 == 0)
        });
        assert!(local.is_registered("even"));
        assert!(!RuleRegistry::shared().is_registered("even"));
        assert_eq!(
            local.validate("even", &Value::from("4"), &RuleFormat::None, false).unwrap(),
            1
        );
    }

    #[test]
    fn test_regex_binding() {
        let mut registry = RuleRegistry::default();
        registry.register_regex("zip", "/^\\d{5}$/").unwrap();
        assert_eq!(
            registry.validate("zip", &Value::from("12345"), &RuleFormat::None, false).unwrap(),
            1
        );
        assert_eq!(
            registry.validate("zip", &Value::from("1234"), &RuleFormat::None, false).unwrap(),
            0
        );
    }
}
