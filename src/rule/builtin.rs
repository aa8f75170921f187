// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 内置校验规则

use std::fs;

use lazy_static::lazy_static;
use regex::Regex;

use crate::element::is_uploaded_file;
use crate::rule::{compile_pattern, Rule, RuleFormat, RuleRegistry};
use crate::value::{UploadError, UploadedFile, Value};

lazy_static! {
    static ref EMAIL: Regex = Regex::new(concat!(
        r#"^(("[^"\f\n\r\t\v\x08]+")|([\w!\#$%\&'*+\-\~/^`|{}]+(\.[\w!\#$%\&'*+\-\~/^`|{}]+)*))"#,
        r"@((\[(((25[0-5])|(2[0-4][0-9])|([0-1]?[0-9]?[0-9]))\.){3}((25[0-5])|(2[0-4][0-9])|([0-1]?[0-9]?[0-9]))\])",
        r"|(((25[0-5])|(2[0-4][0-9])|([0-1]?[0-9]?[0-9]))\.){3}((25[0-5])|(2[0-4][0-9])|([0-1]?[0-9]?[0-9]))",
        r"|(([A-Za-z0-9\-])+\.)+[A-Za-z\-]+)$",
    ))
    .unwrap();
}

/// 内置规则名与正则表达式
const REGEX_RULES: &[(&str, &str)] = &[
    ("lettersonly", r"^[a-zA-Z]+$"),
    ("alphanumeric", r"^[a-zA-Z0-9]+$"),
    ("numeric", r"(^-?\d\d*\.\d*$)|(^-?\d\d*$)|(^-?\.\d\d*$)"),
    ("nopunctuation", r#"^[^()./*^?\#!@$%+=,"'><\~\[\]{}]+$"#),
    ("nonzero", r"^-?[1-9][0-9]*"),
];

pub(crate) fn register_all(registry: &mut RuleRegistry) {
    registry.register_rule("required", Required);
    registry.register_rule("maxlength", Length::Max);
    registry.register_rule("minlength", Length::Min);
    registry.register_rule("rangelength", Length::Between);
    registry.register_rule("email", Email);
    registry.register_rule("regex", RegexRule);
    registry.register_rule("callback", Callback);
    registry.register_rule("compare", Compare);
    registry.register_rule("uploadedfile", UploadRule::Uploaded);
    registry.register_rule("maxfilesize", UploadRule::MaxSize);
    registry.register_rule("mimetype", UploadRule::MimeType);
    registry.register_rule("filename", UploadRule::FileName);
    for (name, pattern) in REGEX_RULES {
        if let Err(e) = registry.register_regex(name, pattern) {
            log::error!("内置规则 {} 无法编译: {}", name, e);
        }
    }
}

/// 值不能为空；映射至少有一项，文件必须真的选择过。
#[derive(Debug, Clone, Copy)]
pub struct Required;

impl Rule for Required {
    fn validate(&self, value: &Value, _format: &RuleFormat) -> bool {
        match value {
            Value::Str(s) => !s.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::File(f) => f.error != UploadError::NoFile,
        }
    }
}

/// 按字符计数的长度限制
#[derive(Debug, Clone, Copy)]
pub enum Length {
    Max,
    Min,
    Between,
}

impl Rule for Length {
    fn validate(&self, value: &Value, format: &RuleFormat) -> bool {
        let length = value.text().chars().count() as u64;
        match (self, format) {
            (Length::Between, RuleFormat::Range(min, max)) => length >= *min && length <= *max,
            (Length::Between, _) => false,
            (Length::Max, f) => f.number().is_some_and(|max| length <= max),
            (Length::Min, f) => f.number().is_some_and(|min| length >= min),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Email;

impl Rule for Email {
    fn validate(&self, value: &Value, _format: &RuleFormat) -> bool {
        value.as_str().is_some_and(|s| EMAIL.is_match(s))
    }
}

/// 参数给出正则表达式，可以是已编译的，也可以是 `/…/flags` 文字
#[derive(Debug, Clone, Copy)]
pub struct RegexRule;

impl Rule for RegexRule {
    fn validate(&self, value: &Value, format: &RuleFormat) -> bool {
        let Some(text) = value.as_str() else {
            return false;
        };
        match format {
            RuleFormat::Pattern(re) => re.is_match(text),
            RuleFormat::Text(source) => compile_pattern(source).is_ok_and(|re| re.is_match(text)),
            _ => false,
        }
    }
}

/// 参数给出回调
#[derive(Debug, Clone, Copy)]
pub struct Callback;

impl Rule for Callback {
    fn validate(&self, value: &Value, format: &RuleFormat) -> bool {
        match format {
            RuleFormat::Callback(f) => f(value),
            _ => false,
        }
    }
}

/// 比较两个元素的值，值为 `[左, 右]`。
///
/// 运算符：`eq`（默认）、`neq`、`gt`、`gte`、`lt`、`lte`，也接受 `==`、`!=`、`>` 等写法。
/// 相等与不等按字符串比较，其余按数字比较。
#[derive(Debug, Clone, Copy)]
pub struct Compare;

impl Rule for Compare {
    fn validate(&self, value: &Value, format: &RuleFormat) -> bool {
        let items = value.items();
        let (Some(left), Some(right)) = (items.first(), items.get(1)) else {
            return false;
        };
        let (left, right) = (left.text(), right.text());
        match format.text().unwrap_or("eq") {
            "" | "eq" | "==" | "===" => left == right,
            "neq" | "!=" | "!==" => left != right,
            "gt" | ">" => float_val(left) > float_val(right),
            "gte" | ">=" => float_val(left) >= float_val(right),
            "lt" | "<" => float_val(left) < float_val(right),
            "lte" | "<=" => float_val(left) <= float_val(right),
            _ => false,
        }
    }
}

/// 取字符串开头的数字部分，没有数字时为 0
fn float_val(s: &str) -> f64 {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = s.as_bytes();
    while end < bytes.len() {
        let c = bytes[end];
        match c {
            b'0'..=b'9' => seen_digit = true,
            b'+' | b'-' if end == 0 => {}
            b'+' | b'-' if seen_exp && matches!(bytes[end - 1], b'e' | b'E') => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => seen_exp = true,
            _ => break,
        }
        end += 1;
    }
    let mut candidate = &s[..end];
    while !candidate.is_empty() {
        if let Ok(n) = candidate.parse::<f64>() {
            return n;
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    0.0
}

/// 上传文件相关的规则
#[derive(Debug, Clone, Copy)]
pub enum UploadRule {
    /// 确实有文件上传成功
    Uploaded,
    /// 文件大小不超过参数（字节）
    MaxSize,
    /// MIME 类型等于参数或属于参数列表
    MimeType,
    /// 客户端文件名匹配正则
    FileName,
}

impl Rule for UploadRule {
    fn validate(&self, value: &Value, format: &RuleFormat) -> bool {
        let Some(file) = value.as_file() else {
            // 没有上传记录时，只有 uploadedfile 规则失败
            return !matches!(self, UploadRule::Uploaded);
        };
        match self {
            UploadRule::Uploaded => is_uploaded_file(file),
            UploadRule::MaxSize => max_size(file, format),
            UploadRule::MimeType => {
                if !is_uploaded_file(file) {
                    return true;
                }
                match format {
                    RuleFormat::List(types) => types.iter().any(|t| *t == file.mime_type),
                    RuleFormat::Text(t) => *t == file.mime_type,
                    _ => false,
                }
            }
            UploadRule::FileName => {
                if !is_uploaded_file(file) {
                    return true;
                }
                RegexRule.validate(&Value::from(file.name.as_str()), format)
            }
        }
    }
}

fn max_size(file: &UploadedFile, format: &RuleFormat) -> bool {
    if matches!(file.error, UploadError::FormSize | UploadError::IniSize) {
        return false;
    }
    if !is_uploaded_file(file) {
        return true;
    }
    let Some(limit) = format.number() else {
        return false;
    };
    let size = fs::metadata(&file.tmp_name).map_or(file.size, |m| m.len());
    size <= limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    fn check(name: &str, value: &str, format: RuleFormat) -> bool {
        RuleRegistry::shared()
            .validate(name, &Value::from(value), &format, false)
            .unwrap()
            == 1
    }

    #[test]
    fn test_required() {
        assert!(!check("required", "", RuleFormat::None));
        assert!(check("required", "0", RuleFormat::None));
        assert!(!Required.validate(&Value::Map(Default::default()), &RuleFormat::None));
        assert!(!Required.validate(&Value::File(UploadedFile::missing()), &RuleFormat::None));
    }

    #[test]
    fn test_lengths_count_characters() {
        assert!(check("maxlength", "ÄÖÜ", RuleFormat::Number(3)));
        assert!(!check("maxlength", "abcd", RuleFormat::Number(3)));
        assert!(check("minlength", "abc", RuleFormat::from("3")));
        assert!(check("rangelength", "abcd", RuleFormat::Range(2, 4)));
        assert!(!check("rangelength", "a", RuleFormat::Range(2, 4)));
    }

    #[test]
    fn test_email() {
        for ok in ["user@example.com", "first.last+tag@sub.example.org", "a@[10.0.0.1]", "a@127.0.0.1"] {
            assert!(check("email", ok, RuleFormat::None), "{}", ok);
        }
        for bad in ["", "plain", "a@b", "a b@example.com", "@example.com", "a@[300.1.1.1]"] {
            assert!(!check("email", bad, RuleFormat::None), "{}", bad);
        }
    }

    #[test]
    fn test_regex_family() {
        assert!(check("lettersonly", "abcXYZ", RuleFormat::None));
        assert!(!check("lettersonly", "abc1", RuleFormat::None));
        assert!(check("alphanumeric", "abc123", RuleFormat::None));
        assert!(check("numeric", "-12.5", RuleFormat::None));
        assert!(check("numeric", ".5", RuleFormat::None));
        assert!(!check("numeric", "1e5", RuleFormat::None));
        assert!(check("nopunctuation", "hello world", RuleFormat::None));
        assert!(!check("nopunctuation", "hello!", RuleFormat::None));
        assert!(check("nonzero", "10", RuleFormat::None));
        assert!(!check("nonzero", "012", RuleFormat::None));
        assert!(check("regex", "ABC", RuleFormat::from("/^[a-c]+$/i")));
    }

    #[test]
    fn test_callback() {
        let odd = RuleFormat::Callback(Arc::new(|v: &Value| v.text().len() % 2 == 1));
        assert!(check("callback", "abc", odd.clone()));
        assert!(!check("callback", "ab", odd));
    }

    #[test]
    fn test_compare() {
        let pair = |a: &str, b: &str| Value::list([a, b]);
        assert!(Compare.validate(&pair("x", "x"), &RuleFormat::None));
        assert!(!Compare.validate(&pair("1.0", "1"), &RuleFormat::from("eq")));
        assert!(Compare.validate(&pair("10", "9"), &RuleFormat::from("gt")));
        assert!(Compare.validate(&pair("5abc", "5"), &RuleFormat::from("gte")));
        assert!(!Compare.validate(&pair("a", "b"), &RuleFormat::from("lt")));
        assert!(Compare.validate(&pair("a", "b"), &RuleFormat::from("neq")));
    }

    #[test]
    fn test_float_val() {
        assert_eq!(float_val("12abc"), 12.0);
        assert_eq!(float_val(" -1.5e2x"), -150.0);
        assert_eq!(float_val("1e"), 1.0);
        assert_eq!(float_val("abc"), 0.0);
    }

    #[test]
    fn test_upload_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.tmp");
        fs::File::create(&path).unwrap().write_all(b"0123456789").unwrap();
        let file = Value::File(UploadedFile::new("photo.png", "image/png", 10, &path));

        assert!(UploadRule::Uploaded.validate(&file, &RuleFormat::None));
        assert!(UploadRule::MaxSize.validate(&file, &RuleFormat::Number(10)));
        assert!(!UploadRule::MaxSize.validate(&file, &RuleFormat::Number(9)));
        assert!(UploadRule::MimeType.validate(
            &file,
            &RuleFormat::List(vec!["image/gif".into(), "image/png".into()])
        ));
        assert!(!UploadRule::MimeType.validate(&file, &RuleFormat::from("text/plain")));
        assert!(UploadRule::FileName.validate(&file, &RuleFormat::from(r"/\.png$/")));

        let missing = Value::File(UploadedFile::missing());
        assert!(!UploadRule::Uploaded.validate(&missing, &RuleFormat::None));
        assert!(UploadRule::MimeType.validate(&missing, &RuleFormat::from("text/plain")));
        let too_big = Value::File(UploadedFile::missing().with_error(UploadError::FormSize));
        assert!(!UploadRule::MaxSize.validate(&too_big, &RuleFormat::Number(100)));
    }
}
