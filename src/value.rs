// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 表单值模块
//!
//! 提交数据、默认值、常量值都是“字符串 / 有序映射 / 上传文件”三种节点构成的树。
//! 元素名中的方括号路径（`user[address][city]`）被显式解析为键序列，
//! 再在树上递归查找或写入。

use std::path::PathBuf;

use indexmap::IndexMap;
use serde_derive::Serialize;

/// 文件上传的错误状态，取值与浏览器上传约定的状态码一一对应。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadError {
    Ok,
    IniSize,
    FormSize,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    Extension,
}

impl UploadError {
    /// 由数字状态码构造，未知状态码视为写入失败。
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => UploadError::Ok,
            1 => UploadError::IniSize,
            2 => UploadError::FormSize,
            3 => UploadError::Partial,
            4 => UploadError::NoFile,
            6 => UploadError::NoTmpDir,
            7 => UploadError::CantWrite,
            8 => UploadError::Extension,
            _ => UploadError::CantWrite,
        }
    }
}

/// 一次文件上传的描述信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedFile {
    /// 客户端提供的原始文件名
    pub name: String,
    /// 客户端声明的 MIME 类型
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
    /// 服务器端临时文件路径
    pub tmp_name: PathBuf,
    pub error: UploadError,
}

impl UploadedFile {
    pub fn new(name: &str, mime_type: &str, size: u64, tmp_name: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size,
            tmp_name: tmp_name.into(),
            error: UploadError::Ok,
        }
    }

    /// 表示“该字段没有选择文件”的记录
    pub fn missing() -> Self {
        Self {
            name: String::new(),
            mime_type: String::new(),
            size: 0,
            tmp_name: PathBuf::new(),
            error: UploadError::NoFile,
        }
    }

    pub fn with_error(mut self, error: UploadError) -> Self {
        self.error = error;
        self
    }
}

/// 表单值树的节点
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Map(IndexMap<String, Value>),
    File(UploadedFile),
}

impl Default for Value {
    fn default() -> Self {
        Value::Map(IndexMap::new())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<bool> for Value {
    /// `true` 记为 `"1"`，`false` 记为空串
    fn from(b: bool) -> Self {
        Value::Str(if b { "1" } else { "" }.to_string())
    }
}

impl From<UploadedFile> for Value {
    fn from(f: UploadedFile) -> Self {
        Value::File(f)
    }
}

impl Value {
    /// 空映射
    pub fn empty() -> Self {
        Value::default()
    }

    /// 以 `"0"`, `"1"`, ... 为键的列表
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Map(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.into()))
                .collect(),
        )
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Value::File(f) => Some(f),
            _ => None,
        }
    }

    /// 字符串视图；映射与文件没有字符串形式，返回空串。
    pub fn text(&self) -> &str {
        self.as_str().unwrap_or("")
    }

    /// 是否为空字符串（缺失值由 `Option::None` 表示，不在此列）
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Str(s) if s.is_empty())
    }

    /// 布尔语义：空串与 `"0"` 为假，空映射为假，未上传的文件为假。
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty() && s != "0",
            Value::Map(m) => !m.is_empty(),
            Value::File(f) => f.error != UploadError::NoFile,
        }
    }

    /// 映射的直接子节点；标量视为只有自身一个元素。
    pub fn items(&self) -> Vec<&Value> {
        match self {
            Value::Map(m) => m.values().collect(),
            other => vec![other],
        }
    }

    /// 按元素名查找：先把整个名称当作键，再按方括号路径逐级查找。
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let map = self.as_map()?;
        if let Some(v) = map.get(name) {
            return Some(v);
        }
        if !name.contains('[') {
            return None;
        }
        self.get_path(&parse_path(name))
    }

    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let mut current = self;
        for key in path {
            current = current.as_map()?.get(key.as_ref())?;
        }
        Some(current)
    }

    /// 按路径写入；中间节点不是映射时会被替换为映射，空键表示追加。
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            *self = value;
            return;
        };
        let mut current = self;
        for key in parents {
            let map = current.ensure_map();
            let key = next_key(map, key.as_ref());
            current = map.entry(key).or_insert_with(Value::empty);
        }
        let map = current.ensure_map();
        let key = next_key(map, last.as_ref());
        map.insert(key, value);
    }

    /// 与 `lookup` 对应的写入：名称不含方括号时直接作为键。
    pub fn assign(&mut self, name: &str, value: Value) {
        if name.contains('[') {
            self.set_path(&parse_path(name), value);
        } else {
            self.ensure_map().insert(name.to_string(), value);
        }
    }

    fn ensure_map(&mut self) -> &mut IndexMap<String, Value> {
        if !matches!(self, Value::Map(_)) {
            *self = Value::empty();
        }
        match self {
            Value::Map(m) => m,
            _ => unreachable!(),
        }
    }

    /// 递归合并：`other` 中的标量覆盖 `self`，映射逐键合并。
    pub fn merge(&mut self, other: &Value) {
        match (self, other) {
            (Value::Map(mine), Value::Map(theirs)) => {
                for (key, value) in theirs {
                    match mine.get_mut(key) {
                        Some(existing @ Value::Map(_)) if matches!(value, Value::Map(_)) => {
                            existing.merge(value)
                        }
                        _ => {
                            mine.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            (this, other) => *this = other.clone(),
        }
    }

    /// 对所有字符串叶子应用过滤函数
    pub fn map_strings(&self, filter: &dyn Fn(&str) -> String) -> Value {
        match self {
            Value::Str(s) => Value::Str(filter(s)),
            Value::Map(m) => Value::Map(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.map_strings(filter)))
                    .collect(),
            ),
            Value::File(f) => Value::File(f.clone()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Value::Map(m) => m.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Map(m) if m.is_empty())
    }
}

/// 空键表示追加，取当前最大数字键加一。
fn next_key(map: &IndexMap<String, Value>, key: &str) -> String {
    if !key.is_empty() {
        return key.to_string();
    }
    map.keys()
        .filter_map(|k| k.parse::<usize>().ok())
        .max()
        .map_or(0, |n| n + 1)
        .to_string()
}

/// 解析 `base[a][b]` 为 `["base", "a", "b"]`。
///
/// 没有方括号时返回只含名称本身的路径；不闭合的方括号按字面量处理。
pub fn parse_path(name: &str) -> Vec<String> {
    let Some(open) = name.find('[') else {
        return vec![name.to_string()];
    };
    let mut path = vec![name[..open].to_string()];
    let mut rest = &name[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        match stripped.find(']') {
            Some(close) => {
                path.push(stripped[..close].to_string());
                rest = &stripped[close + 1..];
            }
            None => {
                path.push(stripped.to_string());
                rest = "";
            }
        }
    }
    path
}

/// 将值放到元素名对应的路径下，得到一棵只含该值的树。
pub fn wrap_in_path(name: &str, value: Value) -> Value {
    let mut root = Value::empty();
    root.set_path(&parse_path(name), value);
    root
}
