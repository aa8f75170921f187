// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了表单引擎、HTML 表格以及 HTTP 客户端在运行过程中可能返回的各类异常。
//!
//! ## 设计意图
//! - **配置错误**：未注册的元素类型或规则、类型不兼容的重名元素、引用了不存在的元素等。
//!   这些都是表单装配阶段的编程错误，会在调用处立即返回。
//! - **协议/传输错误**：畸形的状态行、损坏的 gzip 数据、连接失败、重定向次数过多等。
//! - **回调误用**：整表规则返回了空的错误集合。
//!
//! 注意：字段校验失败 **不是** 异常，它们被记录在表单的错误表中。

use std::fmt;
use std::io;

/// 表单引擎与 HTTP 客户端共用的异常类型。
///
/// 该枚举作为 `Result` 的 `Err` 部分返回。
#[derive(Debug, Clone, PartialEq)]
pub enum Exception {
    /// 通过类型名创建元素时，该类型没有在元素注册表中登记。
    UnregisteredElementType(String),
    /// 引用了一个没有登记的校验规则。
    UnregisteredRule(String),
    /// 引用了表单中不存在的元素。
    ElementNotFound(String),
    /// 同名元素已经存在且类型不同，无法作为兼容的重复元素加入。
    DuplicateElement(String),
    /// 存在多个同名元素，无法确定插入位置。
    AmbiguousElement(String),
    /// 按组名操作时，目标元素并不是一个组。
    NotAGroup(String),
    /// 文件上传字段只能出现在 POST 表单中。
    FileInGetForm(String),
    /// 规则参数（例如正则表达式）无法使用。
    InvalidRuleFormat(String),
    /// 整表规则报告了失败，却没有给出任何元素的错误信息。
    InvalidFormRule,
    /// 元素自身在处理事件时报告的错误。
    ElementFailure(String),
    /// 表格单元格越界且未开启自动扩展。
    InvalidTableCell(usize, usize),
    /// 配置文件无法读取。
    Config(String),
    /// URL 无法解析。
    InvalidUrl(String),
    /// 服务器返回的报文不符合 HTTP 规范（例如状态行格式错误）。
    MalformedResponse(String),
    /// 请求了 https:// 地址，但客户端没有 TLS 支持。
    TlsUnsupported,
    /// 不支持通过代理访问 https:// 地址。
    HttpsProxyUnsupported,
    /// 重定向次数超过上限。
    TooManyRedirects(u32),
    /// gzip 压缩方法不是 deflate（8）。
    GzipMethod(u8),
    /// gzip 数据格式错误（魔数、保留位、长度不足等）。
    GzipData(&'static str),
    /// gzip 头部或数据的 CRC 校验失败。
    GzipCrc(&'static str),
    /// 解压失败或解压后的长度与尾部记录不一致。
    GzipRead(String),
    /// 底层套接字或文件 I/O 错误。
    Io(io::ErrorKind, String),
}

use Exception::*;

/// 为 `Exception` 实现 `Display` 特性，便于写入日志或向调用方展示。
impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnregisteredElementType(t) => write!(f, "Element '{}' is not registered", t),
            UnregisteredRule(r) => write!(f, "Rule '{}' is not registered", r),
            ElementNotFound(n) => write!(f, "Element '{}' does not exist", n),
            DuplicateElement(n) => write!(f, "Element '{}' already exists", n),
            AmbiguousElement(n) => write!(f, "Several elements named '{}' exist", n),
            NotAGroup(n) => write!(f, "Element '{}' is not a group", n),
            FileInGetForm(n) => write!(
                f,
                "Cannot add a file upload field '{}' to a GET method form",
                n
            ),
            InvalidRuleFormat(m) => write!(f, "Invalid rule format: {}", m),
            InvalidFormRule => write!(f, "Form rule callback returned invalid value"),
            ElementFailure(m) => write!(f, "Element failure: {}", m),
            InvalidTableCell(row, col) => write!(f, "Invalid table cell reference[{}][{}]", row, col),
            Config(m) => write!(f, "Configuration error: {}", m),
            InvalidUrl(u) => write!(f, "Invalid URL: {}", u),
            MalformedResponse(line) => write!(f, "Malformed response: {}", line),
            TlsUnsupported => write!(f, "https:// requests need TLS support"),
            HttpsProxyUnsupported => write!(f, "HTTPS proxies are not supported"),
            TooManyRedirects(n) => write!(f, "Too many redirects (limit {})", n),
            GzipMethod(m) => write!(f, "decode_gzip(): unknown compression method {}", m),
            GzipData(m) => write!(f, "decode_gzip(): {}", m),
            GzipCrc(m) => write!(f, "decode_gzip(): {} CRC check failed", m),
            GzipRead(m) => write!(f, "decode_gzip(): {}", m),
            Io(kind, m) => write!(f, "I/O error ({:?}): {}", kind, m),
        }
    }
}

impl std::error::Error for Exception {}

impl From<io::Error> for Exception {
    fn from(e: io::Error) -> Self {
        Io(e.kind(), e.to_string())
    }
}

/// 本 crate 统一使用的结果类型。
pub type Result<T> = std::result::Result<T, Exception>;
