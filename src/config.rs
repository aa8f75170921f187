// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 配置模块
//!
//! 从 TOML 文件读取 HTTP 客户端与表单的默认选项：
//!
//! ```toml
//! log_config = "config/log4rs.yaml"
//!
//! [http]
//! method = "GET"
//! http_version = "1.1"
//! timeout_secs = 30
//! allow_redirects = true
//! max_redirects = 3
//!
//! [form]
//! method = "post"
//! track_submit = true
//! ```
//!
//! 所有字段都有默认值，缺省的字段由 `#[serde(default = ...)]` 补齐。

use std::fs::File;
use std::io::prelude::*;
use std::time::Duration;

use log::{error, warn};
use serde_derive::{Deserialize, Serialize};

use crate::exception::{Exception, Result};
use crate::param::{FormMethod, HttpMethod, HttpVersion, DEFAULT_REQUIRED_NOTE, USER_AGENT};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_log_config")]
    log_config: String,
    #[serde(default)]
    http: RequestOptions,
    #[serde(default)]
    form: FormOptions,
}

/// HTTP 请求的默认选项
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RequestOptions {
    #[serde(default = "default_http_method")]
    method: HttpMethod,
    #[serde(default = "default_http_version")]
    http_version: HttpVersion,
    #[serde(default = "default_user_agent")]
    user_agent: String,
    /// 连接超时（秒），0 表示不限
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    /// 读取超时（秒），0 表示不限
    #[serde(default)]
    read_timeout_secs: u64,
    #[serde(default)]
    allow_redirects: bool,
    #[serde(default = "default_max_redirects")]
    max_redirects: u32,
    /// 嵌套的 POST 字段是否编码为 `name[key]`
    #[serde(default = "default_true")]
    use_brackets: bool,
    #[serde(default = "default_true")]
    save_body: bool,
    /// `host:port`，为空表示直连
    #[serde(default)]
    proxy: Option<String>,
    #[serde(default)]
    proxy_user: Option<String>,
    #[serde(default)]
    proxy_pass: Option<String>,
    /// 每个线程保留的长连接数上限
    #[serde(default = "default_pool_capacity")]
    pool_capacity: usize,
}

/// 表单的默认选项
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FormOptions {
    #[serde(default)]
    method: FormMethod,
    #[serde(default)]
    track_submit: bool,
    #[serde(default = "default_required_note")]
    required_note: String,
    #[serde(default = "default_max_file_size")]
    max_file_size: u64,
}

fn default_log_config() -> String {
    "config/log4rs.yaml".to_string()
}

fn default_http_method() -> HttpMethod {
    HttpMethod::Get
}

fn default_http_version() -> HttpVersion {
    HttpVersion::V1_1
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_redirects() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_pool_capacity() -> usize {
    5
}

fn default_required_note() -> String {
    DEFAULT_REQUIRED_NOTE.to_string()
}

fn default_max_file_size() -> u64 {
    2 * 1024 * 1024 // 2MB
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: default_http_method(),
            http_version: default_http_version(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            read_timeout_secs: 0,
            allow_redirects: false,
            max_redirects: default_max_redirects(),
            use_brackets: true,
            save_body: true,
            proxy: None,
            proxy_user: None,
            proxy_pass: None,
            pool_capacity: default_pool_capacity(),
        }
    }
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            method: FormMethod::Post,
            track_submit: false,
            required_note: default_required_note(),
            max_file_size: default_max_file_size(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            log_config: default_log_config(),
            http: RequestOptions::default(),
            form: FormOptions::default(),
        }
    }

    /// 读取配置文件。文件不存在时返回错误；内容无法解析时记录错误并使用默认配置。
    pub fn from_toml(filename: &str) -> Result<Self> {
        let mut file = File::open(filename)
            .map_err(|e| Exception::Config(format!("no such file {}: {}", filename, e)))?;
        let mut str_val = String::new();
        file.read_to_string(&mut str_val)
            .map_err(|e| Exception::Config(format!("error reading {}: {}", filename, e)))?;

        let mut raw_config: Config = match toml::from_str(&str_val) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        };
        if raw_config.http.pool_capacity == 0 {
            warn!("pool_capacity被设置为0，长连接池至少需要一个位置，因此该值将被改为1。");
            raw_config.http.pool_capacity = 1;
        }
        Ok(raw_config)
    }
}

impl Config {
    pub fn log_config(&self) -> &str {
        &self.log_config
    }

    pub fn http(&self) -> &RequestOptions {
        &self.http
    }

    pub fn form(&self) -> &FormOptions {
        &self.form
    }
}

impl RequestOptions {
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn http_version(&self) -> HttpVersion {
        self.http_version
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }

    pub fn allow_redirects(&self) -> bool {
        self.allow_redirects
    }

    pub fn max_redirects(&self) -> u32 {
        self.max_redirects
    }

    pub fn use_brackets(&self) -> bool {
        self.use_brackets
    }

    pub fn save_body(&self) -> bool {
        self.save_body
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn proxy_user(&self) -> Option<&str> {
        self.proxy_user.as_deref()
    }

    pub fn proxy_pass(&self) -> Option<&str> {
        self.proxy_pass.as_deref()
    }

    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }
}

impl FormOptions {
    pub fn method(&self) -> FormMethod {
        self.method
    }

    pub fn track_submit(&self) -> bool {
        self.track_submit
    }

    pub fn required_note(&self) -> &str {
        &self.required_note
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let file = write_config(
            r#"
[http]
method = "POST"
http_version = "1.0"
allow_redirects = true
proxy = "proxy.local:3128"

[form]
method = "get"
track_submit = true
"#,
        );
        let config = Config::from_toml(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.log_config(), "config/log4rs.yaml");
        assert_eq!(config.http().method(), HttpMethod::Post);
        assert_eq!(config.http().http_version(), HttpVersion::V1_0);
        assert!(config.http().allow_redirects());
        assert_eq!(config.http().max_redirects(), 3);
        assert_eq!(config.http().proxy(), Some("proxy.local:3128"));
        assert_eq!(config.http().timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.http().read_timeout(), None);
        assert_eq!(config.form().method(), FormMethod::Get);
        assert!(config.form().track_submit());
        assert_eq!(config.form().required_note(), DEFAULT_REQUIRED_NOTE);
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = Config::from_toml("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, Exception::Config(_)));
    }

    #[test]
    fn test_unparsable_file_falls_back() {
        let file = write_config("[http\nmethod = ");
        let config = Config::from_toml(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.http(), &RequestOptions::default());
        assert_eq!(config.form(), &FormOptions::default());
    }

    #[test]
    fn test_zero_pool_capacity_is_raised() {
        let file = write_config("[http]\npool_capacity = 0\n");
        let config = Config::from_toml(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.http().pool_capacity(), 1);
    }
}
