// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应解析模块
//!
//! 从 [`Socket`] 读取并解析一个完整的响应，状态依次为：
//! 1. 状态行，格式必须是 `HTTP/d.d ddd[ reason]`；
//! 2. 头部，直到空行为止，`100 Continue` 会回到状态行；
//! 3. 正文，可以是分块编码、定长或读到连接关闭；
//! 4. 完成，gzip 正文在此时统一解压。

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::{debug, error};
use regex::Regex;

use crate::exception::{Exception, Result};
use crate::http::gzip::decode_gzip;
use crate::http::listener::{notify, HttpEvent, ListenerHandle};
use crate::http::socket::Socket;
use crate::param::{READ_CHUNK_SIZE, STATUS_CODES};
use crate::util::urldecode;

lazy_static! {
    static ref STATUS_LINE: Regex = Regex::new(r"^(HTTP/\d\.\d) (\d{3})(?: (.+))?").unwrap();
    static ref CHUNK_SIZE: Regex = Regex::new(r"^([0-9a-fA-F]+)").unwrap();
}

/// `Set-Cookie` 头解析出的 cookie
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// 原始的过期时间文本，已去掉引号
    pub expires: Option<String>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: bool,
    /// 其他属性，例如 `httponly` 或 `max-age`
    pub extra: IndexMap<String, Option<String>>,
}

impl Cookie {
    pub fn parse(header: &str) -> Self {
        let mut elements = header.split(';');
        let first = elements.next().unwrap_or_default();
        let (name, value) = first.split_once('=').unwrap_or((first, ""));
        let mut cookie = Cookie {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
            ..Cookie::default()
        };
        for element in elements {
            let (el_name, el_value) = match element.split_once('=') {
                Some((n, v)) => (n.trim().to_lowercase(), Some(v.trim())),
                None => (element.trim().to_lowercase(), None),
            };
            match el_name.as_str() {
                "secure" => cookie.secure = true,
                "expires" => cookie.expires = el_value.map(|v| v.replace('"', "")),
                "path" => cookie.path = el_value.map(urldecode),
                "domain" => cookie.domain = el_value.map(urldecode),
                _ => {
                    cookie.extra.insert(el_name, el_value.map(str::to_string));
                }
            }
        }
        cookie
    }

    /// 解析过期时间，支持 RFC 2822 与 Netscape 的 `Wdy, DD-Mon-YYYY HH:MM:SS GMT`
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.expires.as_deref()?.trim();
        if let Ok(t) = DateTime::parse_from_rfc2822(raw) {
            return Some(t.with_timezone(&Utc));
        }
        ["%a, %d-%b-%Y %H:%M:%S GMT", "%A, %d-%b-%y %H:%M:%S GMT", "%a, %d %b %Y %H:%M:%S GMT"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|t| t.and_utc())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|t| t <= now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StatusLine,
    Headers,
    Body,
}

#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    protocol: String,
    code: u16,
    reason: Option<String>,
    headers: IndexMap<String, String>,
    cookies: Vec<Cookie>,
    body: Bytes,
}

/// 正文读取过程中的状态
struct BodyReader<'a> {
    socket: &'a mut dyn Socket,
    chunked: bool,
    /// 定长正文剩余的字节数；`None` 表示读到连接关闭
    to_read: Option<usize>,
    chunk_length: usize,
}

impl BodyReader<'_> {
    fn finished(&self) -> bool {
        self.socket.eof() || self.to_read == Some(0)
    }

    fn next(&mut self) -> Result<Vec<u8>> {
        if self.chunked {
            return self.read_chunk();
        }
        match self.to_read {
            None => self.socket.read(READ_CHUNK_SIZE),
            Some(remaining) => {
                let data = self.socket.read(remaining.min(READ_CHUNK_SIZE))?;
                self.to_read = Some(remaining.saturating_sub(data.len()));
                Ok(data)
            }
        }
    }

    fn read_chunk(&mut self) -> Result<Vec<u8>> {
        if self.chunk_length == 0 {
            let line = self.socket.read_line()?;
            let Some(caps) = CHUNK_SIZE.captures(&line) else {
                return Ok(Vec::new());
            };
            self.chunk_length = usize::from_str_radix(&caps[1], 16)
                .map_err(|_| Exception::MalformedResponse(format!("chunk size {}", line)))?;
            if self.chunk_length == 0 {
                // 最后一个分块之后的空行
                self.socket.read_line()?;
                return Ok(Vec::new());
            }
        }
        let data = self.socket.read(self.chunk_length.min(READ_CHUNK_SIZE))?;
        self.chunk_length = self.chunk_length.saturating_sub(data.len());
        if self.chunk_length == 0 {
            self.socket.read_line()?;
        }
        Ok(data)
    }

    /// 空读且不在分块中间（或连接已关闭）时结束
    fn should_stop(&self, data: &[u8]) -> bool {
        data.is_empty() && (self.chunk_length == 0 || self.socket.eof())
    }
}

impl HttpResponse {
    /// 读取并解析一个响应。
    ///
    /// `save_body` 为假时丢弃普通正文（gzip 正文仍需缓存以便解压）；
    /// `can_have_body` 为假（HEAD 请求）时不读取正文。
    pub fn process(
        socket: &mut dyn Socket,
        save_body: bool,
        can_have_body: bool,
        listeners: &[ListenerHandle],
    ) -> Result<HttpResponse> {
        let mut response = HttpResponse::default();
        let mut state = State::StatusLine;
        while state != State::Body {
            let line = socket.read_line()?;
            state = match state {
                State::StatusLine => {
                    response.parse_status_line(&line)?;
                    State::Headers
                }
                State::Headers if !line.is_empty() => {
                    response.process_header(&line);
                    State::Headers
                }
                State::Headers if response.code == 100 => {
                    debug!("收到100 Continue，丢弃已读头部并继续读取状态行");
                    response.headers.clear();
                    response.cookies.clear();
                    response.reason = None;
                    State::StatusLine
                }
                _ => State::Body,
            };
        }
        notify(listeners, &HttpEvent::GotHeaders(&response.headers));

        let gzipped = response.header("content-encoding") == Some("gzip");
        let chunked = response.header("transfer-encoding") == Some("chunked");
        let content_length = match response.header("content-length") {
            Some(v) => Some(v.trim().parse::<usize>().map_err(|_| {
                error!("Content-Length 无法解析：{}", v);
                Exception::MalformedResponse(format!("content-length {}", v))
            })?),
            None => None,
        };
        let can_have_body = can_have_body && response.code >= 200 && response.code != 204 && response.code != 304;

        let mut raw_body = Vec::new();
        let mut has_body = false;
        if can_have_body && (chunked || content_length != Some(0)) {
            let mut reader = BodyReader {
                socket: &mut *socket,
                chunked,
                to_read: if chunked { None } else { content_length },
                chunk_length: 0,
            };
            while !reader.finished() {
                let data = reader.next()?;
                if reader.should_stop(&data) {
                    break;
                }
                has_body = true;
                if save_body || gzipped {
                    raw_body.extend_from_slice(&data);
                }
                let event = if gzipped {
                    HttpEvent::GzTick(&data)
                } else {
                    HttpEvent::Tick(&data)
                };
                notify(listeners, &event);
            }
        }
        if has_body {
            if gzipped {
                let body = decode_gzip(&raw_body).inspect_err(|e| {
                    error!("gzip 正文解码失败：{}", e);
                })?;
                response.body = Bytes::from(body);
                notify(listeners, &HttpEvent::GotBody(Some(&response.body)));
            } else {
                response.body = Bytes::from(raw_body);
                notify(listeners, &HttpEvent::GotBody(None));
            }
        }
        debug!(
            "响应 {} {}，正文 {} 字节",
            response.code,
            response.reason().unwrap_or_default(),
            response.body.len()
        );
        Ok(response)
    }

    fn parse_status_line(&mut self, line: &str) -> Result<()> {
        let caps = STATUS_LINE.captures(line).ok_or_else(|| {
            error!("状态行格式不正确：{}", line);
            Exception::MalformedResponse(line.to_string())
        })?;
        self.protocol = caps[1].to_string();
        self.code = caps[2]
            .parse()
            .map_err(|_| Exception::MalformedResponse(line.to_string()))?;
        self.reason = caps.get(3).map(|m| m.as_str().to_string()).filter(|r| !r.is_empty());
        Ok(())
    }

    fn process_header(&mut self, line: &str) {
        let Some((name, value)) = line.split_once(':') else {
            return;
        };
        let name = name.to_lowercase();
        let value = value.trim_start();
        if name == "set-cookie" {
            self.cookies.push(Cookie::parse(value));
        } else if let Some(existing) = self.headers.get_mut(&name) {
            existing.push(',');
            existing.push_str(value);
        } else {
            self.headers.insert(name, value.to_string());
        }
    }

    /// 例如 `HTTP/1.1`
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    /// 服务器给出的原因短语；省略时使用标准短语
    pub fn reason(&self) -> Option<&str> {
        self.reason
            .as_deref()
            .or_else(|| STATUS_CODES.get(&self.code).copied())
    }

    /// 按小写名称查询响应头
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// 响应的分帧方式允许复用连接，且服务器没有要求关闭
    pub fn keeps_alive(&self) -> bool {
        let framed = self.header("content-length").is_some()
            || self
                .header("transfer-encoding")
                .is_some_and(|te| te.eq_ignore_ascii_case("chunked"));
        if !framed {
            return false;
        }
        match self.header("connection") {
            Some(connection) => connection.eq_ignore_ascii_case("keep-alive"),
            None => self.protocol == "HTTP/1.1",
        }
    }
}

impl fmt::Display for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} {}", self.protocol, self.code, self.reason().unwrap_or_default())?;
        for (name, value) in &self.headers {
            writeln!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}
