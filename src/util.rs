// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// 与 `application/x-www-form-urlencoded` 一致：除字母数字与 `-_.` 外全部编码
const URLENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// RFC 3986 的非保留字符不编码
const RAWURLENCODE_SET: &AsciiSet = &URLENCODE_SET.remove(b'~');

/// 按兼容实体方案转义 HTML：只处理 `& < > "`，单引号保持原样。
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// `escape_html` 的逆操作，额外识别 `&#039;`。
pub fn unescape_html(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

/// 表单式 URL 编码，空格编码为 `+`。
pub fn urlencode(value: &str) -> String {
    utf8_percent_encode(value, URLENCODE_SET)
        .to_string()
        .replace("%20", "+")
}

/// RFC 3986 百分号编码，空格编码为 `%20`。
pub fn rawurlencode(value: &str) -> String {
    utf8_percent_encode(value, RAWURLENCODE_SET).to_string()
}

/// `urlencode` 的逆操作；非法的百分号序列按原样保留。
pub fn urldecode(value: &str) -> String {
    let plus_decoded = value.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// 将换行转为 `<br />`，用于冻结状态下的多行文本。
pub fn nl2br(value: &str) -> String {
    value.replace("\r\n", "\n").replace('\n', "<br />\n")
}

/// 将渲染好的 HTML 片段包装成完整页面。
pub struct HtmlBuilder {
    title: String,
    css: String,
    body: String,
}

impl HtmlBuilder {
    pub fn from_fragment(title: &str, fragment: &str) -> Self {
        let css = r"
            body {
                width: 45em;
                margin: 0 auto;
                font-family: Tahoma, Verdana, Arial, sans-serif;
            }
            "
        .to_string();
        Self {
            title: escape_html(title),
            css,
            body: fragment.to_string(),
        }
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        <title>{}</title>
        <style>{}</style>
    </head>
    <body>
    {}
    </body>
</html>"##,
            self.title, self.css, self.body
        )
    }
}

pub fn format_file_size(size: u64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < units.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.1} {}", size, units[unit_index])
}
