// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 命令行演示
//!
//! - `quickform fetch <url>`：发送一次 GET 请求，打印状态、头部、Cookie 与正文；
//! - `quickform form [query]`：把 `query` 当作 POST 提交给演示表单，校验后输出
//!   完整的 HTML 页面，并用表格列出导出的值。

use std::cell::RefCell;
use std::env;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Instant;

use log::{error, info};

use quickform::config::Config;
use quickform::element::{Checkbox, Header, Password, Radio, Select, Submit, Text, Textarea};
use quickform::exception::Result;
use quickform::form::{ChildRule, Form, Submission};
use quickform::http::{EventLog, HttpRequest, ListenerHandle};
use quickform::table::{CellKind, Table};
use quickform::util::{escape_html, format_file_size, HtmlBuilder};
use quickform::value::Value;

const CONFIG_FILE: &str = "config/development.toml";

fn main() -> ExitCode {
    let config = match Config::from_toml(CONFIG_FILE) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}，使用默认配置", e);
            Config::new()
        }
    };
    if let Err(e) = log4rs::init_file(config.log_config(), Default::default()) {
        eprintln!("无法初始化日志：{}", e);
    }
    info!("配置文件已载入");

    let args: Vec<String> = env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("fetch") => match args.get(1) {
            Some(url) => fetch(url, &config),
            None => {
                usage();
                return ExitCode::FAILURE;
            }
        },
        Some("form") => demo_form(args.get(1).map_or("", String::as_str), &config),
        _ => {
            usage();
            return ExitCode::FAILURE;
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("执行失败：{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn usage() {
    println!("== quickform ==");
    println!("fetch <url>    - 发送 GET 请求并打印响应");
    println!("form [query]   - 以 query 作为提交数据渲染演示表单");
    println!("===============");
}

fn fetch(url: &str, config: &Config) -> Result<()> {
    let start_time = Instant::now();
    let mut request = HttpRequest::new(url, config.http())?;
    let events = Rc::new(RefCell::new(EventLog::new()));
    let handle: ListenerHandle = events.clone();
    request.attach(handle);

    let response = request.send_request(true)?;
    println!("{} {} {}", response.protocol(), response.code(), response.reason().unwrap_or_default());
    for (name, value) in response.headers() {
        println!("{}: {}", name, value);
    }
    for cookie in response.cookies() {
        println!("cookie {}={} path={:?} expires={:?}", cookie.name, cookie.value, cookie.path, cookie.expires);
    }
    println!();
    println!("{}", response.body_text());
    info!(
        "[ID{}]{} 完成，正文 {}，事件 {:?}，用时{}ms",
        request.id(),
        url,
        format_file_size(events.borrow().body_bytes() as u64),
        events.borrow().events(),
        start_time.elapsed().as_millis()
    );
    Ok(())
}

fn demo_form(query: &str, config: &Config) -> Result<()> {
    let submission = Submission {
        post: Submission::parse_query(query),
        ..Submission::default()
    };
    let mut form = Form::builder("signup")
        .options(config.form())
        .action("/signup")
        .submission(submission)
        .build()?;

    form.add_element(Box::new(Header::new("account", "账户")))?;
    form.add_element(Box::new(Text::new("user[name]", "用户名", "size=20")))?;
    form.add_element(Box::new(Text::new("user[email]", "邮箱", "")))?;
    form.add_element(Box::new(Password::new("pass", "密码", "")))?;
    form.add_element(Box::new(Password::new("pass2", "确认密码", "")))?;
    form.add_element(Box::new(Select::new(
        "country",
        "国家",
        &[("", "--"), ("no", "Norway"), ("cn", "China")],
        "",
    )))?;
    form.add_group(
        vec![
            Box::new(Radio::new("plan", "", "免费", "free", "")),
            Box::new(Radio::new("plan", "", "付费", "paid", "")),
        ],
        "plan",
        "套餐",
        Some(" "),
        false,
    )?;
    form.add_group(
        vec![
            Box::new(Text::new("area", "", "size=3")),
            Box::new(Text::new("number", "", "size=8")),
        ],
        "phone",
        "电话",
        Some("-"),
        true,
    )?;
    form.add_element(Box::new(Textarea::new("bio", "简介", "")))?;
    form.add_element(Box::new(Checkbox::new("terms", "", "同意条款", "")))?;
    form.add_element(Box::new(Submit::new("send", "注册", "")))?;

    form.add_rule("user[name]", "请填写用户名", "required", "")?;
    form.add_rule("user[name]", "用户名只能包含字母和数字", "alphanumeric", "")?;
    form.add_rule("user[email]", "邮箱格式不正确", "email", "")?;
    form.add_rule("pass", "密码至少 6 位", "minlength", 6u64)?;
    form.add_dependent_rule(&["pass", "pass2"], "两次密码不一致", "compare", "")?;
    form.add_rule("country", "请选择国家", "required", "")?;
    form.add_group_rule("plan", "请选择套餐", "required", "", 0)?;
    form.add_group_rules(
        "phone",
        vec![
            ("area", vec![ChildRule::new("区号必须是数字", "numeric", "")]),
            ("number", vec![ChildRule::new("请填写号码", "required", "")]),
        ],
    )?;
    form.add_rule("terms", "必须同意条款", "required", "")?;
    form.add_form_rule(|values: &Value, _files: &Value| {
        match values.lookup("user[name]").map(Value::text) {
            Some("admin") => Err([("user[name]".to_string(), "该用户名已被占用".to_string())]
                .into_iter()
                .collect()),
            _ => Ok(()),
        }
    });

    let valid = form.validate()?;
    let mut fragment = String::new();
    if valid {
        form.freeze_all();
        fragment.push_str(&values_table(&form.export_values(None)?)?.to_html());
    }
    fragment.push_str(&form.to_html()?);
    info!("表单 {} 校验结果：{}", form.name(), valid);
    println!("{}", HtmlBuilder::from_fragment("注册", &fragment).build());
    Ok(())
}

/// 把导出的值展开成两列的表格
fn values_table(values: &Value) -> Result<Table> {
    let mut table = Table::new("border=1 cellpadding=4");
    table.set_caption("提交内容", "");
    table.add_row(&["字段", "值"], "", CellKind::Header)?;
    let mut rows = Vec::new();
    flatten(String::new(), values, &mut rows);
    for (name, value) in rows {
        table.add_row(&[&escape_html(&name), &escape_html(&value)], "", CellKind::Data)?;
    }
    table.alt_row_attributes(1, &"class=odd".into(), &"class=even".into(), true)?;
    Ok(table)
}

fn flatten(prefix: String, value: &Value, rows: &mut Vec<(String, String)>) {
    match value.as_map() {
        Some(map) => {
            for (key, item) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}[{}]", prefix, key)
                };
                flatten(name, item, rows);
            }
        }
        None => rows.push((prefix, value.text().to_string())),
    }
}
