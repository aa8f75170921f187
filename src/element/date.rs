// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 日期/时间选择：按格式串生成一组下拉列表。
//!
//! 格式字符 `d D l m M F Y y H h g i s a A W` 各自对应一个下拉列表，
//! 反斜杠转义下一个字符，其他字符原样作为列表之间的分隔文字。

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use log::debug;

use crate::common::Attributes;
use crate::element::{Element, ElementArgs, ElementBase, FormContext, Group, Select};
use crate::exception::Result;
use crate::renderer::Renderer;
use crate::value::Value;

const WEEKDAYS_SHORT: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const WEEKDAYS_LONG: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];
const MONTHS_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const MONTHS_LONG: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// 日期元素的生成选项
#[derive(Debug, Clone, PartialEq)]
pub struct DateOptions {
    pub format: String,
    pub min_year: i32,
    pub max_year: i32,
    pub add_empty_option: bool,
    pub empty_option_value: String,
    pub empty_option_text: String,
    pub minute_step: usize,
    pub second_step: usize,
}

impl Default for DateOptions {
    fn default() -> Self {
        Self {
            format: "dMY".to_string(),
            min_year: 2001,
            max_year: Utc::now().year(),
            add_empty_option: false,
            empty_option_value: String::new(),
            empty_option_text: "&nbsp;".to_string(),
            minute_step: 1,
            second_step: 1,
        }
    }
}

impl DateOptions {
    /// 从映射读取选项，缺失的键保持默认值
    pub fn from_value(value: &Value) -> Self {
        let mut options = Self::default();
        let get = |key: &str| value.lookup(key).map(|v| v.text().to_string());
        if let Some(format) = get("format") {
            options.format = format;
        }
        if let Some(y) = get("min_year").and_then(|v| v.parse().ok()) {
            options.min_year = y;
        }
        if let Some(y) = get("max_year").and_then(|v| v.parse().ok()) {
            options.max_year = y;
        }
        if let Some(flag) = value.lookup("add_empty_option") {
            options.add_empty_option = flag.is_truthy();
        }
        if let Some(v) = get("empty_option_value") {
            options.empty_option_value = v;
        }
        if let Some(v) = get("empty_option_text") {
            options.empty_option_text = v;
        }
        if let Some(step) = get("minute_step").and_then(|v| v.parse().ok()) {
            options.minute_step = step;
        }
        if let Some(step) = get("second_step").and_then(|v| v.parse().ok()) {
            options.second_step = step;
        }
        options
    }
}

fn numbered(range: impl Iterator<Item = usize>, pad: bool) -> Vec<(String, String)> {
    range
        .map(|n| {
            let text = if pad { format!("{:02}", n) } else { n.to_string() };
            (n.to_string(), text)
        })
        .collect()
}

fn named(names: &[&str], first: usize) -> Vec<(String, String)> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| ((i + first).to_string(), n.to_string()))
        .collect()
}

fn years(options: &DateOptions, two_digit: bool) -> Vec<(String, String)> {
    let list: Vec<i32> = if options.min_year <= options.max_year {
        (options.min_year..=options.max_year).collect()
    } else {
        (options.max_year..=options.min_year).rev().collect()
    };
    list.into_iter()
        .map(|y| {
            let text = if two_digit {
                format!("{:02}", y.rem_euclid(100))
            } else {
                y.to_string()
            };
            (y.to_string(), text)
        })
        .collect()
}

fn options_for(sign: char, options: &DateOptions) -> Option<Vec<(String, String)>> {
    let list = match sign {
        'D' => named(&WEEKDAYS_SHORT, 0),
        'l' => named(&WEEKDAYS_LONG, 0),
        'd' => numbered(1..=31, true),
        'M' => named(&MONTHS_SHORT, 1),
        'm' => numbered(1..=12, true),
        'F' => named(&MONTHS_LONG, 1),
        'Y' => years(options, false),
        'y' => years(options, true),
        'h' => numbered(1..=12, true),
        'g' => numbered(1..=12, false),
        'H' => numbered(0..=23, true),
        'i' => numbered((0..60).step_by(options.minute_step.max(1)), true),
        's' => numbered((0..60).step_by(options.second_step.max(1)), true),
        'a' => vec![("am".into(), "am".into()), ("pm".into(), "pm".into())],
        'A' => vec![("AM".into(), "AM".into()), ("PM".into(), "PM".into())],
        'W' => numbered(1..=53, false),
        _ => return None,
    };
    Some(list)
}

/// 去掉数字前导零，使其与选项值一致
fn trim_leading_zeros(value: &str) -> String {
    if value.len() > 1 && value.chars().all(|c| c.is_ascii_digit()) {
        let trimmed = value.trim_start_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        value.to_string()
    }
}

/// 把时间戳拆成各格式字符对应的值
fn timestamp_components(ts: DateTime<Utc>) -> Value {
    let weekday = ts.weekday().num_days_from_sunday().to_string();
    let hour12 = match ts.hour() % 12 {
        0 => 12,
        h => h,
    };
    let (am, big_am) = if ts.hour() < 12 { ("am", "AM") } else { ("pm", "PM") };
    Value::map([
        ("D", weekday.clone()),
        ("l", weekday),
        ("d", ts.day().to_string()),
        ("M", ts.month().to_string()),
        ("m", ts.month().to_string()),
        ("F", ts.month().to_string()),
        ("Y", ts.year().to_string()),
        ("y", ts.year().to_string()),
        ("h", hour12.to_string()),
        ("g", hour12.to_string()),
        ("H", ts.hour().to_string()),
        ("i", ts.minute().to_string()),
        ("s", ts.second().to_string()),
        ("a", am.to_string()),
        ("A", big_am.to_string()),
        ("W", ts.iso_week().week().to_string()),
    ])
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(secs) = text.trim().parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// 日期选择组
#[derive(Debug, Clone, Default)]
pub struct Date {
    group: Group,
    options: DateOptions,
    wrap: (String, String),
}

impl Date {
    pub fn new(name: &str, label: &str, options: DateOptions, attributes: impl Into<Attributes>) -> Self {
        let mut date = Self {
            group: Group::new(name, label, Vec::new(), None, true),
            options,
            wrap: (String::new(), String::new()),
        };
        date.group.base.attributes = attributes.into();
        date.group.base.set_name(name);
        date.create_selects();
        date
    }

    pub fn options(&self) -> &DateOptions {
        &self.options
    }

    fn create_selects(&mut self) {
        let attributes = self.group.base.attributes.clone();
        let mut children: Vec<Box<dyn Element>> = Vec::new();
        let mut separators = Vec::new();
        let mut pending = String::new();
        let mut escaped = false;
        let mut leading = None;
        for sign in self.options.format.chars() {
            if escaped {
                escaped = false;
                pending.push(sign);
                continue;
            }
            if sign == '\\' {
                escaped = true;
                continue;
            }
            let Some(mut list) = options_for(sign, &self.options) else {
                if sign == ' ' {
                    pending.push_str("&nbsp;");
                } else {
                    pending.push(sign);
                }
                continue;
            };
            if children.is_empty() {
                leading = Some(std::mem::take(&mut pending));
            } else {
                separators.push(std::mem::take(&mut pending));
            }
            if self.options.add_empty_option {
                list.insert(
                    0,
                    (
                        self.options.empty_option_value.clone(),
                        self.options.empty_option_text.clone(),
                    ),
                );
            }
            let select = Select::new(&sign.to_string(), "", &list, attributes.clone());
            children.push(Box::new(select));
        }
        if escaped {
            pending.push('\\');
        }
        debug!("日期元素 {} 生成 {} 个下拉列表", self.group.name(), children.len());
        self.wrap = (leading.unwrap_or_default(), pending);
        self.group.set_children(children);
        self.group.set_separators(separators);
    }
}

impl Element for Date {
    fn base(&self) -> &ElementBase {
        &self.group.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.group.base
    }

    fn element_type(&self) -> &'static str {
        "date"
    }

    /// 位置参数：名称、标签、选项（格式串或选项映射）、属性
    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        let options = match args.value(2) {
            Some(Value::Str(format)) => DateOptions {
                format,
                ..DateOptions::default()
            },
            Some(map @ Value::Map(_)) => DateOptions::from_value(&map),
            _ => DateOptions::default(),
        };
        *self = Date::new(&args.text_or(0, ""), "", options, args.attrs(3));
        self.group.base.labels = args.labels(1);
        Ok(())
    }

    fn value(&self) -> Option<Value> {
        self.group.value()
    }

    /// 接受各格式字符到值的映射、Unix 时间戳或日期字符串
    fn set_value(&mut self, value: &Value) {
        let components = match value {
            Value::Str(s) if s.is_empty() => Value::empty(),
            Value::Str(s) => match parse_datetime(s) {
                Some(ts) => timestamp_components(ts),
                None => return,
            },
            Value::Map(_) => value.map_strings(&trim_leading_zeros),
            Value::File(_) => return,
        };
        self.group.set_value(&components);
    }

    fn editable_html(&self) -> String {
        format!("{}{}{}", self.wrap.0, self.group.editable_html(), self.wrap.1)
    }

    fn frozen_html(&self) -> String {
        self.editable_html()
    }

    fn freeze(&mut self) -> bool {
        self.group.freeze()
    }

    fn unfreeze(&mut self) {
        self.group.unfreeze();
    }

    fn set_persistent_freeze(&mut self, persist: bool) {
        self.group.set_persistent_freeze(persist);
    }

    fn update_value(&mut self, ctx: &FormContext) -> Result<()> {
        if let Some(value) = ctx.standard_value(self.name()) {
            self.set_value(&value);
        }
        Ok(())
    }

    fn export_value(&mut self, submitted: &Value, assoc: bool) -> Result<Option<Value>> {
        self.group.export_value(submitted, assoc)
    }

    fn accept(&mut self, renderer: &mut dyn Renderer, required: bool, error: Option<&str>) -> Result<()> {
        renderer.render_element(&*self, required, error);
        Ok(())
    }

    fn as_group(&self) -> Option<&Group> {
        Some(&self.group)
    }

    fn as_group_mut(&mut self) -> Option<&mut Group> {
        Some(&mut self.group)
    }
}
