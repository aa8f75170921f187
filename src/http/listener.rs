// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 请求与响应过程中的事件通知。

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpEvent<'a> {
    /// 开始建立新连接
    Connect,
    SentRequest,
    Disconnect,
    GotHeaders(&'a IndexMap<String, String>),
    /// 读到一段未压缩的正文
    Tick(&'a [u8]),
    /// 读到一段 gzip 压缩的正文
    GzTick(&'a [u8]),
    /// 正文读取完毕；gzip 正文附带解压后的内容
    GotBody(Option<&'a [u8]>),
}

impl HttpEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            HttpEvent::Connect => "connect",
            HttpEvent::SentRequest => "sentRequest",
            HttpEvent::Disconnect => "disconnect",
            HttpEvent::GotHeaders(_) => "gotHeaders",
            HttpEvent::Tick(_) => "tick",
            HttpEvent::GzTick(_) => "gzTick",
            HttpEvent::GotBody(_) => "gotBody",
        }
    }
}

pub trait Listener {
    fn update(&mut self, event: &HttpEvent<'_>);
}

pub type ListenerHandle = Rc<RefCell<dyn Listener>>;

pub(crate) fn notify(listeners: &[ListenerHandle], event: &HttpEvent<'_>) {
    for listener in listeners {
        listener.borrow_mut().update(event);
    }
}

/// 记录事件名称与正文字节数的监听器
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<&'static str>,
    body_bytes: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[&'static str] {
        &self.events
    }

    /// 经由 tick/gzTick 收到的字节数
    pub fn body_bytes(&self) -> usize {
        self.body_bytes
    }
}

impl Listener for EventLog {
    fn update(&mut self, event: &HttpEvent<'_>) {
        if let HttpEvent::Tick(data) | HttpEvent::GzTick(data) = event {
            self.body_bytes += data.len();
        }
        self.events.push(event.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_counts_body() {
        let log = Rc::new(RefCell::new(EventLog::new()));
        let handle: ListenerHandle = log.clone();
        let handles = vec![handle];
        notify(&handles, &HttpEvent::Connect);
        notify(&handles, &HttpEvent::Tick(b"abc"));
        notify(&handles, &HttpEvent::GzTick(b"de"));
        notify(&handles, &HttpEvent::GotBody(None));
        assert_eq!(log.borrow().events(), &["connect", "tick", "gzTick", "gotBody"]);
        assert_eq!(log.borrow().body_bytes(), 5);
    }
}
