// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 客户端
//!
//! 阻塞式 HTTP/1.0、HTTP/1.1 客户端：请求组装、长连接池、分块与 gzip 正文
//! 解析、Cookie 解析以及请求过程中的事件通知。

pub mod gzip;
pub mod listener;
pub mod pool;
pub mod request;
pub mod response;
pub mod socket;

pub use gzip::decode_gzip;
pub use listener::{EventLog, HttpEvent, Listener, ListenerHandle};
pub use request::HttpRequest;
pub use response::{Cookie, HttpResponse};
pub use socket::{Connector, MemorySocket, Socket, TcpConnector, TcpSocket};
