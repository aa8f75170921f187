// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 阻塞式套接字抽象。
//!
//! [`Socket`] 提供按行与按字节的读写，[`Connector`] 负责建立连接。
//! `TcpSocket` 基于 `std::net::TcpStream`，`MemorySocket` 从内存缓冲区读取，
//! 便于离线解析一段已经捕获的响应。

use std::io::{BufRead, BufReader, Cursor, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, error};

use crate::exception::{Exception, Result};

#[cfg_attr(test, mockall::automock)]
pub trait Socket {
    /// 最多读取 `size` 字节；返回空向量表示对端已关闭
    fn read(&mut self, size: usize) -> Result<Vec<u8>>;
    /// 读取一行，去掉行尾的 CRLF 或 LF
    fn read_line(&mut self) -> Result<String>;
    fn write(&mut self, data: &[u8]) -> Result<()>;
    fn eof(&self) -> bool;
    fn disconnect(&mut self);
    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
pub trait Connector {
    fn connect(&self, host: &str, port: u16, timeout: Option<Duration>) -> Result<Box<dyn Socket>>;
}

fn strip_line_ending(mut line: Vec<u8>) -> String {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    String::from_utf8_lossy(&line).into_owned()
}

/// TCP 连接
pub struct TcpSocket {
    reader: BufReader<TcpStream>,
    eof: bool,
}

impl TcpSocket {
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<Self> {
        let stream = match timeout {
            None => TcpStream::connect((host, port))?,
            Some(timeout) => {
                let addr = (host, port)
                    .to_socket_addrs()?
                    .next()
                    .ok_or_else(|| Exception::InvalidUrl(format!("{}:{}", host, port)))?;
                TcpStream::connect_timeout(&addr, timeout)?
            }
        };
        debug!("已连接到 {}:{}", host, port);
        Ok(Self {
            reader: BufReader::new(stream),
            eof: false,
        })
    }
}

impl Socket for TcpSocket {
    fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; size];
        let n = self.reader.read(&mut buf)?;
        if n == 0 && size > 0 {
            self.eof = true;
        }
        buf.truncate(n);
        Ok(buf)
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line)? == 0 {
            self.eof = true;
        }
        Ok(strip_line_ending(line))
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data)?;
        stream.flush()?;
        Ok(())
    }

    fn eof(&self) -> bool {
        self.eof
    }

    fn disconnect(&mut self) {
        if let Err(e) = self.reader.get_ref().shutdown(Shutdown::Both) {
            error!("关闭连接失败：{}", e);
        }
        self.eof = true;
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }
}

/// 使用 [`TcpSocket`] 的连接器
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, host: &str, port: u16, timeout: Option<Duration>) -> Result<Box<dyn Socket>> {
        Ok(Box::new(TcpSocket::connect(host, port, timeout)?))
    }
}

/// 从内存读取、向内存写入的套接字
#[derive(Debug, Clone, Default)]
pub struct MemorySocket {
    input: Cursor<Vec<u8>>,
    written: Vec<u8>,
    closed: bool,
}

impl MemorySocket {
    pub fn new(input: impl Into<Vec<u8>>) -> Self {
        Self {
            input: Cursor::new(input.into()),
            ..Self::default()
        }
    }

    /// 已写入的全部数据
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Socket for MemorySocket {
    fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; size];
        let n = self.input.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();
        self.input.read_until(b'\n', &mut line)?;
        Ok(strip_line_ending(line))
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.written.extend_from_slice(data);
        Ok(())
    }

    fn eof(&self) -> bool {
        self.input.position() as usize >= self.input.get_ref().len()
    }

    fn disconnect(&mut self) {
        self.closed = true;
    }

    fn set_timeout(&mut self, _timeout: Option<Duration>) -> Result<()> {
        Ok(())
    }
}
