// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 线程内的长连接池。
//!
//! 以 `host:port` 为键保存仍然可用的连接，容量受限，超出时按 LRU 淘汰并断开
//! 最久未用的连接。连接池是线程局部的，不在线程之间共享套接字。

use std::cell::RefCell;
use std::num::NonZeroUsize;

use log::debug;
use lru::LruCache;

use crate::http::socket::Socket;

const DEFAULT_CAPACITY: usize = 5;

pub struct SocketPool {
    sockets: LruCache<String, Box<dyn Socket>>,
}

impl SocketPool {
    // 容量为 0 时按 1 处理
    pub fn from_capacity(capacity: usize) -> Self {
        Self {
            sockets: LruCache::new(NonZeroUsize::MIN.saturating_add(capacity.saturating_sub(1))),
        }
    }

    /// 取出连接；取出后连接不再属于连接池
    pub fn take(&mut self, key: &str) -> Option<Box<dyn Socket>> {
        self.sockets.pop(key)
    }

    // 放回，被挤出的连接直接断开
    pub fn put(&mut self, key: &str, socket: Box<dyn Socket>) {
        if let Some((evicted_key, mut evicted)) = self.sockets.push(key.to_string(), socket) {
            if evicted_key != key {
                debug!("连接池已满，断开 {}", evicted_key);
            }
            evicted.disconnect();
        }
    }

    pub fn resize(&mut self, capacity: usize) {
        let capacity = NonZeroUsize::MIN.saturating_add(capacity.saturating_sub(1));
        if capacity != self.sockets.cap() {
            self.sockets.resize(capacity);
        }
    }

    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.sockets.cap().get()
    }

    pub fn clear(&mut self) {
        while let Some((_, mut socket)) = self.sockets.pop_lru() {
            socket.disconnect();
        }
    }
}

thread_local! {
    static POOL: RefCell<SocketPool> = RefCell::new(SocketPool::from_capacity(DEFAULT_CAPACITY));
}

/// 从当前线程的连接池取出连接
pub fn checkout(key: &str) -> Option<Box<dyn Socket>> {
    POOL.with(|pool| pool.borrow_mut().take(key)).inspect(|_| {
        debug!("复用 {} 的长连接", key);
    })
}

/// 把连接放回当前线程的连接池
pub fn checkin(key: &str, socket: Box<dyn Socket>, capacity: usize) {
    POOL.with(|pool| {
        let mut pool = pool.borrow_mut();
        pool.resize(capacity);
        pool.put(key, socket);
    });
}

/// 当前线程保留的连接数
pub fn idle_count() -> usize {
    POOL.with(|pool| pool.borrow().len())
}

/// 断开并清空当前线程的全部连接
pub fn clear() {
    POOL.with(|pool| pool.borrow_mut().clear());
}
