use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use quickform::config::RequestOptions;
use quickform::exception::Exception;
use quickform::http::{pool, EventLog, HttpRequest, ListenerHandle};
use quickform::param::HttpMethod;

/// 服务端记录下的请求
#[derive(Debug, Default)]
struct Seen {
    requests: Vec<String>,
    connections: usize,
}

/// 启动一个按顺序返回预设响应的服务端。响应中带 `Connection: close` 时服务端
/// 在发送后关闭连接，否则继续在同一连接上等待下一个请求。
async fn mock_server(responses: Vec<Vec<u8>>) -> (u16, Arc<Mutex<Seen>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let seen = Arc::new(Mutex::new(Seen::default()));
    let queue = Arc::new(Mutex::new(responses.into_iter().rev().collect::<Vec<_>>()));

    let seen_task = Arc::clone(&seen);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            seen_task.lock().unwrap().connections += 1;
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            loop {
                let Some(request) = read_request(&mut reader).await else {
                    break;
                };
                seen_task.lock().unwrap().requests.push(request);
                let Some(response) = queue.lock().unwrap().pop() else {
                    break;
                };
                if write_half.write_all(&response).await.is_err() {
                    break;
                }
                let _ = write_half.flush().await;
                if String::from_utf8_lossy(&response).contains("Connection: close\r\n") {
                    break;
                }
            }
        }
    });
    (port, seen)
}

async fn read_request(reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>) -> Option<String> {
    let mut head = String::new();
    let mut content_length = 0;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
        head.push_str(&line);
        if line == "\r\n" {
            break;
        }
    }
    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).await.ok()?;
    head.push_str(&String::from_utf8_lossy(&body));
    Some(head)
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// 把正文切成若干块，按分块编码输出
fn chunked(data: &[u8], size: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(size) {
        out.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        out.extend_from_slice(chunk);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}

fn options(toml_text: &str) -> RequestOptions {
    toml::from_str(toml_text).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chunked_gzip_response() {
    let text = "<html>".to_string() + &"hello quickform ".repeat(200) + "</html>";
    let mut response =
        b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Encoding: gzip\r\nTransfer-Encoding: chunked\r\nSet-Cookie: sid=abc; path=/; HttpOnly\r\nConnection: close\r\n\r\n"
            .to_vec();
    response.extend_from_slice(&chunked(&gzip(text.as_bytes()), 64));
    let (port, seen) = mock_server(vec![response]).await;

    let (body, events, cookie) = tokio::task::spawn_blocking(move || {
        let mut request = HttpRequest::new(&format!("http://127.0.0.1:{}/page?x=1", port), &RequestOptions::default()).unwrap();
        let log = Rc::new(RefCell::new(EventLog::new()));
        let handle: ListenerHandle = log.clone();
        request.attach(handle);
        let response = request.send_request(true).unwrap();
        let cookie = response.cookies()[0].clone();
        let body = response.body_text();
        let events: Vec<String> = log.borrow().events().iter().map(|e| e.to_string()).collect();
        (body, events, cookie)
    })
    .await
    .unwrap();

    assert_eq!(body, text);
    assert_eq!(cookie.name, "sid");
    assert_eq!(cookie.path.as_deref(), Some("/"));
    assert_eq!(events.first().map(String::as_str), Some("connect"));
    assert!(events.iter().any(|e| e == "gzTick"));
    assert!(events.iter().all(|e| e != "tick"));
    assert_eq!(events.last().map(String::as_str), Some("disconnect"));

    let seen = seen.lock().unwrap();
    assert!(seen.requests[0].starts_with("GET /page?x=1 HTTP/1.1\r\n"));
    assert!(seen.requests[0].contains(&format!("Host: 127.0.0.1:{}\r\n", port)));
    assert!(seen.requests[0].contains("Accept-Encoding: gzip\r\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_post_and_follow_see_other() {
    let (port, seen) = mock_server(vec![
        b"HTTP/1.1 303 See Other\r\nLocation: /thanks\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec(),
        b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\nConnection: close\r\n\r\nthanks".to_vec(),
    ])
    .await;

    let body = tokio::task::spawn_blocking(move || {
        let mut request =
            HttpRequest::new(&format!("http://127.0.0.1:{}/submit", port), &options("allow_redirects = true")).unwrap();
        request.set_method(HttpMethod::Post);
        request.add_post_data("name", "Ada Lovelace", false);
        request.add_post_data("langs", quickform::Value::list(["en", "fr"]), false);
        request.send_request(true).unwrap().body_text()
    })
    .await
    .unwrap();

    assert_eq!(body, "thanks");
    let seen = seen.lock().unwrap();
    assert_eq!(seen.connections, 2);
    assert!(seen.requests[0].starts_with("POST /submit HTTP/1.1\r\n"));
    assert!(seen.requests[0].contains("Content-Type: application/x-www-form-urlencoded\r\n"));
    assert!(seen.requests[0].ends_with("\r\n\r\nname=Ada+Lovelace&langs[0]=en&langs[1]=fr"));
    assert!(seen.requests[1].starts_with("GET /thanks HTTP/1.1\r\n"));
    assert!(!seen.requests[1].contains("Content-Length"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_redirect_limit() {
    let hop = b"HTTP/1.1 302 Found\r\nLocation: /loop\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec();
    let (port, _seen) = mock_server(vec![hop.clone(), hop.clone(), hop]).await;

    let err = tokio::task::spawn_blocking(move || {
        let mut request = HttpRequest::new(
            &format!("http://127.0.0.1:{}/loop", port),
            &options("allow_redirects = true\nmax_redirects = 2"),
        )
        .unwrap();
        request.send_request(true).unwrap_err()
    })
    .await
    .unwrap();
    assert_eq!(err, Exception::TooManyRedirects(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_keep_alive_reuses_connection() {
    let reply = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec();
    let (port, seen) = mock_server(vec![reply.clone(), reply]).await;

    let bodies = tokio::task::spawn_blocking(move || {
        pool::clear();
        let mut request = HttpRequest::new(&format!("http://127.0.0.1:{}/", port), &RequestOptions::default()).unwrap();
        request.add_header("Connection", "keep-alive");
        let first = request.send_request(true).unwrap().body_text();
        let idle = pool::idle_count();
        let second = request.send_request(true).unwrap().body_text();
        pool::clear();
        (first, idle, second)
    })
    .await
    .unwrap();

    assert_eq!(bodies, ("ok".to_string(), 1, "ok".to_string()));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.connections, 1);
    assert_eq!(seen.requests.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_head_has_no_body() {
    let (port, _seen) =
        mock_server(vec![b"HTTP/1.1 200 OK\r\nContent-Length: 1234\r\nConnection: close\r\n\r\n".to_vec()]).await;

    let (code, length, body_len) = tokio::task::spawn_blocking(move || {
        let mut request = HttpRequest::new(&format!("http://127.0.0.1:{}/", port), &RequestOptions::default()).unwrap();
        request.set_method(HttpMethod::Head);
        let response = request.send_request(true).unwrap();
        (
            response.code(),
            response.header("content-length").map(str::to_string),
            response.body().len(),
        )
    })
    .await
    .unwrap();
    assert_eq!(code, 200);
    assert_eq!(length.as_deref(), Some("1234"));
    assert_eq!(body_len, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let err = tokio::task::spawn_blocking(move || {
        let mut request = HttpRequest::new(&format!("http://127.0.0.1:{}/", port), &RequestOptions::default()).unwrap();
        request.send_request(true).unwrap_err()
    })
    .await
    .unwrap();
    assert!(matches!(err, Exception::Io(..)));
}
