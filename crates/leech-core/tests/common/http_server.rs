//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves one static body for any path. HEAD answers with the headers a GET
//! would send. Every response closes the connection, so a body sent without
//! `Content-Length` ends at EOF.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// If false, neither HEAD nor GET carry `Content-Length`.
    pub advertise_length: bool,
    /// If false, HEAD returns 405 (servers that block HEAD).
    pub head_allowed: bool,
    /// Body is written in chunks of this size...
    pub chunk_size: usize,
    /// ...with this pause after each chunk.
    pub chunk_delay: Option<Duration>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            advertise_length: true,
            head_allowed: true,
            chunk_size: 64 * 1024,
            chunk_delay: None,
        }
    }
}

/// Serve `body` on a background thread; returns `http://127.0.0.1:<port>/<name>`.
/// The server runs until the process exits.
pub fn start(name: &str, body: Vec<u8>) -> String {
    start_with_options(name, body, ServerOptions::default())
}

pub fn start_with_options(name: &str, body: Vec<u8>, opts: ServerOptions) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            thread::spawn(move || handle(stream, &body, opts));
        }
    });
    format!("http://127.0.0.1:{}/{}", port, name)
}

fn handle(mut stream: std::net::TcpStream, body: &[u8], opts: ServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let method = request.split_whitespace().next().unwrap_or("");

    let length = if opts.advertise_length {
        format!("Content-Length: {}\r\n", body.len())
    } else {
        String::new()
    };
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n{}Connection: close\r\n\r\n",
        length
    );

    if method.eq_ignore_ascii_case("HEAD") {
        if !opts.head_allowed {
            let _ = stream.write_all(
                b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
            return;
        }
        let _ = stream.write_all(head.as_bytes());
        return;
    }
    if method.eq_ignore_ascii_case("GET") {
        if stream.write_all(head.as_bytes()).is_err() {
            return;
        }
        for chunk in body.chunks(opts.chunk_size.max(1)) {
            if stream.write_all(chunk).is_err() {
                return;
            }
            if let Some(delay) = opts.chunk_delay {
                let _ = stream.flush();
                thread::sleep(delay);
            }
        }
        let _ = stream.flush();
        return;
    }
    let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
}
