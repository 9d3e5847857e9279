//! Minimal HTTP/1.1 object server for integration tests.
//!
//! Serves a fixed set of objects by path (query strings are ignored), answers
//! `Range: bytes=N-` with 206 Partial Content and records the `Host` and
//! `Range` headers of every request. Unknown paths get 404.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Paths whose responses announce the full length but stop halfway.
    pub truncate: HashSet<String>,
    /// If true, GET ignores Range and always returns 200 with the full body.
    pub ignore_ranges: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub path: String,
    pub host: Option<String>,
    pub range: Option<String>,
}

pub struct ObjectServer {
    port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ObjectServer {
    /// Serve `objects` (path such as `/a/b.txt`, body) until the process exits.
    pub fn start(objects: Vec<(&str, Vec<u8>)>) -> Self {
        Self::start_with_options(objects, ServerOptions::default())
    }

    pub fn start_with_options(objects: Vec<(&str, Vec<u8>)>, opts: ServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let objects: Arc<HashMap<String, Vec<u8>>> = Arc::new(
            objects
                .into_iter()
                .map(|(path, body)| (path.to_string(), body))
                .collect(),
        );
        let opts = Arc::new(opts);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let objects = Arc::clone(&objects);
                let opts = Arc::clone(&opts);
                let log = Arc::clone(&log);
                thread::spawn(move || handle(stream, &objects, &opts, &log));
            }
        });
        ObjectServer { port, requests }
    }

    /// `127.0.0.1:<port>`.
    pub fn host(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// `http://127.0.0.1:<port>`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.host())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut head = Vec::new();
    let mut buf = [0u8; 4096];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return None,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
        if head.len() > 64 * 1024 {
            return None;
        }
    }
    String::from_utf8(head).ok()
}

fn parse_request(head: &str) -> Option<RecordedRequest> {
    let mut lines = head.lines();
    let request_line = lines.next()?;
    let target = request_line.split_whitespace().nth(1)?;
    let path = target.split('?').next().unwrap_or(target).to_string();
    let mut host = None;
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim().to_string();
            if name.trim().eq_ignore_ascii_case("host") {
                host = Some(value);
            } else if name.trim().eq_ignore_ascii_case("range") {
                range = Some(value);
            }
        }
    }
    Some(RecordedRequest { path, host, range })
}

/// Start offset of `bytes=N-`.
fn range_start(range: &str) -> Option<u64> {
    let spec = range.trim().strip_prefix("bytes=")?;
    let (start, _) = spec.split_once('-')?;
    start.trim().parse().ok()
}

fn handle(
    mut stream: TcpStream,
    objects: &HashMap<String, Vec<u8>>,
    opts: &ServerOptions,
    log: &Mutex<Vec<RecordedRequest>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(head) = read_head(&mut stream) else {
        return;
    };
    let Some(request) = parse_request(&head) else {
        return;
    };
    log.lock().unwrap().push(request.clone());

    let Some(body) = objects.get(&request.path) else {
        let _ = stream.write_all(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        );
        return;
    };
    let total = body.len() as u64;
    let start = if opts.ignore_ranges {
        None
    } else {
        request.range.as_deref().and_then(range_start)
    };
    let (status, content_range, slice) = match start {
        Some(start) if start >= total => {
            let response = format!(
                "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                total
            );
            let _ = stream.write_all(response.as_bytes());
            return;
        }
        Some(start) => (
            "206 Partial Content",
            format!(
                "Content-Range: bytes {}-{}/{}\r\n",
                start,
                total.saturating_sub(1),
                total
            ),
            &body[start as usize..],
        ),
        None => ("200 OK", String::new(), &body[..]),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}Accept-Ranges: bytes\r\nConnection: close\r\n\r\n",
        status,
        slice.len(),
        content_range
    );
    let _ = stream.write_all(response.as_bytes());
    if opts.truncate.contains(&request.path) {
        let _ = stream.write_all(&slice[..slice.len() / 2]);
        let _ = stream.flush();
        return;
    }
    let _ = stream.write_all(slice);
}
