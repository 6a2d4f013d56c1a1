//! Shared test infrastructure for integration tests.
//!
//! `FixtureServer` is a single-threaded HTTP/1.1 responder on a loopback port.
//! It serves one request per connection and records every request it saw.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::thread;

/// A request as seen by the fixture server.
#[derive(Debug, Clone)]
pub struct Request {
    pub path: String,
    pub params: Vec<(String, String)>,
    pub user_agent: Option<String>,
}

impl Request {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Canned response.
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            status: 200,
            body: value.to_string(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: r#"{"error":"fixture"}"#.to_string(),
        }
    }
}

pub struct FixtureServer {
    pub base: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl FixtureServer {
    /// Start serving; `handler` receives the server base URL and the request.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &Request) -> Reply + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fixture server");
        let addr = listener.local_addr().expect("fixture server address");
        let base = format!("http://{addr}");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let thread_base = base.clone();
        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else {
                    continue;
                };
                let _ = serve(stream, &thread_base, &handler, &log);
            }
        });

        Self { base, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().expect("request log").clone()
    }
}

fn serve<F>(
    mut stream: TcpStream,
    base: &str,
    handler: &F,
    log: &Mutex<Vec<Request>>,
) -> std::io::Result<()>
where
    F: Fn(&str, &Request) -> Reply,
{
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let target = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();

    let mut user_agent = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("user-agent") {
                user_agent = Some(value.trim().to_string());
            }
        }
    }

    let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));
    let request = Request {
        path: path.to_string(),
        params: url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect(),
        user_agent,
    };
    let reply = handler(base, &request);
    log.lock().expect("request log").push(request);

    let reason = if reply.status < 400 { "OK" } else { "Error" };
    write!(
        stream,
        "HTTP/1.1 {} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reply.body.len(),
        reply.body
    )?;
    stream.flush()
}

/// Service index advertising a search endpoint on `base`.
pub fn service_index(base: &str) -> serde_json::Value {
    serde_json::json!({
        "version": "3.0.0",
        "resources": [
            { "@id": format!("{base}/registration/"), "@type": "RegistrationsBaseUrl/3.6.0" },
            { "@id": format!("{base}/query"), "@type": ["SearchQueryService", "SearchQueryService/3.0.0-rc"] }
        ]
    })
}

/// Run `ntrends` in `dir` with proxy settings cleared.
pub fn run_ntrends(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ntrends"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy")
        .env_remove("HTTPS_PROXY")
        .env_remove("https_proxy")
        .env_remove("ALL_PROXY")
        .env_remove("all_proxy")
        .output()
        .expect("run ntrends")
}

/// Write `ntrends.json` pointing at the fixture server.
pub fn write_config(dir: &Path, server: &FixtureServer, extra: serde_json::Value) {
    let mut config = serde_json::json!({
        "index_url": server.url("/v3/index.json"),
        "timeout_secs": 10
    });
    if let (Some(config), Some(extra)) = (config.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            config.insert(key.clone(), value.clone());
        }
    }
    std::fs::write(dir.join("ntrends.json"), config.to_string()).expect("write config");
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Read the only daily snapshot under `data/daily/`.
pub fn single_daily_snapshot(dir: &Path) -> serde_json::Value {
    let daily = dir.join("data").join("daily");
    let mut files: Vec<_> = std::fs::read_dir(&daily)
        .expect("read daily dir")
        .map(|entry| entry.expect("daily entry").path())
        .collect();
    assert_eq!(
        files.len(),
        1,
        "expected one snapshot in {}",
        daily.display()
    );
    let path = files.remove(0);
    let text = std::fs::read_to_string(&path).expect("read snapshot");
    let snapshot: serde_json::Value = serde_json::from_str(&text).expect("parse snapshot");
    let expected_name = format!("{}.json", snapshot["dateUtc"].as_str().expect("dateUtc"));
    assert_eq!(
        path.file_name().and_then(|name| name.to_str()),
        Some(expected_name.as_str())
    );
    snapshot
}
