//! Shared helpers for the integration tests

#![allow(dead_code)]

use httpmock::Mock;
use std::fs::OpenOptions;
use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::time::{Duration, Instant};

pub const COLLECTOR_PATH: &str = "/api/wazuh";
pub const API_KEY: &str = "test-key";

/// URL of a port with nothing listening on it
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}{}", addr, COLLECTOR_PATH)
}

pub fn append(path: &Path, data: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(data.as_bytes()).unwrap();
    file.flush().unwrap();
}

/// Wait until `mock` was hit at least `count` times or `timeout` elapsed
pub async fn wait_for_hits(mock: &Mock<'_>, count: usize, timeout: Duration) -> usize {
    let deadline = Instant::now() + timeout;
    loop {
        let hits = mock.hits_async().await;
        if hits >= count || Instant::now() >= deadline {
            return hits;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
