//! Shared utilities for integration tests.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use courier::config::EngineConfig;
use courier::service::ServerRequest;
use courier::{ServerHandle, Services};

/// Start an engine hosting two services on one ephemeral port:
/// `/echo` sleeps for the number of milliseconds in its payload and then
/// echoes it back; `/flaky` echoes its payload but silently drops the
/// request when the payload is `drop`.
pub async fn start_echo_engine(config: &EngineConfig) -> ServerHandle {
    let mut services = Services::new();
    services.add("http://127.0.0.1:0/echo", delay_echo).unwrap();
    services.add("http://127.0.0.1:0/flaky", flaky).unwrap();
    services.serve(config).await.unwrap()
}

async fn delay_echo(request: ServerRequest) {
    let payload = request.data().to_vec();
    let delay = std::str::from_utf8(&payload)
        .ok()
        .and_then(|text| text.parse::<u64>().ok())
        .unwrap_or(0);
    tokio::time::sleep(Duration::from_millis(delay)).await;
    request.send_reply(payload, &[("Content-Type", "text/plain")]);
}

async fn flaky(request: ServerRequest) {
    if request.data() == b"drop" {
        return;
    }
    let payload = request.data().to_vec();
    request.send_reply(payload, &[]);
}

/// The exact bytes `/echo` produces for `payload` on an HTTP/1.1 request.
#[allow(dead_code)]
pub fn echo_response(payload: &str, keep_alive: bool) -> Vec<u8> {
    let mut expected = format!("HTTP/1.1 200 Ok\r\nContent-Length: {}\r\n", payload.len());
    if keep_alive {
        expected.push_str("Connection: Keep-Alive\r\n");
    }
    expected.push_str("Content-Type: text/plain\r\n\r\n");
    expected.push_str(payload);
    expected.into_bytes()
}

/// Read exactly `len` bytes, panicking if the peer closes early or five
/// seconds pass.
#[allow(dead_code)]
pub async fn read_len(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(len);
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        while buf.len() < len {
            let n = stream.read_buf(&mut buf).await.unwrap();
            assert_ne!(n, 0, "peer closed after {} of {} bytes", buf.len(), len);
        }
    })
    .await
    .expect("timed out waiting for response bytes");
    buf[..len].to_vec()
}

/// Read until the peer closes, with a ten second guard.
#[allow(dead_code)]
pub async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = BytesMut::new();
    tokio::time::timeout(Duration::from_secs(10), async {
        while stream.read_buf(&mut buf).await.unwrap() != 0 {}
    })
    .await
    .expect("timed out waiting for the peer to close");
    buf.to_vec()
}
