//! Client-built requests served end to end.

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use courier::config::EngineConfig;
use courier::service::ServerRequest;
use courier::{Address, Message, Method, RequestBuilder, Services};

mod common;

async fn send_built(message: &Message) -> TcpStream {
    let addr = Address::parse(&message.addr).unwrap();
    let mut stream = TcpStream::connect((addr.host.as_str(), addr.port))
        .await
        .unwrap();
    stream.write_all(&message.data).await.unwrap();
    stream
}

#[tokio::test]
async fn test_built_post_roundtrips() {
    let handle = common::start_echo_engine(&EngineConfig::default()).await;
    let port = handle.local_addr().port();

    let mut message = Message::from_addr(format!("http://127.0.0.1:{port}/echo"));
    RequestBuilder::new()
        .body(&b"Some string 25 bytes long"[..])
        .content_type("text/html; charset=utf-8")
        .build_into(&mut message)
        .unwrap();
    assert!(message.is_built());

    let mut stream = send_built(&message).await;
    let expected = common::echo_response("Some string 25 bytes long", true);
    let got = common::read_len(&mut stream, expected.len()).await;
    assert_eq!(
        String::from_utf8(got).unwrap(),
        String::from_utf8(expected).unwrap()
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn test_built_get_with_url_parts_roundtrips() {
    let handle = common::start_echo_engine(&EngineConfig::default()).await;
    let port = handle.local_addr().port();

    let mut message = Message::from_addr(format!("http://127.0.0.1:{port}/echo"));
    RequestBuilder::new()
        .url_part("a=1")
        .url_part("b=2")
        .method(Method::Get)
        .build_into(&mut message)
        .unwrap();

    // The query string is the RPC payload, so the echo returns it.
    let mut stream = send_built(&message).await;
    let expected = common::echo_response("a=1&b=2", true);
    let got = common::read_len(&mut stream, expected.len()).await;
    assert_eq!(got, expected);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_built_absolute_uri_roundtrips() {
    let handle = common::start_echo_engine(&EngineConfig::default()).await;
    let port = handle.local_addr().port();

    // Proxy-style request lines carry the full URI as the target; the
    // server routes them by path all the same.
    let mut message = Message::from_addr(format!("http://127.0.0.1:{port}/echo"));
    RequestBuilder::new()
        .url_part("a=1")
        .method(Method::Get)
        .absolute_uri(true)
        .build_into(&mut message)
        .unwrap();

    let mut stream = send_built(&message).await;
    let expected = common::echo_response("a=1", true);
    let got = common::read_len(&mut stream, expected.len()).await;
    assert_eq!(
        String::from_utf8(got).unwrap(),
        String::from_utf8(expected).unwrap()
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn test_built_headers_reach_the_handler() {
    let mut services = Services::new();
    services
        .add(
            "http://127.0.0.1:0/trace",
            |request: ServerRequest| async move {
                let trace = request.header("x-trace").unwrap_or("missing").to_string();
                request.send_reply(trace, &[]);
            },
        )
        .unwrap();
    let handle = services.serve(&EngineConfig::default()).await.unwrap();
    let port = handle.local_addr().port();

    let mut message = Message::from_addr(format!("http://127.0.0.1:{port}/trace"));
    RequestBuilder::new()
        .raw_headers("X-Trace: abc123")
        .build_into(&mut message)
        .unwrap();

    let mut stream = send_built(&message).await;
    let expected = b"HTTP/1.1 200 Ok\r\nContent-Length: 6\r\nConnection: Keep-Alive\r\n\r\nabc123";
    let got = common::read_len(&mut stream, expected.len()).await;
    assert_eq!(got, expected.to_vec());

    handle.shutdown().await;
}
