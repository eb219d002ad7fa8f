use std::io::Write as _;
use std::time::Duration;

use bytes::BytesMut;
use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use courier::{Address, Message, Method, RequestBuilder, Scheme};

#[derive(Parser)]
#[command(name = "courier-cli")]
#[command(about = "Send one request to a courier service", long_about = None)]
struct Cli {
    /// Target address, e.g. http://localhost:3380/echo
    address: String,

    /// HTTP method (GET, POST, PUT, DELETE); inferred when omitted.
    #[arg(short, long, value_parser = parse_method)]
    method: Option<Method>,

    /// Query parameter, joined with '&'; repeatable.
    #[arg(short, long = "query")]
    query: Vec<String>,

    /// Extra header line, e.g. "Accept: text/plain"; repeatable.
    #[arg(short = 'H', long = "header")]
    header: Vec<String>,

    /// Request body.
    #[arg(short = 'd', long)]
    body: Option<String>,

    /// Content-Type for the body.
    #[arg(long)]
    content_type: Option<String>,

    /// Send an absolute URI in the request target (proxy style).
    #[arg(long)]
    absolute_uri: bool,

    /// Seconds to wait for the whole exchange.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

fn parse_method(name: &str) -> Result<Method, String> {
    match name.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::Get),
        "POST" => Ok(Method::Post),
        "PUT" => Ok(Method::Put),
        "DELETE" => Ok(Method::Delete),
        other => Err(format!("unsupported method {other}")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut message = Message::from_addr(&cli.address);
    let mut builder = RequestBuilder::new()
        .url_parts(cli.query.clone())
        .absolute_uri(cli.absolute_uri);
    if !cli.header.is_empty() {
        builder = builder.raw_headers(cli.header.join("\r\n"));
    }
    if let Some(body) = &cli.body {
        builder = builder.body(body.as_bytes().to_vec());
    }
    if let Some(content_type) = &cli.content_type {
        builder = builder.content_type(content_type.clone());
    }
    if let Some(method) = cli.method {
        builder = builder.method(method);
    }
    builder.build_into(&mut message)?;

    let addr = Address::parse(&message.addr)?;
    if addr.scheme == Scheme::Fulls {
        return Err("TLS transport is not supported by this tool".into());
    }

    let exchange = async {
        let mut stream = TcpStream::connect((addr.host.as_str(), addr.port)).await?;
        stream.write_all(&message.data).await?;
        read_response(&mut stream).await
    };
    let (head, body) = tokio::time::timeout(Duration::from_secs(cli.timeout_secs), exchange)
        .await
        .map_err(|_| "timed out waiting for response")??;

    // Head goes to stderr so the payload can be piped cleanly.
    eprintln!("{head}");
    std::io::stdout().write_all(&body)?;
    Ok(())
}

/// Read one HTTP response: the head, then Content-Length bytes of body
/// (to EOF when the server declares no length).
async fn read_response(
    stream: &mut TcpStream,
) -> Result<(String, Vec<u8>), Box<dyn std::error::Error>> {
    let mut buf = BytesMut::with_capacity(4096);

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if stream.read_buf(&mut buf).await? == 0 {
            return Err("connection closed before response head".into());
        }
    };

    let head = String::from_utf8(buf[..head_end].to_vec())?;
    let body_start = head_end + 4;

    let content_length = head
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok());

    let body = match content_length {
        Some(len) => {
            while buf.len() < body_start + len {
                if stream.read_buf(&mut buf).await? == 0 {
                    return Err("connection closed mid body".into());
                }
            }
            buf[body_start..body_start + len].to_vec()
        }
        None => {
            // No declared length: the server signals the end by closing.
            while stream.read_buf(&mut buf).await? != 0 {}
            buf[body_start..].to_vec()
        }
    };

    Ok((head, body))
}
