//! Minimal HTTP/1.x front end answering every request with `Hello World!`.
//!
//! It shares nothing with the PDO layer.

use std::net::SocketAddr;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::error::PdoError;

pub const HELLO_BODY: &str = "Hello World!";

/// Largest request head buffered before the connection is dropped.
const MAX_HEAD_SIZE: usize = 16 * 1024;

const INITIAL_BUF_SIZE: usize = 1024;

const MAX_HEADERS: usize = 64;

/// Bind `addr` and serve until the process ends.
///
/// # Errors
/// Returns `PdoError::Io` if the address cannot be bound.
pub async fn bind_and_serve(addr: &str) -> Result<(), PdoError> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener).await
}

/// Accept connections on `listener`, answering each on its own task.
///
/// # Errors
/// Returns `PdoError::Io` if the listener's local address cannot be read.
pub async fn serve(listener: TcpListener) -> Result<(), PdoError> {
    info!(address = %listener.local_addr()?, "hello server listening");

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "failed to accept connection");
                continue;
            }
        };

        debug!(peer = %peer_addr, "connection accepted");
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr).await {
                warn!(peer = %peer_addr, error = %e, "connection closed with error");
            }
        });
    }
}

/// Method and target of a parsed request line.
#[derive(Debug, PartialEq, Eq)]
struct RequestHead {
    method: String,
    path: String,
}

/// Parse the buffered request head.
///
/// `Ok(None)` means more bytes are needed. Bare `\n` line endings are accepted.
fn parse_head(buf: &[u8]) -> Result<Option<RequestHead>, httparse::Error> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);

    match req.parse(buf)? {
        httparse::Status::Complete(_) => Ok(Some(RequestHead {
            method: req.method.unwrap_or_default().to_owned(),
            path: req.path.unwrap_or_default().to_owned(),
        })),
        httparse::Status::Partial => Ok(None),
    }
}

async fn handle_connection(mut stream: TcpStream, peer_addr: SocketAddr) -> std::io::Result<()> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    let response = loop {
        let bytes_read = stream.read_buf(&mut buf).await?;
        if bytes_read == 0 {
            debug!(peer = %peer_addr, "connection closed before request completed");
            return Ok(());
        }

        match parse_head(&buf) {
            Ok(Some(head)) => {
                debug!(
                    peer = %peer_addr,
                    method = %head.method,
                    path = %head.path,
                    "answering request"
                );
                break hello_response();
            }
            Ok(None) if buf.len() > MAX_HEAD_SIZE => {
                warn!(peer = %peer_addr, "request head too large");
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "malformed request");
                break bad_request_response();
            }
        }
    };

    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}

fn plain_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Full response sent for every well-formed request.
#[must_use]
pub fn hello_response() -> String {
    plain_response("200 OK", HELLO_BODY)
}

fn bad_request_response() -> String {
    plain_response("400 Bad Request", "Bad Request")
}
