use sql_pdo::hello::{HELLO_BODY, serve};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn request(addr: std::net::SocketAddr, raw: &str) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(raw.as_bytes()).await?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    Ok(response)
}

#[tokio::test]
async fn every_path_answers_hello_world() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(serve(listener));

    for path in ["/", "/anything/else?x=1"] {
        let response = request(
            addr,
            &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n"),
        )
        .await?;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
        assert!(response.ends_with(HELLO_BODY), "{response}");
    }

    // request head split across writes
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(b"GET / HTTP/1.1\r\nHost: loc").await?;
    stream.write_all(b"alhost\r\n\r\n").await?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    assert!(response.ends_with("Hello World!"));

    server.abort();
    Ok(())
}

#[tokio::test]
async fn bare_lf_request_is_answered() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(serve(listener));

    let response = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        request(addr, "GET / HTTP/1.0\nHost: x\n\n"),
    )
    .await??;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with(HELLO_BODY), "{response}");

    server.abort();
    Ok(())
}

#[tokio::test]
async fn malformed_request_gets_bad_request() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(serve(listener));

    let response = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        request(addr, "\u{1}\u{2} nonsense\r\n\r\n"),
    )
    .await??;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");

    server.abort();
    Ok(())
}
