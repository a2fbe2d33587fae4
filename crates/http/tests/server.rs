use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::header::CONTENT_LENGTH;
use http::HeaderValue;
use micro_httpd::protocol::{BoxError, ServerError};
use micro_httpd::{handler_fn, Application, Environment, Server, ServerConfig, ServerHandle};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn loopback() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
}

async fn start(app: impl Application + 'static) -> ServerHandle {
    init_tracing();
    Server::start_on(loopback(), app).await.unwrap()
}

async fn start_with(config: ServerConfig, app: impl Application + 'static) -> ServerHandle {
    init_tracing();
    Server::start_with(config, loopback(), app).await.unwrap()
}

/// Sends `request` and reads until the server closes the connection.
async fn exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    timeout(WAIT, stream.read_to_end(&mut response)).await.unwrap().unwrap();
    response
}

fn split_response(response: &[u8]) -> (String, &[u8]) {
    let end = response.windows(4).position(|w| w == b"\r\n\r\n").expect("response head terminator") + 4;
    (String::from_utf8(response[..end].to_vec()).unwrap(), &response[end..])
}

/// Reads one `Content-Length` framed response from a kept-alive connection.
async fn read_response(stream: &mut BufReader<TcpStream>) -> (String, Vec<u8>) {
    let mut head = String::new();
    loop {
        let mut line = String::new();
        let n = timeout(WAIT, stream.read_line(&mut line)).await.unwrap().unwrap();
        assert_ne!(n, 0, "connection closed inside the response head");
        head.push_str(&line);
        if line == "\r\n" {
            break;
        }
    }

    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length: "))
        .map(|value| value.trim().parse::<usize>().unwrap())
        .expect("content-length header");
    let mut body = vec![0; length];
    timeout(WAIT, stream.read_exact(&mut body)).await.unwrap().unwrap();
    (head, body)
}

fn echo_path() -> impl Application + 'static {
    handler_fn(|env| {
        Box::pin(async move {
            let path = env.path().to_owned();
            env.response().write(path.as_bytes()).await?;
            Ok(())
        })
    })
}

/// Counts invocations and answers `ok`.
#[derive(Default)]
struct Counting {
    calls: AtomicUsize,
}

#[async_trait]
impl Application for Counting {
    async fn call(&self, env: &mut Environment<'_>) -> Result<(), BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        env.response().write(b"ok").await?;
        Ok(())
    }
}

#[tokio::test]
async fn accepts_connections_while_running() {
    init_tracing();
    let handle = Server::start(0, echo_path()).await.unwrap();
    let port = handle.local_addr().port();
    assert_ne!(port, 0);

    let stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await;
    assert!(stream.is_ok());
}

#[tokio::test]
async fn start_on_host_resolves_localhost() {
    init_tracing();
    let handle = Server::start_on_host("localhost", 0, echo_path()).await.unwrap();
    assert!(handle.local_addr().ip().is_loopback());

    let response = exchange(handle.local_addr(), b"GET /resolved HTTP/1.0\r\n\r\n").await;
    assert!(response.ends_with(b"\r\n\r\n/resolved"));
}

#[tokio::test]
async fn bind_conflict_is_returned_from_start() {
    let first = start(echo_path()).await;

    let err = Server::start_on(first.local_addr(), echo_path()).await.unwrap_err();
    assert!(matches!(err, ServerError::Bind { .. }));
}

#[tokio::test]
async fn closed_server_refuses_connections() {
    let handle = start(echo_path()).await;
    let addr = handle.local_addr();

    handle.close();
    assert!(TcpStream::connect(addr).await.is_err());
    drop(handle);
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn dropped_handle_refuses_connections() {
    let handle = start(echo_path()).await;
    let addr = handle.local_addr();
    drop(handle);

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn well_formed_request_invokes_application_once() {
    let app = Arc::new(Counting::default());
    let handle = start(Arc::clone(&app)).await;

    let response = exchange(handle.local_addr(), b"GET / HTTP/1.0\r\nConnection: close\r\nHost: localhost\r\n\r\n").await;

    assert_eq!(app.calls.load(Ordering::SeqCst), 1);
    assert_eq!(response, b"HTTP/1.0 200 OK\r\nconnection: close\r\ncontent-length: 2\r\n\r\nok");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn application_completes_before_remote_reads() {
    const PAYLOAD: &[u8] = &[b'z'; 4096];
    const WRITES: usize = 256;

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let app = handler_fn(move |env| {
        let done_tx = done_tx.clone();
        Box::pin(async move {
            for _ in 0..WRITES {
                env.response().write(PAYLOAD).await?;
            }
            done_tx.send(())?;
            Ok(())
        })
    });
    let handle = start(app).await;

    let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();
    stream.write_all(b"GET /large HTTP/1.1\r\nConnection: close\r\n\r\n").await.unwrap();

    // nothing has been read yet
    timeout(WAIT, done_rx.recv()).await.unwrap().unwrap();

    let mut response = Vec::new();
    timeout(WAIT, stream.read_to_end(&mut response)).await.unwrap().unwrap();
    let (head, body) = split_response(&response);

    assert!(head.contains(&format!("content-length: {}\r\n", WRITES * PAYLOAD.len())));
    assert_eq!(body.len(), WRITES * PAYLOAD.len());
    assert!(body.iter().all(|b| *b == b'z'));
}

#[tokio::test]
async fn connection_close_ends_after_response() {
    let handle = start(echo_path()).await;

    let response = exchange(handle.local_addr(), b"GET /bye HTTP/1.1\r\nConnection: close\r\n\r\n").await;
    assert_eq!(response, b"HTTP/1.1 200 OK\r\nconnection: close\r\ncontent-length: 4\r\n\r\n/bye");

    let response = exchange(handle.local_addr(), b"GET /old HTTP/1.0\r\n\r\n").await;
    assert_eq!(response, b"HTTP/1.0 200 OK\r\nconnection: close\r\ncontent-length: 4\r\n\r\n/old");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_connections_do_not_interfere() {
    let app = handler_fn(|env| {
        Box::pin(async move {
            let path = env.path().to_owned();
            tokio::time::sleep(Duration::from_millis(50)).await;
            env.response().write(path.as_bytes()).await?;
            Ok(())
        })
    });
    let handle = start(app).await;
    let addr = handle.local_addr();

    let (first, second) = tokio::join!(
        exchange(addr, b"GET /first HTTP/1.1\r\nConnection: close\r\n\r\n"),
        exchange(addr, b"GET /second HTTP/1.1\r\nConnection: close\r\n\r\n"),
    );

    assert!(first.ends_with(b"\r\n\r\n/first"));
    assert!(second.ends_with(b"\r\n\r\n/second"));
}

#[tokio::test]
async fn close_with_pending_accept_stops_accept_loop() {
    let handle = start(echo_path()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    timeout(WAIT, handle.stopped()).await.unwrap();
}

#[tokio::test]
async fn in_flight_connection_outlives_close() {
    let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
    let app = handler_fn(move |env| {
        let entered_tx = entered_tx.clone();
        Box::pin(async move {
            entered_tx.send(())?;
            tokio::time::sleep(Duration::from_millis(100)).await;
            env.response().write(b"finished").await?;
            Ok(())
        })
    });
    let handle = start(app).await;
    let addr = handle.local_addr();

    let client = tokio::spawn(exchange(addr, b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n"));
    timeout(WAIT, entered_rx.recv()).await.unwrap().unwrap();
    handle.stopped().await;

    let response = client.await.unwrap();
    assert!(response.ends_with(b"\r\n\r\nfinished"));
}

#[tokio::test]
async fn keep_alive_serves_sequential_requests() {
    let handle = start(echo_path()).await;
    let mut stream = BufReader::new(TcpStream::connect(handle.local_addr()).await.unwrap());

    stream.get_mut().write_all(b"GET /one HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
    let (head, body) = read_response(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, b"/one");

    stream.get_mut().write_all(b"GET /two HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
    let (_head, body) = read_response(&mut stream).await;
    assert_eq!(body, b"/two");
}

#[tokio::test]
async fn http10_keep_alive_is_honoured() {
    let handle = start(echo_path()).await;
    let mut stream = BufReader::new(TcpStream::connect(handle.local_addr()).await.unwrap());

    for path in ["/a", "/b"] {
        let request = format!("GET {path} HTTP/1.0\r\nConnection: keep-alive\r\n\r\n");
        stream.get_mut().write_all(request.as_bytes()).await.unwrap();
        let (head, body) = read_response(&mut stream).await;
        assert!(head.contains("connection: keep-alive\r\n"));
        assert_eq!(body, path.as_bytes());
    }
}

#[tokio::test]
async fn malformed_request_closes_without_invoking_application() {
    let app = Arc::new(Counting::default());
    let handle = start(Arc::clone(&app)).await;

    let response = exchange(handle.local_addr(), b"this is not http\r\n\r\n").await;
    assert!(response.is_empty());

    let response = exchange(handle.local_addr(), b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n").await;
    assert!(response.is_empty());

    assert_eq!(app.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn application_error_closes_without_response() {
    let app = handler_fn(|env| {
        Box::pin(async move {
            env.response().write(b"never sent").await?;
            Err("application failure".into())
        })
    });
    let handle = start(app).await;

    let response = exchange(handle.local_addr(), b"GET / HTTP/1.1\r\n\r\n").await;
    assert!(response.is_empty());
}

#[tokio::test]
async fn request_body_is_readable() {
    let app = handler_fn(|env| {
        Box::pin(async move {
            let body = env.body().read_to_end().await?;
            let mut response = env.response();
            response.write(b"got ").await?;
            response.write(&body).await?;
            Ok(())
        })
    });
    let handle = start(app).await;

    let response = exchange(handle.local_addr(), b"POST /echo HTTP/1.1\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello").await;
    assert!(response.ends_with(b"content-length: 9\r\n\r\ngot hello"));
}

#[tokio::test]
async fn unread_body_is_discarded_on_keep_alive() {
    let handle = start(echo_path()).await;
    let mut stream = BufReader::new(TcpStream::connect(handle.local_addr()).await.unwrap());

    stream.get_mut().write_all(b"POST /upload HTTP/1.1\r\nContent-Length: 10\r\n\r\n0123456789").await.unwrap();
    let (_head, body) = read_response(&mut stream).await;
    assert_eq!(body, b"/upload");

    stream.get_mut().write_all(b"GET /next HTTP/1.1\r\n\r\n").await.unwrap();
    let (_head, body) = read_response(&mut stream).await;
    assert_eq!(body, b"/next");
}

#[tokio::test]
async fn threshold_flush_delivers_exact_bytes() {
    let config = ServerConfig::builder().write_buffer_threshold(Some(1024)).build();
    let app = handler_fn(|env| {
        Box::pin(async move {
            let block = [b'q'; 100];
            for _ in 0..100 {
                env.response().write(&block).await?;
            }
            Ok(())
        })
    });
    let handle = start_with(config, app).await;

    let response = exchange(handle.local_addr(), b"GET / HTTP/1.1\r\n\r\n").await;
    let (head, body) = split_response(&response);

    assert!(head.contains("connection: close\r\n"));
    assert!(!head.contains("content-length"));
    assert_eq!(body.len(), 10_000);
}

#[tokio::test]
async fn explicit_flush_is_close_delimited() {
    let app = handler_fn(|env| {
        Box::pin(async move {
            let mut response = env.response();
            response.write(b"early ").await?;
            response.flush().await?;
            response.write(b"late").await?;
            Ok(())
        })
    });
    let handle = start(app).await;

    let response = exchange(handle.local_addr(), b"GET / HTTP/1.1\r\n\r\n").await;
    assert_eq!(response, b"HTTP/1.1 200 OK\r\nconnection: close\r\n\r\nearly late");
}

#[tokio::test]
async fn declared_length_allows_streaming_with_keep_alive() {
    let app = handler_fn(|env| {
        Box::pin(async move {
            let mut response = env.response();
            response.headers_mut()?.insert(CONTENT_LENGTH, HeaderValue::from(9));
            response.write(b"streamed ").await?;
            response.flush().await?;
            Ok(())
        })
    });
    let handle = start(app).await;
    let mut stream = BufReader::new(TcpStream::connect(handle.local_addr()).await.unwrap());

    for _ in 0..2 {
        stream.get_mut().write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
        let (_head, body) = read_response(&mut stream).await;
        assert_eq!(body, b"streamed ");
    }
}
