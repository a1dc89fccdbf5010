//! Minimal HTTP/1.1 responder used by the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the responder sends for every request.
#[derive(Debug, Clone, Copy)]
pub struct Reply {
    pub status: &'static str,
    pub body_len: usize,
    /// Close the socket after this many body bytes instead of sending all
    pub truncate_at: Option<usize>,
}

impl Reply {
    pub fn ok(body_len: usize) -> Self {
        Self {
            status: "200 OK",
            body_len,
            truncate_at: None,
        }
    }
}

/// Keep-alive server answering every GET with the same reply.
pub struct BlobServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    requests: Arc<AtomicUsize>,
}

impl BlobServer {
    pub async fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(AtomicUsize::new(0));

        let accepted = connections.clone();
        let served = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                accepted.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve_connection(socket, reply, served.clone()));
            }
        });

        Self {
            addr,
            connections,
            requests,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/blob", self.addr)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

async fn serve_connection(mut socket: TcpStream, reply: Reply, requests: Arc<AtomicUsize>) {
    let body = vec![b'x'; reply.body_len];
    let mut buf = Vec::new();
    let mut read_buf = [0u8; 1024];

    loop {
        // GET requests carry no body, so the headers end the request
        let end = loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            match socket.read(&mut read_buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&read_buf[..n]),
            }
        };
        buf.drain(..end);
        requests.fetch_add(1, Ordering::SeqCst);

        let header = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\n\r\n",
            reply.status, reply.body_len
        );
        if socket.write_all(header.as_bytes()).await.is_err() {
            return;
        }

        let sent = reply.truncate_at.unwrap_or(reply.body_len).min(reply.body_len);
        if socket.write_all(&body[..sent]).await.is_err() {
            return;
        }
        if sent < reply.body_len {
            let _ = socket.shutdown().await;
            return;
        }
    }
}

/// A loopback address with nothing listening on it.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/blob", addr)
}
