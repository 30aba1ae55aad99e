//! Minimal HTTP/1.1 server for exercising the real client.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGIN_BODY: &str = "<h1>Please log in</h1>";

/// Serve a login page at [`LOGIN_PATH`] and redirect every other request to it
/// with a 302, the way a login-protected app treats an anonymous client.
///
/// Returns the server's base URL.
pub async fn login_redirect_server() -> Url {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();

  tokio::spawn(async move {
    while let Ok((socket, _)) = listener.accept().await {
      tokio::spawn(serve(socket));
    }
  });

  Url::parse(&format!("http://{}/", addr)).unwrap()
}

async fn serve(mut socket: TcpStream) {
  let Some(path) = read_request(&mut socket).await else {
    return;
  };

  let response = if path == LOGIN_PATH {
    format!(
      "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
      LOGIN_BODY.len(),
      LOGIN_BODY
    )
  } else {
    format!(
      "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
      LOGIN_PATH
    )
  };

  let _ = socket.write_all(response.as_bytes()).await;
  let _ = socket.shutdown().await;
}

/// Read one full request (headers plus `Content-Length` body) and return its path.
async fn read_request(socket: &mut TcpStream) -> Option<String> {
  let mut buf = Vec::new();
  let mut chunk = [0u8; 4096];

  let header_end = loop {
    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
      break pos + 4;
    }
    let n = socket.read(&mut chunk).await.ok()?;
    if n == 0 {
      return None;
    }
    buf.extend_from_slice(&chunk[..n]);
  };

  let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
  let content_length = head
    .lines()
    .filter_map(|line| line.split_once(':'))
    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
    .unwrap_or(0);

  while buf.len() < header_end + content_length {
    let n = socket.read(&mut chunk).await.ok()?;
    if n == 0 {
      break;
    }
    buf.extend_from_slice(&chunk[..n]);
  }

  head
    .lines()
    .next()
    .and_then(|line| line.split_whitespace().nth(1))
    .map(str::to_string)
}
