/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use base64::prelude::*;
use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::{TargetAddr, TunnelError};

const MAX_HEADER_SIZE: usize = 2048;

fn proxy_authorization_basic(user: &str, password: &str) -> String {
    format!(
        "Proxy-Authorization: Basic {}\r\n",
        BASE64_STANDARD.encode(format!("{user}:{password}"))
    )
}

fn build_request(addr: &TargetAddr, user: &str, password: &str) -> String {
    let mut req = format!("CONNECT {addr} HTTP/1.1\r\nHost: {addr}\r\nConnection: keep-alive\r\n");
    if !user.is_empty() {
        req.push_str(&proxy_authorization_basic(user, password));
    }
    req.push_str("\r\n");
    req
}

/// Offset just past the blank line ending the header, looking at bytes from `from` on.
fn find_header_end(header: &[u8], from: usize) -> Option<usize> {
    (from..header.len())
        .filter(|i| header[*i] == b'\n')
        .map(|i| i + 1)
        .find(|end| header[..*end].ends_with(b"\r\n\r\n") || header[..*end].ends_with(b"\n\n"))
}

/// Read the response header, leaving what follows it in the reader.
async fn recv_header<R>(reader: &mut R) -> Result<Vec<u8>, TunnelError>
where
    R: AsyncBufRead + Unpin,
{
    let mut header = Vec::with_capacity(256);
    loop {
        let buf = reader.fill_buf().await.map_err(TunnelError::read_failed)?;
        if buf.is_empty() {
            return Err(TunnelError::RemoteClosed);
        }
        let start = header.len();
        let len = buf.len().min(MAX_HEADER_SIZE - start);
        header.extend_from_slice(&buf[..len]);
        if let Some(end) = find_header_end(&header, start) {
            reader.consume(end - start);
            header.truncate(end);
            return Ok(header);
        }
        reader.consume(len);
        if header.len() >= MAX_HEADER_SIZE {
            return Err(TunnelError::TooLargeHeader(MAX_HEADER_SIZE));
        }
    }
}

fn parse_status_line(header: &[u8]) -> Result<(u16, String), TunnelError> {
    let line_end = header
        .iter()
        .position(|b| *b == b'\n')
        .ok_or(TunnelError::InvalidProtocol("no status line"))?;
    let line = std::str::from_utf8(&header[..line_end])
        .map_err(|_| TunnelError::InvalidProtocol("invalid status line"))?
        .trim_end();

    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(TunnelError::InvalidProtocol("invalid http version"));
    }
    let code = parts
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or(TunnelError::InvalidProtocol("invalid status code"))?;
    let reason = parts.next().unwrap_or_default().to_string();
    Ok((code, reason))
}

/// Open a tcp tunnel with `CONNECT` through a http proxy already connected to.
///
/// Returns the tunnel data received together with the response header.
pub async fn http_connect_to<S>(
    stream: &mut S,
    user: &str,
    password: &str,
    addr: &TargetAddr,
) -> Result<Bytes, TunnelError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let req = build_request(addr, user, password);
    stream
        .write_all(req.as_bytes())
        .await
        .map_err(TunnelError::WriteFailed)?;
    stream.flush().await.map_err(TunnelError::WriteFailed)?;

    let mut reader = BufReader::new(stream);
    let header = recv_header(&mut reader).await?;
    let (code, reason) = parse_status_line(&header)?;
    if (200..300).contains(&code) {
        Ok(Bytes::copy_from_slice(reader.buffer()))
    } else {
        Err(TunnelError::UnexpectedStatusCode(code, reason))
    }
}
