/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{TargetAddr, TunnelError};

const SOCKS5_VERSION: u8 = 0x05;
const AUTH_METHOD_NONE: u8 = 0x00;
const AUTH_METHOD_USER: u8 = 0x02;
const AUTH_METHOD_NOT_ACCEPTABLE: u8 = 0xFF;
const USER_AUTH_VERSION: u8 = 0x01;
const CMD_TCP_CONNECT: u8 = 0x01;

fn reply_message(code: u8) -> &'static str {
    // messages from rfc1928
    match code {
        0x01 => "General SOCKS server failure",
        0x02 => "Connection not allowed by ruleset",
        0x03 => "Network unreachable",
        0x04 => "Host unreachable",
        0x05 => "Connection refused",
        0x06 => "TTL expired",
        0x07 => "Command not supported",
        0x08 => "Address type not supported",
        0x09 => "Connection attempt timed out",
        _ => "unassigned reply code",
    }
}

/// Length prefix of a field, rfc1928 and rfc1929 limit them to 255 bytes.
fn field_len(field: &str, too_long: &'static str) -> Result<u8, TunnelError> {
    u8::try_from(field.len()).map_err(|_| TunnelError::InvalidProtocol(too_long))
}

async fn write_flush<S>(stream: &mut S, buf: &[u8]) -> Result<(), TunnelError>
where
    S: AsyncWrite + Unpin,
{
    stream
        .write_all(buf)
        .await
        .map_err(TunnelError::WriteFailed)?;
    stream.flush().await.map_err(TunnelError::WriteFailed)
}

async fn socks5_login<S>(stream: &mut S, user: &str, password: &str) -> Result<(), TunnelError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let with_user = !user.is_empty();
    if with_user {
        write_flush(
            stream,
            &[SOCKS5_VERSION, 0x02, AUTH_METHOD_NONE, AUTH_METHOD_USER],
        )
        .await?;
    } else {
        write_flush(stream, &[SOCKS5_VERSION, 0x01, AUTH_METHOD_NONE]).await?;
    }

    let mut rsp = [0u8; 2];
    stream
        .read_exact(&mut rsp)
        .await
        .map_err(TunnelError::read_failed)?;
    if rsp[0] != SOCKS5_VERSION {
        return Err(TunnelError::InvalidProtocol("invalid version code"));
    }
    match rsp[1] {
        AUTH_METHOD_NONE => Ok(()),
        AUTH_METHOD_USER if with_user => {
            let mut buf = BytesMut::with_capacity(3 + user.len() + password.len());
            buf.put_u8(USER_AUTH_VERSION);
            buf.put_u8(field_len(user, "too long user name")?);
            buf.put_slice(user.as_bytes());
            buf.put_u8(field_len(password, "too long password")?);
            buf.put_slice(password.as_bytes());
            write_flush(stream, &buf).await?;

            stream
                .read_exact(&mut rsp)
                .await
                .map_err(TunnelError::read_failed)?;
            if rsp[0] != USER_AUTH_VERSION {
                return Err(TunnelError::InvalidProtocol("unsupported auth version"));
            }
            if rsp[1] != 0x00 {
                return Err(TunnelError::AuthFailed);
            }
            Ok(())
        }
        AUTH_METHOD_NOT_ACCEPTABLE => Err(TunnelError::NoAuthMethodAvailable),
        _ => Err(TunnelError::InvalidProtocol("invalid auth method")),
    }
}

/// Open a tcp tunnel through a socks5 proxy already connected to.
pub async fn socks5_connect_to<S>(
    stream: &mut S,
    user: &str,
    password: &str,
    addr: &TargetAddr,
) -> Result<(), TunnelError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // nothing is sent if any field can not be encoded
    field_len(user, "too long user name")?;
    field_len(password, "too long password")?;
    if let TargetAddr::Domain(domain, _) = addr {
        field_len(domain, "too long domain name")?;
    }

    socks5_login(stream, user, password).await?;

    let mut buf = BytesMut::with_capacity(262);
    buf.put_u8(SOCKS5_VERSION);
    buf.put_u8(CMD_TCP_CONNECT);
    buf.put_u8(0x00);
    match addr {
        TargetAddr::Domain(domain, port) => {
            buf.put_u8(0x03);
            buf.put_u8(field_len(domain, "too long domain name")?);
            buf.put_slice(domain.as_bytes());
            buf.put_u16(*port);
        }
        TargetAddr::Ip(std::net::SocketAddr::V4(addr4)) => {
            buf.put_u8(0x01);
            buf.put_slice(&addr4.ip().octets());
            buf.put_u16(addr4.port());
        }
        TargetAddr::Ip(std::net::SocketAddr::V6(addr6)) => {
            buf.put_u8(0x04);
            buf.put_slice(&addr6.ip().octets());
            buf.put_u16(addr6.port());
        }
    }
    write_flush(stream, &buf).await?;

    let mut hdr = [0u8; 4];
    stream
        .read_exact(&mut hdr)
        .await
        .map_err(TunnelError::read_failed)?;
    if hdr[0] != SOCKS5_VERSION {
        return Err(TunnelError::InvalidProtocol("invalid version code"));
    }
    let left = match hdr[3] {
        0x01 => 4 + 2,
        0x04 => 16 + 2,
        0x03 => {
            let len = stream.read_u8().await.map_err(TunnelError::read_failed)?;
            len as usize + 2
        }
        _ => return Err(TunnelError::InvalidProtocol("invalid addr type")),
    };
    // the bound address is of no use here
    let mut bind_addr = [0u8; 257];
    stream
        .read_exact(&mut bind_addr[..left])
        .await
        .map_err(TunnelError::read_failed)?;

    match hdr[1] {
        0x00 => Ok(()),
        code => Err(TunnelError::Rejected(code, reply_message(code))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn no_auth_ipv4() {
        let mut stream = Builder::new()
            .write(&[0x05, 0x01, 0x00])
            .read(&[0x05, 0x00])
            .write(&[0x05, 0x01, 0x00, 0x01, 127, 0, 0, 1, 0x30, 0x39])
            .read(&[0x05, 0x00, 0x00, 0x01, 10, 0, 0, 1, 0x04, 0x00])
            .build();
        let addr = TargetAddr::new("127.0.0.1", 12345);
        socks5_connect_to(&mut stream, "", "", &addr).await.unwrap();
    }

    #[tokio::test]
    async fn user_auth_domain() {
        let mut stream = Builder::new()
            .write(&[0x05, 0x02, 0x00, 0x02])
            .read(&[0x05, 0x02])
            .write(&[0x01, 0x01, b'u', 0x01, b'p'])
            .read(&[0x01, 0x00])
            .write(&[
                0x05, 0x01, 0x00, 0x03, 0x04, b'h', b'o', b's', b't', 0x04, 0x57,
            ])
            .read(&[0x05, 0x00, 0x00, 0x03, 0x01, b'x', 0x00, 0x50])
            .build();
        let addr = TargetAddr::new("host", 1111);
        socks5_connect_to(&mut stream, "u", "p", &addr).await.unwrap();
    }

    #[tokio::test]
    async fn auth_failed() {
        let mut stream = Builder::new()
            .write(&[0x05, 0x02, 0x00, 0x02])
            .read(&[0x05, 0x02])
            .write(&[0x01, 0x01, b'u', 0x01, b'p'])
            .read(&[0x01, 0x01])
            .build();
        let addr = TargetAddr::new("host", 1111);
        let e = socks5_connect_to(&mut stream, "u", "p", &addr)
            .await
            .unwrap_err();
        assert!(matches!(e, TunnelError::AuthFailed));
    }

    #[tokio::test]
    async fn no_acceptable_method() {
        let mut stream = Builder::new()
            .write(&[0x05, 0x01, 0x00])
            .read(&[0x05, 0xFF])
            .build();
        let addr = TargetAddr::new("host", 1);
        let e = socks5_connect_to(&mut stream, "", "", &addr)
            .await
            .unwrap_err();
        assert!(matches!(e, TunnelError::NoAuthMethodAvailable));
    }

    #[tokio::test]
    async fn rejected() {
        let mut stream = Builder::new()
            .write(&[0x05, 0x01, 0x00])
            .read(&[0x05, 0x00])
            .write(&[0x05, 0x01, 0x00, 0x01, 10, 0, 0, 2, 0x00, 0x50])
            .read(&[0x05, 0x05, 0x00, 0x01, 0, 0, 0, 0, 0x00, 0x00])
            .build();
        let addr = TargetAddr::new("10.0.0.2", 80);
        let e = socks5_connect_to(&mut stream, "", "", &addr)
            .await
            .unwrap_err();
        assert!(matches!(e, TunnelError::Rejected(0x05, "Connection refused")));
    }

    #[tokio::test]
    async fn too_long_fields() {
        let long = "x".repeat(256);
        let addr = TargetAddr::new("host", 1);

        let mut stream = Builder::new().build();
        let e = socks5_connect_to(&mut stream, &long, "p", &addr)
            .await
            .unwrap_err();
        assert!(matches!(e, TunnelError::InvalidProtocol("too long user name")));

        let mut stream = Builder::new().build();
        let e = socks5_connect_to(&mut stream, "u", &long, &addr)
            .await
            .unwrap_err();
        assert!(matches!(e, TunnelError::InvalidProtocol("too long password")));

        let mut stream = Builder::new().build();
        let addr = TargetAddr::new(&long, 80);
        let e = socks5_connect_to(&mut stream, "", "", &addr)
            .await
            .unwrap_err();
        assert!(matches!(e, TunnelError::InvalidProtocol("too long domain name")));
    }

    #[tokio::test]
    async fn max_length_domain() {
        let domain = "d".repeat(255);
        let mut request = vec![0x05, 0x01, 0x00, 0x03, 0xFF];
        request.extend_from_slice(domain.as_bytes());
        request.extend_from_slice(&[0x00, 0x50]);
        let mut stream = Builder::new()
            .write(&[0x05, 0x01, 0x00])
            .read(&[0x05, 0x00])
            .write(&request)
            .read(&[0x05, 0x00, 0x00, 0x01, 10, 0, 0, 1, 0x00, 0x50])
            .build();
        let addr = TargetAddr::new(&domain, 80);
        socks5_connect_to(&mut stream, "", "", &addr).await.unwrap();
    }

    #[tokio::test]
    async fn closed_early() {
        let mut stream = Builder::new().write(&[0x05, 0x01, 0x00]).read(&[0x05]).build();
        let addr = TargetAddr::new("host", 1);
        let e = socks5_connect_to(&mut stream, "", "", &addr)
            .await
            .unwrap_err();
        assert!(matches!(e, TunnelError::RemoteClosed));
    }
}
