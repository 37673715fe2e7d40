// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Wire format of the HotSpot attach protocol.
//!
//! A request is the protocol version followed by exactly four NUL terminated
//! argument slots. The response starts with a status code and is followed by
//! free-form output which is relayed as it arrives.

use log::{debug, info};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedSender;

use crate::LOG_TARGET;
use crate::errors::Error;

pub const PROTOCOL_VERSION: u8 = b'1';
pub const ARG_SLOTS: usize = 4;
pub const RESPONSE_BUF_SIZE: usize = 8192;

/// Status reported when a `load` response has an unknown layout.
pub const UNRECOGNIZED_STATUS: i32 = -1;

/// Length of the `<status>\n` line preceding the `load` result.
const LOAD_HEADER_LEN: usize = 2;
const RETURN_CODE_PREFIX: &[u8] = b"return code: ";

pub fn encode_request<S: AsRef<str>>(args: &[S]) -> Vec<u8> {
    let payload: usize = args.iter().take(ARG_SLOTS).map(|a| a.as_ref().len()).sum();
    let mut request = Vec::with_capacity(2 + ARG_SLOTS + payload);

    request.push(PROTOCOL_VERSION);
    request.push(0);

    let mut args = args.iter();
    for _ in 0..ARG_SLOTS {
        if let Some(arg) = args.next() {
            request.extend_from_slice(arg.as_ref().as_bytes());
        }
        request.push(0);
    }

    request
}

pub async fn send_request<W, S>(writer: &mut W, args: &[S]) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
    S: AsRef<str>,
{
    let request = encode_request(args);
    writer.write_all(&request).await.map_err(Error::Write)?;
    writer.flush().await.map_err(Error::Write)
}

/// Status of a response whose first chunk is exactly a decimal integer, 0
/// otherwise.
pub fn parse_status(chunk: &[u8]) -> i32 {
    std::str::from_utf8(chunk)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Parses an optional minus sign followed by digits, stopping at the first
/// byte that is not a digit.
pub fn parse_leading_int(bytes: &[u8]) -> Option<i32> {
    let (negative, digits) = match bytes.strip_prefix(b"-") {
        Some(rest) => (true, rest),
        None => (false, bytes),
    };

    let len = digits.iter().take_while(|b| b.is_ascii_digit()).count();
    let digits = digits.get(..len).filter(|d| !d.is_empty())?;

    let mut value: i64 = 0;
    for digit in digits {
        value = value
            .checked_mul(10)?
            .checked_add(i64::from(digit - b'0'))?;
        if value > i64::from(i32::MAX) + 1 {
            return None;
        }
    }

    i32::try_from(if negative { -value } else { value }).ok()
}

/// Extracts the real status from a `load` response.
///
/// The agent load result follows the status line, either as
/// `return code: <n>` or as a bare integer.
pub fn decode_load_status(response: &[u8]) -> i32 {
    let Some(body) = response.get(LOAD_HEADER_LEN..) else {
        return UNRECOGNIZED_STATUS;
    };

    if let Some(rest) = body.strip_prefix(RETURN_CODE_PREFIX) {
        return parse_leading_int(rest).unwrap_or(UNRECOGNIZED_STATUS);
    }

    match body.first() {
        Some(b'0'..=b'9' | b'-') => parse_leading_int(body).unwrap_or(UNRECOGNIZED_STATUS),
        _ => UNRECOGNIZED_STATUS,
    }
}

fn relay(out: &UnboundedSender<Vec<u8>>, data: &[u8]) {
    if out.send(data.to_vec()).is_err() {
        debug!(target: LOG_TARGET, "output relay closed, dropping {} bytes", data.len());
    }
}

/// Reads the status of the response, then relays the rest of the stream to
/// `out` followed by a single newline.
pub async fn read_response<R>(
    reader: &mut R,
    is_load: bool,
    out: &UnboundedSender<Vec<u8>>,
) -> Result<i32, Error>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; RESPONSE_BUF_SIZE];

    let n = reader.read(&mut buf).await.map_err(Error::Read)?;
    if n == 0 {
        return Err(Error::UnexpectedEof);
    }

    let first = buf.get(..n).unwrap_or_default();
    let mut result = parse_status(first);

    if is_load {
        let mut total = n;
        while total < RESPONSE_BUF_SIZE - 1 {
            let Some(free) = buf.get_mut(total..) else {
                break;
            };
            match reader.read(free).await {
                Ok(0) | Err(_) => break,
                Ok(read) => total += read,
            }
        }

        if result == 0 {
            result = decode_load_status(buf.get(..total).unwrap_or_default());
        }
    }

    info!(target: LOG_TARGET, "JVM response code={result}");

    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(read) => relay(out, buf.get(..read).unwrap_or_default()),
        }
    }

    relay(out, b"\n");

    Ok(result)
}
