//! HTTP/1.1 message framing
//!
//! Just enough of HTTP/1.1 for the in-crate engines: request serialization
//! and response parsing with `Content-Length`, chunked and read-to-close
//! bodies.

use super::transport::Target;
use crate::message::{HeaderMap, HttpRequest, HttpResponse, Method};
use crate::{Error, Result, CRLF, MAX_BODY_LEN, MAX_HEADERS, MAX_INTERIM_RESPONSES, MAX_LINE_LEN};
use bytes::Bytes;
use std::io::{BufRead, Read, Write};

/// Serialize a request onto `w`
///
/// `Host` and `Content-Length` are added unless the request already carries
/// them. When `keep_alive` is false, `Connection: close` is sent.
pub fn write_request<W: Write>(
    w: &mut W,
    request: &HttpRequest,
    target: &Target,
    keep_alive: bool,
) -> Result<()> {
    let url = request.url();
    let mut head = format!("{} {}", request.method(), url.path());
    if let Some(query) = url.query() {
        head.push('?');
        head.push_str(query);
    }
    head.push_str(" HTTP/1.1");
    head.push_str(CRLF);

    let mut push_header = |name: &str, value: &str| -> Result<()> {
        if name.is_empty() || name.contains([':', '\r', '\n']) {
            return Err(Error::InvalidHeader(format!("Invalid header name: {:?}", name)));
        }
        if value.contains(['\r', '\n']) {
            return Err(Error::InvalidHeader(format!("Invalid value for {}", name)));
        }
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str(CRLF);
        Ok(())
    };

    if request.header("Host").is_none() {
        push_header("Host", &target.authority())?;
    }
    for (name, value) in request.headers() {
        push_header(name, value)?;
    }

    let framed = request.header("Content-Length").is_some()
        || request.header("Transfer-Encoding").is_some();
    if !framed && (!request.body().is_empty() || request.method().expects_body()) {
        push_header("Content-Length", &request.body().len().to_string())?;
    }
    if !keep_alive && request.header("Connection").is_none() {
        push_header("Connection", "close")?;
    }
    head.push_str(CRLF);

    w.write_all(head.as_bytes()).map_err(Error::from_io)?;
    w.write_all(request.body()).map_err(Error::from_io)?;
    w.flush().map_err(Error::from_io)
}

/// Read one response from `r`
///
/// Up to [`MAX_INTERIM_RESPONSES`] interim `1xx` responses are skipped.
/// Bodies larger than [`MAX_BODY_LEN`] are rejected. The returned flag tells
/// whether the connection may carry another request.
pub fn read_response<R: BufRead>(r: &mut R, method: Method) -> Result<(HttpResponse, bool)> {
    let mut interim = 0;
    let (http11, status, headers) = loop {
        let line = read_line(r)?;
        let (http11, status) = parse_status_line(&line)?;
        let headers = read_headers(r)?;
        if (100..200).contains(&status) && status != 101 {
            interim += 1;
            if interim > MAX_INTERIM_RESPONSES {
                return Err(Error::Parse(format!(
                    "More than {} interim responses",
                    MAX_INTERIM_RESPONSES
                )));
            }
            continue;
        }
        break (http11, status, headers);
    };

    let close = header_has_token(&headers, "connection", "close");
    let chunked = header_has_token(&headers, "transfer-encoding", "chunked");

    let (body, framed) = if method == Method::Head || matches!(status, 101..=199 | 204 | 304) {
        (Vec::new(), true)
    } else if chunked {
        (read_chunked(r)?, true)
    } else if let Some(len) = content_length(&headers)? {
        check_body_len(len)?;
        let mut body = Vec::new();
        read_exact_len(r, len, &mut body)?;
        (body, true)
    } else {
        let mut body = Vec::new();
        r.by_ref()
            .take(MAX_BODY_LEN as u64 + 1)
            .read_to_end(&mut body)
            .map_err(Error::from_io)?;
        check_body_len(body.len())?;
        (body, false)
    };

    let reusable = http11 && framed && !close && status != 101;
    Ok((HttpResponse::with_headers(status, Bytes::from(body), headers), reusable))
}

fn read_line<R: BufRead>(r: &mut R) -> Result<String> {
    let mut buf = Vec::new();
    let n = r
        .by_ref()
        .take(MAX_LINE_LEN as u64 + 1)
        .read_until(b'\n', &mut buf)
        .map_err(Error::from_io)?;

    if n == 0 {
        return Err(Error::ConnectionClosed);
    }
    if buf.last() != Some(&b'\n') {
        return Err(if n > MAX_LINE_LEN {
            Error::Parse(format!("Line exceeds {} bytes", MAX_LINE_LEN))
        } else {
            Error::ConnectionClosed
        });
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf).map_err(|_| Error::Parse("Line is not valid UTF-8".to_string()))
}

/// Parse `HTTP/1.x CODE [REASON]`, returning (is HTTP/1.1, code)
fn parse_status_line(line: &str) -> Result<(bool, u16)> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    let http11 = match version {
        "HTTP/1.1" => true,
        "HTTP/1.0" => false,
        _ => return Err(Error::Parse(format!("Invalid status line: {}", line))),
    };

    let code = parts
        .next()
        .and_then(|c| c.parse::<u16>().ok())
        .filter(|c| (100..600).contains(c))
        .ok_or_else(|| Error::Parse(format!("Invalid status code in: {}", line)))?;

    Ok((http11, code))
}

fn read_headers<R: BufRead>(r: &mut R) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let mut count = 0;

    loop {
        let line = read_line(r)?;
        if line.is_empty() {
            return Ok(headers);
        }

        count += 1;
        if count > MAX_HEADERS {
            return Err(Error::Parse(format!("More than {} headers", MAX_HEADERS)));
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidHeader(format!("No colon in header: {}", line)))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidHeader("Empty header name".to_string()));
        }

        headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.trim().to_string());
    }
}

fn header_has_token(headers: &HeaderMap, name: &str, token: &str) -> bool {
    headers.get(name).is_some_and(|values| {
        values
            .iter()
            .flat_map(|v| v.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case(token))
    })
}

fn content_length(headers: &HeaderMap) -> Result<Option<usize>> {
    let Some(values) = headers.get("content-length") else {
        return Ok(None);
    };

    let mut length = None;
    for value in values {
        let parsed = value
            .parse::<usize>()
            .map_err(|_| Error::Parse(format!("Invalid Content-Length: {}", value)))?;
        if length.is_some_and(|l| l != parsed) {
            return Err(Error::Parse("Conflicting Content-Length values".to_string()));
        }
        length = Some(parsed);
    }
    Ok(length)
}

fn read_chunked<R: BufRead>(r: &mut R) -> Result<Vec<u8>> {
    let mut body = Vec::new();

    loop {
        let line = read_line(r)?;
        let size_str = line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_str, 16)
            .map_err(|_| Error::InvalidChunkSize(size_str.to_string()))?;

        if size == 0 {
            // Trailers are read and dropped
            while !read_line(r)?.is_empty() {}
            return Ok(body);
        }

        let total = body
            .len()
            .checked_add(size)
            .ok_or_else(|| Error::Parse(format!("Body exceeds {} bytes", MAX_BODY_LEN)))?;
        check_body_len(total)?;
        read_exact_len(r, size, &mut body)?;

        if !read_line(r)?.is_empty() {
            return Err(Error::Parse("Missing CRLF after chunk data".to_string()));
        }
    }
}

fn check_body_len(len: usize) -> Result<()> {
    if len > MAX_BODY_LEN {
        return Err(Error::Parse(format!("Body exceeds {} bytes", MAX_BODY_LEN)));
    }
    Ok(())
}

/// Append exactly `len` bytes to `body`; allocation follows the bytes received
fn read_exact_len<R: Read>(r: &mut R, len: usize, body: &mut Vec<u8>) -> Result<()> {
    let n = r
        .by_ref()
        .take(len as u64)
        .read_to_end(body)
        .map_err(Error::from_io)?;
    if n != len {
        return Err(Error::ConnectionClosed);
    }
    Ok(())
}
