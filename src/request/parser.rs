//! Textual request parsing.
//!
//! The message regex splits a request into request line, header block
//! and body tail; each part is re-parsed by its own category parser.
//! Absent or empty parts fall back to default instances, and body bytes
//! keep the raw substring; the `Content-Type` header supplies the
//! media type at access time.
use crate::body::Body;
use crate::error::Error;
use crate::grammar;
use crate::header::Headers;
use crate::request::{Request, RequestLine};

pub(crate) fn parse_request(s: &str) -> Result<Request, Error> {
    let caps = grammar::MESSAGE
        .captures(s)
        .ok_or_else(|| Error::malformed_input("request", s))?;
    let line = match caps.name("line") {
        Some(m) if !m.as_str().is_empty() => RequestLine::parse(m.as_str())?,
        _ => RequestLine::default(),
    };
    let headers = match caps.name("headers") {
        Some(m) => Headers::parse(m.as_str())?,
        None => Headers::new(),
    };
    let body = match caps.name("body") {
        Some(m) if !m.as_str().is_empty() => Some(Body::bytes(m.as_str().as_bytes().to_vec())),
        _ => None,
    };
    Ok(Request {
        line,
        headers,
        body,
    })
}
