//! HTTP response: status code, status line and the response message.
use std::fmt;
use std::str::FromStr;

use crate::body::Body;
use crate::error::Error;
use crate::grammar;
use crate::header::Headers;
use crate::mime::Mime;
use crate::request::HttpVersion;

pub mod parser;
pub mod status;

text_component!(
    /// A three-digit status code.
    StatusCode,
    "status-code",
    grammar::STATUS_CODE
);

impl StatusCode {
    pub const CONTINUE: StatusCode = StatusCode(std::borrow::Cow::Borrowed("100"));
    pub const OK: StatusCode = StatusCode(std::borrow::Cow::Borrowed("200"));
    pub const CREATED: StatusCode = StatusCode(std::borrow::Cow::Borrowed("201"));
    pub const ACCEPTED: StatusCode = StatusCode(std::borrow::Cow::Borrowed("202"));
    pub const NO_CONTENT: StatusCode = StatusCode(std::borrow::Cow::Borrowed("204"));
    pub const MOVED_PERMANENTLY: StatusCode = StatusCode(std::borrow::Cow::Borrowed("301"));
    pub const FOUND: StatusCode = StatusCode(std::borrow::Cow::Borrowed("302"));
    pub const NOT_MODIFIED: StatusCode = StatusCode(std::borrow::Cow::Borrowed("304"));
    pub const BAD_REQUEST: StatusCode = StatusCode(std::borrow::Cow::Borrowed("400"));
    pub const UNAUTHORIZED: StatusCode = StatusCode(std::borrow::Cow::Borrowed("401"));
    pub const FORBIDDEN: StatusCode = StatusCode(std::borrow::Cow::Borrowed("403"));
    pub const NOT_FOUND: StatusCode = StatusCode(std::borrow::Cow::Borrowed("404"));
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(std::borrow::Cow::Borrowed("405"));
    pub const REQUEST_TIMEOUT: StatusCode = StatusCode(std::borrow::Cow::Borrowed("408"));
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(std::borrow::Cow::Borrowed("500"));
    pub const BAD_GATEWAY: StatusCode = StatusCode(std::borrow::Cow::Borrowed("502"));
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(std::borrow::Cow::Borrowed("503"));

    pub fn from_code(code: u16) -> Self {
        StatusCode(std::borrow::Cow::Owned(format!("{:03}", code)))
    }

    pub fn code(&self) -> u16 {
        self.as_str().parse().unwrap_or(0)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code())
    }
}

text_component!(
    /// A status-line reason phrase.
    ReasonPhrase,
    "reason-phrase",
    grammar::REASON_PHRASE
);

impl ReasonPhrase {
    pub const EMPTY: ReasonPhrase = ReasonPhrase(std::borrow::Cow::Borrowed(""));
    pub const OK: ReasonPhrase = ReasonPhrase(std::borrow::Cow::Borrowed("OK"));
}

/// The status line: version, status code and reason phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub version: HttpVersion,
    pub status: StatusCode,
    pub reason: ReasonPhrase,
}

impl StatusLine {
    pub fn new(version: HttpVersion, status: StatusCode, reason: ReasonPhrase) -> Self {
        StatusLine {
            version,
            status,
            reason,
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        let caps = grammar::STATUS_LINE
            .captures(s)
            .ok_or_else(|| Error::malformed_input("status-line", s))?;
        Ok(StatusLine {
            version: HttpVersion::parse(&caps["version"])?,
            status: StatusCode::parse(&caps["status"])?,
            reason: match caps.name("reason") {
                Some(m) => ReasonPhrase::parse(m.as_str())?,
                None => ReasonPhrase::EMPTY,
            },
        })
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        StatusLine {
            version: HttpVersion::HTTP_1_1,
            status: StatusCode::OK,
            reason: ReasonPhrase::OK,
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.version, self.status)?;
        if !self.reason.is_empty() {
            write!(f, " {}", self.reason)?;
        }
        Ok(())
    }
}

impl FromStr for StatusLine {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusLine::parse(s)
    }
}

/// An HTTP response.
///
/// # Example
/// ```
/// use pipehttp::response::Response;
///
/// let response = Response::new(404);
/// assert_eq!(response.line.status.code(), 404);
/// assert_eq!(response.line.reason.as_str(), "Not Found");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    pub line: StatusLine,
    pub headers: Headers,
    pub body: Option<Body>,
}

impl Response {
    /// Create a response with the default reason phrase for `code`.
    pub fn new(code: u16) -> Self {
        Response {
            line: StatusLine {
                version: HttpVersion::HTTP_1_1,
                status: StatusCode::from_code(code),
                reason: ReasonPhrase::raw(status::default_reason(code)),
            },
            headers: Headers::new(),
            body: None,
        }
    }

    /// Parse a textual response. Missing parts fall back to defaults; a
    /// missing status line yields `200 OK`.
    pub fn parse(s: &str) -> Result<Self, Error> {
        parser::parse_response(s)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.line.status = status;
        self
    }

    pub fn with_reason(mut self, reason: ReasonPhrase) -> Self {
        self.line.reason = reason;
        self
    }

    pub fn with_version(mut self, version: HttpVersion) -> Self {
        self.line.version = version;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.put(name, value);
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Apply `op` to the header block in place.
    pub fn headers<F: FnOnce(&mut Headers)>(&mut self, op: F) -> &mut Self {
        op(&mut self.headers);
        self
    }

    /// Apply `op` to the optional body in place.
    pub fn body<F: FnOnce(&mut Option<Body>)>(&mut self, op: F) -> &mut Self {
        op(&mut self.body);
        self
    }

    /// The effective media type: the body's explicit type if set, else
    /// the `Content-Type` header, else the body's variant default.
    pub fn mime(&self) -> Option<Mime> {
        let body = self.body.as_ref()?;
        if let Some(mime) = body.mime() {
            return Some(mime.clone());
        }
        if let Ok(Some(mime)) = self.headers.content_type() {
            return Some(mime);
        }
        Some(body.default_mime())
    }

    /// The body decoded as text, per the effective media type's charset.
    pub fn text(&self) -> Result<String, Error> {
        match &self.body {
            Some(body) => {
                let charset = self
                    .mime()
                    .and_then(|m| m.charset().map(|c| c.to_ascii_lowercase()));
                crate::body::decode(&body.to_bytes()?, charset.as_deref())
            }
            None => Ok(String::new()),
        }
    }

    pub fn content_length(&self) -> Result<u64, Error> {
        match &self.body {
            Some(body) => body.content_length(),
            None => Ok(0),
        }
    }

    /// Serialise to wire bytes: status line, header block, blank line,
    /// body.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = format!("{}\r\n{}\r\n", self.line, self.headers).into_bytes();
        if let Some(body) = &self.body {
            bytes.extend(body.to_bytes()?);
        }
        Ok(bytes)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n{}\r\n", self.line, self.headers)?;
        if let Some(body) = &self.body {
            write!(
                f,
                "{}",
                String::from_utf8_lossy(&body.to_bytes().unwrap_or_default())
            )?;
        }
        Ok(())
    }
}

impl FromStr for Response {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Response::parse(s)
    }
}
