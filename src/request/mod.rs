//! HTTP request: method, request line and the request message.
use std::fmt;
use std::str::FromStr;

use crate::body::Body;
use crate::error::Error;
use crate::grammar;
use crate::header::Headers;
use crate::mime::Mime;
use crate::uri::Uri;

pub mod parser;

text_component!(
    /// A request method token.
    Method,
    "method",
    grammar::METHOD
);

impl Method {
    pub const GET: Method = Method(std::borrow::Cow::Borrowed("GET"));
    pub const HEAD: Method = Method(std::borrow::Cow::Borrowed("HEAD"));
    pub const POST: Method = Method(std::borrow::Cow::Borrowed("POST"));
    pub const PUT: Method = Method(std::borrow::Cow::Borrowed("PUT"));
    pub const PATCH: Method = Method(std::borrow::Cow::Borrowed("PATCH"));
    pub const DELETE: Method = Method(std::borrow::Cow::Borrowed("DELETE"));
    pub const CONNECT: Method = Method(std::borrow::Cow::Borrowed("CONNECT"));
    pub const OPTIONS: Method = Method(std::borrow::Cow::Borrowed("OPTIONS"));
    pub const TRACE: Method = Method(std::borrow::Cow::Borrowed("TRACE"));
}

text_component!(
    /// An HTTP version: `"HTTP/" DIGIT "." DIGIT`.
    HttpVersion,
    "http-version",
    grammar::HTTP_VERSION
);

impl HttpVersion {
    pub const HTTP_1_0: HttpVersion = HttpVersion(std::borrow::Cow::Borrowed("HTTP/1.0"));
    pub const HTTP_1_1: HttpVersion = HttpVersion(std::borrow::Cow::Borrowed("HTTP/1.1"));
}

/// The request line: method, target URI and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub uri: Uri,
    pub version: HttpVersion,
}

impl RequestLine {
    pub fn new(method: Method, uri: Uri, version: HttpVersion) -> Self {
        RequestLine {
            method,
            uri,
            version,
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        let caps = grammar::REQUEST_LINE
            .captures(s)
            .ok_or_else(|| Error::malformed_input("request-line", s))?;
        Ok(RequestLine {
            method: Method::parse(&caps["method"])?,
            uri: Uri::parse(&caps["uri"])?,
            version: HttpVersion::parse(&caps["version"])?,
        })
    }
}

impl Default for RequestLine {
    fn default() -> Self {
        RequestLine {
            method: Method::GET,
            uri: Uri::default(),
            version: HttpVersion::HTTP_1_1,
        }
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.method, self.uri, self.version)
    }
}

impl FromStr for RequestLine {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestLine::parse(s)
    }
}

/// An HTTP request.
///
/// # Example
/// ```
/// use pipehttp::prelude::*;
/// use pipehttp::uri::Uri;
///
/// let request = Request::get(Uri::parse("http://example.com/").unwrap())
///     .with_header("Host", "example.com");
/// assert_eq!(
///     request.to_string(),
///     "GET http://example.com/ HTTP/1.1\r\nHost: example.com\r\n\r\n"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Request {
    pub line: RequestLine,
    pub headers: Headers,
    pub body: Option<Body>,
}

impl Request {
    pub fn new() -> Self {
        Request::default()
    }

    pub fn get(uri: Uri) -> Self {
        Request::default().with_method(Method::GET).with_uri(uri)
    }

    pub fn head(uri: Uri) -> Self {
        Request::default().with_method(Method::HEAD).with_uri(uri)
    }

    pub fn post(uri: Uri, body: Body) -> Self {
        Request::default()
            .with_method(Method::POST)
            .with_uri(uri)
            .with_body(body)
    }

    pub fn put(uri: Uri, body: Body) -> Self {
        Request::default()
            .with_method(Method::PUT)
            .with_uri(uri)
            .with_body(body)
    }

    pub fn delete(uri: Uri) -> Self {
        Request::default().with_method(Method::DELETE).with_uri(uri)
    }

    /// Parse a textual request. Missing parts fall back to defaults.
    pub fn parse(s: &str) -> Result<Self, Error> {
        parser::parse_request(s)
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.line.method = method;
        self
    }

    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.line.uri = uri;
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

    /// Apply `op` to the target URI in place.
    pub fn uri<F: FnOnce(&mut Uri)>(&mut self, op: F) -> &mut Self {
        op(&mut self.line.uri);
        self
    }

    /// Apply `op` to the URI authority in place.
    pub fn authority<F: FnOnce(&mut crate::uri::Authority)>(&mut self, op: F) -> &mut Self {
        op(&mut self.line.uri.authority);
        self
    }

    /// Apply `op` to the URI query in place.
    pub fn query<F: FnOnce(&mut crate::uri::Query)>(&mut self, op: F) -> &mut Self {
        op(&mut self.line.uri.query);
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

    pub fn content_length(&self) -> Result<u64, Error> {
        match &self.body {
            Some(body) => body.content_length(),
            None => Ok(0),
        }
    }

    /// Serialise to wire bytes: request line, header block, blank line,
    /// body.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = format!("{}\r\n{}\r\n", self.line, self.headers).into_bytes();
        if let Some(body) = &self.body {
            bytes.extend(body.to_bytes()?);
        }
        Ok(bytes)
    }
}

impl fmt::Display for Request {
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

impl FromStr for Request {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Request::parse(s)
    }
}
