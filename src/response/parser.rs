//! Response parsing: a textual parser over the message regex, and a
//! streaming reader for wire responses.
use std::io::Read;

use crate::body::Body;
use crate::error::Error;
use crate::grammar;
use crate::header::Headers;
use crate::response::{Response, StatusLine};

pub(crate) fn parse_response(s: &str) -> Result<Response, Error> {
    let caps = grammar::MESSAGE
        .captures(s)
        .ok_or_else(|| Error::malformed_input("response", s))?;
    let line = match caps.name("line") {
        Some(m) if !m.as_str().is_empty() => StatusLine::parse(m.as_str())?,
        _ => StatusLine::default(),
    };
    let headers = match caps.name("headers") {
        Some(m) => Headers::parse(m.as_str())?,
        None => Headers::new(),
    };
    let body = match caps.name("body") {
        Some(m) if !m.as_str().is_empty() => Some(Body::bytes(m.as_str().as_bytes().to_vec())),
        _ => None,
    };
    Ok(Response {
        line,
        headers,
        body,
    })
}

const READER_BUFFER_SIZE: usize = 1024;

/// A streaming HTTP/1.1 response reader.
///
/// Reads a status line and header block line by line, then the body
/// according to `Content-Length`, `Transfer-Encoding: chunked`, or
/// connection close. Head syntax errors surface as
/// [`Error::Malformed`], body framing errors as [`Error::NotParsed`],
/// transport errors as [`Error::NotReceived`].
pub struct ResponseReader<R: Read> {
    buffer: [u8; READER_BUFFER_SIZE],
    buffer_position: usize,
    buffer_read_size: usize,
    peek: Option<u8>,
    stream_position: usize,
    eof: bool,
    stream: R,
}

impl<R: Read> ResponseReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            buffer: [0; READER_BUFFER_SIZE],
            buffer_position: 0,
            buffer_read_size: 0,
            peek: None,
            stream_position: 0,
            eof: false,
            stream,
        }
    }

    fn malformed(&self, reason: &str) -> Error {
        Error::Malformed(format!("at byte {}: {}", self.stream_position, reason))
    }

    /// Read the next chunk from the stream. A zero-length read marks
    /// end of input.
    fn fill(&mut self) -> Result<(), Error> {
        self.buffer_read_size = self
            .stream
            .read(&mut self.buffer)
            .map_err(|e| Error::NotReceived(e.to_string()))?;
        self.buffer_position = 0;
        if self.buffer_read_size == 0 {
            self.eof = true;
        }
        Ok(())
    }

    /// Take the current byte and advance the peek.
    fn next(&mut self) -> Result<Option<u8>, Error> {
        let current = self.peek;
        if self.eof {
            self.peek = None;
            return Ok(current);
        }
        if self.buffer_position == self.buffer_read_size {
            self.fill()?;
        }
        if self.buffer_position == self.buffer_read_size {
            self.peek = None;
        } else {
            self.peek = Some(self.buffer[self.buffer_position]);
            self.buffer_position += 1;
            self.stream_position += 1;
        }
        Ok(current)
    }

    fn expect(&mut self, b: u8) -> Result<(), Error> {
        if self.next()? == Some(b) {
            Ok(())
        } else {
            Err(self.malformed(&format!("expected '{}'", b as char)))
        }
    }

    fn crlf(&mut self) -> Result<(), Error> {
        self.expect(b'\r')?;
        self.expect(b'\n')
    }

    /// Consume bytes up to, not including, the next CR.
    fn until_cr(&mut self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        while self.peek != Some(b'\r') {
            bytes.push(
                self.next()?
                    .ok_or_else(|| self.malformed("unexpected end of input"))?,
            );
        }
        Ok(bytes)
    }

    /// One CRLF-terminated line as text.
    fn line(&mut self) -> Result<String, Error> {
        let bytes = self.until_cr()?;
        self.crlf()?;
        String::from_utf8(bytes).map_err(|e| self.malformed(&e.to_string()))
    }

    fn status_line(&mut self) -> Result<StatusLine, Error> {
        let line = self.line()?;
        StatusLine::parse(&line).map_err(|_| self.malformed(&format!("bad status line {:?}", line)))
    }

    fn headers(&mut self) -> Result<Headers, Error> {
        let mut block = String::new();
        loop {
            if self.peek == Some(b'\r') {
                self.crlf()?;
                break;
            }
            block.push_str(&self.line()?);
            block.push_str("\r\n");
        }
        Headers::parse(&block).map_err(|e| Error::Malformed(e.to_string()))
    }

    /// Read exactly `length` body bytes.
    fn sized_body(&mut self, length: u64) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        for i in 0..length {
            if i == length - 1 {
                // The final byte may be the last of the stream.
                self.eof = self.buffer_position == self.buffer_read_size;
            }
            match self.next()? {
                Some(b) => bytes.push(b),
                None => {
                    return Err(Error::NotParsed(format!(
                        "expected {} more body bytes",
                        length - i
                    )))
                }
            }
        }
        Ok(bytes)
    }

    /// Read a chunked body: hex-sized chunks, then trailers up to the
    /// terminating blank line.
    fn chunked_body(&mut self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        loop {
            let size_line = self
                .line()
                .map_err(|e| Error::NotParsed(e.to_string()))?;
            let size_text = size_line.split(';').next().unwrap_or("").trim();
            let size = u64::from_str_radix(size_text, 16)
                .map_err(|_| Error::NotParsed(format!("bad chunk size {:?}", size_line)))?;
            if size == 0 {
                break;
            }
            for _ in 0..size {
                match self.next()? {
                    Some(b) => bytes.push(b),
                    None => return Err(Error::NotParsed("truncated chunk".to_string())),
                }
            }
            self.crlf().map_err(|e| Error::NotParsed(e.to_string()))?;
        }
        // Trailer fields are read and discarded.
        loop {
            if self.peek == Some(b'\r') {
                self.expect(b'\r').map_err(|e| Error::NotParsed(e.to_string()))?;
                if self.buffer_position == self.buffer_read_size {
                    // The terminator may be the last bytes of the stream.
                    self.eof = true;
                }
                self.expect(b'\n').map_err(|e| Error::NotParsed(e.to_string()))?;
                return Ok(bytes);
            }
            if self.peek.is_none() {
                return Ok(bytes);
            }
            self.line().map_err(|e| Error::NotParsed(e.to_string()))?;
        }
    }

    /// Read until the peer closes the connection.
    fn close_delimited_body(&mut self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        while let Some(b) = self.next()? {
            bytes.push(b);
        }
        Ok(bytes)
    }

    /// Read the status line and header block.
    pub fn read_head(&mut self) -> Result<(StatusLine, Headers), Error> {
        self.next()?;
        let line = self.status_line()?;
        let headers = self.headers()?;
        Ok((line, headers))
    }

    /// Read the body the head promised: chunked, sized, or delimited
    /// by connection close.
    pub fn read_body(&mut self, headers: &Headers) -> Result<Option<Body>, Error> {
        let chunked = headers
            .get("transfer-encoding")
            .map(|v| v.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false);
        let body = if chunked {
            self.chunked_body()?
        } else {
            match headers
                .content_length()
                .map_err(|e| Error::NotParsed(e.to_string()))?
            {
                Some(0) => Vec::new(),
                Some(length) => self.sized_body(length)?,
                None => self.close_delimited_body()?,
            }
        };
        if body.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Body::bytes(body)))
        }
    }

    /// Read one full response from the stream.
    pub fn read_response(&mut self) -> Result<Response, Error> {
        let (line, headers) = self.read_head()?;
        let body = self.read_body(&headers)?;
        Ok(Response {
            line,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::response::StatusCode;

    #[test]
    fn test_parse_not_found_round_trips() {
        let text = "HTTP/1.1 404 Not Found\r\nContent-Length: 3\r\n\r\nabc";
        let response = Response::parse(text).unwrap();
        assert_eq!(response.line.status, StatusCode::NOT_FOUND);
        assert_eq!(response.line.reason.as_str(), "Not Found");
        let body = response.body.as_ref().unwrap();
        assert_eq!(body.to_bytes().unwrap(), vec![0x61, 0x62, 0x63]);
        assert_eq!(response.content_length().unwrap(), 3);
        assert_eq!(response.to_string(), text);
    }

    #[test]
    fn test_parse_empty_input_defaults_to_ok() {
        let response = Response::parse("").unwrap();
        assert_eq!(response.line.status, StatusCode::OK);
        assert_eq!(response.line.reason.as_str(), "OK");
        assert!(response.body.is_none());
    }

    #[test]
    fn test_reader_content_length() {
        let wire = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";
        let response = ResponseReader::new(&wire[..]).read_response().unwrap();
        assert_eq!(response.line.status, StatusCode::OK);
        assert_eq!(response.body.unwrap().to_bytes().unwrap(), b"hello");
    }

    #[test]
    fn test_reader_short_body_is_not_parsed() {
        let wire = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nhello";
        match ResponseReader::new(&wire[..]).read_response() {
            Err(Error::NotParsed(_)) => (),
            other => panic!("expected NotParsed, got {:?}", other),
        }
    }

    #[test]
    fn test_reader_chunked() {
        let wire = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
                     5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
        let response = ResponseReader::new(&wire[..]).read_response().unwrap();
        assert_eq!(response.body.unwrap().to_bytes().unwrap(), b"hello world");
    }

    #[test]
    fn test_reader_chunked_bad_size() {
        let wire = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n\r\n";
        match ResponseReader::new(&wire[..]).read_response() {
            Err(Error::NotParsed(_)) => (),
            other => panic!("expected NotParsed, got {:?}", other),
        }
    }

    #[test]
    fn test_reader_close_delimited() {
        let wire = b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\neverything until eof";
        let response = ResponseReader::new(&wire[..]).read_response().unwrap();
        assert_eq!(
            response.body.unwrap().to_bytes().unwrap(),
            b"everything until eof"
        );
    }

    #[test]
    fn test_reader_no_body() {
        let wire = b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n";
        let response = ResponseReader::new(&wire[..]).read_response().unwrap();
        assert_eq!(response.line.status.code(), 204);
        assert!(response.body.is_none());
    }

    #[test]
    fn test_reader_bad_status_line_is_malformed() {
        let wire = b"NONSENSE\r\n\r\n";
        match ResponseReader::new(&wire[..]).read_response() {
            Err(Error::Malformed(_)) => (),
            other => panic!("expected Malformed, got {:?}", other),
        }
    }
}
