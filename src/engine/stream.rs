//! An engine over any `Read + Write` stream.
use std::io::{Read, Write};
use std::sync::Mutex;

use crate::call::Cursor;
use crate::engine::{write_request, ClientEngine};
use crate::pipe::Next;
use crate::response::parser::ResponseReader;

/// Performs the HTTP/1.1 exchange synchronously over a caller-supplied
/// stream. Useful for tunnelled transports and as the in-memory test
/// transport together with
/// [`ReadWriteAdapter`](crate::io::ReadWriteAdapter).
///
/// # Example
/// ```
/// use pipehttp::engine::{ClientEngine, StreamEngine};
/// use pipehttp::io::ReadWriteAdapter;
/// use pipehttp::call::Cursor;
/// use pipehttp::pipe::Next;
/// use pipehttp::request::Request;
/// use pipehttp::uri::Uri;
///
/// let canned = b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\n\r\nHello!";
/// let engine = StreamEngine::new(ReadWriteAdapter::new(&canned[..], Vec::new()));
/// let cursor = Cursor::new(Request::get(Uri::parse("http://example.com/").unwrap()));
/// engine.connect(cursor.clone(), Next::new(|error| assert!(error.is_none())));
/// assert_eq!(cursor.response(|r| r.text().unwrap()), "Hello!");
/// ```
pub struct StreamEngine<S> {
    stream: Mutex<S>,
}

impl<S: Read + Write + Send> StreamEngine<S> {
    pub fn new(stream: S) -> Self {
        StreamEngine {
            stream: Mutex::new(stream),
        }
    }
}

impl<S: Read + Write + Send> ClientEngine for StreamEngine<S> {
    fn connect(&self, cursor: Cursor, next: Next) {
        let mut stream = self.stream.lock().unwrap();
        let result = write_request(&mut *stream, &cursor).and_then(|_| {
            let mut reader = ResponseReader::new(&mut *stream);
            let (line, headers) = reader.read_head()?;
            // The head survives on the call even when the body fails.
            cursor.response(|r| {
                r.line = line;
                r.headers = headers.clone();
                r.body = None;
            });
            let body = reader.read_body(&headers)?;
            cursor.response(|r| r.body = body);
            Ok(())
        });
        drop(stream);
        match result {
            Ok(()) => next.ok(),
            Err(error) => next.fail(error),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;
    use crate::io::ReadWriteAdapter;
    use crate::perform::WaitPerformer;
    use crate::request::Request;
    use crate::uri::Uri;

    #[test]
    fn test_exchange_over_in_memory_stream() {
        let canned = b"HTTP/1.1 404 Not Found\r\nContent-Length: 3\r\n\r\nabc";
        let engine = StreamEngine::new(ReadWriteAdapter::new(&canned[..], Vec::new()));
        let cursor = Cursor::new(Request::get(Uri::parse("http://example.com/x").unwrap()));
        let outcome = WaitPerformer::perform(|next| engine.connect(cursor.clone(), next));
        assert_eq!(outcome, None);
        assert_eq!(cursor.status().code(), 404);
        assert_eq!(cursor.response(|r| r.text().unwrap()), "abc");
    }

    #[test]
    fn test_malformed_head_classified() {
        let canned = b"NOT HTTP AT ALL\r\n\r\n";
        let engine = StreamEngine::new(ReadWriteAdapter::new(&canned[..], Vec::new()));
        let cursor = Cursor::new(Request::get(Uri::parse("http://example.com/").unwrap()));
        let outcome = WaitPerformer::perform(|next| engine.connect(cursor.clone(), next));
        match outcome {
            Some(Error::Malformed(_)) => (),
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_body_keeps_partial_head() {
        let canned = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc";
        let engine = StreamEngine::new(ReadWriteAdapter::new(&canned[..], Vec::new()));
        let cursor = Cursor::new(Request::get(Uri::parse("http://example.com/").unwrap()));
        let outcome = WaitPerformer::perform(|next| engine.connect(cursor.clone(), next));
        match outcome {
            Some(Error::NotParsed(_)) => (),
            other => panic!("expected NotParsed, got {:?}", other),
        }
        // The head arrived before the body failed and stays visible.
        assert_eq!(cursor.status().code(), 200);
        assert_eq!(
            cursor.response(|r| r.headers.get("content-length").map(String::from)),
            Some("10".to_string())
        );
        assert!(cursor.response(|r| r.body.is_none()));
    }
}
