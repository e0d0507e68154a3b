//! The default HTTP/1.1 engine over TCP.
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, trace};

use crate::call::Cursor;
use crate::engine::{write_request, CancelToken, ClientEngine, CANCEL_EXTRA};
use crate::error::Error;
use crate::pipe::Next;
use crate::response::parser::ResponseReader;
use crate::runner::Runner;
use crate::uri::Scheme;

/// Plain-TCP HTTP/1.1 transport.
///
/// Each exchange opens one connection, writes the request, reads the
/// response and closes. `https` targets are refused; TLS belongs to an
/// injected engine. A [`CancelToken`] is registered in the call's
/// extras before any I/O.
///
/// # Arguments to [`TcpEngine::new`]
/// * `n_threads`: exchange scheduling. 0 for a thread per exchange,
///   1 to run on the calling thread, n for a pool of n workers
/// * `timeout`: socket read/write timeout
pub struct TcpEngine {
    runner: Mutex<Runner>,
    timeout: Option<Duration>,
}

impl TcpEngine {
    pub fn new(n_threads: usize, timeout: Option<Duration>) -> Self {
        TcpEngine {
            runner: Mutex::new(Runner::new(n_threads)),
            timeout,
        }
    }
}

impl ClientEngine for TcpEngine {
    fn connect(&self, cursor: Cursor, next: Next) {
        let timeout = self.timeout;
        self.runner.lock().unwrap().run(move || {
            let token = Arc::new(CancelToken::new());
            cursor.extras(|extras| {
                extras.put_arc(CANCEL_EXTRA, token.clone());
            });
            let result = exchange(&cursor, &token, timeout);
            match result {
                Ok(()) => next.ok(),
                Err(_) if token.is_cancelled() => next.fail(Error::Cancelled),
                Err(error) => next.fail(error),
            }
        });
    }
}

fn exchange(
    cursor: &Cursor,
    token: &CancelToken,
    timeout: Option<Duration>,
) -> Result<(), Error> {
    let uri = cursor.uri();
    let scheme = if uri.scheme.is_empty() {
        Scheme::HTTP
    } else {
        uri.scheme.clone()
    };
    if scheme == Scheme::HTTPS {
        return Err(Error::NotSent(
            "https requires a TLS-capable engine".to_string(),
        ));
    }
    if scheme != Scheme::HTTP {
        return Err(Error::NotSent(format!(
            "unsupported scheme: {}",
            scheme.as_str()
        )));
    }
    if uri.host().is_unspecified() {
        return Err(Error::NotSent("request uri has no host".to_string()));
    }
    let port = match uri.port().number() {
        None => u32::from(scheme.default_port().unwrap_or(80)),
        Some(number) => number,
    };
    if port == 0 || port > u32::from(u16::max_value()) {
        return Err(Error::NotSent(format!("port out of range: {}", port)));
    }

    debug!("connecting to {}:{}", uri.host().as_str(), port);
    let stream = TcpStream::connect((uri.host().as_str(), port as u16))
        .map_err(|e| Error::NotSent(e.to_string()))?;
    stream
        .set_read_timeout(timeout)
        .and_then(|_| stream.set_write_timeout(timeout))
        .map_err(|e| Error::NotSent(e.to_string()))?;
    if let Ok(handle) = stream.try_clone() {
        token.attach(handle);
    }

    debug!("writing request");
    write_request(&mut (&stream), cursor)?;

    debug!("reading response");
    let mut reader = ResponseReader::new(&stream);
    let (line, headers) = reader.read_head()?;
    trace!("RESPONSE {:?}", line);
    // Record the head before body framing, so a body failure still
    // leaves the partial response on the call.
    cursor.response(|r| {
        r.line = line;
        r.headers = headers.clone();
        r.body = None;
    });
    let body = reader.read_body(&headers)?;
    cursor.response(|r| r.body = body);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::Request;
    use crate::uri::Uri;

    fn failure(uri: &str) -> Error {
        let engine = TcpEngine::new(1, None);
        let cursor = Cursor::new(Request::get(Uri::parse(uri).unwrap()));
        crate::perform::WaitPerformer::perform(|next| engine.connect(cursor.clone(), next))
            .expect("exchange should fail")
    }

    #[test]
    fn test_https_is_refused() {
        match failure("https://example.com/") {
            Error::NotSent(reason) => assert!(reason.contains("https")),
            other => panic!("expected NotSent, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_scheme_is_refused() {
        match failure("gopher://example.com/") {
            Error::NotSent(reason) => assert!(reason.contains("scheme")),
            other => panic!("expected NotSent, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_host_is_refused() {
        match failure("http:/no-host") {
            Error::NotSent(reason) => assert!(reason.contains("host")),
            other => panic!("expected NotSent, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_port_is_refused() {
        match failure("http://example.com:99999/") {
            Error::NotSent(reason) => assert!(reason.contains("port")),
            other => panic!("expected NotSent, got {:?}", other),
        }
    }
}
