//! A programmable, event-driven HTTP/1.1 client library.
//! * Strongly-typed mutable [message model](crate::request) validated
//!   against RFC 3986/7230 [grammar](crate::grammar)
//! * Named lifecycle [events](crate::action) with runtime-typed
//!   [callbacks](crate::client::Client::on)
//! * A continuation-passing [pipeline](crate::pipe) around a pluggable
//!   [transport engine](crate::engine)
//! * JSON bodies with [`serde_json`](serde_json) behind the `json`
//!   feature
//!
//! # Example
//! ```
//! use pipehttp::engine::StreamEngine;
//! use pipehttp::io::ReadWriteAdapter;
//! use pipehttp::prelude::*;
//! use pipehttp::uri::Uri;
//!
//! // An in-memory transport with a canned response.
//! let canned = b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\n\r\nHello!";
//! let engine = StreamEngine::new(ReadWriteAdapter::new(&canned[..], Vec::new()));
//!
//! let client = Client::new(engine)
//!     .with_callback(&action::CONNECTED, |cursor: &Cursor| {
//!         println!("{} -> {}", cursor.uri(), cursor.status().code());
//!         Ok(())
//!     })
//!     .with_pipe(|cursor: Cursor, next: Next| -> Result<(), Error> {
//!         cursor.request(|r| {
//!             r.headers.put("Accept", "*/*");
//!         });
//!         next.ok();
//!         Ok(())
//!     });
//!
//! let request = Request::get(Uri::parse("http://example.com/").unwrap());
//! let response = client.send(request).unwrap();
//! assert_eq!(response.line.status.code(), 200);
//! assert_eq!(response.text().unwrap(), "Hello!");
//! ```
#[macro_use]
pub mod grammar;

pub mod action;
pub mod body;
pub mod call;
pub mod client;
pub mod engine;
pub mod error;
pub mod header;
pub mod io;
pub mod middleware;
pub mod mime;
pub mod perform;
pub mod pipe;
pub mod prelude;
pub mod request;
pub mod response;
pub mod runner;
pub mod sink;
pub mod uri;

pub use error::Error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
