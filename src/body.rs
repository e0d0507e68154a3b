//! Message bodies: in-memory bytes and text, structured JSON and form
//! parameters, multipart composites, and deferred byte streams.
use std::fmt;
use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::Error;
use crate::header::Headers;
use crate::mime::{mediatypes, Mime};
use crate::uri::Query;

/// A readable byte source opened from a body.
pub type ByteSource = Box<dyn Read + Send>;

/// A factory producing a fresh byte source per call.
pub type SourceFactory = Arc<dyn Fn() -> ByteSource + Send + Sync>;

static BOUNDARY_COUNTER: AtomicU64 = AtomicU64::new(0);
const DEFAULT_BOUNDARY: &str = "pipehttp-boundary";

fn next_boundary() -> String {
    format!(
        "pipehttp-{:012x}",
        BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// A message body.
///
/// Each variant may carry an explicit media type; when it does not, the
/// variant default applies, and a message's `Content-Type` header takes
/// precedence over the default (see `Request::mime`).
pub enum Body {
    /// Raw bytes, `application/octet-stream` by default.
    Bytes { mime: Option<Mime>, data: Vec<u8> },
    /// Text, `text/plain` by default. Encoded as UTF-8; a `charset`
    /// parameter on the media type is authoritative for decoding.
    Text { mime: Option<Mime>, text: String },
    /// A structured JSON value, `application/json` by default.
    #[cfg(feature = "json")]
    Json {
        mime: Option<Mime>,
        value: serde_json::Value,
    },
    /// Form parameters, `application/x-www-form-urlencoded` by default.
    Parameters { mime: Option<Mime>, parameters: Query },
    /// A multipart composite, `multipart/form-data` by default.
    Multipart {
        mime: Option<Mime>,
        parts: Vec<BodyPart>,
    },
    /// A deferred byte stream. Content length is computed by draining a
    /// fresh stream.
    Stream {
        mime: Option<Mime>,
        source: SourceFactory,
    },
}

/// One part of a multipart body: a header block and an optional inner
/// body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyPart {
    pub headers: Headers,
    pub body: Option<Body>,
}

impl BodyPart {
    pub fn new(headers: Headers, body: Option<Body>) -> Self {
        BodyPart { headers, body }
    }
}

impl Body {
    pub fn bytes(data: Vec<u8>) -> Self {
        Body::Bytes { mime: None, data }
    }

    pub fn text(text: &str) -> Self {
        Body::Text {
            mime: None,
            text: text.to_string(),
        }
    }

    #[cfg(feature = "json")]
    pub fn json(value: serde_json::Value) -> Self {
        Body::Json { mime: None, value }
    }

    pub fn parameters(parameters: Query) -> Self {
        Body::Parameters {
            mime: None,
            parameters,
        }
    }

    /// Build a multipart body with a freshly generated boundary.
    pub fn multipart(parts: Vec<BodyPart>) -> Self {
        Body::Multipart {
            mime: Some(
                mediatypes::multipart_form_data().with_parameter("boundary", &next_boundary()),
            ),
            parts,
        }
    }

    pub fn stream<F>(factory: F) -> Self
    where
        F: Fn() -> ByteSource + Send + Sync + 'static,
    {
        Body::Stream {
            mime: None,
            source: Arc::new(factory),
        }
    }

    pub fn with_mime(mut self, new: Mime) -> Self {
        *self.mime_slot() = Some(new);
        self
    }

    fn mime_slot(&mut self) -> &mut Option<Mime> {
        match self {
            Body::Bytes { mime, .. } => mime,
            Body::Text { mime, .. } => mime,
            #[cfg(feature = "json")]
            Body::Json { mime, .. } => mime,
            Body::Parameters { mime, .. } => mime,
            Body::Multipart { mime, .. } => mime,
            Body::Stream { mime, .. } => mime,
        }
    }

    /// The explicitly set media type, if any.
    pub fn mime(&self) -> Option<&Mime> {
        match self {
            Body::Bytes { mime, .. } => mime.as_ref(),
            Body::Text { mime, .. } => mime.as_ref(),
            #[cfg(feature = "json")]
            Body::Json { mime, .. } => mime.as_ref(),
            Body::Parameters { mime, .. } => mime.as_ref(),
            Body::Multipart { mime, .. } => mime.as_ref(),
            Body::Stream { mime, .. } => mime.as_ref(),
        }
    }

    /// The media type implied by the variant when none is set.
    pub fn default_mime(&self) -> Mime {
        match self {
            Body::Bytes { .. } => mediatypes::application_octet_stream(),
            Body::Text { .. } => mediatypes::text_plain().with_parameter("charset", "utf-8"),
            #[cfg(feature = "json")]
            Body::Json { .. } => mediatypes::application_json(),
            Body::Parameters { .. } => mediatypes::application_x_www_form_urlencoded(),
            Body::Multipart { .. } => {
                mediatypes::multipart_form_data().with_parameter("boundary", DEFAULT_BOUNDARY)
            }
            Body::Stream { .. } => mediatypes::application_octet_stream(),
        }
    }

    fn boundary(&self) -> String {
        self.mime()
            .and_then(|m| m.boundary())
            .unwrap_or(DEFAULT_BOUNDARY)
            .to_string()
    }

    /// Serialise the body to bytes. Stream bodies drain a fresh source.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        match self {
            Body::Bytes { data, .. } => Ok(data.clone()),
            Body::Text { text, .. } => Ok(text.clone().into_bytes()),
            #[cfg(feature = "json")]
            Body::Json { value, .. } => Ok(serde_json::to_vec(value).unwrap_or_default()),
            Body::Parameters { parameters, .. } => Ok(parameters.to_string().into_bytes()),
            Body::Multipart { parts, .. } => {
                let boundary = self.boundary();
                let mut bytes = Vec::new();
                for part in parts {
                    bytes.extend(format!("--{}\r\n", boundary).into_bytes());
                    bytes.extend(part.headers.to_string().into_bytes());
                    bytes.extend(b"\r\n");
                    if let Some(body) = &part.body {
                        bytes.extend(body.to_bytes()?);
                    }
                    bytes.extend(b"\r\n");
                }
                bytes.extend(format!("--{}--\r\n", boundary).into_bytes());
                Ok(bytes)
            }
            Body::Stream { source, .. } => {
                let mut bytes = Vec::new();
                source().read_to_end(&mut bytes)?;
                Ok(bytes)
            }
        }
    }

    /// Open a fresh byte source over the body content.
    pub fn open(&self) -> Result<ByteSource, Error> {
        match self {
            Body::Stream { source, .. } => Ok(source()),
            _ => Ok(Box::new(io::Cursor::new(self.to_bytes()?))),
        }
    }

    /// The body length in bytes. Stream bodies drain a fresh source to
    /// count it.
    pub fn content_length(&self) -> Result<u64, Error> {
        match self {
            Body::Bytes { data, .. } => Ok(data.len() as u64),
            Body::Text { text, .. } => Ok(text.len() as u64),
            Body::Stream { source, .. } => Ok(io::copy(&mut source(), &mut io::sink())?),
            _ => Ok(self.to_bytes()?.len() as u64),
        }
    }

    /// The body as text, decoded per the `charset` media-type parameter
    /// (UTF-8 by default). Stream bodies are refused.
    pub fn as_text(&self) -> Result<String, Error> {
        match self {
            Body::Text { text, .. } => Ok(text.clone()),
            Body::Stream { .. } => Err(Error::UnsupportedOperation(
                "stream body has no in-memory text".to_string(),
            )),
            _ => {
                let charset = self
                    .mime()
                    .and_then(|m| m.charset())
                    .map(|c| c.to_ascii_lowercase());
                decode(&self.to_bytes()?, charset.as_deref())
            }
        }
    }

    /// The body as a JSON value. Bytes and text bodies are parsed;
    /// other variants are refused.
    #[cfg(feature = "json")]
    pub fn as_json(&self) -> Result<serde_json::Value, Error> {
        match self {
            Body::Json { value, .. } => Ok(value.clone()),
            Body::Bytes { data, .. } => serde_json::from_slice(data)
                .map_err(|e| Error::malformed_input("json", &e.to_string())),
            Body::Text { text, .. } => serde_json::from_str(text)
                .map_err(|e| Error::malformed_input("json", &e.to_string())),
            _ => Err(Error::UnsupportedOperation(
                "body is not json".to_string(),
            )),
        }
    }

    /// Look up a form parameter. Only parameter bodies support this.
    pub fn parameter(&self, name: &str) -> Result<Option<String>, Error> {
        match self {
            Body::Parameters { parameters, .. } => {
                Ok(parameters.get(name).map(|v| v.to_string()))
            }
            _ => Err(Error::UnsupportedOperation(
                "body is not a parameter list".to_string(),
            )),
        }
    }

    /// Set a form parameter. Only parameter bodies support this.
    pub fn put_parameter(&mut self, name: &str, value: &str) -> Result<&mut Self, Error> {
        match self {
            Body::Parameters { parameters, .. } => {
                parameters.put(name, value);
                Ok(self)
            }
            _ => Err(Error::UnsupportedOperation(
                "body is not a parameter list".to_string(),
            )),
        }
    }
}

pub(crate) fn decode(bytes: &[u8], charset: Option<&str>) -> Result<String, Error> {
    match charset {
        None | Some("utf-8") | Some("utf8") | Some("us-ascii") | Some("ascii") => {
            String::from_utf8(bytes.to_vec()).map_err(|_| {
                Error::malformed_input("text", &String::from_utf8_lossy(bytes).into_owned())
            })
        }
        Some("iso-8859-1") | Some("latin1") => Ok(bytes.iter().map(|b| *b as char).collect()),
        Some(other) => Err(Error::UnsupportedOperation(format!(
            "unsupported charset: {}",
            other
        ))),
    }
}

impl Clone for Body {
    fn clone(&self) -> Self {
        match self {
            Body::Bytes { mime, data } => Body::Bytes {
                mime: mime.clone(),
                data: data.clone(),
            },
            Body::Text { mime, text } => Body::Text {
                mime: mime.clone(),
                text: text.clone(),
            },
            #[cfg(feature = "json")]
            Body::Json { mime, value } => Body::Json {
                mime: mime.clone(),
                value: value.clone(),
            },
            Body::Parameters { mime, parameters } => Body::Parameters {
                mime: mime.clone(),
                parameters: parameters.clone(),
            },
            Body::Multipart { mime, parts } => Body::Multipart {
                mime: mime.clone(),
                parts: parts.clone(),
            },
            Body::Stream { mime, source } => Body::Stream {
                mime: mime.clone(),
                source: source.clone(),
            },
        }
    }
}

impl PartialEq for Body {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Body::Bytes { mime: m1, data: d1 },
                Body::Bytes { mime: m2, data: d2 },
            ) => m1 == m2 && d1 == d2,
            (
                Body::Text { mime: m1, text: t1 },
                Body::Text { mime: m2, text: t2 },
            ) => m1 == m2 && t1 == t2,
            #[cfg(feature = "json")]
            (
                Body::Json { mime: m1, value: v1 },
                Body::Json { mime: m2, value: v2 },
            ) => m1 == m2 && v1 == v2,
            (
                Body::Parameters {
                    mime: m1,
                    parameters: p1,
                },
                Body::Parameters {
                    mime: m2,
                    parameters: p2,
                },
            ) => m1 == m2 && p1 == p2,
            (
                Body::Multipart { mime: m1, parts: p1 },
                Body::Multipart { mime: m2, parts: p2 },
            ) => m1 == m2 && p1 == p2,
            // Stream bodies have no comparable content.
            _ => false,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Bytes { mime, data } => f
                .debug_struct("Bytes")
                .field("mime", mime)
                .field("len", &data.len())
                .finish(),
            Body::Text { mime, text } => f
                .debug_struct("Text")
                .field("mime", mime)
                .field("text", text)
                .finish(),
            #[cfg(feature = "json")]
            Body::Json { mime, value } => f
                .debug_struct("Json")
                .field("mime", mime)
                .field("value", value)
                .finish(),
            Body::Parameters { mime, parameters } => f
                .debug_struct("Parameters")
                .field("mime", mime)
                .field("parameters", parameters)
                .finish(),
            Body::Multipart { mime, parts } => f
                .debug_struct("Multipart")
                .field("mime", mime)
                .field("parts", parts)
                .finish(),
            Body::Stream { mime, .. } => f
                .debug_struct("Stream")
                .field("mime", mime)
                .finish(),
        }
    }
}
