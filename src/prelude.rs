pub use crate::action::{self, Action, Callback};
pub use crate::body::Body;
pub use crate::call::{Call, Cursor, Extras, State};
pub use crate::client::Client;
pub use crate::engine::ClientEngine;
pub use crate::error::Error;
pub use crate::header::Headers;
pub use crate::middleware::Middleware;
pub use crate::mime::Mime;
pub use crate::pipe::{Next, Pipe};
pub use crate::request::{HttpVersion, Method, Request, RequestLine};
pub use crate::response::{ReasonPhrase, Response, StatusCode, StatusLine};
pub use crate::uri::Uri;
