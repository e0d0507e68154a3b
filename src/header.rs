//! HTTP header block: insertion-ordered, case-insensitive lookup,
//! case-preserving storage.
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::grammar;
use crate::mime::Mime;

/// An ordered mapping of field name to field value.
///
/// Lookup compares names ASCII-case-insensitively; the casing seen
/// first is kept for serialisation. Values are stored as given; `parse`
/// validates whole header lines against the RFC 7230 grammar.
///
/// # Example
/// ```
/// use pipehttp::header::Headers;
///
/// let mut headers = Headers::new();
/// headers.put("Content-Type", "text/plain");
/// assert_eq!(headers.get("content-type"), Some("text/plain"));
/// assert_eq!(headers.to_string(), "Content-Type: text/plain\r\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Headers(Vec::new())
    }

    /// Parse a header block: `field-name ":" OWS field-value OWS` lines
    /// separated by CRLF. A trailing CRLF is tolerated.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let mut headers = Headers::new();
        for line in s.split("\r\n") {
            if line.is_empty() {
                continue;
            }
            let caps = grammar::HEADER_LINE
                .captures(line)
                .ok_or_else(|| Error::malformed_input("header", line))?;
            headers
                .0
                .push((caps["name"].to_string(), caps["value"].trim().to_string()));
        }
        Ok(headers)
    }

    /// Wrap pairs without validation.
    pub fn raw(pairs: Vec<(String, String)>) -> Self {
        Headers(pairs)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| &v[..])
    }

    /// Set `name` to `value`. An existing entry keeps its position and
    /// its original casing.
    pub fn put(&mut self, name: &str, value: &str) -> &mut Self {
        match self
            .0
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.to_string(),
            None => self.0.push((name.to_string(), value.to_string())),
        }
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        match self.0.iter().position(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(index) => Some(self.0.remove(index).1),
            None => None,
        }
    }

    pub fn compute<F>(&mut self, name: &str, op: F) -> &mut Self
    where
        F: FnOnce(Option<&str>) -> Option<String>,
    {
        match op(self.get(name)) {
            Some(value) => {
                self.put(name, &value);
            }
            None => {
                self.remove(name);
            }
        }
        self
    }

    pub fn compute_if_absent<F>(&mut self, name: &str, supplier: F) -> &mut Self
    where
        F: FnOnce() -> String,
    {
        if self.get(name).is_none() {
            let value = supplier();
            self.put(name, &value);
        }
        self
    }

    pub fn compute_if_present<F>(&mut self, name: &str, op: F) -> &mut Self
    where
        F: FnOnce(&str) -> Option<String>,
    {
        if let Some(current) = self.get(name) {
            match op(current) {
                Some(value) => {
                    self.put(name, &value);
                }
                None => {
                    self.remove(name);
                }
            }
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<(String, String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The parsed `Content-Type` value, if present.
    pub fn content_type(&self) -> Result<Option<Mime>, Error> {
        match self.get("content-type") {
            Some(value) => Ok(Some(Mime::parse(value)?)),
            None => Ok(None),
        }
    }

    /// The parsed `Content-Length` value, if present.
    pub fn content_length(&self) -> Result<Option<u64>, Error> {
        match self.get("content-length") {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| Error::Malformed(format!("invalid content-length: {:?}", value))),
            None => Ok(None),
        }
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.0 {
            write!(f, "{}: {}\r\n", name, value)?;
        }
        Ok(())
    }
}

impl FromStr for Headers {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Headers::parse(s)
    }
}
