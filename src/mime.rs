//! Media types: `type "/" subtype ( ";" parameter )*`.
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::grammar;

/// A MIME media type with its ordered parameter list.
///
/// # Example
/// ```
/// use pipehttp::mime::Mime;
///
/// let mime = Mime::parse("text/html; charset=UTF-8").unwrap();
/// assert_eq!(mime.essence(), "text/html");
/// assert_eq!(mime.charset(), Some("UTF-8"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mime {
    kind: String,
    subtype: String,
    parameters: Vec<(String, String)>,
}

impl Mime {
    /// Build a parameterless media type without validation.
    pub fn new(kind: &str, subtype: &str) -> Self {
        Mime {
            kind: kind.to_string(),
            subtype: subtype.to_string(),
            parameters: Vec::new(),
        }
    }

    /// Parse a media type. Parameter values may be tokens or quoted
    /// strings; quotes are kept as given.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let caps = grammar::MEDIA_TYPE
            .captures(s.trim())
            .ok_or_else(|| Error::malformed_input("media-type", s))?;
        let mut mime = Mime::new(&caps["type"], &caps["subtype"]);
        if let Some(params) = caps.name("params") {
            for param in grammar::MEDIA_TYPE_PARAMETER.captures_iter(params.as_str()) {
                mime.parameters
                    .push((param["name"].to_string(), param["value"].to_string()));
            }
        }
        Ok(mime)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// The `type/subtype` part, without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.kind, self.subtype)
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| &v[..])
    }

    pub fn put_parameter(&mut self, name: &str, value: &str) -> &mut Self {
        match self
            .parameters
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.to_string(),
            None => self
                .parameters
                .push((name.to_string(), value.to_string())),
        }
        self
    }

    pub fn remove_parameter(&mut self, name: &str) -> Option<String> {
        match self
            .parameters
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(index) => Some(self.parameters.remove(index).1),
            None => None,
        }
    }

    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        self.put_parameter(name, value);
        self
    }

    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    pub fn matches(&self, kind: &str, subtype: &str) -> bool {
        self.kind.eq_ignore_ascii_case(kind) && self.subtype.eq_ignore_ascii_case(subtype)
    }
}

impl fmt::Display for Mime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (name, value) in &self.parameters {
            write!(f, "; {}={}", name, value)?;
        }
        Ok(())
    }
}

impl FromStr for Mime {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mime::parse(s)
    }
}

/// Define a constructor for a well-known media type.
#[macro_export]
macro_rules! media_type {
    ( $i:ident, $t:literal, $s:literal ) => {
        pub fn $i() -> $crate::mime::Mime {
            $crate::mime::Mime::new($t, $s)
        }
    };
}

/// Constructors for common media types.
pub mod mediatypes {
    media_type!(application_gzip, "application", "gzip");
    media_type!(application_json, "application", "json");
    media_type!(application_ld_json, "application", "ld+json");
    media_type!(application_octet_stream, "application", "octet-stream");
    media_type!(application_pdf, "application", "pdf");
    media_type!(application_rtf, "application", "rtf");
    media_type!(application_xhtml_xml, "application", "xhtml+xml");
    media_type!(application_xml, "application", "xml");
    media_type!(application_x_tar, "application", "x-tar");
    media_type!(application_zip, "application", "zip");
    media_type!(
        application_x_www_form_urlencoded,
        "application",
        "x-www-form-urlencoded"
    );
    media_type!(audio_aac, "audio", "aac");
    media_type!(audio_mpeg, "audio", "mpeg");
    media_type!(audio_ogg, "audio", "ogg");
    media_type!(audio_wav, "audio", "wav");
    media_type!(font_otf, "font", "otf");
    media_type!(font_ttf, "font", "ttf");
    media_type!(font_woff, "font", "woff");
    media_type!(font_woff2, "font", "woff2");
    media_type!(image_bmp, "image", "bmp");
    media_type!(image_gif, "image", "gif");
    media_type!(image_jpeg, "image", "jpeg");
    media_type!(image_png, "image", "png");
    media_type!(image_svg_xml, "image", "svg+xml");
    media_type!(image_tiff, "image", "tiff");
    media_type!(image_webp, "image", "webp");
    media_type!(multipart_byteranges, "multipart", "byteranges");
    media_type!(multipart_form_data, "multipart", "form-data");
    media_type!(multipart_mixed, "multipart", "mixed");
    media_type!(text_calendar, "text", "calendar");
    media_type!(text_css, "text", "css");
    media_type!(text_csv, "text", "csv");
    media_type!(text_html, "text", "html");
    media_type!(text_javascript, "text", "javascript");
    media_type!(text_plain, "text", "plain");
    media_type!(video_mp4, "video", "mp4");
    media_type!(video_mpeg, "video", "mpeg");
    media_type!(video_ogg, "video", "ogg");
    media_type!(video_webm, "video", "webm");
}
