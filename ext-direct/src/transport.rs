//! Narrow transport abstraction.
//!
//! The router never touches a socket: the host server parses the HTTP
//! request (headers, body, form fields, multipart uploads, cookies) into a
//! [`DirectRequest`] and emits the returned [`DirectResponse`] however it
//! likes. Keeping the boundary at plain structs makes the routing core
//! host-framework agnostic.

use std::collections::BTreeMap;

/// Content type of JSON call batches.
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Content type of descriptor publish responses.
pub const CONTENT_TYPE_JAVASCRIPT: &str = "text/javascript";
/// Content type of upload responses (textarea-wrapped JSON).
pub const CONTENT_TYPE_HTML: &str = "text/html";

/// An uploaded file accompanying a multipart form submission.
///
/// The host server is expected to have buffered the part body already; the
/// router hands the handle to form handlers verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field the file was posted under.
    pub field_name: String,
    /// Client-side file name.
    pub file_name: String,
    /// Declared content type of the part.
    pub content_type: String,
    /// Buffered file contents.
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Create an upload handle.
    pub fn new(
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Size of the buffered contents in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A transport request, pre-parsed by the host server.
#[derive(Debug, Clone, Default)]
pub struct DirectRequest {
    /// The `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// Raw request body. Only consulted for JSON requests.
    pub body: String,
    /// Parsed form fields. Only consulted for form requests.
    pub form: BTreeMap<String, String>,
    /// Uploaded files keyed by form field name.
    pub uploads: BTreeMap<String, UploadedFile>,
    /// Request cookies.
    pub cookies: BTreeMap<String, String>,
}

impl DirectRequest {
    /// A JSON call request with the given body.
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            content_type: Some(CONTENT_TYPE_JSON.to_string()),
            body: body.into(),
            ..Self::default()
        }
    }

    /// A url-encoded form request with the given parsed fields.
    pub fn form<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            content_type: Some("application/x-www-form-urlencoded".to_string()),
            form: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// A multipart form request with the given parsed fields.
    pub fn multipart<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            content_type: Some("multipart/form-data; boundary=----direct".to_string()),
            form: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Attach an uploaded file.
    pub fn with_upload(mut self, file: UploadedFile) -> Self {
        self.uploads.insert(file.field_name.clone(), file);
        self
    }

    /// Attach a request cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }
}

/// A cookie set on the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Cookie path.
    pub path: String,
}

/// A transport response for the host server to emit.
#[derive(Debug, Clone, Default)]
pub struct DirectResponse {
    /// Response content type.
    pub content_type: String,
    /// Response body.
    pub body: String,
    /// Additional response headers.
    pub headers: Vec<(String, String)>,
    /// Cookies to set.
    pub cookies: Vec<SetCookie>,
}

impl DirectResponse {
    fn with_content_type(content_type: &str, body: String) -> Self {
        Self {
            content_type: content_type.to_string(),
            body,
            headers: Vec::new(),
            cookies: Vec::new(),
        }
    }

    /// An `application/json` response.
    pub fn json(body: impl Into<String>) -> Self {
        Self::with_content_type(CONTENT_TYPE_JSON, body.into())
    }

    /// A `text/javascript` response.
    pub fn javascript(body: impl Into<String>) -> Self {
        Self::with_content_type(CONTENT_TYPE_JAVASCRIPT, body.into())
    }

    /// A `text/html` response.
    pub fn html(body: impl Into<String>) -> Self {
        Self::with_content_type(CONTENT_TYPE_HTML, body.into())
    }

    /// Append a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append a response cookie on path `/`.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push(SetCookie {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
        });
        self
    }

    /// Look up a response header by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}
