use bytes::Bytes;
use smol_str::SmolStr;
use std::fmt;

use crate::{Headers, Method, RequestLine, Response, StatusLine, Uri};

/// A SIP message fragment per RFC 3420.
///
/// message/sipfrag can represent partial SIP messages containing:
/// - Optional start line (request or status line)
/// - Zero or more complete header fields
/// - Optional message body (with required Content-* headers if present)
///
/// This is commonly used in NOTIFY messages to report the status of
/// referenced requests (e.g., with REFER method).
///
/// # Example
///
/// ```
/// use sip_core::{SipFrag, StatusLine};
/// use smol_str::SmolStr;
///
/// // Status-only fragment (common for REFER notifications)
/// let frag = SipFrag::status_only(200, SmolStr::new("OK".to_owned()));
/// assert_eq!(frag.to_string(), "SIP/2.0 200 OK\r\n");
///
/// // Complete response fragment
/// let status = StatusLine::new(603, SmolStr::new("Declined".to_owned()));
/// let frag = SipFrag::response(status);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipFrag {
    /// Optional start line (request or response)
    pub start_line: Option<StartLine>,
    /// Header fields (may be empty)
    pub headers: Headers,
    /// Optional message body
    pub body: Bytes,
}

/// Start line of a SIP message fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    /// Request line (method, URI, version)
    Request(RequestLine),
    /// Status line (version, code, reason)
    Response(StatusLine),
}

impl SipFrag {
    /// Creates an empty sipfrag with no start line, headers, or body.
    pub fn empty() -> Self {
        Self {
            start_line: None,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Creates a sipfrag containing only a status line (common for REFER notifications).
    ///
    /// # Example
    ///
    /// ```
    /// use sip_core::SipFrag;
    /// use smol_str::SmolStr;
    ///
    /// let frag = SipFrag::status_only(200, SmolStr::new("OK".to_owned()));
    /// assert!(frag.is_response());
    /// ```
    pub fn status_only(code: u16, reason: SmolStr) -> Self {
        Self {
            start_line: Some(StartLine::Response(StatusLine::new(code, reason))),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Creates a sipfrag from a complete response (status line + headers + body).
    ///
    /// This is useful for creating detailed NOTIFY bodies that include
    /// headers from the referenced request.
    pub fn from_response(response: Response) -> Self {
        Self {
            start_line: Some(StartLine::Response(response.start)),
            headers: response.headers,
            body: response.body,
        }
    }

    /// Creates a sipfrag with a response status line and headers.
    pub fn response(status: StatusLine) -> Self {
        Self {
            start_line: Some(StartLine::Response(status)),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Creates a sipfrag with a request line.
    pub fn request(request_line: RequestLine) -> Self {
        Self {
            start_line: Some(StartLine::Request(request_line)),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Creates a sipfrag with only headers (no start line or body).
    pub fn headers_only(headers: Headers) -> Self {
        Self {
            start_line: None,
            headers,
            body: Bytes::new(),
        }
    }

    /// Adds a header field to the fragment.
    pub fn with_header(mut self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.headers.push(name.into(), value.into());
        self
    }

    /// Sets the message body.
    ///
    /// If a body is provided, you should also include appropriate headers
    /// like Content-Type and Content-Length per RFC 3420.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns true if this fragment represents a response.
    pub fn is_response(&self) -> bool {
        matches!(self.start_line, Some(StartLine::Response(_)))
    }

    /// Returns true if this fragment represents a request.
    pub fn is_request(&self) -> bool {
        matches!(self.start_line, Some(StartLine::Request(_)))
    }

    /// Returns the status code if this is a response fragment.
    pub fn status_code(&self) -> Option<u16> {
        match &self.start_line {
            Some(StartLine::Response(status)) => Some(status.code),
            _ => None,
        }
    }

    /// Returns the method if this is a request fragment.
    pub fn method(&self) -> Option<&Method> {
        match &self.start_line {
            Some(StartLine::Request(req)) => Some(&req.method),
            _ => None,
        }
    }

    /// Returns the request URI if this is a request fragment.
    pub fn request_uri(&self) -> Option<&Uri> {
        match &self.start_line {
            Some(StartLine::Request(req)) => Some(&req.uri),
            _ => None,
        }
    }
}

impl fmt::Display for SipFrag {
    /// Formats the sipfrag as a message/sipfrag body per RFC 3420.
    ///
    /// Uses CRLF line endings per SIP specification.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Start line (if present)
        if let Some(start_line) = &self.start_line {
            match start_line {
                StartLine::Request(req) => {
                    write!(f, "{} {} {}\r\n", req.method.as_str(), req.uri, req.version)?;
                }
                StartLine::Response(status) => {
                    write!(
                        f,
                        "{} {} {}\r\n",
                        status.version, status.code, status.reason
                    )?;
                }
            }
        }

        // Headers
        for header in self.headers.iter() {
            write!(f, "{}: {}\r\n", header.name, header.value)?;
        }

        // Body (if present, must include blank line separator)
        if !self.body.is_empty() {
            write!(f, "\r\n")?; // Blank line separates headers from body
            f.write_str(&String::from_utf8_lossy(&self.body))?;
        }

        Ok(())
    }
}
