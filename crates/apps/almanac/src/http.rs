//! Transport-independent request and response types
//!
//! Handlers only see these, so they can be exercised without a socket.

use url::form_urlencoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Decoded `application/x-www-form-urlencoded` body
    pub form: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Build from a request target such as `/edition/?id=abc`
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Self {
            method,
            path: path.to_string(),
            query: parse_pairs(query),
            form: Vec::new(),
            cookies: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn with_form_body(mut self, body: &str) -> Self {
        self.form = parse_pairs(body);
        self
    }

    /// Parse a `Cookie` header value
    pub fn with_cookie_header(mut self, header: &str) -> Self {
        for part in header.split(';') {
            if let Some((name, value)) = part.trim().split_once('=') {
                self.cookies.push((name.to_string(), value.to_string()));
            }
        }
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Header lookup, ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        lookup(&self.query, name)
    }

    pub fn form_param(&self, name: &str) -> Option<&str> {
        lookup(&self.form, name)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        lookup(&self.cookies, name)
    }
}

fn parse_pairs(s: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(s.as_bytes()).into_owned().collect()
}

fn lookup<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Reply {
    pub fn html(status: u16, body: String) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "text/html; charset=utf-8".to_string())],
            body,
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// 302 to `location`
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::empty(302).with_header("Location", location)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn with_etag(self, etag: &str) -> Self {
        self.with_header("ETag", format!("\"{}\"", etag))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        let req = HttpRequest::new(Method::Get, "/configure/?return_url=https%3A%2F%2Fx.test%2Fr&error_url=e");
        assert_eq!(req.path, "/configure/");
        assert_eq!(req.query_param("return_url"), Some("https://x.test/r"));
        assert_eq!(req.query_param("error_url"), Some("e"));
        assert_eq!(req.query_param("missing"), None);
    }

    #[test]
    fn test_form_and_cookies() {
        let req = HttpRequest::new(Method::Post, "/mailboxes/")
            .with_form_body("mailbox-1=%5BGmail%5D%2FSent+Mail&metric-1=daily")
            .with_cookie_header("other=1; almanac_session=abc");
        assert_eq!(req.form_param("mailbox-1"), Some("[Gmail]/Sent Mail"));
        assert_eq!(req.cookie("almanac_session"), Some("abc"));
    }

    #[test]
    fn test_redirect() {
        let reply = Reply::redirect("/mailboxes/");
        assert_eq!(reply.status, 302);
        assert_eq!(reply.header("location"), Some("/mailboxes/"));
    }
}
