/// HTTP request methods recognized by the parser.
///
/// The route table only binds GET and POST; the remaining methods parse
/// cleanly and then fail route matching with a 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
}

impl Method {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"GET" => Some(Self::Get),
            b"POST" => Some(Self::Post),
            b"PUT" => Some(Self::Put),
            b"DELETE" => Some(Self::Delete),
            b"HEAD" => Some(Self::Head),
            b"OPTIONS" => Some(Self::Options),
            b"PATCH" => Some(Self::Patch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parsed request line plus the single header the frontend cares about.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub path: String,
    pub content_length: usize,
}

impl RequestHead {
    /// The route name of an `/api/<route>` path, query string ignored.
    ///
    /// Any other path layout is an unmatched-route condition for the
    /// dispatcher, not a parse failure.
    pub fn api_route(&self) -> Option<&str> {
        let path = self.path.split('?').next().unwrap_or("");
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        match (segments.next(), segments.next(), segments.next()) {
            (Some("api"), Some(route), None) => Some(route),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(method: Method, path: &str) -> RequestHead {
        RequestHead {
            method,
            path: path.to_string(),
            content_length: 0,
        }
    }

    #[test]
    fn api_route_extraction() {
        assert_eq!(head(Method::Post, "/api/userLogin").api_route(), Some("userLogin"));
        assert_eq!(head(Method::Get, "/api/instanceEnumerateAll").api_route(), Some("instanceEnumerateAll"));
        assert_eq!(head(Method::Post, "/api/userLogin?x=1").api_route(), Some("userLogin"));
    }

    #[test]
    fn non_api_paths_rejected() {
        assert_eq!(head(Method::Get, "/").api_route(), None);
        assert_eq!(head(Method::Get, "/api").api_route(), None);
        assert_eq!(head(Method::Get, "/api/").api_route(), None);
        assert_eq!(head(Method::Get, "/other/userLogin").api_route(), None);
        assert_eq!(head(Method::Get, "/api/user/extra").api_route(), None);
    }

    #[test]
    fn method_round_trip() {
        for (token, method) in [
            (&b"GET"[..], Method::Get),
            (&b"POST"[..], Method::Post),
            (&b"DELETE"[..], Method::Delete),
        ] {
            assert_eq!(Method::from_bytes(token), Some(method));
            assert_eq!(method.as_str().as_bytes(), token);
        }
        assert_eq!(Method::from_bytes(b"BREW"), None);
    }
}
