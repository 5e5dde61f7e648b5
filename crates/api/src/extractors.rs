//! Request extractors.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

/// Explicit caller identity header.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity used when no header identifies the caller.
pub const UNKNOWN_IDENTITY: &str = "unknown";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Client IP address.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

impl ClientIp {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        // X-Forwarded-For first (proxied requests), first hop only
        if let Some(xff) = header_str(headers, "x-forwarded-for") {
            if let Some(ip) = xff.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
                return ClientIp(Some(ip.to_string()));
            }
        }

        ClientIp(header_str(headers, "x-real-ip").map(String::from))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Who the request is rate limited as.
///
/// `x-user-id` wins over the client IP; with neither the caller is
/// `"unknown"`.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub key: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

impl ClientIdentity {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ClientIp(ip) = ClientIp::from_headers(headers);

        let key = header_str(headers, USER_ID_HEADER)
            .map(String::from)
            .or_else(|| ip.clone())
            .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string());

        Self {
            key,
            ip,
            user_agent: header_str(headers, header::USER_AGENT.as_str()).map(String::from),
            referer: header_str(headers, header::REFERER.as_str()).map(String::from),
        }
    }

    /// IP for tracking metadata, `"unknown"` when absent.
    pub fn ip_or_unknown(&self) -> &str {
        self.ip.as_deref().unwrap_or(UNKNOWN_IDENTITY)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
