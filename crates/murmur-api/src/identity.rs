use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Voter identity used to deduplicate reflections: the first hop of
/// `X-Forwarded-For` when present, else the peer address. This is a
/// best-effort string, not an authenticated identity; the header is only
/// honest behind a trusted proxy.
pub fn voter_identity(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}
