//! Session cookie middleware
//!
//! Every request gets a [`SessionId`] in its extensions. A caller without a
//! valid `tps_session` cookie is issued a fresh one on the response.

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::state_store::SessionId;

pub const SESSION_COOKIE: &str = "tps_session";

/// Session id from a `Cookie` header, if present and well-formed
pub fn session_from_headers(headers: &axum::http::HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionId::parse(value))
}

pub async fn session_middleware(mut request: Request, next: Next) -> Response {
    let existing = session_from_headers(request.headers());
    let is_new = existing.is_none();
    let session = existing.unwrap_or_else(SessionId::generate);

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;

    if is_new {
        debug!(session = %session, "Issued new session");
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, session);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}
