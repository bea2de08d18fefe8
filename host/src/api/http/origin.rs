//! Same-origin guard
//!
//! The bridge hands out a root shell, so only pages served by this host may
//! reach it. A foreign site open in the same browser is rejected by `Origin`;
//! the host name must also be one a rebinding DNS name cannot claim.

use std::net::IpAddr;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderValue};
use tracing::warn;
use webui_bridge::Error;

use crate::error::ApiError;
use crate::{AppState, Config};

/// Extractor that rejects requests from a foreign `Origin`.
///
/// Requests without `Origin` (non-browser clients) pass.
pub struct SameOrigin;

impl FromRequestParts<AppState> for SameOrigin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Some(origin) = parts.headers.get(header::ORIGIN) else {
            return Ok(SameOrigin);
        };
        if origin_allowed(origin, parts, &state.config) {
            Ok(SameOrigin)
        } else {
            let origin = String::from_utf8_lossy(origin.as_bytes()).into_owned();
            warn!("Rejecting request from foreign origin {}", origin);
            Err(Error::OriginRejected(origin).into())
        }
    }
}

/// Whether `origin` is the host the request was sent to
pub fn origin_allowed(origin: &HeaderValue, parts: &Parts, config: &Config) -> bool {
    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok());
    match origin.to_str() {
        Ok(origin) => is_same_origin(origin, host, config),
        Err(_) => false,
    }
}

fn is_same_origin(origin: &str, host: Option<&str>, config: &Config) -> bool {
    let Some(host) = host else {
        return false;
    };
    let Some(authority) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };
    authority.eq_ignore_ascii_case(host) && is_trusted_name(host_name(host), config)
}

fn host_name(authority: &str) -> &str {
    if let Some(rest) = authority.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match authority.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => authority,
    }
}

fn is_trusted_name(name: &str, config: &Config) -> bool {
    name.parse::<IpAddr>().is_ok()
        || name.eq_ignore_ascii_case("localhost")
        || name.eq_ignore_ascii_case(&config.http_host)
}
