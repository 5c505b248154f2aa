//! Outbound relay of one request/response pair.
//!
//! # Responsibilities
//! - Rewrite the request target onto the upstream base URL
//! - Strip hop-by-hop headers in both directions
//! - Rewrite `Host` and append `X-Forwarded-For`
//! - Bound the wait for the upstream response head
//! - Stream both bodies without buffering
//!
//! # Design Decisions
//! - One pooled client shared by every upstream
//! - Outbound requests always use HTTP/1.1
//! - Dropping the returned future aborts the relay and releases the connection

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response, Uri, Version},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::config::TimeoutConfig;
use crate::error::ProxyError;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that apply to a single connection and are never forwarded.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Shared HTTP client plus relay timeout.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    relay_timeout: Duration,
}

impl Forwarder {
    /// Build the pooled client from the timeout configuration.
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeouts.connect()));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            relay_timeout: timeouts.relay(),
        }
    }

    /// Send `request` to the upstream at `base` and return its response.
    pub async fn forward(
        &self,
        base: &Url,
        request: Request<Body>,
    ) -> Result<Response<Body>, ProxyError> {
        let address = base.origin().ascii_serialization();
        let unreachable = |reason: String| ProxyError::UpstreamUnreachable {
            address: address.clone(),
            reason,
        };

        let (mut parts, body) = request.into_parts();
        let client_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let authority = authority(base);
        parts.uri = target_uri(base, &authority, &parts.uri)
            .map_err(|e| unreachable(format!("cannot build request URI: {e}")))?;
        parts.version = Version::HTTP_11;

        strip_hop_by_hop(&mut parts.headers);
        let host = HeaderValue::from_str(&authority)
            .map_err(|e| unreachable(format!("invalid Host value: {e}")))?;
        parts.headers.insert(header::HOST, host);
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut parts.headers, &ip.to_string());
        }

        let outbound = Request::from_parts(parts, body);
        let pending = self.client.request(outbound);
        let response = match tokio::time::timeout(self.relay_timeout, pending).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(classify(&address, &e)),
            Err(_) => {
                return Err(unreachable(format!(
                    "no response within {}s",
                    self.relay_timeout.as_secs_f64()
                )))
            }
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// `host[:port]` of the upstream, as sent in `Host`.
fn authority(base: &Url) -> String {
    let host = base.host_str().unwrap_or_default();
    match base.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Upstream scheme and authority combined with the inbound path and query.
fn target_uri(base: &Url, authority: &str, inbound: &Uri) -> Result<Uri, axum::http::Error> {
    let path_and_query = inbound
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Uri::builder()
        .scheme(base.scheme())
        .authority(authority)
        .path_and_query(path_and_query)
        .build()
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub(crate) fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: &str) {
    let prior: Vec<&str> = headers
        .get_all(&X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let value = if prior.is_empty() {
        ip.to_string()
    } else {
        format!("{}, {}", prior.join(", "), ip)
    };

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Map a client error onto the relay error kinds.
fn classify(address: &str, err: &hyper_util::client::legacy::Error) -> ProxyError {
    let reason = error_chain(err);

    if !err.is_connect() {
        let mut source = err.source();
        while let Some(e) = source {
            if let Some(hyper_err) = e.downcast_ref::<hyper::Error>() {
                if hyper_err.is_parse() || hyper_err.is_parse_status() {
                    return ProxyError::UpstreamProtocolError {
                        address: address.to_string(),
                        reason,
                    };
                }
            }
            source = e.source();
        }
    }

    ProxyError::UpstreamUnreachable {
        address: address.to_string(),
        reason,
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        out.push_str(": ");
        out.push_str(&e.to_string());
        source = e.source();
    }
    out
}
