use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use super::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Caller address resolved once per request and shared by the rate limiter
/// and the request log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddress(pub Option<IpAddr>);

impl ClientAddress {
    /// Forwarding headers are honoured only when the socket peer is a
    /// configured proxy; otherwise the peer itself is the caller.
    pub(super) fn resolve(
        peer: Option<IpAddr>,
        headers: &HeaderMap,
        trusted_proxies: &HashSet<IpAddr>,
    ) -> Self {
        let Some(peer) = peer else {
            return Self(None);
        };
        if !trusted_proxies.contains(&peer) {
            return Self(Some(peer));
        }

        let mut hops = forwarded_hops(headers);
        hops.push(peer);
        let forwarded = hops
            .into_iter()
            .rev()
            .find(|hop| !trusted_proxies.contains(hop));

        Self(forwarded.or_else(|| real_ip(headers)).or(Some(peer)))
    }

    pub(super) fn rate_limit_subject(self) -> String {
        match self.0 {
            Some(ip) => format!("ip:{ip}"),
            None => "anonymous".to_string(),
        }
    }
}

impl fmt::Display for ClientAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ip) => write!(f, "{ip}"),
            None => f.write_str("unknown"),
        }
    }
}

pub(super) async fn client_address_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let address = ClientAddress::resolve(peer, req.headers(), &state.trusted_proxy_ips);
    req.extensions_mut().insert(address);
    next.run(req).await
}

// Left-to-right as the proxies appended them; unparseable entries are skipped.
fn forwarded_hops(headers: &HeaderMap) -> Vec<IpAddr> {
    headers
        .get_all(FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
        .collect()
}

fn real_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(REAL_IP)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
