//! Geo-IP lookup against an ip.sb-compatible HTTP API.
//!
//! Domains are resolved first and the resolved address is what gets
//! geolocated; callers keep storing the host exactly as entered.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::domain::entry::GeoInfo;
use crate::domain::error::GeoError;
use crate::ports::outbound::GeoLocator;

/// Default lookup endpoint; the address is appended as the last path segment.
pub const DEFAULT_ENDPOINT: &str = "https://api.ip.sb/geoip";

// ip.sb rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";

pub struct IpSbLocator {
    client: Client,
    endpoint: String,
}

impl IpSbLocator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GeoError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GeoError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, ip: IpAddr) -> String {
        format!("{}/{}", self.endpoint, ip)
    }
}

#[async_trait]
impl GeoLocator for IpSbLocator {
    async fn locate(&self, host: &str) -> Result<GeoInfo, GeoError> {
        let ip = resolve_host(host).await?;
        let url = self.url_for(ip);
        debug!(host, %ip, %url, "Looking up geo-ip");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GeoError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status.as_u16()));
        }

        response
            .json::<GeoInfo>()
            .await
            .map_err(|e| GeoError::Decode(e.to_string()))
    }
}

/// Resolve `host` to a single address. IP literals (optionally bracketed
/// IPv6) are returned as-is; names go through the system resolver and an
/// IPv4 answer is preferred.
pub async fn resolve_host(host: &str) -> Result<IpAddr, GeoError> {
    let host = host.trim();
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if let Ok(ip) = bare.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((bare, 0))
        .await
        .map_err(|e| GeoError::Resolve {
            host: bare.to_string(),
            reason: e.to_string(),
        })?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .map(SocketAddr::ip)
        .ok_or_else(|| GeoError::NoAddress(bare.to_string()))
}
