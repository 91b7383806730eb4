//! Authenticated session against one cluster node
//!
//! Connection flow mirrors what the cluster expects: log in to the configured
//! host, enumerate member nodes, prefer each node's floating address over its
//! fixed one, then bind the session to a randomly chosen address so parallel
//! crawls spread across the cluster. The bearer token from login is valid on
//! every node.
//!
//! TLS verification is disabled: clusters ship an internal certificate that
//! no local trust store knows. Operational risk, accepted deliberately.

use crate::config::CrawlConfig;
use crate::error::{ApiError, ApiResult};
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    bearer_token: String,
}

#[derive(Deserialize)]
struct ClusterNode {
    id: u64,
}

#[derive(Deserialize)]
struct InterfaceStatus {
    network_statuses: Vec<NetworkStatus>,
}

#[derive(Deserialize)]
struct NetworkStatus {
    address: String,
    #[serde(default)]
    floating_addresses: Vec<String>,
}

/// Shared HTTPS session carrying the bearer token for one cluster node
#[derive(Debug, Clone)]
pub struct ApiSession {
    client: Client,
    token: String,
    base_url: String,
}

impl ApiSession {
    /// Authenticate against `host` and return a ready session bound to it
    pub fn login(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        timeout: Option<Duration>,
        pool_size: usize,
    ) -> ApiResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .pool_max_idle_per_host(pool_size)
            .timeout(timeout)
            .build()?;

        let url = format!("https://{host}:{port}/v1/session/login");
        let resp = client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::AuthenticationFailed {
                user: username.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body: LoginResponse = resp.json()?;
        Ok(Self {
            client,
            token: body.bearer_token,
            base_url: format!("https://{host}:{port}"),
        })
    }

    /// GET `route` under the session's base URL and decode the JSON body
    pub(crate) fn get<T: DeserializeOwned>(&self, route: &str) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, route);
        let resp = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(resp.json()?)
    }

    /// Reachable address per cluster node, floating address preferred
    pub fn cluster_addresses(&self) -> ApiResult<Vec<String>> {
        let nodes: Vec<ClusterNode> = self.get("/v1/cluster/nodes/")?;
        let mut addresses = Vec::with_capacity(nodes.len());
        for node in nodes {
            let route = format!("/v2/network/interfaces/1/status/{}", node.id);
            let status: InterfaceStatus = self.get(&route)?;
            let addr = preferred_address(&status).ok_or_else(|| ApiError::Decode {
                url: route.clone(),
                reason: format!("node {} reported no network status", node.id),
            })?;
            addresses.push(addr.to_string());
        }
        Ok(addresses)
    }

    /// Same credentials and client, bound to a different node address
    pub fn rebind(&self, address: &str, port: u16) -> Self {
        Self {
            client: self.client.clone(),
            token: self.token.clone(),
            base_url: format!("https://{address}:{port}"),
        }
    }
}

fn preferred_address(status: &InterfaceStatus) -> Option<&str> {
    let first = status.network_statuses.first()?;
    match first.floating_addresses.first() {
        Some(floating) => Some(floating),
        None => Some(&first.address),
    }
}

/// Authenticate, enumerate the cluster, and bind to one random node.
/// Returns the chosen address alongside the session.
pub fn connect(config: &CrawlConfig) -> ApiResult<(String, ApiSession)> {
    let session = ApiSession::login(
        &config.host,
        config.port,
        &config.username,
        &config.password,
        config.request_timeout,
        config.pool_size(),
    )?;

    let addresses = session.cluster_addresses()?;
    if addresses.is_empty() {
        return Err(ApiError::NoAddresses {
            cluster: config.host.clone(),
        });
    }
    debug!(count = addresses.len(), "discovered cluster node addresses");

    let chosen = &addresses[rand::rng().random_range(0..addresses.len())];
    info!(node = %chosen, "crawling via cluster node");
    Ok((chosen.clone(), session.rebind(chosen, config.port)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_address_takes_floating() {
        let status = InterfaceStatus {
            network_statuses: vec![NetworkStatus {
                address: "10.1.0.11".to_string(),
                floating_addresses: vec!["10.1.0.101".to_string(), "10.1.0.102".to_string()],
            }],
        };
        assert_eq!(preferred_address(&status), Some("10.1.0.101"));
    }

    #[test]
    fn test_preferred_address_falls_back_to_fixed() {
        let status = InterfaceStatus {
            network_statuses: vec![NetworkStatus {
                address: "10.1.0.11".to_string(),
                floating_addresses: vec![],
            }],
        };
        assert_eq!(preferred_address(&status), Some("10.1.0.11"));
    }

    #[test]
    fn test_preferred_address_empty_status() {
        let status = InterfaceStatus {
            network_statuses: vec![],
        };
        assert_eq!(preferred_address(&status), None);
    }

    #[test]
    fn test_interface_status_decodes_without_floating_field() {
        // Older clusters omit floating_addresses entirely
        let status: InterfaceStatus = serde_json::from_str(
            r#"{"network_statuses": [{"address": "10.1.0.11"}]}"#,
        )
        .unwrap();
        assert_eq!(preferred_address(&status), Some("10.1.0.11"));
    }

    #[test]
    fn test_cluster_node_decode() {
        let nodes: Vec<ClusterNode> =
            serde_json::from_str(r#"[{"id": 1, "node_status": "online"}, {"id": 2}]"#).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, 1);
    }
}
