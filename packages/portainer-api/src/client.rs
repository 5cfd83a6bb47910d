//! API Client
//!
//! HTTP client for communicating with a Portainer server.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::adapter::StackApi;
use crate::error::{Error, Result};
use crate::models::{
    AuthRequest, AuthResponse, CreateStackFromRepository, CreateStackFromString, Endpoint,
    EnvVar, ErrorBody, RepositorySource, Stack, SwarmInfo, UpdateStack,
};

/// Portainer stack type for swarm stacks
const SWARM_STACK_TYPE: u8 = 1;

pub struct PortainerClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl PortainerClient {
    /// Create a client for the given server address.
    ///
    /// Addresses without a scheme are assumed to be `https://`. With
    /// `insecure` set, TLS certificates are not verified.
    pub fn new(address: &str, insecure: bool) -> Result<Self> {
        let base_url = normalize_address(address)?;

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .user_agent(concat!("drone-portainer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        debug!(base_url = %base_url, insecure, "Portainer client created");

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Normalized server address, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if a token was obtained
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Authenticated GET request
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| Error::api(Method::GET, &url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::api(Method::GET, &url, status));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::api(Method::GET, &url, format!("invalid response body: {}", e)))
    }

    /// Authenticated request with a JSON body. The error is a human readable
    /// reason for the caller to wrap.
    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> std::result::Result<(), String> {
        let url = self.url(path);
        let response = self
            .authorized(self.client.request(method.clone(), &url))
            .json(body)
            .send()
            .await
            .map_err(|e| format!("{} {}: {}", method, url, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let reason = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body.describe(),
            Err(_) => None,
        };

        match reason {
            Some(reason) => Err(format!("{} {} {}: {}", method, url, status, reason)),
            None => Err(format!("{} {} {}", method, url, status)),
        }
    }
}

#[async_trait]
impl StackApi for PortainerClient {
    async fn connect(&self) -> Result<()> {
        let url = self.url("/");
        let response = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(|e| Error::Connectivity {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(Error::Connectivity {
                url,
                reason: status.to_string(),
            });
        }

        debug!(url = %url, status = %status, "Portainer server reachable");
        Ok(())
    }

    async fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        let url = self.url("/api/auth");
        let response = self
            .client
            .post(&url)
            .json(&AuthRequest { username, password })
            .send()
            .await
            .map_err(|e| Error::Auth(format!("POST {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Auth(format!("POST {} {}", url, status)));
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("malformed response from {}: {}", url, e)))?;

        if auth.jwt.is_empty() {
            return Err(Error::Auth(format!("empty token returned by {}", url)));
        }

        self.token = Some(auth.jwt);
        debug!(username = %username, "Authenticated against Portainer");

        Ok(())
    }

    async fn find_endpoint_by_name(&self, name: &str) -> Result<Endpoint> {
        let endpoints: Vec<Endpoint> = self.get_json("/api/endpoints").await?;
        debug!(count = endpoints.len(), "Fetched endpoints");

        let mut endpoint = endpoints
            .into_iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::NotFound {
                kind: "endpoint",
                name: name.to_string(),
            })?;

        let swarm: SwarmInfo = self
            .get_json(&format!("/api/endpoints/{}/docker/swarm", endpoint.id))
            .await?;
        endpoint.cluster_id = Some(swarm.id);

        debug!(
            endpoint_id = endpoint.id,
            cluster_id = ?endpoint.cluster_id,
            "Endpoint resolved"
        );

        Ok(endpoint)
    }

    async fn find_stack_by_name(&self, name: &str) -> Result<Option<Stack>> {
        if name.is_empty() {
            return Err(Error::Configuration("stack name not defined".to_string()));
        }

        let stacks: Vec<Stack> = self.get_json("/api/stacks").await?;
        debug!(count = stacks.len(), "Fetched stacks");

        Ok(stacks.into_iter().find(|s| s.name == name))
    }

    async fn deploy_from_string(
        &self,
        endpoint: &Endpoint,
        name: &str,
        content: &str,
        env: &[EnvVar],
    ) -> Result<()> {
        let body = CreateStackFromString {
            name,
            swarm_id: endpoint.cluster_id.as_deref().unwrap_or_default(),
            stack_file_content: content,
            env,
        };
        let path = format!(
            "/api/stacks?type={}&method=string&endpointId={}",
            SWARM_STACK_TYPE, endpoint.id
        );

        self.send_json(Method::POST, &path, &body)
            .await
            .map_err(|reason| Error::Deploy {
                stack: name.to_string(),
                reason,
            })?;

        debug!(stack = %name, endpoint_id = endpoint.id, "Stack created from string");
        Ok(())
    }

    async fn deploy_from_repository(
        &self,
        endpoint: &Endpoint,
        name: &str,
        repository: &RepositorySource,
        env: &[EnvVar],
    ) -> Result<()> {
        let body = CreateStackFromRepository::new(endpoint, name, repository, env);
        let path = format!(
            "/api/stacks?type={}&method=repository&endpointId={}",
            SWARM_STACK_TYPE, endpoint.id
        );

        self.send_json(Method::POST, &path, &body)
            .await
            .map_err(|reason| Error::Deploy {
                stack: name.to_string(),
                reason,
            })?;

        debug!(
            stack = %name,
            endpoint_id = endpoint.id,
            repository = %repository.url,
            "Stack created from repository"
        );
        Ok(())
    }

    async fn update_from_string(
        &self,
        stack: &Stack,
        content: &str,
        prune: bool,
        env: &[EnvVar],
    ) -> Result<()> {
        let body = UpdateStack {
            stack_file_content: content,
            prune,
            env,
        };
        let path = format!("/api/stacks/{}?endpointId={}", stack.id, stack.endpoint_id);

        self.send_json(Method::PUT, &path, &body)
            .await
            .map_err(|reason| Error::Update {
                stack: stack.name.clone(),
                reason,
            })?;

        debug!(stack = %stack.name, stack_id = stack.id, prune, "Stack updated");
        Ok(())
    }
}

/// Turn a user supplied server address into a base URL.
pub fn normalize_address(address: &str) -> Result<String> {
    let address = address.trim();
    if address.is_empty() {
        return Err(Error::Configuration(
            "Portainer address not defined".to_string(),
        ));
    }

    let candidate = if address.contains("://") {
        address.to_string()
    } else {
        format!("https://{}", address)
    };

    let url = Url::parse(&candidate).map_err(|e| {
        Error::Configuration(format!("invalid Portainer address \"{}\": {}", address, e))
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::Configuration(format!(
                "unsupported scheme \"{}\" in Portainer address \"{}\"",
                other, address
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::Configuration(format!(
            "Portainer address \"{}\" has no host",
            address
        )));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::Configuration(format!(
            "Portainer address \"{}\" must not carry a query or fragment",
            address
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_without_scheme_defaults_to_https() {
        assert_eq!(
            normalize_address("portainer.example.com").unwrap(),
            "https://portainer.example.com"
        );
        assert_eq!(
            normalize_address("portainer.example.com:9000").unwrap(),
            "https://portainer.example.com:9000"
        );
        assert_eq!(
            normalize_address("  10.0.0.5:9443/ ").unwrap(),
            "https://10.0.0.5:9443"
        );
    }

    #[test]
    fn test_explicit_scheme_is_kept() {
        assert_eq!(
            normalize_address("http://portainer:9000/").unwrap(),
            "http://portainer:9000"
        );
        assert_eq!(
            normalize_address("HTTPS://Portainer.Example.com:443").unwrap(),
            "https://portainer.example.com"
        );
        assert_eq!(
            normalize_address("https://example.com/portainer/").unwrap(),
            "https://example.com/portainer"
        );
    }

    #[test]
    fn test_invalid_addresses_are_configuration_errors() {
        for address in [
            "",
            "   ",
            "http://exa mple.com",
            "https://",
            "ftp://files.example.com",
            "https://portainer.example.com/?x=1",
            "portainer.example.com#top",
        ] {
            let err = normalize_address(address).unwrap_err();
            assert!(err.is_configuration(), "{:?} -> {}", address, err);
        }
    }

    #[test]
    fn test_new_client_is_unauthenticated() {
        let client = PortainerClient::new("portainer.local", true).unwrap();
        assert_eq!(client.base_url(), "https://portainer.local");
        assert!(!client.is_authenticated());
    }
}
