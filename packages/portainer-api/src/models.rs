//! API Models
//!
//! Wire types exchanged with the Portainer API. Portainer uses PascalCase
//! field names, with a few upper-case acronyms (`URL`, `SwarmID`).

use serde::{Deserialize, Deserializer, Serialize};

/// A stack environment variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A registered execution environment (swarm cluster or single host)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub endpoint_type: i64,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "GroupId")]
    pub group_id: i64,
    #[serde(rename = "PublicURL")]
    pub public_url: String,
    /// Swarm cluster identifier, filled in after the endpoint is selected
    #[serde(rename = "SwarmID", skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
}

/// A deployed stack as reported by `GET /api/stacks`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stack {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub stack_type: i64,
    #[serde(rename = "EndpointID", alias = "EndpointId")]
    pub endpoint_id: i64,
    #[serde(rename = "EntryPoint", deserialize_with = "null_as_default")]
    pub entry_point: String,
    #[serde(rename = "SwarmID", alias = "SwarmId", deserialize_with = "null_as_default")]
    pub cluster_id: String,
    #[serde(rename = "ProjectPath", deserialize_with = "null_as_default")]
    pub project_path: String,
    #[serde(rename = "Env", deserialize_with = "null_as_default")]
    pub env: Vec<EnvVar>,
}

/// Git repository holding a compose file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySource {
    pub url: String,
    /// Compose file path inside the repository
    pub compose_file: String,
    pub credentials: Option<RepositoryCredentials>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryCredentials {
    pub username: String,
    pub password: String,
}

// Request bodies

#[derive(Debug, Serialize)]
pub(crate) struct AuthRequest<'a> {
    #[serde(rename = "Username")]
    pub username: &'a str,
    #[serde(rename = "Password")]
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub jwt: String,
}

/// Error payload Portainer returns alongside non-success statuses
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn describe(self) -> Option<String> {
        match (self.message, self.details) {
            (Some(message), Some(details)) if !details.is_empty() && details != message => {
                Some(format!("{} ({})", message, details))
            }
            (Some(message), _) if !message.is_empty() => Some(message),
            (_, Some(details)) if !details.is_empty() => Some(details),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SwarmInfo {
    #[serde(rename = "ID")]
    pub id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateStackFromString<'a> {
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "SwarmID")]
    pub swarm_id: &'a str,
    #[serde(rename = "StackFileContent")]
    pub stack_file_content: &'a str,
    #[serde(rename = "Env")]
    pub env: &'a [EnvVar],
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateStackFromRepository<'a> {
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "SwarmID")]
    pub swarm_id: &'a str,
    #[serde(rename = "RepositoryURL")]
    pub repository_url: &'a str,
    #[serde(rename = "ComposeFilePathInRepository")]
    pub compose_file_path: &'a str,
    #[serde(rename = "RepositoryAuthentication")]
    pub repository_authentication: bool,
    #[serde(rename = "RepositoryUsername")]
    pub repository_username: &'a str,
    #[serde(rename = "RepositoryPassword")]
    pub repository_password: &'a str,
    #[serde(rename = "Env")]
    pub env: &'a [EnvVar],
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateStack<'a> {
    #[serde(rename = "StackFileContent")]
    pub stack_file_content: &'a str,
    #[serde(rename = "Prune")]
    pub prune: bool,
    #[serde(rename = "Env")]
    pub env: &'a [EnvVar],
}

impl<'a> CreateStackFromRepository<'a> {
    pub fn new(
        endpoint: &'a Endpoint,
        name: &'a str,
        repository: &'a RepositorySource,
        env: &'a [EnvVar],
    ) -> Self {
        let (username, password) = repository
            .credentials
            .as_ref()
            .map(|c| (c.username.as_str(), c.password.as_str()))
            .unwrap_or(("", ""));

        Self {
            name,
            swarm_id: endpoint.cluster_id.as_deref().unwrap_or_default(),
            repository_url: &repository.url,
            compose_file_path: &repository.compose_file,
            repository_authentication: !username.is_empty() && !password.is_empty(),
            repository_username: username,
            repository_password: password,
            env,
        }
    }
}

/// Portainer sends `null` for empty lists and unset strings
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stack_with_null_env() {
        let json = r#"{
            "Id": 12,
            "Name": "web",
            "Type": 1,
            "EndpointID": 3,
            "EntryPoint": "docker-compose.yml",
            "SwarmID": "jpofkc0i9uo9wtx1zesuk649w",
            "ProjectPath": "/data/compose/12",
            "Env": null
        }"#;

        let stack: Stack = serde_json::from_str(json).unwrap();
        assert_eq!(stack.id, 12);
        assert_eq!(stack.endpoint_id, 3);
        assert_eq!(stack.cluster_id, "jpofkc0i9uo9wtx1zesuk649w");
        assert!(stack.env.is_empty());
    }

    #[test]
    fn test_parse_endpoint_ignores_unknown_fields() {
        let json = r#"{"Id": 1, "Name": "local", "Type": 1, "URL": "unix:///var/run/docker.sock", "Status": 1}"#;

        let endpoint: Endpoint = serde_json::from_str(json).unwrap();
        assert_eq!(endpoint.name, "local");
        assert_eq!(endpoint.url, "unix:///var/run/docker.sock");
        assert_eq!(endpoint.cluster_id, None);
    }

    #[test]
    fn test_env_var_wire_format() {
        let value = serde_json::to_value(EnvVar::new("FOO", "bar")).unwrap();
        assert_eq!(value, serde_json::json!({"name": "FOO", "value": "bar"}));
    }

    #[test]
    fn test_error_body_description() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"message": "Invalid request payload", "details": "Invalid stack name"}"#)
                .unwrap();
        assert_eq!(
            body.describe().as_deref(),
            Some("Invalid request payload (Invalid stack name)")
        );

        let body: ErrorBody = serde_json::from_str(r#"{"message": "Unauthorized"}"#).unwrap();
        assert_eq!(body.describe().as_deref(), Some("Unauthorized"));

        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.describe(), None);
    }

    #[test]
    fn test_repository_authentication_requires_both_credentials() {
        let endpoint = Endpoint {
            id: 1,
            cluster_id: Some("swarm".to_string()),
            ..Default::default()
        };
        let mut repository = RepositorySource {
            url: "https://git.example.com/app.git".to_string(),
            compose_file: "deploy/stack.yml".to_string(),
            credentials: Some(RepositoryCredentials {
                username: "ci".to_string(),
                password: String::new(),
            }),
        };

        let body = CreateStackFromRepository::new(&endpoint, "app", &repository, &[]);
        assert!(!body.repository_authentication);
        assert_eq!(body.swarm_id, "swarm");

        repository.credentials = Some(RepositoryCredentials {
            username: "ci".to_string(),
            password: "secret".to_string(),
        });
        let body = CreateStackFromRepository::new(&endpoint, "app", &repository, &[]);
        assert!(body.repository_authentication);
        assert_eq!(body.repository_username, "ci");
    }
}
