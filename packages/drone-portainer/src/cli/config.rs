//! Configuration module
//!
//! Builds the immutable run settings from command line flags, the plugin
//! environment variables (several historical names per setting) and an
//! optional TOML file, in that order of precedence.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use portainer_api::{EnvVar, Error, Result};

use crate::cli::args::{Args, BuildArgs};
use crate::plugin::plan::{ForeignStackPolicy, LookupFailurePolicy, Policy};
use crate::plugin::source::{parse_environment, StackSource};

pub const ADDRESS_VARS: &[&str] = &[
    "PLUGIN_PORTAINER_ADDRESS",
    "PLUGIN_PORTAINER",
    "PLUGIN_ADDRESS",
    "PORTAINER_ADDRESS",
];
pub const INSECURE_VARS: &[&str] = &[
    "PLUGIN_PORTAINER_INSECURE",
    "PLUGIN_INSECURE",
    "PORTAINER_INSECURE",
];
pub const ENDPOINT_VARS: &[&str] = &[
    "PLUGIN_PORTAINER_ENDPOINT",
    "PLUGIN_ENDPOINT",
    "PORTAINER_ENDPOINT",
];
pub const USERNAME_VARS: &[&str] = &[
    "PLUGIN_PORTAINER_USERNAME",
    "PLUGIN_USERNAME",
    "PORTAINER_USERNAME",
];
pub const PASSWORD_VARS: &[&str] = &[
    "PLUGIN_PORTAINER_PASSWORD",
    "PLUGIN_PASSWORD",
    "PORTAINER_PASSWORD",
];
pub const STACK_NAME_VARS: &[&str] = &["PLUGIN_STACK_NAME", "PLUGIN_STACK", "STACK_NAME"];
pub const STACK_FILE_VARS: &[&str] = &["PLUGIN_STACK_FILE", "PLUGIN_FILE", "STACK_FILE"];
pub const STACK_CONFIG_VARS: &[&str] = &["PLUGIN_STACK_CONFIG", "PLUGIN_CONFIG", "STACK_CONFIG"];
pub const STACK_ENVIRONMENT_VARS: &[&str] = &[
    "PLUGIN_STACK_ENVIRONMENT",
    "PLUGIN_STACK_ENV",
    "PLUGIN_ENVIRONMENT",
    "PLUGIN_ENV",
    "STACK_ENVIRONMENT",
    "STACK_ENV",
];
pub const STACK_PRUNE_VARS: &[&str] = &["PLUGIN_STACK_PRUNE", "STACK_PRUNE"];
pub const SECRETS_VARS: &[&str] = &["PLUGIN_SECRETS"];
pub const LOOKUP_FAILURE_VARS: &[&str] = &["PLUGIN_ON_LOOKUP_FAILURE"];
pub const FOREIGN_STACK_VARS: &[&str] = &["PLUGIN_ON_FOREIGN_STACK"];
pub const DEBUG_VARS: &[&str] = &["PLUGIN_DEBUG"];

const DEFAULT_ENDPOINT: &str = "local";
const DEFAULT_STACK_NAME: &str = "stack";
const DEFAULT_STACK_FILE: &str = "docker-compose.yml";

/// Settings file passed with `--config-file`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub portainer: PortainerSection,
    pub stack: StackSection,
    pub policy: PolicySection,
    pub secrets: Vec<String>,
    pub debug: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PortainerSection {
    pub address: Option<String>,
    pub insecure: Option<bool>,
    pub endpoint: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StackSection {
    pub name: Option<String>,
    pub file: Option<PathBuf>,
    pub config: Vec<String>,
    pub environment: Vec<String>,
    pub prune: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    pub on_lookup_failure: Option<LookupFailurePolicy>,
    pub on_foreign_stack: Option<ForeignStackPolicy>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::Configuration(format!(
                "failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }
}

/// Immutable configuration for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub portainer: PortainerSettings,
    pub stack: StackSettings,
    pub policy: Policy,
    /// Opaque secrets handed to the plugin, not interpreted
    pub secrets: Vec<String>,
    pub debug: bool,
    pub build: BuildArgs,
}

#[derive(Clone)]
pub struct PortainerSettings {
    pub address: String,
    pub insecure: bool,
    pub endpoint: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for PortainerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortainerSettings")
            .field("address", &self.address)
            .field("insecure", &self.insecure)
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct StackSettings {
    pub name: String,
    pub file: Option<PathBuf>,
    /// Inline compose fragments, in the order given
    pub config: Vec<String>,
    pub environment: Vec<EnvVar>,
    pub prune: bool,
}

impl StackSettings {
    pub fn source(&self) -> Option<StackSource> {
        StackSource::select(&self.config, self.file.as_deref())
    }
}

impl Settings {
    /// Resolve settings from flags, the process environment and the
    /// optional config file
    pub fn load(args: Args) -> Result<Self> {
        let file = match &args.config_file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        Self::resolve(args, file, &process_env)
    }

    /// Resolve settings with an explicit environment lookup
    pub fn resolve(args: Args, file: FileConfig, env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = Lookup { env };

        let address = lookup
            .string(args.portainer_address, ADDRESS_VARS, file.portainer.address)
            .ok_or_else(|| missing("Portainer address", ADDRESS_VARS))?;
        let username = lookup
            .string(args.portainer_username, USERNAME_VARS, file.portainer.username)
            .ok_or_else(|| missing("Portainer username", USERNAME_VARS))?;
        let password = lookup
            .string(args.portainer_password, PASSWORD_VARS, file.portainer.password)
            .ok_or_else(|| missing("Portainer password", PASSWORD_VARS))?;

        let portainer = PortainerSettings {
            address,
            insecure: lookup
                .boolean(args.portainer_insecure, INSECURE_VARS, file.portainer.insecure)?
                .unwrap_or(false),
            endpoint: lookup
                .string(args.portainer_endpoint, ENDPOINT_VARS, file.portainer.endpoint)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            username,
            password,
        };

        let environment = lookup.list(
            args.stack_environment,
            STACK_ENVIRONMENT_VARS,
            file.stack.environment,
        );

        let stack = StackSettings {
            name: lookup
                .string(args.stack_name, STACK_NAME_VARS, file.stack.name)
                .unwrap_or_else(|| DEFAULT_STACK_NAME.to_string()),
            file: Some(
                args.stack_file
                    .filter(|p| !p.as_os_str().is_empty())
                    .or_else(|| lookup.var(STACK_FILE_VARS).map(PathBuf::from))
                    .or(file.stack.file)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STACK_FILE)),
            ),
            config: lookup.list(args.stack_config, STACK_CONFIG_VARS, file.stack.config),
            environment: parse_environment(&environment)?,
            prune: lookup
                .boolean(args.stack_prune, STACK_PRUNE_VARS, file.stack.prune)?
                .unwrap_or(true),
        };

        let policy = Policy {
            on_lookup_failure: match args.on_lookup_failure {
                Some(policy) => policy,
                None => lookup
                    .choice(LOOKUP_FAILURE_VARS)?
                    .or(file.policy.on_lookup_failure)
                    .unwrap_or_default(),
            },
            on_foreign_stack: match args.on_foreign_stack {
                Some(policy) => policy,
                None => lookup
                    .choice(FOREIGN_STACK_VARS)?
                    .or(file.policy.on_foreign_stack)
                    .unwrap_or_default(),
            },
        };

        Ok(Self {
            portainer,
            stack,
            policy,
            secrets: lookup.list(args.secrets, SECRETS_VARS, file.secrets),
            debug: lookup
                .boolean(args.debug, DEBUG_VARS, file.debug)?
                .unwrap_or(false),
            build: args.build,
        })
    }
}

/// Reads the process environment; empty values count as unset
fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn missing(what: &str, vars: &[&str]) -> Error {
    Error::Configuration(format!("{} not defined (set {})", what, vars.join(" or ")))
}

struct Lookup<'a> {
    env: &'a dyn Fn(&str) -> Option<String>,
}

impl Lookup<'_> {
    /// First set variable among the aliases, with its name
    fn named_var(&self, names: &[&str]) -> Option<(String, String)> {
        names.iter().find_map(|name| {
            (self.env)(name)
                .filter(|v| !v.is_empty())
                .map(|v| (name.to_string(), v))
        })
    }

    fn var(&self, names: &[&str]) -> Option<String> {
        self.named_var(names).map(|(_, value)| value)
    }

    fn string(&self, flag: Option<String>, names: &[&str], file: Option<String>) -> Option<String> {
        flag.filter(|v| !v.is_empty())
            .or_else(|| self.var(names))
            .or(file.filter(|v| !v.is_empty()))
    }

    fn boolean(&self, flag: Option<bool>, names: &[&str], file: Option<bool>) -> Result<Option<bool>> {
        if flag.is_some() {
            return Ok(flag);
        }

        match self.named_var(names) {
            Some((name, value)) => parse_bool(&name, &value).map(Some),
            None => Ok(file),
        }
    }

    /// Comma separated list in the environment, as the CI runner passes lists
    fn list(&self, flag: Vec<String>, names: &[&str], file: Vec<String>) -> Vec<String> {
        if !flag.is_empty() {
            return flag;
        }

        match self.var(names) {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            None => file,
        }
    }

    fn choice<T: clap::ValueEnum>(&self, names: &[&str]) -> Result<Option<T>> {
        match self.named_var(names) {
            Some((name, value)) => T::from_str(value.trim(), true).map(Some).map_err(|e| {
                Error::Configuration(format!("invalid value \"{}\" for {}: {}", value, name, e))
            }),
            None => Ok(None),
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Configuration(format!(
            "invalid boolean \"{}\" for {}",
            value, name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn required_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("PLUGIN_PORTAINER_ADDRESS", "portainer.example.com"),
            ("PLUGIN_USERNAME", "admin"),
            ("PORTAINER_PASSWORD", "hunter2"),
        ]
    }

    #[test]
    fn test_defaults() {
        let env = env_from(&required_env());
        let settings = Settings::resolve(Args::default(), FileConfig::default(), &env).unwrap();

        assert_eq!(settings.portainer.address, "portainer.example.com");
        assert_eq!(settings.portainer.username, "admin");
        assert_eq!(settings.portainer.password, "hunter2");
        assert_eq!(settings.portainer.endpoint, "local");
        assert!(!settings.portainer.insecure);
        assert_eq!(settings.stack.name, "stack");
        assert_eq!(settings.stack.file, Some(PathBuf::from("docker-compose.yml")));
        assert!(settings.stack.config.is_empty());
        assert!(settings.stack.environment.is_empty());
        assert!(settings.stack.prune);
        assert_eq!(settings.policy, Policy::default());
        assert!(!settings.debug);
    }

    #[test]
    fn test_missing_address() {
        let env = env_from(&[("PLUGIN_USERNAME", "admin"), ("PLUGIN_PASSWORD", "x")]);
        let err = Settings::resolve(Args::default(), FileConfig::default(), &env).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("PLUGIN_PORTAINER_ADDRESS"));
    }

    #[test]
    fn test_alias_order() {
        let mut pairs = required_env();
        pairs.push(("PLUGIN_ENDPOINT", "secondary"));
        pairs.push(("PORTAINER_ENDPOINT", "tertiary"));
        pairs.push(("STACK_NAME", "web"));
        let env = env_from(&pairs);

        let settings = Settings::resolve(Args::default(), FileConfig::default(), &env).unwrap();
        assert_eq!(settings.portainer.endpoint, "secondary");
        assert_eq!(settings.stack.name, "web");
    }

    #[test]
    fn test_flags_override_environment() {
        let mut pairs = required_env();
        pairs.push(("PLUGIN_STACK_NAME", "from-env"));
        pairs.push(("PLUGIN_INSECURE", "true"));
        let env = env_from(&pairs);

        let args = Args {
            stack_name: Some("from-flag".to_string()),
            portainer_insecure: Some(false),
            ..Default::default()
        };

        let settings = Settings::resolve(args, FileConfig::default(), &env).unwrap();
        assert_eq!(settings.stack.name, "from-flag");
        assert!(!settings.portainer.insecure);
    }

    #[test]
    fn test_lists_from_environment() {
        let mut pairs = required_env();
        pairs.push(("PLUGIN_STACK_CONFIG", "a: 1,b: 2"));
        pairs.push(("PLUGIN_ENV", "FOO=bar, URL=http://x/?a=b"));
        pairs.push(("PLUGIN_SECRETS", "one,two"));
        let env = env_from(&pairs);

        let settings = Settings::resolve(Args::default(), FileConfig::default(), &env).unwrap();
        assert_eq!(settings.stack.config, vec!["a: 1", "b: 2"]);
        assert_eq!(
            settings.stack.environment,
            vec![EnvVar::new("FOO", "bar"), EnvVar::new("URL", "http://x/?a=b")]
        );
        assert_eq!(settings.secrets, vec!["one", "two"]);
        assert_eq!(
            settings.stack.source(),
            Some(StackSource::Inline("a: 1\nb: 2".to_string()))
        );
    }

    #[test]
    fn test_malformed_environment_entry() {
        let mut pairs = required_env();
        pairs.push(("PLUGIN_STACK_ENVIRONMENT", "FOO=bar,BROKEN"));
        let env = env_from(&pairs);

        let err = Settings::resolve(Args::default(), FileConfig::default(), &env).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("BROKEN"));
    }

    #[test]
    fn test_invalid_boolean() {
        let mut pairs = required_env();
        pairs.push(("PLUGIN_PORTAINER_INSECURE", "maybe"));
        let env = env_from(&pairs);

        let err = Settings::resolve(Args::default(), FileConfig::default(), &env).unwrap_err();
        assert!(err.to_string().contains("PLUGIN_PORTAINER_INSECURE"));
    }

    #[test]
    fn test_policies_from_environment() {
        let mut pairs = required_env();
        pairs.push(("PLUGIN_ON_LOOKUP_FAILURE", "Abort"));
        pairs.push(("PLUGIN_ON_FOREIGN_STACK", "reject"));
        let env = env_from(&pairs);

        let settings = Settings::resolve(Args::default(), FileConfig::default(), &env).unwrap();
        assert_eq!(settings.policy.on_lookup_failure, LookupFailurePolicy::Abort);
        assert_eq!(settings.policy.on_foreign_stack, ForeignStackPolicy::Reject);

        let env = env_from(&[
            ("PLUGIN_ADDRESS", "p"),
            ("PLUGIN_USERNAME", "u"),
            ("PLUGIN_PASSWORD", "p"),
            ("PLUGIN_ON_FOREIGN_STACK", "explode"),
        ]);
        assert!(Settings::resolve(Args::default(), FileConfig::default(), &env).is_err());
    }

    #[test]
    fn test_parse_file_config() {
        let toml_content = r#"
            debug = true

            [portainer]
            address = "https://portainer.internal:9443"
            username = "deployer"
            password = "s3cret"
            endpoint = "swarm"

            [stack]
            name = "shop"
            environment = ["TAG=1.4.0"]
            prune = false

            [policy]
            on_foreign_stack = "reject"
        "#;

        let file: FileConfig = toml::from_str(toml_content).unwrap();
        let env = env_from(&[("PLUGIN_STACK_NAME", "shop-staging")]);
        let settings = Settings::resolve(Args::default(), file, &env).unwrap();

        assert_eq!(settings.portainer.address, "https://portainer.internal:9443");
        assert_eq!(settings.portainer.endpoint, "swarm");
        assert_eq!(settings.stack.name, "shop-staging");
        assert_eq!(settings.stack.environment, vec![EnvVar::new("TAG", "1.4.0")]);
        assert!(!settings.stack.prune);
        assert_eq!(settings.policy.on_foreign_stack, ForeignStackPolicy::Reject);
        assert!(settings.debug);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfig::load(dir.path().join("plugin.toml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_password_is_masked() {
        let env = env_from(&required_env());
        let settings = Settings::resolve(Args::default(), FileConfig::default(), &env).unwrap();
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("hunter2"));
    }
}
