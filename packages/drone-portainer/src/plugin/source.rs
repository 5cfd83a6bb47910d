//! Stack definition source and environment entries

use std::path::{Path, PathBuf};

use portainer_api::{EnvVar, Error, Result};

/// Where the compose definition for a deploy or update comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackSource {
    /// Inline fragments, already joined
    Inline(String),
    /// Local compose file
    File(PathBuf),
}

impl StackSource {
    /// Inline fragments win over the file path. Returns `None` when neither
    /// is usable.
    pub fn select(fragments: &[String], file: Option<&Path>) -> Option<Self> {
        let inline = fragments.join("\n");
        if !inline.is_empty() {
            return Some(StackSource::Inline(inline));
        }

        file.filter(|path| !path.as_os_str().is_empty())
            .map(|path| StackSource::File(path.to_path_buf()))
    }
}

/// Parse a `KEY=VALUE` entry, splitting on the first `=`
pub fn parse_env_entry(entry: &str) -> Result<EnvVar> {
    let (name, value) = entry.split_once('=').ok_or_else(|| {
        Error::Configuration(format!(
            "invalid stack environment entry \"{}\": expected KEY=VALUE",
            entry
        ))
    })?;

    if name.is_empty() {
        return Err(Error::Configuration(format!(
            "invalid stack environment entry \"{}\": empty variable name",
            entry
        )));
    }

    Ok(EnvVar::new(name, value))
}

pub fn parse_environment<S: AsRef<str>>(entries: &[S]) -> Result<Vec<EnvVar>> {
    entries
        .iter()
        .map(|entry| parse_env_entry(entry.as_ref()))
        .collect()
}
