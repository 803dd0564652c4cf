//! Manifest file: provider settings and declared resources
//!
//! ```toml
//! [provider]
//! token = ""            # empty: read SRHT_TOKEN
//!
//! [repository.dotfiles]
//! name = "dotfiles"
//! description = "My dotfiles"
//! visibility = "private"
//!
//! [ssh_key.laptop]
//! key = "ssh-ed25519 AAAA... me@laptop"
//!
//! [pgp_key.main]
//! key = """
//! -----BEGIN PGP PUBLIC KEY BLOCK-----
//! ...
//! """
//! ```

use anyhow::{Context, Result, bail};
use declarative::{Attributes, Declared};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::ProviderConfig;
use crate::resource::{PGP_KEY, REPOSITORY, SSH_KEY};

/// Parsed manifest
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub repository: BTreeMap<String, toml::Table>,

    #[serde(default)]
    pub ssh_key: BTreeMap<String, toml::Table>,

    #[serde(default)]
    pub pgp_key: BTreeMap<String, toml::Table>,
}

impl Manifest {
    /// Load a manifest; a missing file is an error
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let manifest = Self::parse(&content)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
        log::debug!("Loaded manifest from {}", path.display());
        Ok(manifest)
    }

    /// Load a manifest, or an empty one if the file doesn't exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Manifest {} does not exist, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Declared resources, one per table entry, in address order
    pub fn declared(&self) -> Result<Vec<Declared>> {
        let mut declared = Vec::new();
        for (resource_type, tables) in [
            (REPOSITORY, &self.repository),
            (SSH_KEY, &self.ssh_key),
            (PGP_KEY, &self.pgp_key),
        ] {
            for (label, table) in tables {
                validate_label(label)?;
                declared.push(Declared::new(resource_type, label, to_attributes(table)?));
            }
        }
        declared.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(declared)
    }
}

fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() || label.contains('.') {
        bail!("Invalid resource label '{label}': must be non-empty and contain no '.'");
    }
    Ok(())
}

fn to_attributes(table: &toml::Table) -> Result<Attributes> {
    let value = serde_json::to_value(table).context("Failed to convert manifest table")?;
    match value {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        other => bail!("Expected a table, got {other}"),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
[provider]
token = "abc"
timeout_secs = 10

[repository.dotfiles]
name = "dotfiles"
visibility = "private"

[ssh_key.laptop]
key = "ssh-ed25519 AAAA me@laptop"
"#;

    #[test]
    fn test_parse_and_declare() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.provider.token.as_deref(), Some("abc"));
        assert_eq!(manifest.provider.timeout_secs, Some(10));

        let declared = manifest.declared().unwrap();
        let addresses: Vec<_> = declared.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(
            addresses,
            ["sourcehut_repository.dotfiles", "sourcehut_user_ssh_key.laptop"]
        );
        assert_eq!(declared[0].config["visibility"], json!("private"));
        assert!(!declared[0].config.contains_key("description"));
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(Manifest::parse("[gist.x]\nname = \"y\"").is_err());
    }

    #[test]
    fn test_label_with_dot_rejected() {
        let manifest = Manifest::parse("[repository.\"a.b\"]\nname = \"x\"").unwrap();
        assert!(manifest.declared().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("srht.toml");
        fs::write(&path, MANIFEST).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.repository.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        assert!(Manifest::load(&path).is_err());
        let manifest = Manifest::load_or_default(&path).unwrap();
        assert!(manifest.declared().unwrap().is_empty());
    }
}
