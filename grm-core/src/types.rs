//! Domain types for tracked repositories and their releases.
//!
//! [`ReleaseDescriptor`] deserializes straight from the GitHub releases API;
//! field names are mapped with serde renames so the Rust side keeps its own
//! vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Repository reference
// ---------------------------------------------------------------------------

/// A tracked repository, identified by `(owner, name)`.
///
/// Persisted as `{"owner": "...", "repo": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    #[serde(rename = "repo")]
    pub name: String,
}

impl RepositoryRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `https://github.com/<owner>/<repo>` and its scheme-less and
    /// `www.` variants. Extra path segments, query strings and a trailing
    /// `.git` are ignored.
    pub fn parse_url(url: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidRepositoryUrl(url.to_owned());

        let rest = url.trim();
        let rest = rest
            .strip_prefix("https://")
            .or_else(|| rest.strip_prefix("http://"))
            .unwrap_or(rest);
        let rest = rest.strip_prefix("www.").unwrap_or(rest);
        let rest = rest.strip_prefix("github.com/").ok_or_else(invalid)?;
        let rest = rest.split(['?', '#']).next().unwrap_or_default();

        let mut segments = rest.split('/');
        let owner = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let name = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let name = name.strip_suffix(".git").unwrap_or(name);
        if name.is_empty() {
            return Err(invalid());
        }

        Ok(Self::new(owner, name))
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_url(s)
    }
}

// ---------------------------------------------------------------------------
// Releases
// ---------------------------------------------------------------------------

/// A named downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

/// One published release as returned by the releases API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    #[serde(rename = "zipball_url", default)]
    pub source_zip_url: Option<String>,
    #[serde(rename = "tarball_url", default)]
    pub source_tar_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://github.com/sqlmapproject/sqlmap", "sqlmapproject", "sqlmap")]
    #[case("http://github.com/acme/tool", "acme", "tool")]
    #[case("github.com/acme/tool", "acme", "tool")]
    #[case("https://www.github.com/acme/tool", "acme", "tool")]
    #[case("https://github.com/acme/tool.git", "acme", "tool")]
    #[case("https://github.com/acme/tool/releases/tag/v1", "acme", "tool")]
    #[case("https://github.com/acme/tool?tab=readme", "acme", "tool")]
    #[case("  https://github.com/acme/tool/  ", "acme", "tool")]
    fn parses_repository_urls(#[case] url: &str, #[case] owner: &str, #[case] name: &str) {
        let repo = RepositoryRef::parse_url(url).expect("parse");
        assert_eq!(repo, RepositoryRef::new(owner, name));
    }

    #[rstest]
    #[case("")]
    #[case("https://gitlab.com/acme/tool")]
    #[case("https://github.com/acme")]
    #[case("https://github.com/acme/")]
    #[case("https://github.com//tool")]
    #[case("https://github.com/acme/.git")]
    fn rejects_non_repository_urls(#[case] url: &str) {
        let err = RepositoryRef::parse_url(url).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRepositoryUrl(_)), "got: {err}");
    }

    #[test]
    fn repository_display_is_owner_slash_name() {
        assert_eq!(RepositoryRef::new("acme", "tool").to_string(), "acme/tool");
    }

    #[test]
    fn repository_serializes_with_repo_key() {
        let json = serde_json::to_value(RepositoryRef::new("acme", "tool")).unwrap();
        assert_eq!(json, serde_json::json!({"owner": "acme", "repo": "tool"}));
    }

    #[test]
    fn release_deserializes_from_api_shape() {
        let body = r#"{
            "id": 1,
            "tag_name": "v1.2.0",
            "name": "Release 1.2.0",
            "assets": [
                {"name": "tool-linux.tar.gz", "size": 10,
                 "browser_download_url": "https://github.com/acme/tool/releases/download/v1.2.0/tool-linux.tar.gz"}
            ],
            "zipball_url": "https://api.github.com/repos/acme/tool/zipball/v1.2.0",
            "tarball_url": null
        }"#;
        let release: ReleaseDescriptor = serde_json::from_str(body).expect("deserialize");
        assert_eq!(release.tag, "v1.2.0");
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].name, "tool-linux.tar.gz");
        assert!(release.assets[0].download_url.ends_with("tool-linux.tar.gz"));
        assert!(release.source_zip_url.is_some());
        assert!(release.source_tar_url.is_none());
    }

    #[test]
    fn release_without_assets_field_is_accepted() {
        let release: ReleaseDescriptor =
            serde_json::from_str(r#"{"tag_name": "v0.1"}"#).expect("deserialize");
        assert!(release.assets.is_empty());
        assert!(release.source_zip_url.is_none());
    }
}
