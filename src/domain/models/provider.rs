//! Supported external providers.

use serde::{Deserialize, Serialize};

/// The external system a source ingests from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Github,
    Gitlab,
    Slack,
    Notion,
    Confluence,
    Jira,
    Gdrive,
    Gdocs,
    Linear,
    Dropbox,
    S3,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Slack => "slack",
            Self::Notion => "notion",
            Self::Confluence => "confluence",
            Self::Jira => "jira",
            Self::Gdrive => "gdrive",
            Self::Gdocs => "gdocs",
            Self::Linear => "linear",
            Self::Dropbox => "dropbox",
            Self::S3 => "s3",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "github" => Some(Self::Github),
            "gitlab" => Some(Self::Gitlab),
            "slack" => Some(Self::Slack),
            "notion" => Some(Self::Notion),
            "confluence" => Some(Self::Confluence),
            "jira" => Some(Self::Jira),
            "gdrive" | "google_drive" => Some(Self::Gdrive),
            "gdocs" | "google_docs" => Some(Self::Gdocs),
            "linear" => Some(Self::Linear),
            "dropbox" => Some(Self::Dropbox),
            "s3" => Some(Self::S3),
            _ => None,
        }
    }

    /// Human-readable name used when deriving installation names.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Github => "GitHub",
            Self::Gitlab => "GitLab",
            Self::Slack => "Slack",
            Self::Notion => "Notion",
            Self::Confluence => "Confluence",
            Self::Jira => "Jira",
            Self::Gdrive => "Google Drive",
            Self::Gdocs => "Google Docs",
            Self::Linear => "Linear",
            Self::Dropbox => "Dropbox",
            Self::S3 => "Amazon S3",
        }
    }

    /// All known providers, in a stable order.
    pub fn all() -> &'static [ProviderType] {
        &[
            Self::Github,
            Self::Gitlab,
            Self::Slack,
            Self::Notion,
            Self::Confluence,
            Self::Jira,
            Self::Gdrive,
            Self::Gdocs,
            Self::Linear,
            Self::Dropbox,
            Self::S3,
        ]
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_providers() {
        for provider in ProviderType::all() {
            assert_eq!(ProviderType::from_str(provider.as_str()), Some(*provider));
        }
    }

    #[test]
    fn test_from_str_aliases() {
        assert_eq!(ProviderType::from_str("google_drive"), Some(ProviderType::Gdrive));
        assert_eq!(ProviderType::from_str("GITHUB"), Some(ProviderType::Github));
        assert_eq!(ProviderType::from_str("bitbucket"), None);
    }
}
