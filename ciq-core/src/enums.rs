//! Enum types for inventory entities
//!
//! The scanner owns these vocabularies. Values the model recognizes get a
//! variant; anything else is kept verbatim in `Other` and written back
//! exactly as it was read.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CLOUD PROVIDER
// ============================================================================

/// Cloud provider hosting an account, cluster or instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Provider {
    Aws,
    Gcp,
    Azure,
    #[default]
    Unknown,
    /// A provider string the model doesn't know, as the scanner wrote it.
    Other(String),
}

impl Provider {
    /// Wire representation used in the stored snapshot.
    pub fn as_str(&self) -> &str {
        match self {
            Provider::Aws => "AWS",
            Provider::Gcp => "GCP",
            Provider::Azure => "Azure",
            Provider::Unknown => "UNKNOWN",
            Provider::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Provider::Unknown | Provider::Other(_))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Provider {
    fn from(value: String) -> Self {
        match value.as_str() {
            "AWS" => Provider::Aws,
            "GCP" => Provider::Gcp,
            "Azure" => Provider::Azure,
            "UNKNOWN" => Provider::Unknown,
            _ => Provider::Other(value),
        }
    }
}

impl From<&str> for Provider {
    fn from(value: &str) -> Self {
        Provider::from(value.to_string())
    }
}

impl From<Provider> for String {
    fn from(value: Provider) -> Self {
        match value {
            Provider::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

// ============================================================================
// CLUSTER STATUS
// ============================================================================

/// Power state of a cluster as last observed by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClusterStatus {
    Running,
    Stopped,
    Terminated,
    #[default]
    Unknown,
    /// A status string the model doesn't know, as the scanner wrote it.
    Other(String),
}

impl ClusterStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ClusterStatus::Running => "Running",
            ClusterStatus::Stopped => "Stopped",
            ClusterStatus::Terminated => "Terminated",
            ClusterStatus::Unknown => "Unknown",
            ClusterStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ClusterStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Running" => ClusterStatus::Running,
            "Stopped" => ClusterStatus::Stopped,
            "Terminated" => ClusterStatus::Terminated,
            "Unknown" => ClusterStatus::Unknown,
            _ => ClusterStatus::Other(value),
        }
    }
}

impl From<&str> for ClusterStatus {
    fn from(value: &str) -> Self {
        ClusterStatus::from(value.to_string())
    }
}

impl From<ClusterStatus> for String {
    fn from(value: ClusterStatus) -> Self {
        match value {
            ClusterStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_wire_names() {
        assert_eq!(Provider::Aws.to_string(), "AWS");
        assert_eq!(Provider::Gcp.to_string(), "GCP");
        assert_eq!(Provider::Azure.to_string(), "Azure");
        assert_eq!(Provider::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_unrecognized_provider_is_kept_verbatim() {
        assert_eq!(Provider::from("AZURE"), Provider::Other("AZURE".to_string()));
        assert_eq!(Provider::from("IBM").to_string(), "IBM");
        assert!(!Provider::from("IBM").is_known());
        assert!(Provider::from("AWS").is_known());
    }

    #[test]
    fn test_provider_serde() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&Provider::Gcp)?;
        assert_eq!(json, "\"GCP\"");

        let parsed: Provider = serde_json::from_str("\"something-new\"")?;
        assert_eq!(parsed, Provider::Other("something-new".to_string()));
        assert_eq!(serde_json::to_string(&parsed)?, "\"something-new\"");
        Ok(())
    }

    #[test]
    fn test_cluster_status_serde() -> Result<(), serde_json::Error> {
        let parsed: ClusterStatus = serde_json::from_str("\"Running\"")?;
        assert_eq!(parsed, ClusterStatus::Running);

        let parsed: ClusterStatus = serde_json::from_str("\"Hibernating\"")?;
        assert_eq!(parsed, ClusterStatus::Other("Hibernating".to_string()));
        assert_eq!(serde_json::to_string(&parsed)?, "\"Hibernating\"");

        assert_eq!(serde_json::to_string(&ClusterStatus::Stopped)?, "\"Stopped\"");
        Ok(())
    }
}
