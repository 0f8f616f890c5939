//! Export/import encoding capability (external collaborator)
//!
//! File-format encoders (dotenv, JSON, YAML, Kubernetes manifests) live
//! outside the core. The export use case hands over finished entries with
//! already-masked or already-decrypted values; the exporter only encodes.

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Target formats the core knows how to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Dotenv,
    Json,
    Yaml,
    K8sSecret,
    K8sConfigMap,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dotenv => "dotenv",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::K8sSecret => "k8s-secret",
            Self::K8sConfigMap => "k8s-configmap",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "dotenv" => Ok(Self::Dotenv),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            "k8s-secret" => Ok(Self::K8sSecret),
            "k8s-configmap" => Ok(Self::K8sConfigMap),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One key/value pair handed to the exporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    pub key: String,
    pub value: String,
    pub is_secret: bool,
}

/// Encoding capability for exports and imports
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Encode entries into the requested format. `name` labels the artifact
    /// (Kubernetes resource name, file stem).
    async fn encode(
        &self,
        format: ExportFormat,
        name: &str,
        entries: &[ExportEntry],
    ) -> Result<String>;

    /// Parse dotenv content into key/value pairs, keyed and sorted by key;
    /// a later line for the same key wins
    async fn parse_dotenv(&self, content: &str) -> Result<BTreeMap<String, String>>;
}
