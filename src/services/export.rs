//! Export and import use cases
//!
//! Export renders one environment's variables into a deployment format;
//! secret values ship masked unless the caller explicitly asks for plaintext,
//! and either way the export is audited. Import parses dotenv content and
//! funnels every key through the normal create/update paths, collecting
//! per-key failures instead of aborting the batch.

use crate::domain::{AuditAction, EnvVarType, ScopeLevel, MASKED};
use crate::errors::{EnvkeepError, Result};
use crate::ports::{
    Clock, EnvStore, EnvVarFilter, ExportEntry, ExportFormat, Exporter, IdGenerator, Page,
    SecretCipher,
};
use crate::services::env_vars::{CreateEnvVarRequest, EnvVarService, UpdateEnvVarRequest};
use async_trait::async_trait;
use base64::Engine;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Request to export one environment
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub environment: String,
    pub format: ExportFormat,
    /// Ship decrypted secret values instead of the mask. Requires deliberate
    /// opt-in; the audit event records the choice.
    pub include_secret_values: bool,
}

/// One key that failed during import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportError {
    pub key: String,
    pub message: String,
}

/// Outcome of a dotenv import
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub errors: Vec<ImportError>,
}

/// Use cases for moving variables across the system boundary
#[derive(Clone)]
pub struct ExportService {
    store: Arc<dyn EnvStore>,
    cipher: Arc<dyn SecretCipher>,
    exporter: Arc<dyn Exporter>,
    env_vars: EnvVarService,
}

impl ExportService {
    pub fn new(
        store: Arc<dyn EnvStore>,
        cipher: Arc<dyn SecretCipher>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        exporter: Arc<dyn Exporter>,
    ) -> Self {
        let env_vars = EnvVarService::new(
            Arc::clone(&store),
            Arc::clone(&cipher),
            Arc::clone(&clock),
            Arc::clone(&ids),
        );
        Self { store, cipher, exporter, env_vars }
    }

    /// Render one environment into the requested format
    pub async fn export(&self, request: &ExportRequest, actor: &str) -> Result<String> {
        let vars = self.all_in_env(&request.environment).await?;

        let mut entries = Vec::with_capacity(vars.len());
        for var in vars.values() {
            let value = if var.is_secret {
                if request.include_secret_values {
                    self.cipher.decrypt(&var.value).await?
                } else {
                    MASKED.to_string()
                }
            } else {
                var.value.clone()
            };
            entries.push(ExportEntry { key: var.key.clone(), value, is_secret: var.is_secret });
        }

        let rendered =
            self.exporter.encode(request.format, &request.environment, &entries).await?;

        self.env_vars
            .audit(
                actor,
                AuditAction::Export,
                &format!("ENV:{}", request.environment),
                None,
                Some(json!({
                    "environment": request.environment,
                    "format": request.format.as_str(),
                    "count": entries.len(),
                    "include_secret_values": request.include_secret_values,
                })),
                None,
            )
            .await?;

        info!(
            environment = %request.environment,
            format = %request.format,
            count = entries.len(),
            include_secret_values = request.include_secret_values,
            "Exported environment"
        );
        Ok(rendered)
    }

    /// Import dotenv content into one environment.
    ///
    /// Existing keys are updated through the normal update path (encryption
    /// included for secrets); unknown keys are created as plain STRING
    /// variables. A bad key or value fails that key only.
    pub async fn import_dotenv(
        &self,
        environment: &str,
        content: &str,
        actor: &str,
    ) -> Result<ImportReport> {
        let pairs = self.exporter.parse_dotenv(content).await?;
        let mut report = ImportReport::default();

        for (key, value) in pairs {
            let existing = self
                .store
                .get_by_scoped_key(ScopeLevel::Env, environment, &key)
                .await?;
            let outcome = match existing {
                Some(var) => {
                    let request =
                        UpdateEnvVarRequest { value: Some(value), ..Default::default() };
                    self.env_vars.update(&var.id, request, actor).await.map(|_| false)
                }
                None => {
                    let request = CreateEnvVarRequest::new(
                        key.clone(),
                        value,
                        EnvVarType::String,
                        crate::domain::ScopeRef::env(environment),
                    );
                    self.env_vars.create(request, actor).await.map(|_| true)
                }
            };
            match outcome {
                Ok(true) => report.created.push(key),
                Ok(false) => report.updated.push(key),
                Err(error) => {
                    warn!(%key, %error, "Import skipped key");
                    report.errors.push(ImportError { key, message: error.to_string() });
                }
            }
        }

        self.env_vars
            .audit(
                actor,
                AuditAction::Import,
                &format!("ENV:{}", environment),
                None,
                Some(json!({
                    "environment": environment,
                    "created": report.created,
                    "updated": report.updated,
                    "failed": report.errors.iter().map(|e| e.key.clone()).collect::<Vec<_>>(),
                })),
                None,
            )
            .await?;

        info!(
            environment,
            created = report.created.len(),
            updated = report.updated.len(),
            failed = report.errors.len(),
            "Imported dotenv content"
        );
        Ok(report)
    }

    async fn all_in_env(
        &self,
        environment: &str,
    ) -> Result<BTreeMap<String, crate::domain::EnvVar>> {
        let filter = EnvVarFilter::for_scope(ScopeLevel::Env, environment);
        let mut out = BTreeMap::new();
        let mut page = Page::default();
        loop {
            let batch = self.store.list_env_vars(&filter, page).await?;
            let batch_len = batch.len();
            for var in batch {
                out.insert(var.key.clone(), var);
            }
            if (batch_len as u32) < page.size {
                break;
            }
            page = Page::new(page.page + 1, page.size);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for ExportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportService").finish_non_exhaustive()
    }
}

/// Production encoder for the supported file formats
#[derive(Debug, Clone, Default)]
pub struct FileExporter;

impl FileExporter {
    fn encode_dotenv(entries: &[ExportEntry]) -> String {
        let mut out = String::new();
        for entry in entries {
            out.push_str(&entry.key);
            out.push('=');
            out.push_str(&quote_dotenv_value(&entry.value));
            out.push('\n');
        }
        out
    }

    fn encode_json(entries: &[ExportEntry]) -> Result<String> {
        let map: BTreeMap<&str, &str> =
            entries.iter().map(|e| (e.key.as_str(), e.value.as_str())).collect();
        Ok(serde_json::to_string_pretty(&map)?)
    }

    fn encode_yaml(entries: &[ExportEntry]) -> Result<String> {
        let map: BTreeMap<&str, &str> =
            entries.iter().map(|e| (e.key.as_str(), e.value.as_str())).collect();
        serde_yaml::to_string(&map)
            .map_err(|e| EnvkeepError::internal(format!("YAML encoding failed: {}", e)))
    }

    fn encode_k8s(name: &str, entries: &[ExportEntry], secret: bool) -> Result<String> {
        let data: BTreeMap<&str, String> = entries
            .iter()
            .map(|e| {
                let value = if secret {
                    base64::engine::general_purpose::STANDARD.encode(&e.value)
                } else {
                    e.value.clone()
                };
                (e.key.as_str(), value)
            })
            .collect();
        let mut manifest = json!({
            "apiVersion": "v1",
            "kind": if secret { "Secret" } else { "ConfigMap" },
            "metadata": { "name": name },
            "data": data,
        });
        if secret {
            manifest["type"] = json!("Opaque");
        }
        serde_yaml::to_string(&manifest)
            .map_err(|e| EnvkeepError::internal(format!("YAML encoding failed: {}", e)))
    }
}

#[async_trait]
impl Exporter for FileExporter {
    async fn encode(
        &self,
        format: ExportFormat,
        name: &str,
        entries: &[ExportEntry],
    ) -> Result<String> {
        match format {
            ExportFormat::Dotenv => Ok(Self::encode_dotenv(entries)),
            ExportFormat::Json => Self::encode_json(entries),
            ExportFormat::Yaml => Self::encode_yaml(entries),
            ExportFormat::K8sSecret => Self::encode_k8s(name, entries, true),
            ExportFormat::K8sConfigMap => Self::encode_k8s(name, entries, false),
        }
    }

    async fn parse_dotenv(&self, content: &str) -> Result<BTreeMap<String, String>> {
        let mut pairs = BTreeMap::new();
        for (line_no, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=').ok_or_else(|| {
                EnvkeepError::validation(format!(
                    "Malformed dotenv line {}: missing '='",
                    line_no + 1
                ))
            })?;
            pairs.insert(key.trim().to_string(), unquote_dotenv_value(value.trim()));
        }
        Ok(pairs)
    }
}

fn quote_dotenv_value(value: &str) -> String {
    let needs_quoting = value.is_empty()
        || value.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '#' | '$' | '\\'));
    if !needs_quoting {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
    format!("\"{}\"", escaped)
}

fn unquote_dotenv_value(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let inner = &value[1..value.len() - 1];
        return inner.replace("\\n", "\n").replace("\\\"", "\"").replace("\\\\", "\\");
    }
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return value[1..value.len() - 1].to_string();
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<ExportEntry> {
        vec![
            ExportEntry { key: "API_URL".into(), value: "https://api.internal".into(), is_secret: false },
            ExportEntry { key: "DB_PASSWORD".into(), value: "***".into(), is_secret: true },
        ]
    }

    #[tokio::test]
    async fn dotenv_encoding() {
        let rendered =
            FileExporter.encode(ExportFormat::Dotenv, "prod", &entries()).await.unwrap();
        assert!(rendered.contains("API_URL=https://api.internal\n"));
        assert!(rendered.contains("DB_PASSWORD=***\n"));
    }

    #[tokio::test]
    async fn dotenv_quotes_values_with_spaces() {
        let entries = vec![ExportEntry {
            key: "GREETING".into(),
            value: "hello world".into(),
            is_secret: false,
        }];
        let rendered = FileExporter.encode(ExportFormat::Dotenv, "dev", &entries).await.unwrap();
        assert_eq!(rendered, "GREETING=\"hello world\"\n");
    }

    #[tokio::test]
    async fn json_encoding() {
        let rendered = FileExporter.encode(ExportFormat::Json, "prod", &entries()).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["API_URL"], "https://api.internal");
    }

    #[tokio::test]
    async fn k8s_secret_base64_encodes_values() {
        let rendered =
            FileExporter.encode(ExportFormat::K8sSecret, "prod", &entries()).await.unwrap();
        assert!(rendered.contains("kind: Secret"));
        assert!(rendered.contains("name: prod"));
        let encoded = base64::engine::general_purpose::STANDARD.encode("https://api.internal");
        assert!(rendered.contains(&encoded));
    }

    #[tokio::test]
    async fn k8s_configmap_keeps_plain_values() {
        let rendered =
            FileExporter.encode(ExportFormat::K8sConfigMap, "prod", &entries()).await.unwrap();
        assert!(rendered.contains("kind: ConfigMap"));
        assert!(rendered.contains("https://api.internal"));
    }

    #[tokio::test]
    async fn parse_dotenv_basics() {
        let content = "# comment\n\nAPI_URL=https://api.internal\nexport TOKEN1=abc\nQUOTED=\"a b\"\nSINGLE='x y'\n";
        let pairs = FileExporter.parse_dotenv(content).await.unwrap();
        assert_eq!(pairs["API_URL"], "https://api.internal");
        assert_eq!(pairs["TOKEN1"], "abc");
        assert_eq!(pairs["QUOTED"], "a b");
        assert_eq!(pairs["SINGLE"], "x y");
    }

    #[tokio::test]
    async fn parse_dotenv_rejects_missing_equals() {
        let result = FileExporter.parse_dotenv("JUST_A_KEY\n").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn dotenv_quote_roundtrip() {
        for value in ["plain", "has space", "line1\nline2", "quo\"te", ""] {
            let quoted = quote_dotenv_value(value);
            assert_eq!(unquote_dotenv_value(&quoted), value, "value {:?}", value);
        }
    }
}
