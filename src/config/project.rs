use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::secret::SecretManager;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub database: DatabaseConfig,
    pub functions: FunctionsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub ty: DatabaseType,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionsConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_functions_timeout")]
    pub timeout: u64,
}

fn default_functions_timeout() -> u64 {
    30
}

impl FunctionsConfig {
    /// Placeholder expansion is deferred to the moment the key is actually
    /// needed, so a project with an unset `${VAR}` still loads for commands
    /// that never talk to the functions host.
    pub fn resolved_api_key(&self, project_root: &Path) -> Result<Option<String>> {
        match &self.api_key {
            Some(raw) => Ok(Some(expand_placeholders(raw, project_root)?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds between job-status reads while watching a pipeline.
    pub interval: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval: 3 }
    }
}

impl ServerConfig {
    pub fn report_url(&self) -> String {
        format!("http://{}:{}/api/jobs/report", self.host, self.port)
    }
}

/// Expands `${ENV_VAR}` and `${secret.NAME}` references in a config value.
pub fn expand_placeholders(value: &str, project_root: &Path) -> Result<String> {
    let pattern = Regex::new(r"\$\{([A-Za-z0-9_.]+)\}").expect("valid placeholder pattern");

    let mut result = String::new();
    let mut last_end = 0;

    for caps in pattern.captures_iter(value) {
        let whole = caps.get(0).expect("capture 0 always present");
        let name = &caps[1];

        result.push_str(&value[last_end..whole.start()]);

        if let Some(secret_name) = name.strip_prefix("secret.") {
            let manager = SecretManager::new(project_root)?;
            let secret = manager
                .get_secret(secret_name)?
                .ok_or_else(|| anyhow::anyhow!("Secret not found: {secret_name}"))?;
            result.push_str(&secret);
        } else {
            let env_value =
                env::var(name).with_context(|| format!("Environment variable not found: {name}"))?;
            result.push_str(&env_value);
        }

        last_end = whole.end();
    }

    result.push_str(&value[last_end..]);
    Ok(result)
}
