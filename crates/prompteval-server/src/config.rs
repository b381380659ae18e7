use std::env;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Forwarded to the completion backend; unset means api.openai.com.
    pub api_base: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_base: None,
            timeout_secs: None,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match non_empty("PORT") {
            Some(p) => p.parse().with_context(|| format!("invalid PORT '{p}'"))?,
            None => defaults.port,
        };

        let timeout_secs = non_empty("LLM_TIMEOUT_SECS")
            .map(|t| t.parse().with_context(|| format!("invalid LLM_TIMEOUT_SECS '{t}'")))
            .transpose()?;

        Ok(Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port,
            api_base: non_empty("OPENAI_API_BASE"),
            timeout_secs,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
