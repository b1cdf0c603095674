use std::{collections::HashMap, path::Path, time::Duration};

use anyhow::{bail, Result};

use crate::coordinator::CoordinatorSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
    Ollama,
}

impl std::str::FromStr for LlmBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "ollama" | "local" => Ok(Self::Ollama),
            other => bail!("unknown LLM_BACKEND {other:?} (expected gemini or ollama)"),
        }
    }
}

// Upper bounds keep the derived durations representable.
const MAX_SESSION_AGE_HOURS: i64 = 24 * 365 * 10;
const MAX_LLM_TIMEOUT_S: u64 = 3600;

/// Process configuration. Environment variables win over `.env` entries.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_backend: LlmBackend,
    pub google_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub llm_timeout_s: u64,

    // Debate
    pub max_rounds: u32,
    pub history_window: usize,
    pub session_max_age_hours: i64,
    pub sweep_interval_s: u64,

    // Web
    pub web_bind: String,
    pub web_port: u16,
    pub cors_permissive: bool,
}

/// Where config values come from.
struct Source {
    dotenv: HashMap<String, String>,
    read_env: bool,
}

impl Source {
    fn get(&self, key: &str) -> Option<String> {
        let from_env = if self.read_env {
            std::env::var(key).ok()
        } else {
            None
        };
        from_env
            .or_else(|| self.dotenv.get(key).cloned())
            .filter(|v| !v.trim().is_empty())
    }
}

pub fn parse_dotenv_str(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((k, v)) = line.split_once('=') {
            let v = v.trim().trim_matches('"').trim_matches('\'');
            map.insert(k.trim().to_string(), v.to_string());
        }
    }
    map
}

/// Missing file reads as empty.
pub fn parse_dotenv_file(path: impl AsRef<Path>) -> HashMap<String, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_dotenv_str(&contents),
        Err(_) => HashMap::new(),
    }
}

fn get_str(key: &str, src: &Source, default: &str) -> String {
    src.get(key).unwrap_or_else(|| default.to_string())
}

fn get_bool(key: &str, src: &Source, default: bool) -> bool {
    match src.get(key).map(|v| v.to_lowercase()).as_deref() {
        Some("true") | Some("1") | Some("yes") => true,
        Some("false") | Some("0") | Some("no") => false,
        _ => default,
    }
}

fn get_num<T: std::str::FromStr>(key: &str, src: &Source, default: T) -> T {
    src.get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Read the process environment, falling back to `./.env`.
    pub fn from_env() -> Result<Self> {
        Self::load(Source {
            dotenv: parse_dotenv_file(".env"),
            read_env: true,
        })
    }

    /// Build from a parsed `.env` map alone, ignoring the process environment.
    pub fn from_dotenv(dotenv: HashMap<String, String>) -> Result<Self> {
        Self::load(Source {
            dotenv,
            read_env: false,
        })
    }

    fn load(src: Source) -> Result<Self> {
        let llm_backend: LlmBackend = get_str("LLM_BACKEND", &src, "gemini").parse()?;

        let config = Config {
            llm_backend,
            google_api_key: get_str("GOOGLE_API_KEY", &src, ""),
            gemini_model: get_str("GEMINI_MODEL", &src, "gemini-1.5-flash"),
            gemini_base_url: get_str(
                "GEMINI_BASE_URL",
                &src,
                "https://generativelanguage.googleapis.com",
            ),
            ollama_base_url: get_str("OLLAMA_BASE_URL", &src, "http://localhost:11434"),
            ollama_model: get_str("OLLAMA_MODEL", &src, "llama3.1"),
            llm_timeout_s: get_num("LLM_TIMEOUT_S", &src, 60),
            max_rounds: get_num("MAX_ROUNDS", &src, 10),
            history_window: get_num("HISTORY_WINDOW", &src, 5),
            session_max_age_hours: get_num("SESSION_MAX_AGE_HOURS", &src, 24),
            sweep_interval_s: get_num("SWEEP_INTERVAL_S", &src, 600),
            web_bind: get_str("WEB_BIND", &src, "127.0.0.1"),
            web_port: get_num("WEB_PORT", &src, 8000),
            cors_permissive: get_bool("CORS_PERMISSIVE", &src, true),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.llm_backend == LlmBackend::Gemini && self.google_api_key.is_empty() {
            bail!("GOOGLE_API_KEY is required when LLM_BACKEND=gemini");
        }
        if self.max_rounds == 0 {
            bail!("MAX_ROUNDS must be at least 1");
        }
        if self.history_window == 0 {
            bail!("HISTORY_WINDOW must be at least 1");
        }
        if self.llm_timeout_s == 0 {
            bail!("LLM_TIMEOUT_S must be at least 1");
        }
        if self.session_max_age_hours <= 0 {
            bail!("SESSION_MAX_AGE_HOURS must be positive");
        }
        if self.session_max_age_hours > MAX_SESSION_AGE_HOURS {
            bail!("SESSION_MAX_AGE_HOURS must be at most {MAX_SESSION_AGE_HOURS}");
        }
        if self.llm_timeout_s > MAX_LLM_TIMEOUT_S {
            bail!("LLM_TIMEOUT_S must be at most {MAX_LLM_TIMEOUT_S}");
        }
        Ok(())
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            max_rounds: self.max_rounds,
            history_window: self.history_window,
            llm_timeout: Duration::from_secs(self.llm_timeout_s),
            session_max_age: chrono::Duration::try_hours(self.session_max_age_hours)
                .unwrap_or_else(|| chrono::Duration::hours(MAX_SESSION_AGE_HOURS)),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_s.max(1))
    }
}
