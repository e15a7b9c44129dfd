//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. historia.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::Error;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "historia.toml";

/// Model selector sent with every request of a session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Llm {
    #[default]
    #[serde(rename = "OpenAI")]
    OpenAi,
    #[serde(rename = "DeepSeek")]
    DeepSeek,
}

impl Llm {
    /// Value the chat service expects in the `llm` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::DeepSeek => "DeepSeek",
        }
    }
}

impl std::fmt::Display for Llm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Llm {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "deepseek" => Ok(Self::DeepSeek),
            other => Err(Error::Config(format!(
                "Unknown llm '{}' (expected OpenAI or DeepSeek)",
                other
            ))),
        }
    }
}

/// Chat service endpoint configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL; the three operations are sub-paths of it
    #[serde(default)]
    pub url: String,

    /// Static API key sent as `x-api-key`
    #[serde(default, skip_serializing)]
    pub key: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// The key must never end up in log output
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Chat session defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model used when the operator does not pick one
    #[serde(default)]
    pub llm: Llm,

    /// User name to log in with on startup
    pub user: Option<String>,
}

/// Main configuration for historia
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat service configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Session defaults
    #[serde(default)]
    pub chat: ChatConfig,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 設定ファイル内の `${VAR_NAME}` は環境変数の値に置換され、
    /// その後、環境変数による上書きが適用されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let mut cfg = Self::read_toml_file(path)?;
        cfg.apply_env_overrides()?;

        Ok(cfg)
    }

    /// Read and parse a TOML file without env overrides
    fn read_toml_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let toml_content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&toml_content)
    }

    /// Parse a TOML document after `${VAR}` expansion, without env overrides
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded_content = Self::expand_env_vars(content);

        toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// 以下の順序で設定ファイルを探します:
    /// 1. `HISTORIA_CONFIG` で指定されたパス
    /// 2. `./historia.toml`
    /// 3. 見つからない場合は環境変数のみ
    pub fn load() -> crate::Result<Self> {
        if let Ok(path) = std::env::var("HISTORIA_CONFIG") {
            if !path.is_empty() {
                return Self::from_toml_file(path);
            }
        }

        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) -> crate::Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply `HISTORIA_*` overrides read through `lookup`
    fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> crate::Result<()> {
        if let Some(url) = lookup("HISTORIA_API_URL") {
            if !url.is_empty() {
                self.api.url = url;
            }
        }
        if let Some(key) = lookup("HISTORIA_API_KEY") {
            if !key.is_empty() {
                self.api.key = key;
            }
        }
        if let Some(secs) = lookup("HISTORIA_TIMEOUT_SECS") {
            self.api.timeout_secs = secs.trim().parse().map_err(|_| {
                Error::Config(format!("HISTORIA_TIMEOUT_SECS is not a number: {}", secs))
            })?;
        }

        if let Some(llm) = lookup("HISTORIA_LLM") {
            if !llm.is_empty() {
                self.chat.llm = llm.parse()?;
            }
        }
        if let Some(user) = lookup("HISTORIA_USER") {
            if !user.trim().is_empty() {
                self.chat.user = Some(user);
            }
        }

        Ok(())
    }

    /// Check that the chat service can be reached with this configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.api.url.trim().is_empty() {
            return Err(Error::Config(
                "API URL not set (HISTORIA_API_URL or [api].url)".to_string(),
            ));
        }
        if self.api.key.trim().is_empty() {
            return Err(Error::Config(
                "API key not set (HISTORIA_API_KEY or [api].key)".to_string(),
            ));
        }
        if self.api.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than 0".to_string()));
        }
        Ok(())
    }
}
