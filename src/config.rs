use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::model::{default_word_entries, ImprovableWordEntry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default = "default_word_entries")]
    pub words: Vec<ImprovableWordEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "gemini", "anthropic", "openai", "openai-compatible" or "mock"
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Inline key, used when `api_key_env` is unset or empty
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,

    /// Optional: Override max_tokens for LLM requests
    /// If not specified, uses provider-specific defaults:
    /// - gemini: 2048
    /// - anthropic: 1024
    /// - openai: 1024
    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    60
}

impl LlmConfig {
    /// Get max_tokens value, using provider-specific default if not specified
    pub fn get_max_tokens(&self) -> u32 {
        if let Some(tokens) = self.max_tokens {
            return tokens;
        }

        match self.provider.as_str() {
            "gemini" => 2048,
            "anthropic" => 1024,
            "openai" | "openai-compatible" => 1024,
            _ => 1024,
        }
    }
}

/// Where the controller looks for prompt fields on the host page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_target_tag")]
    pub tag: String,
    #[serde(default = "default_target_attribute")]
    pub attribute: String,
    #[serde(default = "default_placeholder_markers")]
    pub placeholder_markers: Vec<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            tag: default_target_tag(),
            attribute: default_target_attribute(),
            placeholder_markers: default_placeholder_markers(),
        }
    }
}

fn default_target_tag() -> String {
    "textarea".to_string()
}

fn default_target_attribute() -> String {
    "cdktextareaautosize".to_string()
}

fn default_placeholder_markers() -> Vec<String> {
    vec!["Describe your idea".to_string(), "Make changes".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Quiet period before a suggestion request (default: 1000)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Quiet period before word highlights refresh (default: 300)
    #[serde(default = "default_highlight_debounce_ms")]
    pub highlight_debounce_ms: u64,

    /// Delay of the one-off re-scan after init (default: 1500)
    #[serde(default = "default_rescan_delay_ms")]
    pub rescan_delay_ms: u64,

    /// How long an applied option fades before removal (default: 200)
    #[serde(default = "default_option_fade_ms")]
    pub option_fade_ms: u64,

    /// Ancestor levels searched for the panel anchor (default: 5)
    #[serde(default = "default_anchor_max_depth")]
    pub anchor_max_depth: usize,

    /// Class marking the host element the panel is placed after
    #[serde(default = "default_anchor_class")]
    pub anchor_class: String,

    /// Also ask for short additive options alongside the full suggestion
    #[serde(default = "default_true")]
    pub request_options: bool,

    /// Shown when the suggestion request fails
    #[serde(default = "default_fallback_suggestion")]
    pub fallback_suggestion: String,

    #[serde(default)]
    pub target: TargetConfig,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            highlight_debounce_ms: default_highlight_debounce_ms(),
            rescan_delay_ms: default_rescan_delay_ms(),
            option_fade_ms: default_option_fade_ms(),
            anchor_max_depth: default_anchor_max_depth(),
            anchor_class: default_anchor_class(),
            request_options: true,
            fallback_suggestion: default_fallback_suggestion(),
            target: TargetConfig::default(),
        }
    }
}

impl OverlayConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn highlight_debounce(&self) -> Duration {
        Duration::from_millis(self.highlight_debounce_ms)
    }

    pub fn rescan_delay(&self) -> Duration {
        Duration::from_millis(self.rescan_delay_ms)
    }

    pub fn option_fade(&self) -> Duration {
        Duration::from_millis(self.option_fade_ms)
    }
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_highlight_debounce_ms() -> u64 {
    300
}

fn default_rescan_delay_ms() -> u64 {
    1500
}

fn default_option_fade_ms() -> u64 {
    200
}

fn default_anchor_max_depth() -> usize {
    5
}

fn default_anchor_class() -> String {
    "prompt-input-wrapper".to_string()
}

fn default_true() -> bool {
    true
}

fn default_fallback_suggestion() -> String {
    "Please provide more specific details about what you want to build.".to_string()
}

impl Config {
    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path);
        }

        if let Ok(config) = Self::load_from_path("fromptly.toml") {
            debug!("Loaded config from ./fromptly.toml");
            return Ok(config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("fromptly").join("config.toml");
            if let Ok(config) = Self::load_from_path(&config_path) {
                debug!("Loaded config from {:?}", config_path);
                return Ok(config);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the API key: environment variable first, then the inline value.
    /// Returns an empty string when neither is set; the backend rejects it
    /// before making any request.
    pub fn get_api_key(&self) -> String {
        if let Some(env_var) = &self.llm.api_key_env {
            if let Ok(value) = env::var(env_var) {
                if !value.trim().is_empty() {
                    return value;
                }
            }
        }
        self.llm.api_key.clone().unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: "gemini".to_string(),
                model: "gemini-2.5-flash".to_string(),
                api_key_env: Some("GEMINI_API_KEY".to_string()),
                api_key: None,
                base_url: None,
                max_tokens: None,
                temperature: default_temperature(),
                timeout_secs: default_timeout_secs(),
            },
            overlay: OverlayConfig::default(),
            words: default_word_entries(),
        }
    }
}
