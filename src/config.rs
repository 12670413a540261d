use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::DeskPilotResult;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub stability: StabilityConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model_name")]
    pub model: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model_name(),
            request_timeout_secs: default_request_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Fixed settle delay used when stability gating is disabled.
    #[serde(default = "default_ui_settle_ms")]
    pub ui_settle_ms: u64,
    #[serde(default = "default_true")]
    pub journal_enabled: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            ui_settle_ms: default_ui_settle_ms(),
            journal_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fraction of differing pixels at or below which a frame pair counts
    /// as unchanged.
    #[serde(default = "default_stability_threshold")]
    pub threshold: f64,
    #[serde(default = "default_stability_max_wait")]
    pub max_wait_ms: u64,
    #[serde(default = "default_check_interval")]
    pub check_interval_ms: u64,
    #[serde(default = "default_min_stable_frames")]
    pub min_stable_frames: u32,
    /// Probe for an OS busy cursor before comparing frames.
    #[serde(default = "default_true")]
    pub check_cursor: bool,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: default_stability_threshold(),
            max_wait_ms: default_stability_max_wait(),
            check_interval_ms: default_check_interval(),
            min_stable_frames: default_min_stable_frames(),
            check_cursor: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Intents below this model-reported confidence are skipped.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Sleep after every executed action.
    #[serde(default = "default_action_delay_ms")]
    pub action_delay_ms: u64,
    /// Pause before each action, leaving the operator a moment to react.
    #[serde(default = "default_pause_before_ms")]
    pub pause_before_ms: u64,
    #[serde(default = "default_true")]
    pub failsafe_enabled: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            action_delay_ms: default_action_delay_ms(),
            pause_before_ms: default_pause_before_ms(),
            failsafe_enabled: true,
        }
    }
}

/// Pixel delta added to every resolved click/drag coordinate, produced by an
/// offline calibration pass against the model's systematic pointing bias.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct CalibrationConfig {
    #[serde(default)]
    pub offset_x: i32,
    #[serde(default)]
    pub offset_y: i32,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".into()
}
fn default_model_name() -> String {
    "qwen3-vl".into()
}
fn default_request_timeout() -> u64 {
    120
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f64 {
    0.7
}
fn default_top_p() -> f64 {
    0.8
}
fn default_max_iterations() -> u32 {
    10
}
fn default_ui_settle_ms() -> u64 {
    1500
}
fn default_stability_threshold() -> f64 {
    0.02
}
fn default_stability_max_wait() -> u64 {
    3000
}
fn default_check_interval() -> u64 {
    150
}
fn default_min_stable_frames() -> u32 {
    2
}
fn default_confidence_threshold() -> f64 {
    0.8
}
fn default_action_delay_ms() -> u64 {
    500
}
fn default_pause_before_ms() -> u64 {
    100
}
fn default_true() -> bool {
    true
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Some(candidate);
            }
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        let candidate = cwd.join("config.toml");
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in working directory");
            return Some(candidate);
        }
    }

    None
}

/// Loads `config.toml` from next to the executable or the working directory,
/// falling back to defaults when no file exists.
pub fn load_config() -> DeskPilotResult<AppConfig> {
    let Some(path) = resolve_config_path() else {
        tracing::info!("no config.toml found, using defaults");
        return Ok(AppConfig::default());
    };
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(
        path = %path.display(),
        server = %config.model.base_url,
        "config loaded"
    );
    Ok(config)
}
