use safe_llm::{ProviderKind, ProviderSettings};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::io;
use crate::types::{AgentRole, Tier};

/// Looked up in the working directory when no path is given.
pub const CONFIG_FILE: &str = "safe.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// AgentBinding
// ---------------------------------------------------------------------------

/// Which provider (and optionally which model) backs one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentBinding {
    pub provider: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AgentBinding {
    fn on(provider: ProviderKind) -> Self {
        Self {
            provider,
            model: None,
        }
    }

    pub fn model_or_default(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentBindings {
    #[serde(default = "default_coach")]
    pub coach: AgentBinding,
    #[serde(default = "default_scrum_master")]
    pub scrum_master: AgentBinding,
    #[serde(default = "default_developer")]
    pub developer: AgentBinding,
}

fn default_coach() -> AgentBinding {
    AgentBinding::on(ProviderKind::OpenAi)
}

fn default_scrum_master() -> AgentBinding {
    AgentBinding::on(ProviderKind::Anthropic)
}

fn default_developer() -> AgentBinding {
    AgentBinding::on(ProviderKind::Google)
}

impl Default for AgentBindings {
    fn default() -> Self {
        Self {
            coach: default_coach(),
            scrum_master: default_scrum_master(),
            developer: default_developer(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProviderConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

impl ProviderConfig {
    fn for_kind(kind: ProviderKind) -> Self {
        Self {
            api_key_env: kind.default_key_env().to_string(),
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_openai")]
    pub openai: ProviderConfig,
    #[serde(default = "default_anthropic")]
    pub anthropic: ProviderConfig,
    #[serde(default = "default_google")]
    pub google: ProviderConfig,
}

fn default_openai() -> ProviderConfig {
    ProviderConfig::for_kind(ProviderKind::OpenAi)
}

fn default_anthropic() -> ProviderConfig {
    ProviderConfig::for_kind(ProviderKind::Anthropic)
}

fn default_google() -> ProviderConfig {
    ProviderConfig::for_kind(ProviderKind::Google)
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: default_openai(),
            anthropic: default_anthropic(),
            google: default_google(),
        }
    }
}

// ---------------------------------------------------------------------------
// SafeConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeConfig {
    #[serde(default, deserialize_with = "lenient_tier")]
    pub tier: Tier,
    #[serde(default = "default_sprints_per_pi")]
    pub sprints_per_pi: u32,
    #[serde(default = "default_weeks_per_sprint")]
    pub weeks_per_sprint: u32,
    #[serde(default = "default_workdays_per_week")]
    pub workdays_per_week: u32,
    #[serde(default = "default_team_size")]
    pub team_size: u32,
    #[serde(default)]
    pub agents: AgentBindings,
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Fixes the simulated outcomes when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_sprints_per_pi() -> u32 {
    5
}

fn default_weeks_per_sprint() -> u32 {
    2
}

fn default_workdays_per_week() -> u32 {
    5
}

fn default_team_size() -> u32 {
    7
}

fn lenient_tier<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Tier, D::Error> {
    let raw = String::deserialize(d)?;
    Ok(Tier::parse_or_default(&raw))
}

impl Default for SafeConfig {
    fn default() -> Self {
        Self {
            tier: Tier::default(),
            sprints_per_pi: default_sprints_per_pi(),
            weeks_per_sprint: default_weeks_per_sprint(),
            workdays_per_week: default_workdays_per_week(),
            team_size: default_team_size(),
            agents: AgentBindings::default(),
            providers: ProvidersConfig::default(),
            seed: None,
        }
    }
}

impl SafeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: SafeConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(path, data.as_bytes())
    }

    /// Write the default config to `dir/safe.yaml` unless one exists.
    /// Returns the path and whether it was written.
    pub fn init(dir: &Path) -> Result<(PathBuf, bool)> {
        let path = dir.join(CONFIG_FILE);
        let data = serde_yaml::to_string(&Self::default())?;
        let written = io::write_if_missing(&path, data.as_bytes())?;
        Ok((path, written))
    }

    /// Load `explicit` if given, else `safe.yaml` under `dir` if present,
    /// else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        let candidate = dir.join(CONFIG_FILE);
        if candidate.exists() {
            return Ok((Self::load(&candidate)?, Some(candidate)));
        }
        Ok((Self::default(), None))
    }

    pub fn binding(&self, role: AgentRole) -> &AgentBinding {
        match role {
            AgentRole::Coach => &self.agents.coach,
            AgentRole::ScrumMaster => &self.agents.scrum_master,
            AgentRole::Developer => &self.agents.developer,
        }
    }

    pub fn provider_config(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::OpenAi => &self.providers.openai,
            ProviderKind::Anthropic => &self.providers.anthropic,
            ProviderKind::Google => &self.providers.google,
        }
    }

    /// Connection settings for `role`, with the API key read from the
    /// environment (empty when unset).
    pub fn provider_settings(&self, role: AgentRole) -> ProviderSettings {
        let binding = self.binding(role);
        let pc = self.provider_config(binding.provider);
        let mut settings = ProviderSettings::new(
            binding.provider,
            std::env::var(&pc.api_key_env).unwrap_or_default(),
        )
        .with_model(binding.model_or_default());
        settings.api_key_env = pc.api_key_env.clone();
        settings.max_tokens = pc.max_tokens;
        settings.temperature = pc.temperature;
        if let Some(url) = &pc.base_url {
            settings = settings.with_base_url(url.as_str());
        }
        settings
    }

    /// Key variables that are unset for providers some agent uses.
    pub fn missing_api_keys(&self) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for role in AgentRole::all() {
            let env = &self.provider_config(self.binding(*role).provider).api_key_env;
            let unset = std::env::var(env).map(|v| v.is_empty()).unwrap_or(true);
            if unset && !missing.contains(env) {
                missing.push(env.clone());
            }
        }
        missing
    }

    /// Working days in one sprint.
    pub fn sprint_days(&self) -> u32 {
        self.weeks_per_sprint * self.workdays_per_week
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        for (field, value) in [
            ("sprints_per_pi", self.sprints_per_pi),
            ("weeks_per_sprint", self.weeks_per_sprint),
            ("workdays_per_week", self.workdays_per_week),
        ] {
            if value == 0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("{field} must be at least 1"),
                });
            }
        }
        for kind in ProviderKind::all() {
            let t = self.provider_config(*kind).temperature;
            if !(0.0..=2.0).contains(&t) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("{kind} temperature {t} is outside 0.0..=2.0"),
                });
            }
        }
        for env in self.missing_api_keys() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("missing API key: {env} is not set"),
            });
        }
        warnings
    }
}
