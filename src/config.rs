use std::time::Duration;

use crate::error::{FnolError, Result};

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const MODEL_VAR: &str = "GEMINI_MODEL";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
    /// Extra attempts for transient transport failures, on top of the first.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// Sampling temperature; the model's default when unset.
    pub temperature: Option<f32>,
}

impl GeminiSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Budget and threshold for the critique/refine loop.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackConfig {
    pub target_score: u8,
    pub max_rounds: u32,
    /// Deadline for a single critique or refinement call.
    pub call_timeout: Duration,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            target_score: 10,
            max_rounds: 5,
            call_timeout: Duration::from_secs(180),
        }
    }
}

impl FeedbackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(FnolError::Configuration(
                "feedback max_rounds must be at least 1".to_string(),
            ));
        }
        if !(1..=10).contains(&self.target_score) {
            return Err(FnolError::Configuration(format!(
                "feedback target_score {} must be between 1 and 10",
                self.target_score
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub gemini: GeminiSettings,
    pub feedback: FeedbackConfig,
    pub enable_feedback: bool,
}

impl PipelineConfig {
    pub fn new(gemini: GeminiSettings) -> Self {
        Self {
            gemini,
            feedback: FeedbackConfig::default(),
            enable_feedback: false,
        }
    }

    pub fn with_feedback(mut self, enabled: bool) -> Self {
        self.enable_feedback = enabled;
        self
    }

    /// Resolves the credential and model from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PipelineConfig::from_env`] but reads from any lookup, so tests
    /// never have to touch the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                FnolError::Configuration(format!(
                    "{} environment variable is not set. \
                     Get your API key from https://aistudio.google.com/app/apikey",
                    API_KEY_VAR
                ))
            })?;

        let mut gemini = GeminiSettings::new(api_key);
        if let Some(model) = lookup(MODEL_VAR).filter(|m| !m.trim().is_empty()) {
            gemini = gemini.with_model(model.trim());
        }

        Ok(Self::new(gemini))
    }

    pub fn validate(&self) -> Result<()> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(FnolError::Configuration(format!(
                "{} must not be empty",
                API_KEY_VAR
            )));
        }
        self.feedback.validate()
    }
}
