//! Policy generation – request validation, prompt dispatch and the LLM client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{GenerationError, PolicyError, Result};
use crate::policy::{is_file_safe, Framework, PolicyKind, PolicySet};
use crate::prompts::build_prompt;

pub const MAX_ORGANIZATION_NAME_CHARS: usize = 20;
pub const MAX_CONSTRAINTS_CHARS: usize = 500;

pub const DEFAULT_MODEL: &str = "mistralai/mistral-nemo";
pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";

/// Form submission as received over the wire. Every field is optional so
/// that missing fields surface as validation errors rather than parse errors.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyRequest {
    pub organization_name: Option<String>,
    pub framework: Option<String>,
    pub constraints: Option<String>,
}

/// A validated generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyForm {
    pub organization_name: String,
    pub framework: Framework,
    pub constraints: String,
}

impl PolicyRequest {
    /// Validate field presence, framework label and lengths.
    pub fn validate(&self) -> Result<PolicyForm> {
        let (Some(org), Some(framework), Some(constraints)) = (
            non_empty(&self.organization_name),
            non_empty(&self.framework),
            non_empty(&self.constraints),
        ) else {
            return Err(PolicyError::Validation("Missing required fields".into()));
        };

        check_organization_name(org)?;
        if constraints.chars().count() > MAX_CONSTRAINTS_CHARS {
            return Err(PolicyError::Validation("Constraints too long".into()));
        }
        let framework = framework
            .parse::<Framework>()
            .map_err(|_| PolicyError::Validation("Unknown framework".into()))?;

        Ok(PolicyForm {
            organization_name: org.to_string(),
            framework,
            constraints: constraints.to_string(),
        })
    }
}

/// Length and character checks shared by generation and export requests.
/// The name ends up in file names and a quoted header value.
pub fn check_organization_name(org: &str) -> Result<()> {
    if org.chars().count() > MAX_ORGANIZATION_NAME_CHARS {
        return Err(PolicyError::Validation("Organization name too long".into()));
    }
    if !is_file_safe(org) {
        return Err(PolicyError::Validation("Invalid organization name".into()));
    }
    Ok(())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Something that turns a prompt into markdown.
#[async_trait]
pub trait PolicyGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError>;
}

/// Generate all three policies concurrently. The first failure fails the
/// whole set.
pub async fn generate_policy_set(
    generator: Arc<dyn PolicyGenerator>,
    form: &PolicyForm,
) -> Result<PolicySet> {
    let prompt = |kind| {
        build_prompt(
            kind,
            &form.organization_name,
            form.framework,
            &form.constraints,
        )
    };
    let (ac, au, ir) = (
        prompt(PolicyKind::AccessControl),
        prompt(PolicyKind::AcceptableUsage),
        prompt(PolicyKind::IncidentResponse),
    );

    log::info!(
        "generating {} policies for '{}'",
        form.framework,
        form.organization_name
    );
    let (access_control, acceptable_usage, incident_response) = tokio::try_join!(
        generator.generate(&ac),
        generator.generate(&au),
        generator.generate(&ir),
    )?;

    Ok(PolicySet {
        access_control,
        acceptable_usage,
        incident_response,
    })
}

/// Configuration for [`OpenRouterClient`].
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

/// OpenAI-compatible chat-completions client pointed at OpenRouter.
pub struct OpenRouterClient {
    http: reqwest::Client,
    config: LlmConfig,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenRouterClient {
    pub fn new(config: LlmConfig) -> std::result::Result<Self, GenerationError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl PolicyGenerator for OpenRouterClient {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        let body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        log::debug!("POST {} (model {})", self.endpoint(), self.config.model);
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}
