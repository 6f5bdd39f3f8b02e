use async_trait::async_trait;
use crew_core::api::{
    parse_verdict, CritiqueRequest, CritiqueService, GenerationRequest, GenerationService,
    ServiceError, Verdict,
};

use super::http::{ChatClient, ChatHttpErrorKind, ChatMessage};

const MANAGER_SYSTEM_PROMPT: &str = "You are a Senior Investment Research Manager at a top-tier hedge fund. \
Your role is to review analyst work for quality, completeness and accuracy before it reaches the CIO.

Your critique must be ACTIONABLE. Instead of \"needs more detail\", say exactly what is missing:
- BAD: \"The macro analysis needs more depth\"
- GOOD: \"Missing: tariff risk analysis for China exposure, interest rate sensitivity for debt load\"

Output format:
{\"approved\": true/false, \"critique\": \"Specific issues found (if not approved)\", \"revision_instructions\": \"Exactly what the analyst should add or fix (if not approved)\"}";

/// Worker backed by a chat completions endpoint.
pub struct OpenAiGenerationService {
    client: ChatClient,
    temperature: Option<f32>,
}

impl OpenAiGenerationService {
    pub fn new(client: ChatClient, temperature: Option<f32>) -> Self {
        Self {
            client,
            temperature,
        }
    }
}

#[async_trait]
impl GenerationService for OpenAiGenerationService {
    fn name(&self) -> &str {
        "openai-generation"
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, ServiceError> {
        let messages = [
            ChatMessage::system(format!(
                "You are the {} on an equity research team. {}",
                request.role.display_name(),
                request.template.goal
            )),
            ChatMessage::user(request.context),
        ];

        tracing::debug!(
            target: "crew.service",
            model = self.client.model(),
            role = %request.role,
            attempt = request.attempt,
            prompt_len = request.context.len(),
            "generation request"
        );

        self.client
            .complete(&messages, self.temperature, false)
            .await
            .map_err(|err| err.into_service_error())
    }
}

/// Research manager backed by a chat completions endpoint in JSON mode.
pub struct OpenAiCritiqueService {
    client: ChatClient,
}

impl OpenAiCritiqueService {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

fn review_prompt(request: &CritiqueRequest<'_>) -> String {
    let agent = request.role.display_name();
    format!(
        "Review this {agent} output for {ticker}:

--- AGENT OUTPUT ---
{output}
--- END OUTPUT ---

Evaluate it against these criteria:
{criteria}

Be strict but fair. Only approve if the analysis meets professional standards.

Return your evaluation as JSON:
{{\"approved\": true/false, \"critique\": \"...\", \"revision_instructions\": \"...\"}}",
        ticker = request.ticker,
        output = request.output,
        criteria = request.rubric.as_checklist(),
    )
}

#[async_trait]
impl CritiqueService for OpenAiCritiqueService {
    fn name(&self) -> &str {
        "openai-critique"
    }

    async fn critique(&self, request: CritiqueRequest<'_>) -> Result<Verdict, ServiceError> {
        let messages = [
            ChatMessage::system(MANAGER_SYSTEM_PROMPT),
            ChatMessage::user(review_prompt(&request)),
        ];

        let content = self
            .client
            .complete(&messages, None, true)
            .await
            .map_err(|err| match err.kind() {
                ChatHttpErrorKind::Decode => ServiceError::malformed(err.to_string()),
                _ => err.into_service_error(),
            })?;

        let verdict = parse_verdict(&content)?;
        tracing::debug!(
            target: "crew.service",
            model = self.client.model(),
            role = %request.role,
            attempt = request.attempt,
            approved = verdict.approved(),
            feedback = verdict.feedback().len(),
            "critique received"
        );
        Ok(verdict)
    }
}
