use crate::{
    GenerateError, Result, prompt,
    quiz::{QuizAnswer, QuizQuestion, fallback_params},
    request::{APIConfig, ChatCompletion, Message},
    response::{ChatCompletionResponse, ErrorBody, parse_params},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use photo_filter::FilterParameters;
use std::time::Duration;

const MAX_TOKENS: u32 = 250;
const VISION_MAX_TOKENS: u32 = 300;
const APP_TITLE: &str = "VIDNA - Photo Filter App";

/// Client for the remote parameter producers.
#[derive(Debug, Clone)]
pub struct FilterGenerator {
    pub config: APIConfig,
    client: reqwest::Client,
}

impl FilterGenerator {
    pub fn new(config: APIConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Quiz answers to a fresh, named filter.
    pub async fn generate(
        &self,
        questions: &[QuizQuestion],
        answers: &[QuizAnswer],
    ) -> Result<FilterParameters> {
        if answers.is_empty() {
            return Err(GenerateError::NoAnswers);
        }

        let messages = vec![
            Message::system(prompt::SYSTEM_PROMPT),
            Message::user(prompt::generate_prompt(questions, answers)),
        ];

        let reply = self
            .complete(&self.config.api_model, messages, MAX_TOKENS, self.timeout())
            .await?;
        parse_params(&reply, None)
    }

    /// Adjust `current` according to a free-text instruction. The name is kept.
    pub async fn refine(
        &self,
        current: &FilterParameters,
        instruction: &str,
    ) -> Result<FilterParameters> {
        if instruction.trim().is_empty() {
            return Err(GenerateError::EmptyInstruction);
        }

        let messages = vec![Message::user(prompt::refine_prompt(current, instruction))];
        let reply = self
            .complete(&self.config.api_model, messages, MAX_TOKENS, self.timeout())
            .await?;
        parse_params(&reply, Some(current.name()))
    }

    /// Shift `current` toward the look of a JPEG reference image.
    pub async fn match_style(
        &self,
        current: &FilterParameters,
        reference_jpeg: &[u8],
    ) -> Result<FilterParameters> {
        let image_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(reference_jpeg));
        let messages = vec![Message::user_with_image(
            prompt::vision_prompt(current),
            image_url,
        )];

        // Vision calls get half again the normal budget.
        let timeout = self.timeout() * 3 / 2;
        let reply = self
            .complete(&self.config.api_vision_model, messages, VISION_MAX_TOKENS, timeout)
            .await?;
        parse_params(&reply, Some(current.name()))
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs.max(1))
    }

    async fn complete(
        &self,
        model: &str,
        messages: Vec<Message>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<String> {
        if self.config.api_key.trim().is_empty() {
            return Err(GenerateError::MissingApiKey);
        }

        let request_body = ChatCompletion {
            messages,
            model: model.to_string(),
            stream: false,
            max_tokens,
            temperature: self.config.temperature,
        };

        log::debug!("chat completion request: model={model}");

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .header("X-Title", APP_TITLE)
            .json(&request_body)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|e| e.message())
                .unwrap_or_else(|| body.chars().take(200).collect());

            return Err(GenerateError::Api {
                status: status.as_u16(),
                message,
            });
        }

        // Some gateways report errors with a 200 status.
        if let Ok(err) = serde_json::from_str::<ErrorBody>(&body) {
            return Err(GenerateError::Api {
                status: status.as_u16(),
                message: err.message().unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        serde_json::from_str::<ChatCompletionResponse>(&body)?.into_content()
    }
}

/// Remote generation, falling back to the deterministic quiz mapping on any
/// failure or when no generator is configured.
pub async fn generate_or_fallback(
    generator: Option<&FilterGenerator>,
    questions: &[QuizQuestion],
    answers: &[QuizAnswer],
) -> FilterParameters {
    if let Some(generator) = generator {
        match generator.generate(questions, answers).await {
            Ok(params) => return params,
            Err(e) => log::warn!("remote filter generation failed, using quiz fallback: {e}"),
        }
    }

    fallback_params(questions, answers)
}
