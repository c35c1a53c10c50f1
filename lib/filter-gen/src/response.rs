use crate::{GenerateError, Result};
use photo_filter::{FilterParameters, synthesize_name, validate};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Deserialize, Debug)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ErrorBody {
    pub error: HashMap<String, Value>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        self.error.get("message").map(|m| match m {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

impl ChatCompletionResponse {
    pub fn into_content(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerateError::EmptyResponse)
    }
}

/// Remove a surrounding Markdown code fence, with or without a `json` tag.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };

    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Parse a model reply into validated, quantized parameters.
///
/// When the reply carries no usable name, `fallback_name` is used, or a name
/// synthesized from the parameters when that is `None`.
pub fn parse_params(text: &str, fallback_name: Option<&str>) -> Result<FilterParameters> {
    let raw: Value = serde_json::from_str(strip_code_fences(text))?;

    let has_name = raw
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|n| !n.trim().is_empty());

    let params = validate(&raw).rounded();
    if has_name {
        return Ok(params);
    }

    let name = match fallback_name {
        Some(name) => name.to_string(),
        None => synthesize_name(&params),
    };
    Ok(params.with_name(&name))
}
