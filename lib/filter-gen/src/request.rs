use serde::{Deserialize, Serialize};

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";
pub const DEFAULT_VISION_MODEL: &str = "google/gemini-2.0-flash-001";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct APIConfig {
    pub api_base_url: String,
    pub api_model: String,
    pub api_vision_model: String,
    pub api_key: String,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl APIConfig {
    pub fn openrouter(api_key: impl ToString) -> Self {
        Self {
            api_base_url: OPENROUTER_BASE_URL.to_string(),
            api_model: DEFAULT_MODEL.to_string(),
            api_vision_model: DEFAULT_VISION_MODEL.to_string(),
            api_key: api_key.to_string(),
            temperature: Some(0.3),
            timeout_secs: 60,
        }
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize, Debug, Clone)]
pub(crate) struct ChatCompletion {
    pub messages: Vec<Message>,
    pub model: String,
    pub stream: bool,
    pub max_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Serialize, Debug, Clone)]
pub(crate) struct Message {
    pub role: String,
    pub content: Content,
}

impl Message {
    pub fn system(text: impl ToString) -> Self {
        Self {
            role: "system".to_string(),
            content: Content::Text(text.to_string()),
        }
    }

    pub fn user(text: impl ToString) -> Self {
        Self {
            role: "user".to_string(),
            content: Content::Text(text.to_string()),
        }
    }

    pub fn user_with_image(text: impl ToString, image_url: impl ToString) -> Self {
        Self {
            role: "user".to_string(),
            content: Content::Parts(vec![
                ContentPart::Text {
                    text: text.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.to_string(),
                    },
                },
            ]),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(untagged)]
pub(crate) enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Debug, Clone)]
pub(crate) struct ImageUrl {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vision_message_shape() -> anyhow::Result<()> {
        let message = Message::user_with_image("look", "data:image/jpeg;base64,AAAA");
        assert_eq!(
            serde_json::to_value(&message)?,
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "look"},
                    {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,AAAA"}}
                ]
            })
        );

        assert_eq!(
            serde_json::to_value(Message::system("hi"))?,
            json!({"role": "system", "content": "hi"})
        );
        Ok(())
    }

    #[test]
    fn test_completions_url() {
        let mut config = APIConfig::openrouter("key");
        assert_eq!(
            config.completions_url(),
            "https://openrouter.ai/api/v1/chat/completions"
        );

        config.api_base_url.push('/');
        assert_eq!(
            config.completions_url(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }
}
