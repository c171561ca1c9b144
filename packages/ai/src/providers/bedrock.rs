//! AWS Bedrock provider implementation using the Converse API.

use aws_sdk_bedrockruntime::types::{
    self as bedrock, ContentBlock as BedrockContent, ConversationRole, Message as BedrockMessage,
    SystemContentBlock,
};

use super::{LlmProvider, MAX_TOKENS};
use crate::AiError;

/// AWS Bedrock provider using the Converse API.
///
/// Supports any text model available on Bedrock (Claude, Llama, Mistral,
/// etc.). Authentication uses the standard AWS credential chain (env vars,
/// IAM role, `~/.aws/credentials`).
pub struct BedrockProvider {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
}

impl BedrockProvider {
    /// Creates a new Bedrock provider.
    ///
    /// Loads AWS configuration from the environment (region, credentials).
    /// The `model_id` should be a Bedrock model ID such as
    /// `us.anthropic.claude-sonnet-4-20250514-v1:0`.
    pub async fn new(model_id: String, region: Option<String>) -> Self {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = region {
            config_loader = config_loader.region(aws_config::Region::new(region));
        }

        let config = config_loader.load().await;
        let client = aws_sdk_bedrockruntime::Client::new(&config);

        Self { client, model_id }
    }
}

#[async_trait::async_trait]
impl LlmProvider for BedrockProvider {
    fn name(&self) -> &'static str {
        "bedrock"
    }

    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, AiError> {
        let message = BedrockMessage::builder()
            .role(ConversationRole::User)
            .content(BedrockContent::Text(prompt.to_string()))
            .build()
            .map_err(|e| AiError::Provider {
                message: format!("Failed to build Bedrock Message: {e}"),
            })?;

        let response = self
            .client
            .converse()
            .model_id(&self.model_id)
            .system(SystemContentBlock::Text(system_prompt.to_string()))
            .messages(message)
            .inference_config(
                bedrock::InferenceConfiguration::builder()
                    .max_tokens(i32::try_from(MAX_TOKENS).unwrap_or(i32::MAX))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| AiError::Provider {
                message: format!("Bedrock Converse error: {e}"),
            })?;

        let output = response.output().ok_or_else(|| AiError::Provider {
            message: "No output in Bedrock response".to_string(),
        })?;

        let bedrock::ConverseOutput::Message(response_msg) = output else {
            return Err(AiError::Provider {
                message: "Unexpected Bedrock output variant".to_string(),
            });
        };

        let text: String = response_msg
            .content()
            .iter()
            .filter_map(|block| match block {
                BedrockContent::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if text.is_empty() {
            return Err(AiError::Provider {
                message: "No text in Bedrock response".to_string(),
            });
        }
        Ok(text)
    }
}
