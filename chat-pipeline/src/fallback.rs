use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{info, warn};

use common::error::AppError;

use crate::session::{MessageRole, SessionMessage};

const COMPLETION_TEMPERATURE: f32 = 0.7;

/// A chat completion backend addressed by model name. The production
/// implementation talks to OpenRouter; tests script their own.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, model: &str, messages: &[SessionMessage]) -> Result<String, AppError>;
}

/// OpenRouter exposes the OpenAI chat API, so the stock client works with a
/// rewritten base url.
pub struct OpenRouterBackend {
    client: Client<OpenAIConfig>,
}

impl OpenRouterBackend {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        Self {
            client: Client::with_config(config),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenRouterBackend {
    async fn complete(&self, model: &str, messages: &[SessionMessage]) -> Result<String, AppError> {
        let mut request_messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(messages.len());
        for message in messages {
            let request_message = match message.role {
                MessageRole::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(message.content.as_str())
                    .build()?
                    .into(),
                MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(message.content.as_str())
                    .build()?
                    .into(),
                MessageRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(message.content.as_str())
                    .build()?
                    .into(),
            };
            request_messages.push(request_message);
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(request_messages)
            .temperature(COMPLETION_TEMPERATURE)
            .build()?;

        let response = self.client.chat().create(request).await?;
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AppError::LLMParsing("Model returned an empty completion".to_owned()))
    }
}

/// Walks the model priority list and returns the first successful
/// completion. Per-model failures are logged and swallowed; only running out
/// of models is an error.
pub struct FallbackInvoker {
    backend: Arc<dyn ChatBackend>,
    models: Vec<String>,
}

impl FallbackInvoker {
    pub fn new(backend: Arc<dyn ChatBackend>, models: Vec<String>) -> Self {
        Self { backend, models }
    }

    pub async fn complete(&self, messages: &[SessionMessage]) -> Result<String, AppError> {
        for model in &self.models {
            info!(model, "Requesting chat completion");
            match self.backend.complete(model, messages).await {
                Ok(answer) => {
                    info!(model, "Chat completion succeeded");
                    return Ok(answer);
                }
                Err(error) => {
                    warn!(model, "Model failed, moving to the next one: {error}");
                }
            }
        }
        Err(AppError::ModelsExhausted)
    }

    /// Single attempt against the top-priority model, without fallback.
    pub async fn complete_with_primary(
        &self,
        messages: &[SessionMessage],
    ) -> Result<String, AppError> {
        let model = self.models.first().ok_or(AppError::ModelsExhausted)?;
        self.backend.complete(model, messages).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted backend: canned outcomes consumed in call order.
    pub(crate) struct ScriptedBackend {
        responses: Mutex<Vec<Result<String, String>>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        pub fn new(responses: Vec<Result<String, String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn complete(
            &self,
            model: &str,
            _messages: &[SessionMessage],
        ) -> Result<String, AppError> {
            self.calls.lock().unwrap().push(model.to_owned());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(AppError::InternalError("script exhausted".to_owned()));
            }
            responses.remove(0).map_err(AppError::InternalError)
        }
    }

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    #[tokio::test]
    async fn first_successful_model_wins() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err("rate limited".to_owned()),
            Ok("xin chào".to_owned()),
        ]));
        let invoker = FallbackInvoker::new(backend.clone(), models(&["a", "b", "c"]));

        let answer = invoker
            .complete(&[SessionMessage::user("hi")])
            .await
            .expect("fallback should recover");

        assert_eq!(answer, "xin chào");
        assert_eq!(*backend.calls.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn exhausting_every_model_is_an_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err("down".to_owned()),
            Err("down".to_owned()),
        ]));
        let invoker = FallbackInvoker::new(backend, models(&["a", "b"]));

        let error = invoker
            .complete(&[SessionMessage::user("hi")])
            .await
            .expect_err("should exhaust");
        assert!(matches!(error, AppError::ModelsExhausted));
    }

    #[tokio::test]
    async fn empty_model_list_is_exhausted_immediately() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("unused".to_owned())]));
        let invoker = FallbackInvoker::new(backend, Vec::new());

        let error = invoker
            .complete(&[SessionMessage::user("hi")])
            .await
            .expect_err("no models configured");
        assert!(matches!(error, AppError::ModelsExhausted));
    }
}
