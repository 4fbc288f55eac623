//! Zero-shot subject model backed by a chat LLM via the `genai` crate
//!
//! The model is asked for a JSON object mapping every subject label to a
//! probability. Replies are parsed leniently: surrounding prose and code
//! fences are ignored, and both `{"label": score}` maps and
//! `[{"label": .., "score": ..}]` lists are accepted.

use super::model::{ClassificationError, SubjectModel, SubjectScore};
use super::vocabulary::SubjectVocabulary;
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use serde_json::Value;
use tracing::{debug, error};

/// Longer notes are truncated before prompting
const MAX_PROMPT_CHARS: usize = 4000;

const SYSTEM_PROMPT: &str = "You classify handwritten study notes by academic subject. \
Reply with a single JSON object mapping every subject label you are given to a \
probability between 0 and 1. The probabilities must sum to 1. Reply with JSON only.";

pub struct LlmModel {
    client: Client,
    model: String,
    provider: AdapterKind,
}

impl LlmModel {
    /// Creates a model client. `NOTEFILER_API_BASE_URL` overrides the
    /// provider's endpoint.
    pub fn new(provider: AdapterKind, model: impl Into<String>) -> Self {
        let model = model.into();
        let custom_endpoint = std::env::var("NOTEFILER_API_BASE_URL").ok();

        let client = if let Some(endpoint_url) = custom_endpoint {
            debug!(
                "Using custom endpoint for {}: {}",
                provider.as_str(),
                endpoint_url
            );

            let model_clone = model.clone();
            let resolver = ServiceTargetResolver::from_resolver_fn(
                move |_service_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error>
                {
                    let endpoint = Endpoint::from_owned(endpoint_url.clone());

                    let auth = match provider.default_key_env_name() {
                        Some(api_key_var) => AuthData::from_env(api_key_var),
                        None => AuthData::from_single(""),
                    };

                    Ok(ServiceTarget {
                        endpoint,
                        auth,
                        model: ModelIden::new(provider, &model_clone),
                    })
                },
            );

            Client::builder()
                .with_service_target_resolver(resolver)
                .build()
        } else {
            Client::default()
        };

        debug!(
            "Creating subject model: provider={}, model={}",
            provider.as_str(),
            model
        );

        Self {
            client,
            model,
            provider,
        }
    }

    fn build_prompt(text: &str, vocabulary: &SubjectVocabulary) -> String {
        let mut prompt = String::from("Subjects:\n");
        for subject in vocabulary.iter() {
            prompt.push_str(&format!("- {}: {}\n", subject.label, subject.description));
        }

        let note: String = text.chars().take(MAX_PROMPT_CHARS).collect();
        prompt.push_str("\nNote:\n");
        prompt.push_str(&note);
        prompt
    }
}

#[async_trait]
impl SubjectModel for LlmModel {
    async fn score(
        &self,
        text: &str,
        vocabulary: &SubjectVocabulary,
    ) -> Result<Vec<SubjectScore>, ClassificationError> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(Self::build_prompt(text, vocabulary)),
        ]);
        let options = ChatOptions::default().with_temperature(0.0);

        let response = self
            .client
            .exec_chat(&self.model, request, Some(&options))
            .await
            .map_err(|e| {
                error!("{} API error: {}", self.provider.as_str(), e);
                ClassificationError::ModelUnavailable(format!(
                    "{} request failed: {}",
                    self.provider.as_str(),
                    e
                ))
            })?;

        let content = response.first_text().unwrap_or_default();
        parse_scores(content)
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn model_info(&self) -> Option<String> {
        Some(self.model.clone())
    }
}

impl std::fmt::Debug for LlmModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmModel")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .finish()
    }
}

/// Extracts label scores from a model reply
pub fn parse_scores(reply: &str) -> Result<Vec<SubjectScore>, ClassificationError> {
    let json = extract_json(reply).ok_or_else(|| {
        ClassificationError::InvalidResponse(format!(
            "no JSON found in reply: {}",
            reply.chars().take(80).collect::<String>()
        ))
    })?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| ClassificationError::InvalidResponse(e.to_string()))?;

    let scores = match value {
        Value::Object(mut map) => {
            // Some models wrap the map in {"scores": {...}}
            if let Some(Value::Object(inner)) = map.remove("scores") {
                map = inner;
            }
            map.into_iter()
                .filter_map(|(label, score)| {
                    score.as_f64().map(|s| SubjectScore::new(label, s as f32))
                })
                .collect::<Vec<_>>()
        }
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let label = item.get("label").or_else(|| item.get("subject"))?.as_str()?;
                let score = item.get("score").or_else(|| item.get("confidence"))?.as_f64()?;
                Some(SubjectScore::new(label, score as f32))
            })
            .collect(),
        _ => Vec::new(),
    };

    if scores.is_empty() {
        return Err(ClassificationError::InvalidResponse(
            "reply contained no label scores".to_string(),
        ));
    }
    Ok(scores)
}

fn extract_json(reply: &str) -> Option<&str> {
    let object = reply.find('{').zip(reply.rfind('}'));
    let array = reply.find('[').zip(reply.rfind(']'));

    let (start, end) = match (object, array) {
        (Some(o), Some(a)) => {
            if a.0 < o.0 {
                a
            } else {
                o
            }
        }
        (Some(o), None) => o,
        (None, Some(a)) => a,
        (None, None) => return None,
    };

    (start < end).then(|| &reply[start..=end])
}
