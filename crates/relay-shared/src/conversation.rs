use serde_json::Value;
use tracing::debug;

use crate::config::{CompletionSettings, RelayConfig};
use crate::llm::CompletionRequest;
use crate::models::Turn;

/// Turns a widget's `{message, history}` into the outbound message list:
/// the system turn, then at most `history_limit` of the most recent history
/// entries, then the current user message.
#[derive(Debug, Clone)]
pub struct ConversationPolicy {
    system_prompt: String,
    history_limit: usize,
}

impl ConversationPolicy {
    pub fn new(system_prompt: impl Into<String>, history_limit: usize) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            history_limit,
        }
    }

    pub fn from_relay_config(config: &RelayConfig) -> Self {
        Self::new(config.system_prompt.clone(), config.history_limit)
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn build_messages(&self, history: Option<&Value>, message: &str) -> Vec<Turn> {
        let recent = recent_history(history, self.history_limit);

        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(Turn::system(self.system_prompt.as_str()));
        messages.extend(recent);
        messages.push(Turn::user(message));
        messages
    }

    pub fn build_request(
        &self,
        settings: &CompletionSettings,
        history: Option<&Value>,
        message: &str,
    ) -> CompletionRequest {
        CompletionRequest {
            model: settings.model.clone(),
            messages: self.build_messages(history, message),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

// The cap applies to the supplied entries before they are validated, so a
// malformed entry inside the window is dropped rather than replaced by an older one.
fn recent_history(history: Option<&Value>, limit: usize) -> Vec<Turn> {
    let Some(Value::Array(entries)) = history else {
        return Vec::new();
    };

    let start = entries.len().saturating_sub(limit);
    entries[start..]
        .iter()
        .filter_map(|entry| match serde_json::from_value::<Turn>(entry.clone()) {
            Ok(turn) => Some(turn),
            Err(err) => {
                debug!("dropping malformed history entry: {err}");
                None
            }
        })
        .collect()
}
