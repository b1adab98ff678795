use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use relay_shared::models::{ChatSubmission, Turn};
use tracing::{debug, warn};

use crate::log::{ChatLog, LogEntry, Speaker};
use crate::transport::RelayTransport;

pub const WELCOME_MESSAGE: &str = "Welcome to TakeoffSharks AI — Construction Estimating Service Assistant\n\n\
🔗 https://takeoffsharks.us/ for detailed insights.\n\
📌 Explore our Estimating Services to boost your next project.\n\n\
Ask me anything from quantity estimates to waste percentages and get reliable guidance in seconds.";
pub const PENDING_PLACEHOLDER: &str = "_Working on your estimate..._";
pub const ERROR_NOTICE: &str = "Error: unable to reach service. Please check server or API key.";
pub const CLEARED_NOTICE: &str = "**Conversation cleared.** Start a new estimate or paste specs.";

pub const CHIP_PROMPTS: &[&str] = &[
    "Estimate concrete for a 10m x 5m x 0.15m slab",
    "How many CMU blocks for a 30m long, 3m high wall?",
    "Drywall sheets for a 4m x 5m room with 2.7m ceilings",
    "Typical waste percentage for ceramic tile?",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, or another submission was already in flight.
    Ignored,
    Replied(String),
    Failed,
    /// The conversation was cleared while the request was outstanding.
    Discarded,
}

#[derive(Default)]
struct WidgetState {
    history: Vec<Turn>,
    log: ChatLog,
    draft: String,
    epoch: u64,
}

/// One widget instance: its own history, its own visible log, and at most one
/// outstanding relay call.
pub struct ChatWidget<T> {
    transport: T,
    state: Mutex<WidgetState>,
    sending: AtomicBool,
}

struct SendingGuard<'a>(&'a AtomicBool);

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T: RelayTransport> ChatWidget<T> {
    pub fn new(transport: T) -> Self {
        let mut state = WidgetState::default();
        state.log.push(Speaker::Bot, WELCOME_MESSAGE);

        Self {
            transport,
            state: Mutex::new(state),
            sending: AtomicBool::new(false),
        }
    }

    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let message = text.trim();
        if message.is_empty() {
            return SubmitOutcome::Ignored;
        }
        if self
            .sending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("submission ignored: a request is already in flight");
            return SubmitOutcome::Ignored;
        }
        let _guard = SendingGuard(&self.sending);

        let (submission, epoch) = {
            let mut state = self.lock_state();
            state.log.push(Speaker::User, message);
            state.log.push(Speaker::Bot, PENDING_PLACEHOLDER);
            state.draft.clear();
            let history = state.history.clone();
            state.history.push(Turn::user(message));
            (
                ChatSubmission {
                    message: message.to_string(),
                    history,
                },
                state.epoch,
            )
        };

        let result = self.transport.send(submission).await;

        let mut state = self.lock_state();
        if state.epoch != epoch {
            debug!("dropping relay result for a cleared conversation");
            return SubmitOutcome::Discarded;
        }

        match result {
            Ok(reply) => {
                state.log.replace_last_bot(&reply);
                state.history.push(Turn::assistant(reply.clone()));
                SubmitOutcome::Replied(reply)
            }
            Err(err) => {
                warn!("relay call failed: {err}");
                state.log.replace_last_bot(ERROR_NOTICE);
                SubmitOutcome::Failed
            }
        }
    }

    /// Submits whatever a chip or the user left in the draft.
    pub async fn submit_draft(&self) -> SubmitOutcome {
        let draft = self.draft();
        self.submit(&draft).await
    }

    pub fn clear(&self) {
        let mut state = self.lock_state();
        state.history.clear();
        state.log.clear();
        state.log.push(Speaker::Bot, CLEARED_NOTICE);
        state.epoch += 1;
    }

    /// Fills the draft with a preset prompt without sending it.
    pub fn chip(&self, prompt: &str) {
        self.lock_state().draft = prompt.to_string();
    }

    /// Replaces the draft with typed input.
    pub fn set_draft(&self, text: &str) {
        self.lock_state().draft = text.to_string();
    }

    pub fn draft(&self) -> String {
        self.lock_state().draft.clone()
    }

    pub fn history(&self) -> Vec<Turn> {
        self.lock_state().history.clone()
    }

    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.lock_state().log.entries().to_vec()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    fn lock_state(&self) -> MutexGuard<'_, WidgetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
