use crate::markdown::render_markdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Bot,
}

/// One rendered message in the visible log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub speaker: Speaker,
    pub html: String,
}

/// Visible message log. Every entry is stored already rendered, so raw text
/// never reaches the view unescaped.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    entries: Vec<LogEntry>,
}

impl ChatLog {
    pub fn push(&mut self, speaker: Speaker, content: &str) {
        self.entries.push(LogEntry {
            speaker,
            html: render_markdown(content),
        });
    }

    /// Rewrites the most recent bot entry; no-op when there is none.
    pub fn replace_last_bot(&mut self, content: &str) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|entry| entry.speaker == Speaker::Bot)
        {
            entry.html = render_markdown(content);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }
}
