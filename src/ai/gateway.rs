//! Summaries for news and events, with a deterministic fallback whenever the
//! text generator is missing or fails.

use std::sync::Arc;

use tracing::warn;

use super::summarizer::TextGenerator;
use crate::pipeline::normalize::truncate_chars;

const MAX_TOKENS: u32 = 300;
const FALLBACK_CHARS: usize = 150;
const MIN_SENTENCE_CUT: usize = 50;
const NEWS_PROMPT_CHARS: usize = 500;

#[derive(Clone)]
pub struct SummaryGateway {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl SummaryGateway {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    /// A gateway that never calls out and always falls back.
    #[cfg(test)]
    pub fn offline() -> Self {
        Self { generator: None }
    }

    pub async fn summarize_news(&self, title: &str, content: &str) -> String {
        let prompt = format!(
            "Summarize this Pokemon GO news in 2-3 sentences.\n\
             Focus on the key information that players need to know.\n\n\
             Title: {title}\n\
             Content: {}\n\n\
             Provide a clear, concise summary.",
            truncate_chars(content, NEWS_PROMPT_CHARS)
        );
        self.summarize(&prompt, title, content).await
    }

    pub async fn summarize_event(&self, title: &str, description: &str) -> String {
        let prompt = format!(
            "Summarize this Pokemon GO event in 2-3 sentences for players.\n\
             Focus on:\n\
             - Event dates (if mentioned)\n\
             - Featured Pokemon\n\
             - Special bonuses or rewards\n\
             - Key activities or what players should do\n\n\
             Event Title: {title}\n\
             Event Description: {description}\n\n\
             Provide a clear, concise summary that helps players quickly understand \
             what this event is about and what they should know."
        );
        self.summarize(&prompt, title, description).await
    }

    async fn summarize(&self, prompt: &str, title: &str, body: &str) -> String {
        let Some(generator) = &self.generator else {
            return fallback_summary(title, body);
        };

        match generator.generate(prompt, MAX_TOKENS).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, title, "Summary generation failed, using fallback");
                fallback_summary(title, body)
            }
        }
    }
}

/// First 150 characters of `body`, cut back to the last full sentence when
/// one ends past character 50, otherwise ellipsized. Empty bodies point at
/// the title instead.
pub fn fallback_summary(title: &str, body: &str) -> String {
    if body.is_empty() {
        return format!("Check out: {title}");
    }

    let summary = truncate_chars(body, FALLBACK_CHARS);
    let summary = summary.trim();
    if body.chars().count() <= FALLBACK_CHARS {
        return summary.to_string();
    }

    let last_period = summary
        .char_indices()
        .enumerate()
        .filter(|(_, (_, c))| *c == '.')
        .last();
    match last_period {
        Some((char_pos, (byte_pos, _))) if char_pos > MIN_SENTENCE_CUT => {
            summary[..=byte_pos].to_string()
        }
        _ => format!("{summary}..."),
    }
}
