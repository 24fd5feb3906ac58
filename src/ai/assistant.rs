//! Free-form Pokemon GO questions and event recommendations, both routed
//! through the same text generator as the summaries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::summarizer::{ChatMessage, TextGenerator, CLAUDE_MODEL};
use crate::error::{AppError, Result};
use crate::models::Event;

const ASK_MAX_TOKENS: u32 = 1024;
const RECOMMEND_MAX_TOKENS: u32 = 2048;

pub const NO_UPCOMING_EVENTS: &str = "No upcoming events found at the moment. Check back soon!";

const ASSISTANT_SYSTEM_PROMPT: &str = "You are an expert Pokemon GO assistant with deep knowledge of:
- Game mechanics and features
- Pokemon stats, types, and movesets
- Raid battles and counters
- PvP (GO Battle League) strategies
- Events, Community Days, and special features
- Resource management (Stardust, Candy, items)
- Evolution strategies and timing
- Trading and friendship systems
- Team building and optimization

Provide helpful, accurate, and concise advice. When giving recommendations:
- Consider the current meta and game state
- Prioritize accessible options for casual and F2P players
- Explain your reasoning briefly
- Be encouraging and positive

If you don't know something specific or if information might be outdated, acknowledge it.
Keep responses conversational and friendly, but informative.";

const RECOMMENDER_SYSTEM_PROMPT: &str = "You are an expert Pokemon GO event analyst and advisor. Your role is to analyze upcoming events and provide personalized recommendations based on player preferences.

When analyzing events, consider:
- Player's playstyle (casual, hardcore, competitive)
- Player's goals (shiny hunting, PvP, raiding, collecting, XP grinding, stardust farming)
- Time constraints (how much time they can play)
- Resource priorities (stardust, candy, XP, rare Pokemon)

For each recommended event, provide:
1. Why this event matches their goals
2. Optimal strategy for maximizing value
3. What to prioritize during the event
4. Time investment needed
5. Expected rewards/benefits

Be encouraging, practical, and specific. Tailor advice to their stated preferences.";

pub const SUGGESTIONS: [&str; 10] = [
    "Should I power up my Mewtwo for raids or PvP?",
    "What's the best moveset for Garchomp?",
    "When should I use a Lucky Egg?",
    "How do I get more Stardust quickly?",
    "What are the best counters for Dialga raids?",
    "Should I evolve my shiny Eevee or wait?",
    "How does the friendship system work?",
    "What Pokemon should I prioritize for Community Day?",
    "Is it worth raiding for this boss?",
    "How can I improve my GO Battle League team?",
];

/// Player profile used to tailor event recommendations.
#[derive(Debug, Clone, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_level")]
    pub playstyle: String,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default = "default_level")]
    pub time_available: String,
    #[serde(default)]
    pub additional_notes: String,
}

fn default_level() -> String {
    "moderate".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            playstyle: default_level(),
            goals: Vec::new(),
            time_available: default_level(),
            additional_notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub recommendations: String,
    pub events_analyzed: usize,
}

#[derive(Clone)]
pub struct Assistant {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl Assistant {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    /// Model name when a generator is configured.
    pub fn model(&self) -> Option<&'static str> {
        self.generator.as_ref().map(|_| CLAUDE_MODEL)
    }

    fn generator(&self) -> Result<&Arc<dyn TextGenerator>> {
        self.generator
            .as_ref()
            .ok_or_else(|| AppError::AssistantUnavailable("ANTHROPIC_API_KEY not set".into()))
    }

    /// Answers `question`, continuing `history` when one is given.
    pub async fn ask(&self, question: &str, history: Vec<ChatMessage>) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::BadRequest("Question cannot be empty".into()));
        }
        let generator = self.generator()?;
        if let Some(bad) = history
            .iter()
            .find(|m| m.role != "user" && m.role != "assistant")
        {
            return Err(AppError::BadRequest(format!(
                "unknown conversation role '{}'",
                bad.role
            )));
        }

        let mut messages = history;
        messages.push(ChatMessage::user(question));

        generator
            .chat(ASSISTANT_SYSTEM_PROMPT, &messages, ASK_MAX_TOKENS)
            .await
            .inspect_err(|e| warn!(error = %e, "Assistant request failed"))
    }

    /// Ranks `events` for the given player. An empty event list answers
    /// without calling the generator.
    pub async fn recommend(
        &self,
        preferences: &Preferences,
        events: &[Event],
    ) -> Result<Recommendation> {
        let generator = self.generator()?;
        if events.is_empty() {
            return Ok(Recommendation {
                recommendations: NO_UPCOMING_EVENTS.to_string(),
                events_analyzed: 0,
            });
        }

        let prompt = recommendation_prompt(preferences, events);
        let recommendations = generator
            .chat(
                RECOMMENDER_SYSTEM_PROMPT,
                &[ChatMessage::user(prompt)],
                RECOMMEND_MAX_TOKENS,
            )
            .await
            .inspect_err(|e| warn!(error = %e, "Event recommendation failed"))?;

        info!(events = events.len(), "Generated event recommendations");
        Ok(Recommendation {
            recommendations,
            events_analyzed: events.len(),
        })
    }
}

pub fn recommendation_prompt(preferences: &Preferences, events: &[Event]) -> String {
    let goals = if preferences.goals.is_empty() {
        "general gameplay".to_string()
    } else {
        preferences.goals.join(", ")
    };

    let mut profile = format!(
        "Player Profile:\n- Playstyle: {}\n- Primary Goals: {goals}\n- Time Available: {}",
        preferences.playstyle, preferences.time_available
    );
    let notes = preferences.additional_notes.trim();
    if !notes.is_empty() {
        profile.push_str(&format!("\n- Additional Notes: {notes}"));
    }

    let events_text = events
        .iter()
        .map(describe_event)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{profile}\n\n\
         Upcoming Events:\n{events_text}\n\n\
         Please analyze these events and recommend which ones this player should prioritize. \
         For each recommended event:\n\n\
         1. Explain why it matches their goals and playstyle\n\
         2. Provide an optimal strategy for participating\n\
         3. Suggest what to prioritize during the event\n\
         4. Estimate time investment needed\n\
         5. Describe expected rewards/benefits\n\n\
         Format your response as a numbered list of recommendations, starting with the most \
         relevant events first. Be specific, encouraging, and practical."
    )
}

fn describe_event(event: &Event) -> String {
    let date = |d: Option<chrono::DateTime<chrono::Utc>>| {
        d.map_or_else(|| "TBD".to_string(), |d| d.format("%Y-%m-%d %H:%M").to_string())
    };
    format!(
        "Event: {}\nType: {}\nDates: {} to {}\nDescription: {}",
        event.title,
        event.event_type.as_deref().unwrap_or("Special Event"),
        date(event.start_date),
        date(event.end_date),
        event
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("No description available"),
    )
}
