mod assistant;
mod gateway;
mod summarizer;

pub use assistant::{Assistant, Preferences, Recommendation, SUGGESTIONS};
pub use gateway::SummaryGateway;
pub use summarizer::{ChatMessage, ClaudeClient, TextGenerator};
