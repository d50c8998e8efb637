// Screening: the four fixed analyses run against a job description and résumé.
// Prompt composition, dispatch and the match-percentage parse live here.
// All provider calls go through llm_client — nothing here talks HTTP directly.

pub mod analyzer;
pub mod handlers;
pub mod match_score;
pub mod prompts;
pub mod tasks;
