//! Local assistant for PawChat.
//!
//! Answers free-text questions about the clinic from a fixed, ordered table
//! of intent rules. Used while a chat session is in assisted mode.

pub mod matcher;
pub mod rules;

pub use matcher::{FixedPicker, IntentMatcher, ReplyPicker, ThreadRngPicker};
pub use rules::{default_rules, IntentRule, Reply, ASSISTED_GREETING, FALLBACK_REPLY};
