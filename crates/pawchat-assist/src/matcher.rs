//! First-match intent dispatch over the ordered rule table.

use rand::Rng;

use crate::rules::{default_rules, IntentRule, Reply, FALLBACK_REPLY};

/// Source of the index used to choose among equally weighted replies.
pub trait ReplyPicker: Send + Sync {
    /// Return an index in `0..len`. `len` is always at least 1.
    fn pick(&self, len: usize) -> usize;
}

/// Uniform choice from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngPicker;

impl ReplyPicker for ThreadRngPicker {
    fn pick(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Always picks the same position (wrapped to the option count). For tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPicker(pub usize);

impl ReplyPicker for FixedPicker {
    fn pick(&self, len: usize) -> usize {
        self.0 % len
    }
}

/// Maps user text to a canned reply.
pub struct IntentMatcher {
    rules: Vec<IntentRule>,
    picker: Box<dyn ReplyPicker>,
}

impl Default for IntentMatcher {
    fn default() -> Self {
        Self::new(default_rules(), Box::new(ThreadRngPicker))
    }
}

impl IntentMatcher {
    pub fn new(rules: Vec<IntentRule>, picker: Box<dyn ReplyPicker>) -> Self {
        Self { rules, picker }
    }

    /// The built-in table with a caller-supplied picker.
    pub fn with_picker(picker: impl ReplyPicker + 'static) -> Self {
        Self::new(default_rules(), Box::new(picker))
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    /// Name of the first category matching `text`, if any.
    pub fn classify(&self, text: &str) -> Option<&'static str> {
        self.find(&normalize(text)).map(|rule| rule.category)
    }

    /// Reply to `text`, falling back to the topic list when nothing matches.
    pub fn reply(&self, text: &str) -> String {
        let normalized = normalize(text);
        let Some(rule) = self.find(&normalized) else {
            tracing::debug!("No intent matched, using fallback");
            return FALLBACK_REPLY.to_string();
        };

        tracing::debug!(category = rule.category, "Intent matched");
        match rule.reply {
            Reply::Single(text) => text.to_string(),
            Reply::Choice(options) if options.is_empty() => FALLBACK_REPLY.to_string(),
            Reply::Choice(options) => {
                let index = self.picker.pick(options.len()).min(options.len() - 1);
                options[index].to_string()
            }
        }
    }

    fn find(&self, normalized: &str) -> Option<&IntentRule> {
        self.rules.iter().find(|rule| rule.matches(normalized))
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
