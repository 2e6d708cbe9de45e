//! Commit vocabulary and the message synthesizer.
//!
//! A message is one template with each `{slot}` placeholder replaced by a
//! value drawn from that slot's candidates. Templates are compiled once, so
//! a reference to an unknown slot is rejected when the synthesizer is built
//! rather than when a message is filled.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BackfillError, Result};
use crate::source::IntervalSource;

/// Templates plus the candidate values for every slot they may reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitVocabulary {
    pub templates: Vec<String>,
    pub slots: BTreeMap<String, Vec<String>>,
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for CommitVocabulary {
    fn default() -> Self {
        let templates = owned(&[
            "feat: {feature} - Enhanced {component} with {improvement}",
            "fix: Resolved {issue} in {component}",
            "refactor: Optimized {component} for better {metric}",
            "docs: Updated {document} with {addition}",
            "style: Improved {component} styling and UX",
            "perf: Enhanced {component} performance by {improvement}",
            "test: Added comprehensive tests for {component}",
            "chore: Updated dependencies and build configuration",
            "feat: Implemented {feature} with {technology}",
            "fix: Corrected {issue} affecting {functionality}",
        ]);

        let mut slots = BTreeMap::new();
        slots.insert(
            "feature".to_string(),
            owned(&[
                "drag-and-drop functionality",
                "hook randomizer",
                "undo system",
                "multi-provider support",
                "draft management",
                "scheduling system",
                "media preview",
                "viral content generation",
                "timing optimization",
            ]),
        );
        slots.insert(
            "component".to_string(),
            owned(&[
                "AI service integration",
                "PostCreator component",
                "Queue management",
                "Settings panel",
                "Storage service",
                "Media upload",
                "UI components",
                "API integration",
                "Authentication flow",
                "Data persistence",
            ]),
        );
        slots.insert(
            "improvement".to_string(),
            owned(&["performance", "reliability", "user experience", "code quality"]),
        );
        slots.insert(
            "issue".to_string(),
            owned(&["bug", "memory leak", "race condition", "edge case"]),
        );
        slots.insert(
            "metric".to_string(),
            owned(&["performance", "maintainability", "scalability"]),
        );
        slots.insert(
            "document".to_string(),
            owned(&["README", "API docs", "user guide"]),
        );
        slots.insert(
            "addition".to_string(),
            owned(&["examples", "screenshots", "detailed instructions"]),
        );
        slots.insert(
            "technology".to_string(),
            owned(&["React hooks", "TypeScript", "AI integration", "localStorage API"]),
        );
        slots.insert(
            "functionality".to_string(),
            owned(&["scheduling", "media upload", "content generation"]),
        );

        CommitVocabulary { templates, slots }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(usize),
}

/// Compiled vocabulary that produces commit messages.
#[derive(Debug, Clone)]
pub struct MessageSynthesizer {
    templates: Vec<Vec<Segment>>,
    slot_names: Vec<String>,
    slot_values: Vec<Vec<String>>,
}

impl MessageSynthesizer {
    /// Compile `vocabulary`, failing fast on unknown or malformed placeholders.
    pub fn new(vocabulary: &CommitVocabulary) -> Result<Self> {
        if vocabulary.templates.is_empty() {
            return Err(BackfillError::EmptyVocabulary(
                "at least one template is required".to_string(),
            ));
        }
        if let Some((name, _)) = vocabulary.slots.iter().find(|(_, v)| v.is_empty()) {
            return Err(BackfillError::EmptyVocabulary(format!(
                "slot `{name}` has no candidates"
            )));
        }

        let slot_names: Vec<String> = vocabulary.slots.keys().cloned().collect();
        let slot_values: Vec<Vec<String>> = vocabulary.slots.values().cloned().collect();

        let placeholder = Regex::new(r"\{([^{}]*)\}")
            .map_err(|e| BackfillError::Configuration(format!("placeholder pattern: {e}")))?;

        let templates = vocabulary
            .templates
            .iter()
            .map(|t| compile_template(&placeholder, t, &slot_names))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            templates,
            slot_names,
            slot_values,
        })
    }

    /// Build from the built-in vocabulary.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&CommitVocabulary::default())
    }

    /// Number of compiled templates.
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Produce one message. A slot used twice in a template gets the same value.
    pub fn synthesize(&self, source: &mut dyn IntervalSource) -> String {
        let template = &self.templates[source.pick(self.templates.len())];
        let mut chosen: Vec<Option<usize>> = vec![None; self.slot_names.len()];
        let mut message = String::new();

        for segment in template {
            match segment {
                Segment::Literal(text) => message.push_str(text),
                Segment::Slot(slot) => {
                    let candidates = &self.slot_values[*slot];
                    let index =
                        *chosen[*slot].get_or_insert_with(|| source.pick(candidates.len()));
                    message.push_str(&candidates[index]);
                }
            }
        }

        message
    }
}

fn compile_template(
    placeholder: &Regex,
    template: &str,
    slot_names: &[String],
) -> Result<Vec<Segment>> {
    let malformed = |reason: &str| BackfillError::MalformedTemplate {
        template: template.to_string(),
        reason: reason.to_string(),
    };

    let mut segments = Vec::new();
    let mut cursor = 0;

    for caps in placeholder.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        let literal = &template[cursor..whole.start()];
        if literal.contains(['{', '}']) {
            return Err(malformed("unbalanced brace"));
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal.to_string()));
        }

        let name = name.as_str().trim();
        if name.is_empty() {
            return Err(malformed("empty placeholder"));
        }
        let slot = slot_names
            .iter()
            .position(|s| s == name)
            .ok_or_else(|| BackfillError::UndefinedSlot {
                template: template.to_string(),
                slot: name.to_string(),
            })?;
        segments.push(Segment::Slot(slot));
        cursor = whole.end();
    }

    let tail = &template[cursor..];
    if tail.contains(['{', '}']) {
        return Err(malformed("unbalanced brace"));
    }
    if !tail.is_empty() {
        segments.push(Segment::Literal(tail.to_string()));
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{RandomSource, ScriptedSource};

    fn vocab(templates: &[&str], slots: &[(&str, &[&str])]) -> CommitVocabulary {
        CommitVocabulary {
            templates: owned(templates),
            slots: slots
                .iter()
                .map(|(k, v)| (k.to_string(), owned(v)))
                .collect(),
        }
    }

    #[test]
    fn test_default_vocabulary_compiles() {
        let synth = MessageSynthesizer::with_defaults().unwrap();
        assert_eq!(synth.template_count(), 10);
    }

    #[test]
    fn test_undefined_slot_fails_at_construction() {
        let v = vocab(&["fix: {ghost} in {component}"], &[("component", &["Queue"])]);
        match MessageSynthesizer::new(&v) {
            Err(BackfillError::UndefinedSlot { slot, .. }) => assert_eq!(slot, "ghost"),
            other => panic!("expected UndefinedSlot, got {other:?}"),
        }
    }

    #[test]
    fn test_unbalanced_brace_is_malformed() {
        let v = vocab(&["fix: {component"], &[("component", &["Queue"])]);
        assert!(matches!(
            MessageSynthesizer::new(&v),
            Err(BackfillError::MalformedTemplate { .. })
        ));
        let v = vocab(&["fix: {}"], &[("component", &["Queue"])]);
        assert!(matches!(
            MessageSynthesizer::new(&v),
            Err(BackfillError::MalformedTemplate { .. })
        ));
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        let v = vocab(&[], &[("component", &["Queue"])]);
        assert!(matches!(
            MessageSynthesizer::new(&v),
            Err(BackfillError::EmptyVocabulary(_))
        ));
        let v = vocab(&["fix: {component}"], &[("component", &[])]);
        assert!(matches!(
            MessageSynthesizer::new(&v),
            Err(BackfillError::EmptyVocabulary(_))
        ));
    }

    #[test]
    fn test_scripted_fill() {
        let v = vocab(
            &["chore: tidy", "fix: Resolved {issue} in {component}"],
            &[("issue", &["bug", "race condition"]), ("component", &["Queue", "Settings"])],
        );
        let synth = MessageSynthesizer::new(&v).unwrap();
        // template 1, issue 1, component 0
        let mut source = ScriptedSource::new().picks(vec![1, 1, 0]);
        assert_eq!(
            synth.synthesize(&mut source),
            "fix: Resolved race condition in Queue"
        );
    }

    #[test]
    fn test_repeated_slot_reuses_value() {
        let v = vocab(&["{x} and {x}"], &[("x", &["a", "b", "c"])]);
        let synth = MessageSynthesizer::new(&v).unwrap();
        let mut source = ScriptedSource::new().picks(vec![0, 2, 1]);
        assert_eq!(synth.synthesize(&mut source), "c and c");
    }

    #[test]
    fn test_no_unresolved_placeholders_in_default_output() {
        let synth = MessageSynthesizer::with_defaults().unwrap();
        let mut source = RandomSource::seeded(1234);
        for _ in 0..1000 {
            let msg = synth.synthesize(&mut source);
            assert!(!msg.is_empty());
            assert!(!msg.contains('{') && !msg.contains('}'), "unresolved: {msg}");
        }
    }

    #[test]
    fn test_every_default_template_resolves() {
        let synth = MessageSynthesizer::with_defaults().unwrap();
        for t in 0..synth.template_count() {
            let mut source = ScriptedSource::new().picks(vec![t]);
            let msg = synth.synthesize(&mut source);
            assert!(!msg.contains('{'), "template {t} left a placeholder: {msg}");
        }
    }
}
