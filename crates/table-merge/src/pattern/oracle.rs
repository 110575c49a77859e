//! Validation of candidate rules against required and excluded identifiers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{CompiledPattern, PatternError};

/// Judgement of a candidate rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    /// The candidate rule that was checked.
    pub rule: String,

    /// True iff nothing was missed and nothing was falsely matched.
    pub valid: bool,

    /// Required identifiers the rule failed to match.
    pub missed_matches: Vec<String>,

    /// Excluded identifiers the rule matched anyway.
    pub false_positives: Vec<String>,

    /// Parse failure or refinement hint, when the rule is not valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationVerdict {
    /// Verdict for a rule that could not be checked at all.
    pub fn rejected(rule: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            valid: false,
            missed_matches: Vec::new(),
            false_positives: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Refinement instructions for a proposer, built from this verdict.
    pub fn feedback(&self) -> String {
        if self.valid {
            return format!("The rule '{}' is valid.", self.rule);
        }

        let mut lines = vec![format!("The rule '{}' is not valid.", self.rule)];
        if let Some(ref err) = self.error {
            if self.missed_matches.is_empty() && self.false_positives.is_empty() {
                lines.push(format!("Validator error: {}", err));
            }
        }
        if !self.missed_matches.is_empty() {
            lines.push(format!(
                "It does not match these required names: {}. \
                 Refine the rule so that all previously provided names match.",
                self.missed_matches.join(", ")
            ));
        }
        if !self.false_positives.is_empty() {
            lines.push(format!(
                "It also matches these names that must be excluded: {}. \
                 Refine the rule so that all of them are excluded.",
                self.false_positives.join(", ")
            ));
        }
        lines.join("\n")
    }
}

fn judge(
    compiled: &CompiledPattern,
    must_match: &[String],
    must_not_match: &[String],
) -> ValidationVerdict {
    let missed_matches: Vec<String> = must_match
        .iter()
        .filter(|name| !compiled.matches(name))
        .cloned()
        .collect();
    let false_positives: Vec<String> = must_not_match
        .iter()
        .filter(|name| compiled.matches(name))
        .cloned()
        .collect();

    let valid = missed_matches.is_empty() && false_positives.is_empty();
    let error = match (missed_matches.is_empty(), false_positives.is_empty()) {
        (true, true) => None,
        (false, true) => Some("rule misses required names".to_string()),
        (true, false) => Some("rule matches excluded names".to_string()),
        (false, false) => {
            Some("rule misses required names and matches excluded names".to_string())
        }
    };

    ValidationVerdict {
        rule: compiled.as_str().to_string(),
        valid,
        missed_matches,
        false_positives,
        error,
    }
}

fn parse_failure(pattern: &str, err: PatternError) -> ValidationVerdict {
    ValidationVerdict::rejected(pattern, format!("invalid pattern: {}", err))
}

/// Validate a pattern against required and excluded identifiers.
///
/// Pure: compiles the pattern, tests every identifier, and reports misses and
/// false positives in input order. A pattern that does not parse is invalid
/// with `error` set.
pub fn validate(pattern: &str, must_match: &[String], must_not_match: &[String]) -> ValidationVerdict {
    match CompiledPattern::parse(pattern) {
        Ok(compiled) => judge(&compiled, must_match, must_not_match),
        Err(e) => parse_failure(pattern, e),
    }
}

/// Oracle with a compile cache keyed by pattern text.
///
/// Safe to share between tasks and to call at any frequency; the cache only
/// saves repeated parsing and never changes a verdict.
#[derive(Debug, Default)]
pub struct PatternOracle {
    compiled: Mutex<HashMap<String, Arc<CompiledPattern>>>,
}

impl PatternOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a pattern, reusing an earlier compilation of the same text.
    pub fn compile(&self, pattern: &str) -> Result<Arc<CompiledPattern>, PatternError> {
        if let Some(hit) = self.lock().get(pattern) {
            return Ok(hit.clone());
        }
        let compiled = Arc::new(CompiledPattern::parse(pattern)?);
        self.lock()
            .insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    }

    /// Same as [`validate`], using the compile cache.
    pub fn validate(
        &self,
        pattern: &str,
        must_match: &[String],
        must_not_match: &[String],
    ) -> ValidationVerdict {
        match self.compile(pattern) {
            Ok(compiled) => judge(&compiled, must_match, must_not_match),
            Err(e) => parse_failure(pattern, e),
        }
    }

    /// Number of distinct patterns compiled so far.
    pub fn cached_patterns(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<CompiledPattern>>> {
        self.compiled.lock().unwrap_or_else(|e| e.into_inner())
    }
}
