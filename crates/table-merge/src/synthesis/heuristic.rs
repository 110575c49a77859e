//! Deterministic rule proposer that generalizes identifiers character by
//! character. Needs no network, so planning works offline and in tests.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::core::{ProposalRequest, RuleProposer};
use crate::error::{PlanError, Result};
use crate::pattern::CompiledPattern;

use super::sampling::is_placeholder;

/// Proposes rules by generalizing the sampled identifiers column by column.
///
/// Candidates, most specific first:
/// 1. a positional pattern when every identifier has the same length
/// 2. a positional pattern over the shortest length followed by `*`
/// 3. the longest common prefix followed by `*`
///
/// Varying columns become a whole range (`[0-9]`, `[a-z]`). After a round
/// with false positives they list only the characters actually observed
/// (`[1-3]`, `[acd]`) instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicProposer;

impl HeuristicProposer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RuleProposer for HeuristicProposer {
    async fn propose(&self, request: &ProposalRequest) -> Result<String> {
        let mut names: BTreeSet<&str> = request
            .sample
            .iter()
            .map(String::as_str)
            .filter(|s| !is_placeholder(s))
            .collect();
        if let Some(ref prior) = request.prior {
            names.extend(prior.missed_matches.iter().map(String::as_str));
        }
        let names: Vec<Vec<char>> = names.into_iter().map(|s| s.chars().collect()).collect();

        let wide = candidates(&names, Columns::Ranged);
        let pick = match request.prior {
            None => wide.first().cloned(),
            Some(ref prior) if !prior.false_positives.is_empty() => {
                let narrow = candidates(&names, Columns::Observed);
                narrow
                    .iter()
                    .chain(&wide)
                    .find(|c| **c != prior.rule && excludes(c, &prior.false_positives))
                    .or_else(|| narrow.first())
                    .cloned()
            }
            Some(ref prior) => match wide.iter().position(|c| *c == prior.rule) {
                Some(i) => wide.get(i + 1).or_else(|| wide.last()).cloned(),
                None => wide.first().cloned(),
            },
        };
        pick.ok_or_else(|| PlanError::Proposer("no identifiers to generalize".into()))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// How a column whose characters differ is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Columns {
    /// The whole digit or letter range.
    Ranged,
    /// Only the characters seen in that column.
    Observed,
}

fn candidates(names: &[Vec<char>], columns: Columns) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |c: String| {
        if !out.contains(&c) {
            out.push(c);
        }
    };

    let Some(min_len) = names.iter().map(Vec::len).min() else {
        return Vec::new();
    };
    let same_length = names.iter().all(|n| n.len() == min_len);

    if same_length && min_len > 0 {
        push(positional(names, min_len, columns));
    }
    if min_len > 0 {
        push(format!("{}*", positional(names, min_len, columns)));
    }

    let prefix = common_prefix(names);
    push(format!("{}*", escape(&prefix)));

    out
}

fn excludes(candidate: &str, false_positives: &[String]) -> bool {
    CompiledPattern::parse(candidate)
        .map(|p| !false_positives.iter().any(|name| p.matches(name)))
        .unwrap_or(false)
}

/// One token per position over the first `len` characters.
fn positional(names: &[Vec<char>], len: usize, columns: Columns) -> String {
    (0..len)
        .map(|pos| {
            let column = names.iter().map(|n| n[pos]);
            match columns {
                Columns::Ranged => ranged_token(column),
                Columns::Observed => observed_token(column),
            }
        })
        .collect()
}

fn ranged_token(mut column: impl Iterator<Item = char> + Clone) -> String {
    let Some(first) = column.clone().next() else {
        return "?".to_string();
    };
    if column.clone().all(|c| c == first) {
        return escape_char(first);
    }
    if column.clone().all(|c| c.is_ascii_digit()) {
        return "[0-9]".to_string();
    }
    if column.clone().all(|c| c.is_ascii_lowercase()) {
        return "[a-z]".to_string();
    }
    if column.all(|c| c.is_ascii_uppercase()) {
        return "[A-Z]".to_string();
    }
    "?".to_string()
}

/// Class of the characters seen, as a range when they are consecutive.
fn observed_token(column: impl Iterator<Item = char> + Clone) -> String {
    let seen: BTreeSet<char> = column.clone().collect();
    let (Some(&lo), Some(&hi)) = (seen.first(), seen.last()) else {
        return "?".to_string();
    };
    if seen.len() == 1 {
        return escape_char(lo);
    }
    // Punctuation would need escaping inside a class.
    if !seen.iter().all(|c| c.is_ascii_alphanumeric()) {
        return ranged_token(column);
    }

    let consecutive = (hi as u32 - lo as u32) as usize + 1 == seen.len();
    if consecutive && seen.len() > 2 {
        format!("[{}-{}]", lo, hi)
    } else {
        format!("[{}]", seen.into_iter().collect::<String>())
    }
}

fn common_prefix(names: &[Vec<char>]) -> Vec<char> {
    let Some(first) = names.first() else {
        return Vec::new();
    };
    let mut len = first.len();
    for name in &names[1..] {
        len = len.min(first.iter().zip(name).take_while(|(a, b)| a == b).count());
    }
    first[..len].to_vec()
}

fn escape(chars: &[char]) -> String {
    chars.iter().map(|&c| escape_char(c)).collect()
}

/// Dialect metacharacters are wrapped in a single-member class.
fn escape_char(c: char) -> String {
    match c {
        '*' | '?' | '[' => format!("[{}]", c),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{validate, ValidationVerdict};

    fn request(sample: &[&str]) -> ProposalRequest {
        ProposalRequest {
            sample: sample.iter().map(|s| s.to_string()).collect(),
            dialect_rules: String::new(),
            prior: None,
        }
    }

    fn s(items: &[&str]) -> Vec<String> {
        items.iter().map(|i| i.to_string()).collect()
    }

    #[tokio::test]
    async fn test_positional_candidate_first() {
        let rule = HeuristicProposer
            .propose(&request(&["orders_01", "orders_02", "orders_17"]))
            .await
            .unwrap();
        assert_eq!(rule, "orders_[0-9][0-9]");
    }

    #[tokio::test]
    async fn test_letter_and_mixed_columns() {
        let rule = HeuristicProposer
            .propose(&request(&["shard_a1", "shard_b2", "shard_Cx"]))
            .await
            .unwrap();
        assert_eq!(rule, "shard_??");
    }

    #[tokio::test]
    async fn test_varying_lengths_use_open_tail() {
        let rule = HeuristicProposer
            .propose(&request(&["log_1", "log_22", "log_333"]))
            .await
            .unwrap();
        assert_eq!(rule, "log_[0-9]*");
    }

    #[tokio::test]
    async fn test_placeholder_is_ignored() {
        let rule = HeuristicProposer
            .propose(&request(&["t_01", "... other 96 element ...", "t_99"]))
            .await
            .unwrap();
        assert_eq!(rule, "t_[0-9][0-9]");
    }

    #[tokio::test]
    async fn test_advances_past_prior_rule() {
        let mut req = request(&["orders_01", "orders_02"]);
        req.prior = Some(ValidationVerdict::rejected("orders_0[0-9]", "timed out"));

        let rule = HeuristicProposer.propose(&req).await.unwrap();
        assert_eq!(rule, "orders_0[0-9]*");
    }

    #[tokio::test]
    async fn test_false_positives_narrow_to_observed_values() {
        let names = s(&["orders_01", "orders_02", "orders_03"]);
        let mut req = request(&["orders_01", "orders_02", "orders_03"]);
        req.prior = Some(validate("orders_0[0-9]", &names, &s(&["orders_04"])));

        let rule = HeuristicProposer.propose(&req).await.unwrap();
        assert_eq!(rule, "orders_0[1-3]");
        assert!(validate(&rule, &names, &s(&["orders_04"])).valid);
    }

    #[tokio::test]
    async fn test_observed_values_listed_when_not_consecutive() {
        let names = s(&["db_a1", "db_c1", "db_d1"]);
        let mut req = request(&["db_a1", "db_c1", "db_d1"]);
        req.prior = Some(validate("db_[a-z]1", &names, &s(&["db_b1"])));

        let rule = HeuristicProposer.propose(&req).await.unwrap();
        assert_eq!(rule, "db_[acd]1");
    }

    #[tokio::test]
    async fn test_false_positives_narrow_open_tail() {
        let names = s(&["log_1", "log_22"]);
        let mut req = request(&["log_1", "log_22"]);
        req.prior = Some(validate("log_[0-9]*", &names, &s(&["log_3"])));

        let rule = HeuristicProposer.propose(&req).await.unwrap();
        assert_eq!(rule, "log_[12]*");
        assert!(validate(&rule, &names, &s(&["log_3"])).valid);
    }

    #[tokio::test]
    async fn test_missed_matches_widen_candidate() {
        let all = s(&["orders_01", "orders_02", "orders_1x"]);
        let mut req = request(&["orders_01", "orders_02"]);
        req.prior = Some(validate("orders_0[0-9]", &all, &[]));

        let rule = HeuristicProposer.propose(&req).await.unwrap();
        assert!(validate(&rule, &all, &[]).valid, "rule {} should match all", rule);
    }

    #[tokio::test]
    async fn test_metacharacters_are_escaped() {
        let rule = HeuristicProposer
            .propose(&request(&["a*1", "a*2"]))
            .await
            .unwrap();
        assert_eq!(rule, "a[*][0-9]");
        assert!(validate(&rule, &s(&["a*1", "a*2"]), &s(&["ab1"])).valid);
    }

    #[tokio::test]
    async fn test_empty_sample_is_an_error() {
        let err = HeuristicProposer.propose(&request(&[])).await.unwrap_err();
        assert!(matches!(err, PlanError::Proposer(_)));
    }
}
