//! Ordered first-match rule evaluation.
//!
//! List order is priority. A rule matches when every one of its tags is
//! present in the caller's tags with an equal value; a rule with no tags
//! matches everything. The matcher never prefers a more specific rule over an
//! earlier one.

use btt_types::{Rule, TagMap, TagValue};

/// Return the first rule whose tags are a subset of `input`.
pub fn match_rule<'a>(rules: &'a [Rule], input: &TagMap) -> Option<&'a Rule> {
    match_index(rules, input).map(|i| &rules[i])
}

/// Index of the first matching rule.
pub fn match_index(rules: &[Rule], input: &TagMap) -> Option<usize> {
    rules.iter().position(|rule| rule_matches(&rule.tags, input))
}

/// Subset test: every `(k, v)` in `rule_tags` has `k` in `input` with an
/// equal value.
pub fn rule_matches(rule_tags: &TagMap, input: &TagMap) -> bool {
    if rule_tags.is_empty() {
        return true;
    }
    if input.len() < rule_tags.len() {
        return false;
    }
    rule_tags
        .iter()
        .all(|(k, v)| input.get(k).is_some_and(|iv| tag_eq(v, iv)))
}

/// Tag equality.
///
/// Numbers compare as `f64` whatever kind the caller supplied them as;
/// strings and booleans compare by kind and value; mixed kinds are unequal.
pub fn tag_eq(a: &TagValue, b: &TagValue) -> bool {
    match (a, b) {
        (TagValue::Str(x), TagValue::Str(y)) => x == y,
        (TagValue::Bool(x), TagValue::Bool(y)) => x == y,
        (TagValue::Num(x), TagValue::Num(y)) => x == y,
        _ => false,
    }
}

/// Whole-map equality, used by rule deletion.
pub fn tags_exact(a: &TagMap, b: &TagMap) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(k, v)| b.get(k).is_some_and(|bv| tag_eq(v, bv)))
}
