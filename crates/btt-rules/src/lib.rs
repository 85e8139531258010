//! Rule matching and rule-set manipulation.
//!
//! # Modules
//!
//! - [`matcher`]: first-match evaluation of an ordered rule list against
//!   caller tags
//! - [`rule_set`]: [`RuleSet`], the key → rule-list mapping shared by the
//!   loader and the publisher, with its stored-form codec
//! - [`error`]: error types

pub mod error;
pub mod matcher;
pub mod rule_set;

pub use error::{Result, RuleError};
pub use matcher::{match_index, match_rule, rule_matches, tag_eq, tags_exact};
pub use rule_set::RuleSet;
