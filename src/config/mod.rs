//! Rules file loading and parsing for anchorpatch.
//!
//! This module handles:
//! - TOML rules file parsing
//! - Structural validation (pattern/replace pairing, duplicate ids)

pub mod parser;
pub mod types;

pub use parser::{parse_rules_file, parse_rules_str};
pub use types::{Multiplicity, RuleFile, RuleSpec};
