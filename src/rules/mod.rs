//! Rule compilation, matching, and application for anchorpatch.
//!
//! This module handles:
//! - Anchor pattern matching under a multiplicity policy
//! - Sequential rule application with feed-forward buffer threading
//! - The per-rule run report, including manual follow-up steps

pub mod applier;
pub mod matcher;

pub use applier::{
	ApplyResult, CompiledRule, Disposition, ManualStep, RunReport, apply, compile_rules,
};
pub use matcher::{MatchOutcome, compile_pattern, find};
