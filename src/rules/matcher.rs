use crate::config::types::Multiplicity;
use crate::error::{PatchError, Result};
use regex::{Captures, Regex, RegexBuilder};

/// Outcome of matching one anchor pattern against a buffer.
///
/// Captured occurrences borrow the searched text; callers build the
/// replacement buffer before letting the outcome go.
#[derive(Debug)]
pub enum MatchOutcome<'t> {
	/// The occurrences selected by the multiplicity policy, left to right.
	Matched(Vec<Captures<'t>>),

	/// The anchor does not occur in the buffer.
	NoMatch,

	/// More than one occurrence under `RequireExactlyOne`.
	AmbiguousMatch { occurrences: usize },

	/// A selected occurrence is zero-length. Substituting it would loop
	/// forever, so the match is rejected outright.
	DegenerateMatch { offset: usize },
}

/// Compile an anchor pattern. Multiline matching is an explicit opt-in:
/// when set, `.` matches newlines and `^`/`$` match at line boundaries.
pub fn compile_pattern(pattern: &str, multiline: bool, rule_id: &str) -> Result<Regex> {
	RegexBuilder::new(pattern)
		.multi_line(multiline)
		.dot_matches_new_line(multiline)
		.build()
		.map_err(|source| PatchError::InvalidPattern {
			rule_id: rule_id.to_string(),
			pattern: pattern.to_string(),
			source,
		})
}

/// Locate the anchor's occurrences in `text` under the given multiplicity
/// policy. Pure function of its inputs; never touches anything but the
/// arguments.
pub fn find<'t>(pattern: &Regex, text: &'t str, multiplicity: Multiplicity) -> MatchOutcome<'t> {
	let mut occurrences: Vec<Captures<'t>> = pattern.captures_iter(text).collect();

	if occurrences.is_empty() {
		return MatchOutcome::NoMatch;
	}

	match multiplicity {
		Multiplicity::FirstOnly => occurrences.truncate(1),
		Multiplicity::RequireExactlyOne => {
			if occurrences.len() > 1 {
				return MatchOutcome::AmbiguousMatch {
					occurrences: occurrences.len(),
				};
			}
		}
		Multiplicity::AllOccurrences => {}
	}

	// Degenerate check runs over the selected occurrences only: a
	// zero-length match outside the selection never gets substituted.
	for caps in &occurrences {
		if let Some(m) = caps.get(0)
			&& m.is_empty()
		{
			return MatchOutcome::DegenerateMatch { offset: m.start() };
		}
	}

	MatchOutcome::Matched(occurrences)
}
