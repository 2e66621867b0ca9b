use serde::Deserialize;
use std::collections::HashSet;

/// Top-level rules file (a `patch.toml`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuleFile {
	/// Transformation rules, applied in declaration order.
	/// Later rules see earlier rules' output.
	#[serde(default)]
	pub rules: Vec<RuleSpec>,
}

/// One declared transformation rule, as written in the rules file.
///
/// A rule is either a pattern rule (`pattern` + `replace`, with an optional
/// `manual` note surfaced when the rule cannot apply) or a manual-only rule
/// (`manual` alone) for edits that cannot be expressed as a clean
/// pattern/replacement pair.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuleSpec {
	/// Identifier used in the report. Defaults to "rule-N" by position.
	pub id: Option<String>,

	/// Regex anchor pattern locating the text to replace.
	pub pattern: Option<String>,

	/// Replacement template. May reference the pattern's capture groups
	/// as `$1`, `${name}`; `$$` is a literal dollar sign.
	pub replace: Option<String>,

	/// How many anchor occurrences are expected/allowed.
	#[serde(default)]
	pub multiplicity: Multiplicity,

	/// Opt in to multiline matching: `.` matches newlines and `^`/`$`
	/// match at line boundaries. Off by default; a pattern that should
	/// span lines silently never matches without this.
	#[serde(default)]
	pub multiline: bool,

	/// Instruction for a human operator, printed literally when this rule
	/// does not apply (or always, for a manual-only rule).
	pub manual: Option<String>,
}

/// Rule-level policy governing how many anchor occurrences are expected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Multiplicity {
	/// Replace the first occurrence (lowest start offset) only.
	FirstOnly,

	/// Replace the single occurrence; more than one is an ambiguous match.
	#[default]
	RequireExactlyOne,

	/// Replace every non-overlapping occurrence, left to right.
	#[serde(rename = "all", alias = "all-occurrences")]
	AllOccurrences,
}

impl RuleSpec {
	/// The id used in reports and errors: the declared id, or "rule-N"
	/// from the rule's (zero-based) position.
	pub fn effective_id(&self, index: usize) -> String {
		match &self.id {
			Some(id) => id.clone(),
			None => format!("rule-{}", index + 1),
		}
	}

	/// Validate the rule's structure (not its pattern or template syntax;
	/// those are checked at compile time).
	pub fn validate(&self, index: usize) -> Result<(), crate::error::PatchError> {
		if self.pattern.is_some() != self.replace.is_some() {
			return Err(crate::error::PatchError::IncompleteRule {
				rule_id: self.effective_id(index),
			});
		}

		if self.pattern.is_none() && self.manual.is_none() {
			return Err(crate::error::PatchError::EmptyRule {
				rule_id: self.effective_id(index),
			});
		}

		Ok(())
	}
}

impl RuleFile {
	/// Validate every rule's structure and reject duplicate ids.
	pub fn validate(&self) -> Result<(), crate::error::PatchError> {
		let mut seen = HashSet::new();

		for (index, rule) in self.rules.iter().enumerate() {
			rule.validate(index)?;

			let id = rule.effective_id(index);
			if !seen.insert(id.clone()) {
				return Err(crate::error::PatchError::DuplicateRuleId { rule_id: id });
			}
		}

		Ok(())
	}
}
