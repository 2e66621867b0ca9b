use std::path::PathBuf;

/// Library-level structured errors for anchorpatch.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
///
/// Only construction-time problems live here: a rule set that fails to parse
/// or compile never runs. Per-rule match failures (no match, ambiguous match,
/// degenerate match) are not errors; they are recorded in the `RunReport`.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
	#[error("Failed to read rules file: {path}")]
	RulesReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse rules file: {path}")]
	RulesParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Invalid anchor pattern in rule '{rule_id}': {pattern}")]
	InvalidPattern {
		rule_id: String,
		pattern: String,
		#[source]
		source: regex::Error,
	},

	#[error("Template in rule '{rule_id}' references unknown capture group '{reference}'")]
	UnknownGroup { rule_id: String, reference: String },

	#[error("Malformed template in rule '{rule_id}': {detail}")]
	MalformedTemplate { rule_id: String, detail: String },

	#[error("Rule '{rule_id}' must set both 'pattern' and 'replace', or neither")]
	IncompleteRule { rule_id: String },

	#[error("Rule '{rule_id}' has no pattern/replace pair and no manual note")]
	EmptyRule { rule_id: String },

	#[error("Duplicate rule id: '{rule_id}'")]
	DuplicateRuleId { rule_id: String },
}

/// Result type alias using PatchError.
pub type Result<T> = std::result::Result<T, PatchError>;
