use crate::config::types::RuleFile;
use crate::error::{PatchError, Result};
use std::path::Path;

/// Parse a rules file from the given path.
pub fn parse_rules_file(path: &Path) -> Result<RuleFile> {
	let content = std::fs::read_to_string(path).map_err(|source| PatchError::RulesReadError {
		path: path.to_path_buf(),
		source,
	})?;

	parse_rules_str(&content, path)
}

/// Parse a rules file from a string (useful for testing).
pub fn parse_rules_str(content: &str, path: &Path) -> Result<RuleFile> {
	let file: RuleFile =
		toml::from_str(content).map_err(|source| PatchError::RulesParseError {
			path: path.to_path_buf(),
			source,
		})?;

	// Validate rule structure before anything compiles or runs
	file.validate()?;

	Ok(file)
}
