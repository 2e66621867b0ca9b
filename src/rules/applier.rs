use crate::config::types::{Multiplicity, RuleFile, RuleSpec};
use crate::error::{PatchError, Result};
use crate::rules::matcher::{MatchOutcome, compile_pattern, find};
use regex::{Captures, Regex};

/// A compiled rule, immutable after construction.
///
/// Pattern rules carry a compiled regex and a validated substitution
/// template. Manual-only rules carry neither; they exist to put a human
/// instruction into the report.
#[derive(Debug)]
pub struct CompiledRule {
	/// Identifier used in the report.
	pub id: String,

	/// Compiled anchor pattern. `None` for manual-only rules.
	pub pattern: Option<Regex>,

	/// Substitution template, validated against the pattern's groups.
	pub template: Option<String>,

	/// How many anchor occurrences are expected/allowed.
	pub multiplicity: Multiplicity,

	/// Instruction surfaced when the rule does not apply.
	pub manual: Option<String>,
}

impl CompiledRule {
	/// Compile a rule from its declared form. Pattern and template problems
	/// surface here, before any rule runs against a buffer.
	pub fn from_spec(spec: &RuleSpec, index: usize) -> Result<Self> {
		let id = spec.effective_id(index);

		// Re-checked here so programmatically built rule sets get the same
		// guarantees as parsed ones.
		spec.validate(index)?;

		let pattern = spec
			.pattern
			.as_ref()
			.map(|p| compile_pattern(p, spec.multiline, &id))
			.transpose()?;

		if let (Some(re), Some(template)) = (&pattern, &spec.replace) {
			validate_template(template, re, &id)?;
		}

		Ok(CompiledRule {
			id,
			pattern,
			template: spec.replace.clone(),
			multiplicity: spec.multiplicity,
			manual: spec.manual.clone(),
		})
	}
}

/// Compile every rule in a rules file, preserving declaration order.
pub fn compile_rules(file: &RuleFile) -> Result<Vec<CompiledRule>> {
	file.rules
		.iter()
		.enumerate()
		.map(|(index, spec)| CompiledRule::from_spec(spec, index))
		.collect()
}

/// How one rule fared against the buffer it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
	/// The anchor matched; the buffer was rewritten.
	Applied { occurrences: usize },

	/// The anchor did not occur. Buffer unchanged.
	NoMatch,

	/// More than one occurrence under `RequireExactlyOne`. The engine
	/// never guesses which occurrence was intended; buffer unchanged.
	AmbiguousMatch { occurrences: usize },

	/// A zero-length match was rejected. Buffer unchanged.
	DegenerateMatch,

	/// A manual-only rule; it never touches the buffer.
	ManualOnly,
}

/// Per-rule entry in the run report.
#[derive(Debug, Clone)]
pub struct ApplyResult {
	/// The rule this entry describes.
	pub rule_id: String,

	/// What happened when the rule ran.
	pub disposition: Disposition,
}

impl ApplyResult {
	/// Whether the rule matched and rewrote the buffer.
	pub fn matched(&self) -> bool {
		matches!(self.disposition, Disposition::Applied { .. })
	}

	/// Number of occurrences replaced (zero unless applied).
	pub fn occurrences_replaced(&self) -> usize {
		match self.disposition {
			Disposition::Applied { occurrences } => occurrences,
			_ => 0,
		}
	}
}

/// An outstanding edit a human operator must finish by hand.
#[derive(Debug, Clone)]
pub struct ManualStep {
	/// The rule that flagged the step.
	pub rule_id: String,

	/// The literal instruction to show the operator.
	pub instruction: String,
}

/// The complete, inspectable outcome of one run: every rule's result in
/// order, the final buffer, and any outstanding manual steps. The engine
/// never persists anything; the caller decides from this report whether
/// to write `final_buffer` anywhere.
#[derive(Debug)]
pub struct RunReport {
	/// One entry per rule, in application order.
	pub results: Vec<ApplyResult>,

	/// The buffer after every rule has run.
	pub final_buffer: String,

	/// Manual follow-up steps, in the order they were flagged.
	pub manual_steps: Vec<ManualStep>,
}

impl RunReport {
	/// True when every pattern rule applied and no manual step is
	/// outstanding.
	pub fn fully_applied(&self) -> bool {
		self.manual_steps.is_empty()
			&& self
				.results
				.iter()
				.all(|r| matches!(r.disposition, Disposition::Applied { .. }))
	}
}

/// Apply an ordered rule set to a text buffer.
///
/// Each rule matches against the buffer as rewritten by all prior rules,
/// not the original input; that feed-forward ordering is the core
/// invariant of the engine. Match failures are non-fatal: they are
/// recorded and the run continues, since later rules may be independent
/// of earlier ones.
pub fn apply(rules: &[CompiledRule], initial_text: &str) -> RunReport {
	let mut buffer = initial_text.to_string();
	let mut results = Vec::with_capacity(rules.len());
	let mut manual_steps = Vec::new();

	for rule in rules {
		let (disposition, rewritten) = apply_rule(rule, &buffer);

		if let Some(next) = rewritten {
			buffer = next;
		}

		if !matches!(disposition, Disposition::Applied { .. })
			&& let Some(note) = &rule.manual
		{
			manual_steps.push(ManualStep {
				rule_id: rule.id.clone(),
				instruction: note.clone(),
			});
		}

		results.push(ApplyResult {
			rule_id: rule.id.clone(),
			disposition,
		});
	}

	RunReport {
		results,
		final_buffer: buffer,
		manual_steps,
	}
}

/// Run one rule against the current buffer. Returns the disposition and,
/// on success, the rewritten buffer.
fn apply_rule(rule: &CompiledRule, buffer: &str) -> (Disposition, Option<String>) {
	let (Some(pattern), Some(template)) = (&rule.pattern, &rule.template) else {
		return (Disposition::ManualOnly, None);
	};

	match find(pattern, buffer, rule.multiplicity) {
		MatchOutcome::NoMatch => (Disposition::NoMatch, None),
		MatchOutcome::AmbiguousMatch { occurrences } => {
			(Disposition::AmbiguousMatch { occurrences }, None)
		}
		MatchOutcome::DegenerateMatch { .. } => (Disposition::DegenerateMatch, None),
		MatchOutcome::Matched(occurrences) => {
			let rewritten = substitute(buffer, &occurrences, template);
			(
				Disposition::Applied {
					occurrences: occurrences.len(),
				},
				Some(rewritten),
			)
		}
	}
}

/// Replace each matched span with the rendered template, producing a new
/// buffer. Occurrences are non-overlapping and ordered, so a single
/// left-to-right pass suffices.
fn substitute(text: &str, occurrences: &[Captures<'_>], template: &str) -> String {
	let mut out = String::with_capacity(text.len());
	let mut last = 0;

	for caps in occurrences {
		// Group 0 is the whole match and always present.
		let Some(m) = caps.get(0) else { continue };
		out.push_str(&text[last..m.start()]);
		caps.expand(template, &mut out);
		last = m.end();
	}

	out.push_str(&text[last..]);
	out
}

/// Validate a substitution template against its pattern's capture groups.
///
/// References use the `regex` crate's expansion syntax: `$1`, `$name`,
/// `${1}`, `${name}`; `$$` is a literal dollar. Referencing a group the
/// pattern does not define is a construction-time error, never a silent
/// empty expansion at run time.
fn validate_template(template: &str, pattern: &Regex, rule_id: &str) -> Result<()> {
	let group_count = pattern.captures_len();
	let group_names: Vec<&str> = pattern.capture_names().flatten().collect();

	let bytes = template.as_bytes();
	let mut i = 0;

	while i < bytes.len() {
		if bytes[i] != b'$' {
			i += 1;
			continue;
		}

		// "$$" escapes a literal dollar
		if bytes.get(i + 1) == Some(&b'$') {
			i += 2;
			continue;
		}

		let (reference, next) = if bytes.get(i + 1) == Some(&b'{') {
			let start = i + 2;
			let Some(close) = template[start..].find('}').map(|p| start + p) else {
				return Err(PatchError::MalformedTemplate {
					rule_id: rule_id.to_string(),
					detail: format!("unclosed group reference at byte {i}"),
				});
			};
			(&template[start..close], close + 1)
		} else {
			let start = i + 1;
			let mut end = start;
			while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
				end += 1;
			}
			(&template[start..end], end)
		};

		// A bare "$" followed by nothing referencable is a literal dollar,
		// matching the regex crate's expansion rules.
		if reference.is_empty() {
			i += 1;
			continue;
		}

		if reference.bytes().all(|b| b.is_ascii_digit()) {
			let index: usize =
				reference
					.parse()
					.map_err(|_| PatchError::MalformedTemplate {
						rule_id: rule_id.to_string(),
						detail: format!("group index '{reference}' out of range"),
					})?;
			if index >= group_count {
				return Err(PatchError::UnknownGroup {
					rule_id: rule_id.to_string(),
					reference: reference.to_string(),
				});
			}
		} else if !group_names.contains(&reference) {
			return Err(PatchError::UnknownGroup {
				rule_id: rule_id.to_string(),
				reference: reference.to_string(),
			});
		}

		i = next;
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pattern_rule(id: &str, pattern: &str, replace: &str) -> RuleSpec {
		RuleSpec {
			id: Some(id.to_string()),
			pattern: Some(pattern.to_string()),
			replace: Some(replace.to_string()),
			..Default::default()
		}
	}

	fn compile(specs: &[RuleSpec]) -> Vec<CompiledRule> {
		let file = RuleFile {
			rules: specs.to_vec(),
		};
		compile_rules(&file).unwrap()
	}

	#[test]
	fn test_single_replacement() {
		let rules = compile(&[pattern_rule("bump-x", r"const x = 1;", "const x = 2;")]);
		let report = apply(&rules, "const x = 1;\n");

		assert_eq!(report.final_buffer, "const x = 2;\n");
		assert_eq!(report.results.len(), 1);
		assert!(report.results[0].matched());
		assert_eq!(report.results[0].occurrences_replaced(), 1);
		assert!(report.fully_applied());
	}

	#[test]
	fn test_ambiguous_anchor_leaves_buffer_unchanged() {
		let rules = compile(&[pattern_rule("bump-x", r"const x = 1;", "const x = 2;")]);
		let input = "const x = 1;\nconst x = 1;\n";
		let report = apply(&rules, input);

		assert_eq!(report.final_buffer, input);
		assert!(!report.results[0].matched());
		assert_eq!(
			report.results[0].disposition,
			Disposition::AmbiguousMatch { occurrences: 2 }
		);
	}

	#[test]
	fn test_feed_forward_across_rules() {
		// Rule 2's anchor exists only in rule 1's output, so rule 2 can
		// succeed only by reading the post-rule-1 buffer.
		let rules = compile(&[
			pattern_rule("insert-marker", r"start", "start MARKER"),
			pattern_rule("use-marker", r"MARKER", "finish"),
		]);
		let report = apply(&rules, "start\n");

		assert_eq!(report.final_buffer, "start finish\n");
		assert!(report.results[0].matched());
		assert!(report.results[1].matched());
	}

	#[test]
	fn test_absent_anchor_is_nonfatal() {
		let rules = compile(&[
			pattern_rule("missing", r"not here", "never"),
			pattern_rule("present", r"hello", "goodbye"),
		]);
		let input = "hello world\n";
		let report = apply(&rules, input);

		assert_eq!(report.results[0].disposition, Disposition::NoMatch);
		assert_eq!(report.results[0].occurrences_replaced(), 0);
		// Buffer untouched by the missing rule; the run still completed
		// and the later, independent rule applied.
		assert!(report.results[1].matched());
		assert_eq!(report.final_buffer, "goodbye world\n");
		assert!(!report.fully_applied());
	}

	#[test]
	fn test_all_occurrences_replaced() {
		let mut spec = pattern_rule("every", r"foo", "bar");
		spec.multiplicity = Multiplicity::AllOccurrences;
		let rules = compile(&[spec]);
		let report = apply(&rules, "foo foo foo");

		assert_eq!(report.final_buffer, "bar bar bar");
		assert_eq!(report.results[0].occurrences_replaced(), 3);
	}

	#[test]
	fn test_first_only_replaces_lowest_offset() {
		let mut spec = pattern_rule("first", r"foo", "bar");
		spec.multiplicity = Multiplicity::FirstOnly;
		let rules = compile(&[spec]);
		let report = apply(&rules, "foo foo");

		assert_eq!(report.final_buffer, "bar foo");
		assert_eq!(report.results[0].occurrences_replaced(), 1);
	}

	#[test]
	fn test_capture_group_expansion() {
		let mut spec = pattern_rule("wrap", r"(\w+)", "[$1]");
		spec.multiplicity = Multiplicity::AllOccurrences;
		let rules = compile(&[spec]);
		let report = apply(&rules, "hello world");

		assert_eq!(report.final_buffer, "[hello] [world]");
	}

	#[test]
	fn test_named_capture_group_expansion() {
		let rules = compile(&[pattern_rule(
			"swap",
			r"(?P<key>\w+) = (?P<value>\w+)",
			"${value} = ${key}",
		)]);
		let report = apply(&rules, "a = b");

		assert_eq!(report.final_buffer, "b = a");
	}

	#[test]
	fn test_degenerate_pattern_never_substitutes() {
		let rules = compile(&[pattern_rule("empty", r"x*", "y")]);
		let mut spec = pattern_rule("empty-first", r"x*", "y");
		spec.multiplicity = Multiplicity::FirstOnly;
		let first_only = compile(&[spec]);

		let report = apply(&first_only, "abc");
		assert_eq!(report.final_buffer, "abc");
		assert_eq!(report.results[0].disposition, Disposition::DegenerateMatch);

		// Under RequireExactlyOne the multiple zero-length sites read as
		// ambiguous; either way the buffer stays untouched.
		let report = apply(&rules, "abc");
		assert_eq!(report.final_buffer, "abc");
		assert!(!report.results[0].matched());
	}

	#[test]
	fn test_manual_only_rule_records_step() {
		let spec = RuleSpec {
			id: Some("close-delimiter".to_string()),
			manual: Some("Add ')}' after the closing </div>.".to_string()),
			..Default::default()
		};
		let rules = compile(&[spec]);
		let report = apply(&rules, "anything");

		assert_eq!(report.results[0].disposition, Disposition::ManualOnly);
		assert_eq!(report.manual_steps.len(), 1);
		assert_eq!(report.manual_steps[0].rule_id, "close-delimiter");
		assert_eq!(
			report.manual_steps[0].instruction,
			"Add ')}' after the closing </div>."
		);
		assert!(!report.fully_applied());
	}

	#[test]
	fn test_manual_note_surfaces_only_on_failure() {
		let mut applied = pattern_rule("ok", r"hello", "hi");
		applied.manual = Some("should not appear".to_string());

		let mut missed = pattern_rule("miss", r"absent", "never");
		missed.manual = Some("finish this edit by hand".to_string());

		let rules = compile(&[applied, missed]);
		let report = apply(&rules, "hello");

		assert_eq!(report.manual_steps.len(), 1);
		assert_eq!(report.manual_steps[0].rule_id, "miss");
	}

	#[test]
	fn test_idempotent_rerun_is_a_noop() {
		// The replacement erases its own anchor, so a second run over the
		// patched output finds nothing and changes nothing.
		let rules = compile(&[pattern_rule("bump-x", r"const x = 1;", "const x = 2;")]);

		let first = apply(&rules, "const x = 1;\n");
		assert!(first.fully_applied());

		let second = apply(&rules, &first.final_buffer);
		assert_eq!(second.final_buffer, first.final_buffer);
		assert_eq!(second.results[0].disposition, Disposition::NoMatch);
	}

	#[test]
	fn test_non_idempotent_rule_grows_on_rerun() {
		// The replacement still contains its own anchor; rerunning is not
		// a no-op. Such rules work but are not idempotent.
		let mut spec = pattern_rule("grow", r"x", "xx");
		spec.multiplicity = Multiplicity::FirstOnly;
		let rules = compile(&[spec]);

		let first = apply(&rules, "x");
		assert_eq!(first.final_buffer, "xx");

		let second = apply(&rules, &first.final_buffer);
		assert_eq!(second.final_buffer, "xxx");
	}

	#[test]
	fn test_template_numeric_group_out_of_range() {
		let spec = pattern_rule("bad", r"(\w+)", "$1 and $2");
		let result = CompiledRule::from_spec(&spec, 0);

		match result.unwrap_err() {
			PatchError::UnknownGroup { rule_id, reference } => {
				assert_eq!(rule_id, "bad");
				assert_eq!(reference, "2");
			}
			other => panic!("Expected UnknownGroup error, got {other:?}"),
		}
	}

	#[test]
	fn test_template_unknown_named_group() {
		let spec = pattern_rule("bad", r"(?P<key>\w+)", "${value}");
		let result = CompiledRule::from_spec(&spec, 0);

		match result.unwrap_err() {
			PatchError::UnknownGroup { reference, .. } => {
				assert_eq!(reference, "value");
			}
			other => panic!("Expected UnknownGroup error, got {other:?}"),
		}
	}

	#[test]
	fn test_template_unbraced_name_reads_longest() {
		// "$1abc" parses as the reference "1abc" under expansion rules;
		// the fix is "${1}abc", and the compiler says so up front.
		let spec = pattern_rule("bad", r"(\w+)", "$1abc");
		assert!(matches!(
			CompiledRule::from_spec(&spec, 0),
			Err(PatchError::UnknownGroup { .. })
		));

		let spec = pattern_rule("ok", r"(\w+)", "${1}abc");
		assert!(CompiledRule::from_spec(&spec, 0).is_ok());
	}

	#[test]
	fn test_template_literal_dollar() {
		let spec = pattern_rule("price", r"(\d+)", "$$${1}");
		let rules = compile(&[spec]);
		let report = apply(&rules, "cost: 5");

		assert_eq!(report.final_buffer, "cost: $5");
	}

	#[test]
	fn test_template_unclosed_brace() {
		let spec = pattern_rule("bad", r"(\w+)", "${1");
		assert!(matches!(
			CompiledRule::from_spec(&spec, 0),
			Err(PatchError::MalformedTemplate { .. })
		));
	}

	#[test]
	fn test_group_zero_is_always_valid() {
		let spec = pattern_rule("echo", r"\w+", "<$0>");
		assert!(CompiledRule::from_spec(&spec, 0).is_ok());
	}

	#[test]
	fn test_compile_preserves_order() {
		let rules = compile(&[
			pattern_rule("one", "a", "b"),
			pattern_rule("two", "c", "d"),
		]);
		assert_eq!(rules[0].id, "one");
		assert_eq!(rules[1].id, "two");
	}
}
