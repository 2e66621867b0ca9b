use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anchorpatch::config::parse_rules_file;
use anchorpatch::rules::{Disposition, RunReport, apply, compile_rules};

#[derive(Parser)]
#[command(name = "anchorpatch")]
#[command(
	author,
	version,
	about = "Declarative, ordered text patching with pattern-anchored rules"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	/// Rules file describing the patch (TOML)
	#[arg(long, short = 'r', value_name = "RULES")]
	rules: Option<PathBuf>,

	/// Create a template patch.toml in the current directory
	#[arg(long)]
	init: bool,

	/// Overwrite existing patch.toml when using --init
	#[arg(long, requires = "init")]
	force: bool,

	/// Print the report without writing anything
	#[arg(long)]
	dry_run: bool,

	/// Write the patched result here instead of back to FILE
	#[arg(long, short = 'o', value_name = "PATH")]
	output: Option<PathBuf>,

	/// Persist the result even when some rules did not apply
	#[arg(long)]
	force_write: bool,

	/// The file to patch
	#[arg(value_name = "FILE")]
	file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
	/// Check a rules file for errors without patching anything
	Validate {
		/// Rules file to check
		#[arg(value_name = "RULES")]
		rules: PathBuf,
	},
}

fn main() -> ExitCode {
	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn run() -> Result<ExitCode> {
	let cli = Cli::parse();

	// Handle --init
	if cli.init {
		return handle_init(cli.force);
	}

	// Handle subcommands
	if let Some(command) = cli.command {
		return match command {
			Commands::Validate { rules } => handle_validate(&rules),
		};
	}

	// Handle patching
	let Some(file) = cli.file else {
		anyhow::bail!("No file to patch. Usage: anchorpatch --rules <RULES> <FILE>");
	};
	let Some(rules) = cli.rules else {
		anyhow::bail!("No rules file. Usage: anchorpatch --rules <RULES> <FILE>");
	};

	handle_patch(
		&rules,
		&file,
		cli.output.as_deref(),
		cli.dry_run,
		cli.force_write,
	)
}

fn handle_init(force: bool) -> Result<ExitCode> {
	let rules_path = PathBuf::from("patch.toml");

	if rules_path.exists() && !force {
		anyhow::bail!("patch.toml already exists. Use --force to overwrite.");
	}

	std::fs::write(&rules_path, init_template())
		.with_context(|| format!("Failed to write {}", rules_path.display()))?;

	println!("Created patch.toml");
	Ok(ExitCode::SUCCESS)
}

fn handle_validate(rules_path: &Path) -> Result<ExitCode> {
	match parse_rules_file(rules_path).and_then(|file| compile_rules(&file)) {
		Ok(rules) => {
			println!(
				"Rules file is valid: {} ({} rules)",
				rules_path.display(),
				rules.len()
			);
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => {
			eprintln!("Rules file error: {e}");
			if let Some(source) = std::error::Error::source(&e) {
				eprintln!("  caused by: {source}");
			}
			Ok(ExitCode::FAILURE)
		}
	}
}

fn handle_patch(
	rules_path: &Path,
	file: &Path,
	output: Option<&Path>,
	dry_run: bool,
	force_write: bool,
) -> Result<ExitCode> {
	// Construction-time errors abort here, before any rule runs
	let rule_file = parse_rules_file(rules_path).context("Failed to load rules")?;
	let rules = compile_rules(&rule_file).context("Failed to compile rules")?;

	let initial_text = std::fs::read_to_string(file)
		.with_context(|| format!("Failed to read {}", file.display()))?;

	let report = apply(&rules, &initial_text);

	print_report(&report);

	let fully_applied = report.fully_applied();

	if dry_run {
		println!(
			"\nDry run: nothing written ({}).",
			if fully_applied {
				"all rules applied"
			} else {
				"some rules did not apply"
			}
		);
		return Ok(exit_for(fully_applied));
	}

	if !fully_applied && !force_write {
		println!("\nResult not written: some rules did not apply. Use --force-write to write anyway.");
		return Ok(ExitCode::FAILURE);
	}

	// The run is already complete; this is the only write, so a partially
	// patched buffer never reaches storage mid-run.
	let target = output.unwrap_or(file);
	std::fs::write(target, &report.final_buffer)
		.with_context(|| format!("Failed to write {}", target.display()))?;

	println!("\nWrote {}", target.display());
	Ok(exit_for(fully_applied))
}

fn exit_for(fully_applied: bool) -> ExitCode {
	if fully_applied {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	}
}

/// Enumerate every rule and its outcome, then any outstanding manual steps.
fn print_report(report: &RunReport) {
	for result in &report.results {
		println!("rule '{}': {}", result.rule_id, describe(&result.disposition));
	}

	if !report.manual_steps.is_empty() {
		println!("\nManual follow-up required:");
		for step in &report.manual_steps {
			println!("  [{}] {}", step.rule_id, step.instruction);
		}
	}
}

fn describe(disposition: &Disposition) -> String {
	match disposition {
		Disposition::Applied { occurrences: 1 } => "applied (1 occurrence)".to_string(),
		Disposition::Applied { occurrences } => {
			format!("applied ({occurrences} occurrences)")
		}
		Disposition::NoMatch => "no match".to_string(),
		Disposition::AmbiguousMatch { occurrences } => {
			format!("ambiguous match ({occurrences} occurrences)")
		}
		Disposition::DegenerateMatch => "degenerate match (zero-length)".to_string(),
		Disposition::ManualOnly => "manual step".to_string(),
	}
}

fn init_template() -> &'static str {
	r#"# anchorpatch rules file.
# Rules run in order; later rules see earlier rules' output.

[[rules]]
id = "example"
pattern = 'const x = 1;'
replace = 'const x = 2;'
# multiplicity = "require-exactly-one"  # or "first-only" / "all"
# multiline = false                     # opt in for patterns spanning lines
# manual = "Shown when the rule cannot be applied automatically."

# A rule with only a manual note never edits anything; it flags an edit
# that must be finished by hand.
#
# [[rules]]
# id = "close-delimiter"
# manual = "Add ')}' after the closing tag of the wrapped section."
"#
}
