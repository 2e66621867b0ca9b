//! Anchorpatch - declarative, ordered text patching with pattern-anchored rules.
//!
//! This library provides the core functionality for anchorpatch, including:
//! - Rules file parsing and structural validation
//! - Anchor pattern matching under a multiplicity policy
//! - Sequential rule application with per-rule reporting
//!
//! The engine treats the target as an opaque text blob: rules locate an
//! anchor pattern and replace it with a rendered template. It never touches
//! storage; the caller inspects the [`rules::RunReport`] and decides whether
//! to persist the final buffer.
//!
//! # Example
//!
//! ```
//! use anchorpatch::config::parse_rules_str;
//! use anchorpatch::rules::{apply, compile_rules};
//! use std::path::Path;
//!
//! let file = parse_rules_str(
//!     r#"
//! [[rules]]
//! id = "bump-x"
//! pattern = 'const x = 1;'
//! replace = 'const x = 2;'
//! "#,
//!     Path::new("patch.toml"),
//! )
//! .unwrap();
//!
//! let rules = compile_rules(&file).unwrap();
//! let report = apply(&rules, "const x = 1;\n");
//!
//! assert_eq!(report.final_buffer, "const x = 2;\n");
//! assert!(report.fully_applied());
//! ```

pub mod config;
pub mod error;
pub mod rules;

pub use error::{PatchError, Result};
