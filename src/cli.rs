//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// modindex - round-based module index generator
///
/// Finds every type marked with #[index_module], writes an aggregator that
/// references all library modules, then writes a root module for the single
/// application module once the aggregator is visible.
///
/// Examples:
///   modindex --src src
///   modindex --src src --out src/generated --report build.md
///   modindex --src src --dry-run
///   modindex --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Source directory to scan
    #[arg(short, long, default_value = "src", value_name = "DIR", env = "MODINDEX_SRC")]
    pub src: PathBuf,

    /// Directory generated artifacts are written to
    ///
    /// Defaults to the config file value, or <SRC>/generated.
    #[arg(short, long, value_name = "DIR", env = "MODINDEX_OUT")]
    pub out: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .modindex.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Maximum number of rounds before giving up
    #[arg(long, value_name = "COUNT")]
    pub max_rounds: Option<u32>,

    /// File extensions to include (comma-separated)
    ///
    /// Example: --extensions rs
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Names to exclude from scanning (comma-separated)
    ///
    /// Example: --exclude "target,vendor"
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Write a build report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Build report format (markdown, json)
    ///
    /// Defaults to the config file value, or markdown.
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Dry run: scan and classify without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .modindex.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the build report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(max_rounds) = self.max_rounds {
            if max_rounds == 0 {
                return Err("Max rounds must be at least 1".to_string());
            }
        }

        if !self.src.exists() {
            return Err(format!(
                "Source directory does not exist: {}",
                self.src.display()
            ));
        }
        if !self.src.is_dir() {
            return Err(format!(
                "Source path is not a directory: {}",
                self.src.display()
            ));
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(src: PathBuf) -> Args {
        Args {
            src,
            out: None,
            config: None,
            verbose: false,
            quiet: false,
            max_rounds: None,
            extensions: None,
            exclude: None,
            report: None,
            format: None,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_missing_src() {
        let args = make_args(PathBuf::from("/definitely/not/here"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = make_args(dir.path().to_path_buf());
        assert!(args.validate().is_ok());

        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_rounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = make_args(dir.path().to_path_buf());
        args.max_rounds = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args(PathBuf::from("/definitely/not/here"));
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(PathBuf::from("src"));
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "modindex",
            "--src",
            "lib",
            "--extensions",
            "rs,rs.in",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.src, PathBuf::from("lib"));
        assert_eq!(
            args.extensions,
            Some(vec!["rs".to_string(), "rs.in".to_string()])
        );
        assert_eq!(args.format, Some(OutputFormat::Json));
    }
}
