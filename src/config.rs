//! `.modindex.toml` settings.
//!
//! Every section is optional; missing keys fall back to the defaults below.
//! Command-line flags are applied on top with [`Config::merge_with_args`].

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".modindex.toml";

/// Contents of a `.modindex.toml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Role classification settings.
    #[serde(default)]
    pub roles: RolesConfig,

    /// Generated output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[general]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log the effective configuration at startup.
    #[serde(default)]
    pub verbose: bool,

    /// Rounds allowed before the build is considered stuck.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            max_rounds: default_max_rounds(),
        }
    }
}

fn default_max_rounds() -> u32 {
    10
}

/// Source scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// File extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory or file names to skip.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            excludes: default_excludes(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["rs".to_string()]
}

fn default_excludes() -> Vec<String> {
    vec![".git", "target", "node_modules", "vendor"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_file_size() -> usize {
    1024 * 1024 // 1MB
}

/// Trait names that decide which role a marked unit plays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesConfig {
    /// Traits that make a unit an application-style root module.
    #[serde(default = "default_root_traits")]
    pub root_traits: Vec<String>,

    /// Traits that make a unit a library-style module.
    #[serde(default = "default_primary_traits")]
    pub primary_traits: Vec<String>,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            root_traits: default_root_traits(),
            primary_traits: default_primary_traits(),
        }
    }
}

fn default_root_traits() -> Vec<String> {
    vec!["AppModule".to_string()]
}

fn default_primary_traits() -> Vec<String> {
    vec!["LibraryModule".to_string()]
}

/// Generated output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory generated artifacts are written to. Unset means
    /// `generated/` under the source directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Module path generated artifacts live under.
    #[serde(default = "default_module_prefix")]
    pub module_prefix: String,

    /// Build report format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            module_prefix: default_module_prefix(),
            format: OutputFormat::default(),
        }
    }
}

fn default_module_prefix() -> String {
    "crate::generated".to_string()
}

impl Config {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Read `.modindex.toml` from the working directory, if there is one.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Apply flags given on the command line. Absent flags keep the file value.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(max_rounds) = args.max_rounds {
            self.general.max_rounds = max_rounds;
        }

        if let Some(ref out) = args.out {
            self.output.dir = Some(out.to_string_lossy().to_string());
        }
        if let Some(format) = args.format {
            self.output.format = format;
        }

        if let Some(ref extensions) = args.extensions {
            self.scanner.extensions = extensions.clone();
        }
        if let Some(ref excludes) = args.exclude {
            self.scanner.excludes = excludes.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Where generated artifacts go for a build of `src`.
    pub fn output_dir(&self, src: &Path) -> PathBuf {
        match self.output.dir {
            Some(ref dir) => PathBuf::from(dir),
            None => src.join("generated"),
        }
    }

    /// Render the defaults as a commented config file.
    pub fn default_toml() -> Result<String> {
        let body = toml::to_string_pretty(&Config::default())
            .context("Failed to serialize default config")?;
        Ok(format!(
            "# modindex configuration\n# [output] dir defaults to <src>/generated\n\n{}",
            body
        ))
    }
}
