use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};

/// Configuration for a keysweep run.
///
/// # Configuration Locations
///
/// Configuration is merged from these locations, later entries winning:
/// 1. Global `$CONFIG_DIR/keysweep/config.yaml`
/// 2. Local `.keysweep.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// Command-line values are applied last through [`SearchConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # Term to look for (exact token or substring, never a regex)
/// keyword: "volatile"
///
/// # Root directory to walk
/// root_path: "."
///
/// # token | substring. When unset, streaming matches substrings and
/// # counting and first match compare whole tokens.
/// match_mode: token
///
/// # Streaming pipeline sizing
/// channel_capacity: 10
/// searcher_count: 100
///
/// # Task pool used by the count and first-match modes
/// pool:
///   max_threads: 8
///   thread_name_prefix: "keysweep-task"
///
/// # Optional filters, all off by default
/// file_extensions: ["rs", "toml"]
/// ignore_patterns: ["**/target/**"]
/// skip_binary: false
///
/// # failfast | lossy
/// encoding_mode: lossy
///
/// log_level: "warn"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// The term to search for
    #[serde(default)]
    pub keyword: String,

    /// Root directory to start the walk from
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// How a line is compared against the keyword; unset means the per-mode default
    #[serde(default)]
    pub match_mode: Option<MatchMode>,

    /// Maximum number of file paths buffered between the enumerator and the searchers
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: NonZeroUsize,

    /// Number of long-lived searcher threads in streaming mode
    #[serde(default = "default_searcher_count")]
    pub searcher_count: NonZeroUsize,

    /// Sizing of the task pool used by the count and first-match modes
    #[serde(default)]
    pub pool: TaskPoolConfig,

    /// Optional list of file extensions to include (e.g., ["rs", "toml"])
    /// If None, all file extensions are included
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,

    /// Patterns to ignore (glob syntax)
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Skip files whose extension marks them as binary
    #[serde(default)]
    pub skip_binary: bool,

    /// How to handle invalid UTF-8 sequences
    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// How file content is compared against the keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Whitespace-delimited tokens must equal the keyword exactly
    Token,
    /// The keyword may appear anywhere inside a line
    Substring,
}

/// Controls how invalid UTF-8 sequences are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Treat the file as unreadable at the first invalid line
    FailFast,
    /// Replace invalid sequences and keep scanning
    #[default]
    Lossy,
}

/// Sizing policy for the task pool.
///
/// The pool is built once with exactly `max_threads` workers and reused for
/// every batch submitted to it. Jobs beyond that number queue inside the pool
/// until a worker frees up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPoolConfig {
    #[serde(default = "default_max_threads")]
    pub max_threads: NonZeroUsize,

    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
}

impl Default for TaskPoolConfig {
    fn default() -> Self {
        Self {
            max_threads: default_max_threads(),
            thread_name_prefix: default_thread_name_prefix(),
        }
    }
}

/// Values supplied on the command line. `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub keyword: Option<String>,
    pub root_path: Option<PathBuf>,
    pub match_mode: Option<MatchMode>,
    pub channel_capacity: Option<NonZeroUsize>,
    pub searcher_count: Option<NonZeroUsize>,
    pub max_threads: Option<NonZeroUsize>,
    pub file_extensions: Option<Vec<String>>,
    pub ignore_patterns: Vec<String>,
    pub skip_binary: bool,
    pub encoding_mode: Option<EncodingMode>,
    pub log_level: Option<String>,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_channel_capacity() -> NonZeroUsize {
    NonZeroUsize::new(10).unwrap()
}

fn default_searcher_count() -> NonZeroUsize {
    NonZeroUsize::new(100).unwrap()
}

fn default_max_threads() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_thread_name_prefix() -> String {
    "keysweep-task".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            root_path: default_root_path(),
            match_mode: None,
            channel_capacity: default_channel_capacity(),
            searcher_count: default_searcher_count(),
            pool: TaskPoolConfig::default(),
            file_extensions: None,
            ignore_patterns: Vec::new(),
            skip_binary: false,
            encoding_mode: EncodingMode::default(),
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Creates a configuration for `keyword` under `root_path` with every other value defaulted
    pub fn new(keyword: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self {
            keyword: keyword.into(),
            root_path: root_path.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations plus a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("keysweep/config.yaml")),
            Some(PathBuf::from(".keysweep.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist, so it is added unconditionally
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(keyword) = cli.keyword {
            self.keyword = keyword;
        }
        if let Some(root) = cli.root_path {
            self.root_path = root;
        }
        if cli.match_mode.is_some() {
            self.match_mode = cli.match_mode;
        }
        if let Some(capacity) = cli.channel_capacity {
            self.channel_capacity = capacity;
        }
        if let Some(count) = cli.searcher_count {
            self.searcher_count = count;
        }
        if let Some(threads) = cli.max_threads {
            self.pool.max_threads = threads;
        }
        if cli.file_extensions.is_some() {
            self.file_extensions = cli.file_extensions;
        }
        if !cli.ignore_patterns.is_empty() {
            self.ignore_patterns = cli.ignore_patterns;
        }
        if cli.skip_binary {
            self.skip_binary = true;
        }
        if let Some(mode) = cli.encoding_mode {
            self.encoding_mode = mode;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }

    /// Mode used by the streaming pipeline, which reports every line containing the keyword
    pub fn stream_match_mode(&self) -> MatchMode {
        self.match_mode.unwrap_or(MatchMode::Substring)
    }

    /// Mode used by counting and first match, which compare whole tokens
    pub fn batch_match_mode(&self) -> MatchMode {
        self.match_mode.unwrap_or(MatchMode::Token)
    }

    /// Checks the values that cannot be expressed in the type system
    pub fn validate(&self) -> SearchResult<()> {
        if self.keyword.is_empty() {
            return Err(SearchError::invalid_keyword("keyword must not be empty"));
        }
        if self.batch_match_mode() == MatchMode::Token && self.keyword.split_whitespace().count() != 1 {
            return Err(SearchError::invalid_keyword(format!(
                "'{}' is not a single token; use substring mode to search for phrases",
                self.keyword
            )));
        }
        if let Some(bad) = self
            .ignore_patterns
            .iter()
            .find(|p| glob::Pattern::new(p).is_err())
        {
            return Err(SearchError::config_error(format!(
                "invalid ignore pattern '{}'",
                bad
            )));
        }
        Ok(())
    }
}
