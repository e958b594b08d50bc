//! Tracing subscriber setup for the command-line front end
//!
//! The library only emits spans and events; binaries decide where they go.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Output format for tracing events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Colored compact console output (CLI default)
    Console,
    /// Plain compact output for CI logs
    Compact,
    /// One JSON object per event
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Destination for tracing events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracingOutput {
    /// stderr
    Console,
    /// Append to a log file
    #[cfg(feature = "tracing-files")]
    File(std::path::PathBuf),
}

/// Keeps background log writers alive; drop it only when the program exits
#[derive(Default)]
pub struct TracingGuard {
    #[cfg(feature = "tracing-files")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (`-v` count)
    pub verbosity: u8,
    pub format: TracingFormat,
    pub output: TracingOutput,
    /// Explicit filter directive; overrides verbosity when set
    pub env_filter: Option<String>,
    /// Correlation id logged once at startup
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            output: TracingOutput::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Filter directive for the configured verbosity
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn,pixkit=info",
            1 => "info,pixkit=debug",
            _ => "trace",
        }
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// - Invalid filter directive
    /// - A global subscriber is already installed
    pub fn init(self) -> anyhow::Result<TracingGuard> {
        let filter = match &self.env_filter {
            Some(directive) => EnvFilter::try_new(directive)?,
            None => EnvFilter::try_new(self.verbosity_to_filter())?,
        };
        let registry = Registry::default().with(filter);

        #[allow(unused_mut)]
        let mut guard = TracingGuard::default();

        match &self.output {
            TracingOutput::Console => match self.format {
                TracingFormat::Console => registry
                    .with(
                        fmt::layer()
                            .with_writer(std::io::stderr)
                            .with_ansi(true)
                            .with_target(false)
                            .compact(),
                    )
                    .try_init()?,
                TracingFormat::Compact => registry
                    .with(
                        fmt::layer()
                            .with_writer(std::io::stderr)
                            .with_ansi(false)
                            .with_target(false)
                            .compact(),
                    )
                    .try_init()?,
                #[cfg(feature = "tracing-json")]
                TracingFormat::Json => registry
                    .with(
                        fmt::layer()
                            .json()
                            .with_writer(std::io::stderr)
                            .with_current_span(true)
                            .with_span_list(true),
                    )
                    .try_init()?,
            },

            #[cfg(feature = "tracing-files")]
            TracingOutput::File(path) => {
                let directory = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| std::path::Path::new("."));
                let file_name = path
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new("pixkit.log"));
                let (writer, file_guard) =
                    tracing_appender::non_blocking(tracing_appender::rolling::never(
                        directory, file_name,
                    ));
                guard._file_guard = Some(file_guard);

                registry
                    .with(fmt::layer().with_ansi(false).with_writer(writer).compact())
                    .try_init()?;
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::debug!(session_id = %session_id, "pixkit session started");
        }

        Ok(guard)
    }
}

/// Initialize tracing with CLI defaults and a fresh session id
///
/// # Errors
/// - Same as [`TracingConfig::init`]
pub fn init_cli_tracing(verbosity: u8) -> anyhow::Result<TracingGuard> {
    TracingConfig::new()
        .with_verbosity(verbosity)
        .with_session_id(uuid::Uuid::new_v4().to_string())
        .init()
}

/// Span helpers for CLI operations
pub mod spans {
    use tracing::{Level, Span};

    /// Span covering one subcommand invocation
    pub fn command(name: &str, input: &std::path::Path) -> Span {
        tracing::span!(
            Level::INFO,
            "command",
            command = %name,
            input = %input.display()
        )
    }

    /// Span covering one background-removal run
    pub fn removal(producer: &str, dimensions: (u32, u32)) -> Span {
        tracing::span!(
            Level::INFO,
            "removal",
            producer = %producer,
            width = dimensions.0,
            height = dimensions.1
        )
    }
}
