//! # Script Processor Module
//!
//! Entry point of the pipeline: turns caller options into engine flags, runs
//! one engine session per script and classifies the diagnostics.
//!
//! ## Flow:
//! 1. Non-script libraries are not handled (`false`, nothing written)
//! 2. Options are translated on top of the defaults and configured params
//! 3. The engine's precondition check vets the argument list
//! 4. Strict mode input is switched off unless the caller set it
//! 5. One source unit is compiled with the configured environment
//! 6. Error/warning counts decide success; output is written only on success
//!
//! `failOnWarning` only escalates warnings inside the engine. A run that ends
//! with zero errors and some warnings still succeeds.
//!
//! ## Example:
//! ```rust,ignore
//! let engine = ClosureCompiler::locate(&ToolPathResolver::new(None))?;
//! let processor = ScriptProcessor::new(&Config::default(), engine);
//! let mut out = Vec::new();
//! let ok = processor
//!     .process(LibraryKind::Script, &FileScript::new("app.js"), &mut out, [("compilationLevel", "simple")])
//!     .await?;
//! ```

use crate::config::Config;
use crate::engine::{Engine, EngineSession, Environment, SourceUnit};
use crate::error::OptimizeError;
use crate::library::{LibraryKind, ScriptResource};
use crate::options::{translate_with_base, ArgumentSet, FLAG_STRICT_MODE_INPUT};
use std::fmt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

pub const DEFAULT_NAME: &str = "jsopt";
pub const OVERRIDE_NAME: &str = "gcc";

/// Severity tier of a finished compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Clean,
    Warnings,
    Errors,
    ErrorsAndWarnings,
}

impl Classification {
    pub fn from_counts(error_count: usize, warning_count: usize) -> Self {
        match (error_count > 0, warning_count > 0) {
            (true, true) => Self::ErrorsAndWarnings,
            (true, false) => Self::Errors,
            (false, true) => Self::Warnings,
            (false, false) => Self::Clean,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Clean | Self::Warnings)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Clean => "clean",
            Self::Warnings => "warning(s)",
            Self::Errors => "error(s)",
            Self::ErrorsAndWarnings => "error(s) and warning(s)",
        };
        f.write_str(label)
    }
}

/// Result of one engine run. Output is only kept when the run succeeded.
#[derive(Debug, Clone)]
pub struct CompilationOutcome {
    error_count: usize,
    warning_count: usize,
    output: Option<String>,
}

impl CompilationOutcome {
    pub fn new(error_count: usize, warning_count: usize, output: String) -> Self {
        let output = (error_count == 0).then_some(output);
        Self {
            error_count,
            warning_count,
            output,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error_count == 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn classification(&self) -> Classification {
        Classification::from_counts(self.error_count, self.warning_count)
    }
}

/// What happened to a script handed to the processor
#[derive(Debug, Clone)]
pub enum Processed {
    /// Library kind is not a script
    NotHandled,
    /// The engine refused the argument list
    InvalidArguments(String),
    Compiled(CompilationOutcome),
}

/// Script processor backed by an optimization engine
pub struct ScriptProcessor<E> {
    engine: E,
    base_arguments: ArgumentSet,
    name: &'static str,
}

impl<E: Engine> ScriptProcessor<E> {
    pub fn new(config: &Config, engine: E) -> Self {
        let mut base_arguments = ArgumentSet::with_defaults();
        for (flag, value) in ArgumentSet::from_tokens(&config.additional_params).iter() {
            base_arguments.set(flag, value);
        }

        let name = if config.override_min_gcc { OVERRIDE_NAME } else { DEFAULT_NAME };
        info!("Script processor registered as '{}' using {}", name, engine.name());

        Self {
            engine,
            base_arguments,
            name,
        }
    }

    /// Name the host selects this processor by
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn handles(&self, kind: LibraryKind) -> bool {
        kind == LibraryKind::Script
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Merge caller options over the defaults and configured params
    pub fn build_arguments<I, K, V>(&self, options: I) -> ArgumentSet
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        translate_with_base(self.base_arguments.clone(), options)
    }

    /// Compile a script without writing anything
    pub async fn compile<R, I, K, V>(
        &self,
        kind: LibraryKind,
        script: &R,
        options: I,
    ) -> Result<Processed, OptimizeError>
    where
        R: ScriptResource,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if !self.handles(kind) {
            debug!("Not handling library type {}", kind);
            return Ok(Processed::NotHandled);
        }

        let mut arguments = self.build_arguments(options);
        let precondition = self
            .engine
            .check_arguments(&arguments.to_args())
            .and_then(|_| Environment::from_arguments(&arguments));
        let environment = match precondition {
            Ok(environment) => environment,
            Err(OptimizeError::InvalidArguments(reason)) => {
                error!("Invalid parameters for {}: {}", script.name(), reason);
                return Ok(Processed::InvalidArguments(reason));
            }
            Err(e) => return Err(e),
        };

        if !arguments.contains(FLAG_STRICT_MODE_INPUT) {
            arguments.set(FLAG_STRICT_MODE_INPUT, "false");
        }

        let session = EngineSession {
            args: arguments.to_args(),
            environment,
            source: SourceUnit {
                name: script.name().to_string(),
                text: script.read_to_string().await?,
            },
        };

        let report = self.engine.compile(&session).await?;
        for line in &report.diagnostics {
            debug!("{}", line);
        }

        let outcome = CompilationOutcome::new(report.error_count, report.warning_count, report.output);
        log_outcome(kind, script.name(), &outcome);
        Ok(Processed::Compiled(outcome))
    }

    /// Compile a script and write the optimized text to `out` on success.
    ///
    /// Returns `Ok(false)` for unsupported kinds, rejected arguments and
    /// compilations with errors; `out` is untouched in all of those cases.
    pub async fn process<R, W, I, K, V>(
        &self,
        kind: LibraryKind,
        script: &R,
        out: &mut W,
        options: I,
    ) -> Result<bool, OptimizeError>
    where
        R: ScriptResource,
        W: AsyncWrite + Unpin,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let processed = self.compile(kind, script, options).await?;
        match processed {
            Processed::Compiled(outcome) => match outcome.output() {
                Some(text) => {
                    out.write_all(text.as_bytes()).await?;
                    out.flush().await?;
                    Ok(true)
                }
                None => Ok(false),
            },
            Processed::NotHandled | Processed::InvalidArguments(_) => Ok(false),
        }
    }
}

fn log_outcome(kind: LibraryKind, name: &str, outcome: &CompilationOutcome) {
    let (errors, warnings) = (outcome.error_count(), outcome.warning_count());
    match outcome.classification() {
        Classification::ErrorsAndWarnings => {
            error!("{} file {} processed with {} error(s) and {} warning(s).", kind, name, errors, warnings)
        }
        Classification::Errors => error!("{} file {} processed with {} error(s).", kind, name, errors),
        Classification::Warnings => warn!("{} file {} processed with {} warning(s).", kind, name, warnings),
        Classification::Clean => info!("{} file {} processed successfully.", kind, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineReport;
    use crate::library::InlineScript;
    use std::sync::Mutex;

    /// Engine double that records sessions and returns canned counts
    struct StubEngine {
        errors: usize,
        warnings: usize,
        reject: bool,
        sessions: Mutex<Vec<EngineSession>>,
    }

    impl StubEngine {
        fn new(errors: usize, warnings: usize) -> Self {
            Self {
                errors,
                warnings,
                reject: false,
                sessions: Mutex::new(Vec::new()),
            }
        }

        fn rejecting() -> Self {
            Self {
                reject: true,
                ..Self::new(0, 0)
            }
        }

        fn last_args(&self) -> Vec<String> {
            self.sessions.lock().unwrap().last().unwrap().args.clone()
        }
    }

    impl Engine for StubEngine {
        fn name(&self) -> &str {
            "stub"
        }

        fn check_arguments(&self, _args: &[String]) -> Result<(), OptimizeError> {
            if self.reject {
                Err(OptimizeError::InvalidArguments("rejected".to_string()))
            } else {
                Ok(())
            }
        }

        async fn compile(&self, session: &EngineSession) -> Result<EngineReport, OptimizeError> {
            self.sessions.lock().unwrap().push(session.clone());
            Ok(EngineReport {
                output: format!("/* min */{}", session.source.text),
                error_count: self.errors,
                warning_count: self.warnings,
                diagnostics: Vec::new(),
            })
        }
    }

    fn script() -> InlineScript {
        InlineScript::new("app.js", "let a = 1;")
    }

    const NO_OPTIONS: [(&str, &str); 0] = [];

    #[test]
    fn test_classification() {
        assert_eq!(Classification::from_counts(0, 0), Classification::Clean);
        assert_eq!(Classification::from_counts(0, 3), Classification::Warnings);
        assert_eq!(Classification::from_counts(2, 0), Classification::Errors);
        assert_eq!(Classification::from_counts(1, 1), Classification::ErrorsAndWarnings);
        assert!(Classification::Warnings.is_success());
        assert!(!Classification::ErrorsAndWarnings.is_success());
        assert_eq!(Classification::ErrorsAndWarnings.to_string(), "error(s) and warning(s)");
    }

    #[test]
    fn test_outcome_drops_output_on_errors() {
        let outcome = CompilationOutcome::new(1, 0, "var a;".to_string());
        assert!(!outcome.succeeded());
        assert_eq!(outcome.output(), None);

        let outcome = CompilationOutcome::new(0, 5, "var a;".to_string());
        assert!(outcome.succeeded());
        assert_eq!(outcome.output(), Some("var a;"));
    }

    #[test]
    fn test_name_and_handles() {
        let processor = ScriptProcessor::new(&Config::default(), StubEngine::new(0, 0));
        assert_eq!(processor.name(), "jsopt");
        assert!(processor.handles(LibraryKind::Script));
        assert!(!processor.handles(LibraryKind::Style));

        let config = Config {
            override_min_gcc: true,
            ..Default::default()
        };
        let processor = ScriptProcessor::new(&config, StubEngine::new(0, 0));
        assert_eq!(processor.name(), "gcc");
    }

    #[tokio::test]
    async fn test_style_is_not_handled() {
        let processor = ScriptProcessor::new(&Config::default(), StubEngine::new(0, 0));
        let mut out = Vec::new();
        let ok = processor
            .process(LibraryKind::Style, &script(), &mut out, [("compilationLevel", "simple")])
            .await
            .unwrap();
        assert!(!ok);
        assert!(out.is_empty());
        assert!(processor.engine().sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clean_and_warning_runs_write_output() {
        for warnings in [0, 2] {
            let processor = ScriptProcessor::new(&Config::default(), StubEngine::new(0, warnings));
            let mut out = Vec::new();
            let ok = processor
                .process(LibraryKind::Script, &script(), &mut out, NO_OPTIONS)
                .await
                .unwrap();
            assert!(ok);
            assert_eq!(String::from_utf8(out).unwrap(), "/* min */let a = 1;");
        }
    }

    #[tokio::test]
    async fn test_errors_write_nothing() {
        for warnings in [0, 4] {
            let processor = ScriptProcessor::new(&Config::default(), StubEngine::new(1, warnings));
            let mut out = Vec::new();
            let ok = processor
                .process(LibraryKind::Script, &script(), &mut out, NO_OPTIONS)
                .await
                .unwrap();
            assert!(!ok);
            assert!(out.is_empty());
        }
    }

    #[tokio::test]
    async fn test_fail_on_warning_does_not_flip_success() {
        let processor = ScriptProcessor::new(&Config::default(), StubEngine::new(0, 1));
        let mut out = Vec::new();
        let ok = processor
            .process(LibraryKind::Script, &script(), &mut out, [("failOnWarning", "true")])
            .await
            .unwrap();
        assert!(ok);
        let args = processor.engine().last_args();
        assert!(args.windows(2).any(|w| w == ["--jscomp_error", "*"]));
    }

    #[tokio::test]
    async fn test_rejected_arguments_skip_the_engine() {
        let processor = ScriptProcessor::new(&Config::default(), StubEngine::rejecting());
        let mut out = Vec::new();
        let ok = processor
            .process(LibraryKind::Script, &script(), &mut out, NO_OPTIONS)
            .await
            .unwrap();
        assert!(!ok);
        assert!(out.is_empty());
        assert!(processor.engine().sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_strict_mode_input_forced_off() {
        let processor = ScriptProcessor::new(&Config::default(), StubEngine::new(0, 0));
        processor
            .compile(LibraryKind::Script, &script(), NO_OPTIONS)
            .await
            .unwrap();
        let args = processor.engine().last_args();
        assert!(args.windows(2).any(|w| w == ["--strict_mode_input", "false"]));

        processor
            .compile(LibraryKind::Script, &script(), [("--strict_mode_input", "true")])
            .await
            .unwrap();
        let args = processor.engine().last_args();
        assert!(args.windows(2).any(|w| w == ["--strict_mode_input", "true"]));
        assert!(!args.iter().any(|a| a == "false"));
    }

    #[tokio::test]
    async fn test_inline_strict_mode_input_is_respected() {
        let processor = ScriptProcessor::new(&Config::default(), StubEngine::new(0, 0));
        processor
            .compile(LibraryKind::Script, &script(), [("--strict_mode_input=true", "")])
            .await
            .unwrap();
        let args = processor.engine().last_args();
        assert_eq!(args.iter().filter(|a| a.starts_with("--strict_mode_input")).count(), 1);
        assert!(args.windows(2).any(|w| w == ["--strict_mode_input", "true"]));
        assert!(!args.iter().any(|a| a == "false"));
    }

    #[tokio::test]
    async fn test_environment_and_additional_params() {
        let config = Config {
            additional_params: vec!["--env=CUSTOM".to_string(), "--language_out".to_string(), "ECMASCRIPT_2015".to_string()],
            ..Default::default()
        };
        let processor = ScriptProcessor::new(&config, StubEngine::new(0, 0));
        processor
            .compile(LibraryKind::Script, &script(), [("languageOut", "ECMASCRIPT3")])
            .await
            .unwrap();

        let sessions = processor.engine().sessions.lock().unwrap();
        let session = sessions.last().unwrap();
        assert_eq!(session.environment, Environment::Custom);
        assert_eq!(session.source.name, "app.js");
        assert!(session.args.windows(2).any(|w| w == ["--language_out", "ECMASCRIPT3"]));
    }

    #[tokio::test]
    async fn test_unknown_environment_is_invalid() {
        let processor = ScriptProcessor::new(&Config::default(), StubEngine::new(0, 0));
        let processed = processor
            .compile(LibraryKind::Script, &script(), [("--env", "NODE")])
            .await
            .unwrap();
        assert!(matches!(processed, Processed::InvalidArguments(_)));
    }
}
