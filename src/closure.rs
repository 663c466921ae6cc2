//! # Closure Compiler Engine
//!
//! Runs the external Closure Compiler against a single source unit.
//!
//! ## Pipeline:
//! 1. Writes the source unit into a private temp directory, keeping its name
//!    so diagnostics point at the right file
//! 2. Spawns the compiler with the session flags, `--env` and `--js <file>`
//! 3. Captures stdout as the compiled output
//! 4. Reads the `N error(s), M warning(s)` summary from stderr, or counts the
//!    individual `ERROR -` / `WARNING -` lines when no summary was printed
//!
//! A compiler that exits non-zero without reporting a single error crashed
//! (bad flag, JVM failure, ...) and is reported as `OptimizeError::Engine`.
//!
//! ## Argument precondition:
//! `check_arguments` mirrors the checks the compiler's flag parser performs
//! before compiling, so an invalid configuration never spawns a process.

use crate::engine::{Engine, EngineReport, EngineSession, Environment};
use crate::error::OptimizeError;
use crate::options::{FLAG_COMPILATION_LEVEL, FLAG_ENV, FLAG_LANGUAGE_IN, FLAG_LANGUAGE_OUT, FLAG_STRICT_MODE_INPUT};
use crate::tool_resolver::{EngineCommand, ToolPathResolver};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

const COMPILATION_LEVELS: &[&str] = &[
    "SIMPLE",
    "SIMPLE_OPTIMIZATIONS",
    "WHITESPACE_ONLY",
    "ADVANCED",
    "ADVANCED_OPTIMIZATIONS",
    "BUNDLE",
];

const LANGUAGE_MODES: &[&str] = &[
    "ECMASCRIPT3",
    "ECMASCRIPT5",
    "ECMASCRIPT5_STRICT",
    "ECMASCRIPT_2015",
    "ECMASCRIPT_2016",
    "ECMASCRIPT_2017",
    "ECMASCRIPT_2018",
    "ECMASCRIPT_2019",
    "ECMASCRIPT_2020",
    "ECMASCRIPT_2021",
    "ECMASCRIPT_2022",
    "ECMASCRIPT_NEXT",
    "STABLE",
    "UNSTABLE",
    "NO_TRANSPILE",
];

const BOOLEAN_WORDS: &[&str] = &["true", "false", "on", "off", "yes", "no", "1", "0"];

/// Flags that must carry a value
const VALUED_FLAGS: &[&str] = &[
    FLAG_COMPILATION_LEVEL,
    FLAG_LANGUAGE_IN,
    FLAG_LANGUAGE_OUT,
    FLAG_ENV,
    "--jscomp_error",
    "--jscomp_warning",
    "--jscomp_off",
    "--warning_level",
];

/// Input/output and chunking stay under the processor's control
const RESERVED_FLAGS: &[&str] = &["--js", "--js_output_file", "--module", "--chunk", "--chunk_output_path_prefix"];

/// Closure Compiler launched as a child process
#[derive(Debug, Clone)]
pub struct ClosureCompiler {
    command: EngineCommand,
}

impl ClosureCompiler {
    pub fn new(command: EngineCommand) -> Self {
        Self { command }
    }

    /// Locate the compiler through the resolver
    pub fn locate(resolver: &ToolPathResolver) -> Result<Self, OptimizeError> {
        resolver
            .check_engine_with_instructions()
            .map(Self::new)
            .map_err(OptimizeError::MissingDependency)
    }

    pub fn command(&self) -> &EngineCommand {
        &self.command
    }
}

impl Engine for ClosureCompiler {
    fn name(&self) -> &str {
        "closure-compiler"
    }

    fn check_arguments(&self, args: &[String]) -> Result<(), OptimizeError> {
        for (flag, value) in split_flags(args)? {
            check_flag(&flag, value.as_deref())?;
        }
        Ok(())
    }

    async fn compile(&self, session: &EngineSession) -> Result<EngineReport, OptimizeError> {
        let work_dir = tempfile::TempDir::new()?;
        let input_path = work_dir.path().join(input_file_name(&session.source.name));
        tokio::fs::write(&input_path, &session.source.text).await?;

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.leading_args).args(&session.args);
        if !session.args.iter().any(|a| a == FLAG_ENV || a.starts_with("--env=")) {
            cmd.args([FLAG_ENV, session.environment.as_flag_value()]);
        }
        cmd.arg("--js")
            .arg(&input_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            "Running {} on {} with {:?}",
            self.command.describe(),
            session.source.name,
            session.args
        );

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OptimizeError::MissingDependency(format!("{}: {}", self.command.describe(), e))
            } else {
                OptimizeError::Io(e)
            }
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let (error_count, warning_count, diagnostics) = parse_diagnostics(&stderr);

        if !output.status.success() && error_count == 0 {
            return Err(OptimizeError::Engine(format!(
                "{} exited with {}: {}",
                self.name(),
                output.status,
                stderr.trim()
            )));
        }

        let output_text = String::from_utf8(output.stdout)
            .map_err(|e| OptimizeError::Engine(format!("output is not valid UTF-8: {}", e)))?;

        Ok(EngineReport {
            output: output_text,
            error_count,
            warning_count,
            diagnostics,
        })
    }
}

/// Keep only the final path component so the source name cannot escape the work dir
fn input_file_name(source_name: &str) -> String {
    Path::new(source_name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "input.js".to_string())
}

/// Pair up flag tokens with their values
fn split_flags(args: &[String]) -> Result<Vec<(String, Option<String>)>, OptimizeError> {
    let mut pairs = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let token = &args[i];
        if !token.starts_with('-') || token.trim_start_matches('-').is_empty() {
            return Err(OptimizeError::InvalidArguments(format!("unexpected token '{}'", token)));
        }

        if let Some((flag, value)) = token.split_once('=') {
            pairs.push((flag.to_string(), Some(value.to_string())));
            i += 1;
        } else if let Some(next) = args.get(i + 1).filter(|next| !next.starts_with('-')) {
            pairs.push((token.clone(), Some(next.clone())));
            i += 2;
        } else {
            pairs.push((token.clone(), None));
            i += 1;
        }
    }
    Ok(pairs)
}

fn check_flag(flag: &str, value: Option<&str>) -> Result<(), OptimizeError> {
    let invalid = |msg: String| Err(OptimizeError::InvalidArguments(msg));

    if RESERVED_FLAGS.contains(&flag) {
        return invalid(format!("{} is managed by the processor", flag));
    }

    if VALUED_FLAGS.contains(&flag) && value.map_or(true, |v| v.trim().is_empty()) {
        return invalid(format!("{} requires a value", flag));
    }

    let value = value.unwrap_or_default().trim();
    let one_of = |allowed: &[&str]| allowed.iter().any(|a| a.eq_ignore_ascii_case(value));

    match flag {
        FLAG_COMPILATION_LEVEL if !one_of(COMPILATION_LEVELS) => {
            invalid(format!("unknown compilation level '{}'", value))
        }
        FLAG_LANGUAGE_IN | FLAG_LANGUAGE_OUT
            if !LANGUAGE_MODES.contains(&canonical_language_mode(value).as_str()) =>
        {
            invalid(format!("unknown language mode '{}' for {}", value, flag))
        }
        FLAG_ENV if Environment::parse(value).is_none() => invalid(format!("unknown environment '{}'", value)),
        FLAG_STRICT_MODE_INPUT if !value.is_empty() && !one_of(BOOLEAN_WORDS) => {
            invalid(format!("{} expects a boolean, got '{}'", flag, value))
        }
        _ => Ok(()),
    }
}

/// Canonical spelling of a language mode: `es5` -> `ECMASCRIPT5`,
/// `ES6`/`ECMASCRIPT6` -> `ECMASCRIPT_2015`
fn canonical_language_mode(value: &str) -> String {
    let upper = value.trim().to_ascii_uppercase();
    let name = if upper.starts_with("ES") {
        format!("ECMASCRIPT{}", &upper[2..])
    } else {
        upper
    };
    match name.as_str() {
        "ECMASCRIPT6" | "ECMASCRIPT6_STRICT" => "ECMASCRIPT_2015".to_string(),
        _ => name,
    }
}

/// Parse a `N error(s), M warning(s)` summary line
fn parse_summary(line: &str) -> Option<(usize, usize)> {
    let mut parts = line.trim().split(", ");
    let errors = parts.next()?.strip_suffix(" error(s)")?.trim().parse().ok()?;
    let warnings = parts.next()?.strip_suffix(" warning(s)")?.trim().parse().ok()?;
    Some((errors, warnings))
}

/// Extract error/warning counts and the diagnostic lines from compiler stderr
fn parse_diagnostics(stderr: &str) -> (usize, usize, Vec<String>) {
    let mut summary = None;
    let mut diagnostics = Vec::new();
    let mut errors = 0;
    let mut warnings = 0;

    for line in stderr.lines() {
        if let Some(counts) = parse_summary(line) {
            summary = Some(counts);
        } else if line.contains(": ERROR - ") {
            errors += 1;
            diagnostics.push(line.to_string());
        } else if line.contains(": WARNING - ") {
            warnings += 1;
            diagnostics.push(line.to_string());
        }
    }

    let (errors, warnings) = summary.unwrap_or((errors, warnings));
    (errors, warnings, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SourceUnit;
    use crate::options::{translate, ArgumentSet};

    fn engine() -> ClosureCompiler {
        ClosureCompiler::new(EngineCommand::for_path(Path::new("closure-compiler"), None))
    }

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_default_arguments_are_accepted() {
        let args = ArgumentSet::with_defaults().to_args();
        assert!(engine().check_arguments(&args).is_ok());

        let args = translate([("failOnWarning", "true"), ("compilationLevel", "nonsense")]).to_args();
        assert!(engine().check_arguments(&args).is_ok());
    }

    #[test]
    fn test_invalid_arguments_are_rejected() {
        let cases: &[&[&str]] = &[
            &["--compilation_level", "EXTREME"],
            &["--language_out", "ECMASCRIPT_1999"],
            &["--language_in"],
            &["--env", "NODE"],
            &["--strict_mode_input", "maybe"],
            &["--js", "other.js"],
            &["--js_output_file=out.js"],
            &["stray"],
            &["--"],
        ];
        for case in cases {
            assert!(
                matches!(engine().check_arguments(&args(case)), Err(OptimizeError::InvalidArguments(_))),
                "accepted {case:?}"
            );
        }
    }

    #[test]
    fn test_flag_forms() {
        let ok = args(&[
            "--language_out=ecmascript_2015",
            "--strict_mode_input",
            "false",
            "--debug",
            "--jscomp_error",
            "*",
        ]);
        assert!(engine().check_arguments(&ok).is_ok());
    }

    #[test]
    fn test_engine_spellings_are_accepted() {
        let cases: &[&[&str]] = &[
            &["--language_out", "ES5"],
            &["--language_out", "es6"],
            &["--language_out", "ECMASCRIPT6"],
            &["--language_out", "ECMASCRIPT6_STRICT"],
            &["--language_in", "ES_2017"],
            &["--language_in=es_next"],
            &["--compilation_level", "ADVANCED_OPTIMIZATIONS"],
            &["--compilation_level", "simple_optimizations"],
        ];
        for case in cases {
            assert!(engine().check_arguments(&args(case)).is_ok(), "rejected {case:?}");
        }
    }

    #[test]
    fn test_canonical_language_mode() {
        assert_eq!(canonical_language_mode(" es5 "), "ECMASCRIPT5");
        assert_eq!(canonical_language_mode("ES6"), "ECMASCRIPT_2015");
        assert_eq!(canonical_language_mode("ES_2020"), "ECMASCRIPT_2020");
        assert_eq!(canonical_language_mode("ecmascript_next"), "ECMASCRIPT_NEXT");
        assert_eq!(canonical_language_mode("STABLE"), "STABLE");
        assert_eq!(canonical_language_mode("ES7"), "ECMASCRIPT7");
    }

    #[test]
    fn test_parse_summary() {
        assert_eq!(parse_summary("2 error(s), 3 warning(s)"), Some((2, 3)));
        assert_eq!(parse_summary("0 error(s), 1 warning(s), 87.5% typed"), Some((0, 1)));
        assert_eq!(parse_summary("input.js:1:4: ERROR - bad"), None);
        assert_eq!(parse_summary(""), None);
    }

    #[test]
    fn test_parse_diagnostics_fallback() {
        let stderr = "app.js:3:0: WARNING - [JSC_UNREACHABLE_CODE] unreachable code\n  return;\n\
                      app.js:9:2: ERROR - [JSC_PARSE_ERROR] Parse error.\n";
        let (errors, warnings, lines) = parse_diagnostics(stderr);
        assert_eq!((errors, warnings), (1, 1));
        assert_eq!(lines.len(), 2);

        let (errors, warnings, _) = parse_diagnostics(&format!("{}\n1 error(s), 4 warning(s)\n", stderr));
        assert_eq!((errors, warnings), (1, 4));
    }

    #[test]
    fn test_input_file_name() {
        assert_eq!(input_file_name("lib/app.js"), "app.js");
        assert_eq!(input_file_name("../../etc/passwd"), "passwd");
        assert_eq!(input_file_name(""), "input.js");
    }

    /// Shell script standing in for the compiler: echoes the `--js` file and
    /// prints a summary line.
    #[cfg(unix)]
    fn fake_compiler(dir: &Path, exit_code: i32, summary: &str) -> ClosureCompiler {
        let script = dir.join("fake-closure.sh");
        let body = format!(
            "for last; do :; done\ncat \"$last\"\necho '{}' >&2\nexit {}\n",
            summary, exit_code
        );
        std::fs::write(&script, body).unwrap();
        ClosureCompiler::new(EngineCommand {
            program: "sh".into(),
            leading_args: vec![script.to_string_lossy().to_string()],
        })
    }

    fn session(text: &str) -> EngineSession {
        EngineSession {
            args: ArgumentSet::with_defaults().to_args(),
            environment: Environment::Browser,
            source: SourceUnit {
                name: "app.js".to_string(),
                text: text.to_string(),
            },
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compile_with_fake_compiler() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let compiler = fake_compiler(temp_dir.path(), 0, "0 error(s), 2 warning(s)");

        let report = compiler.compile(&session("var a=1;")).await.unwrap();
        assert_eq!(report.output, "var a=1;");
        assert_eq!(report.error_count, 0);
        assert_eq!(report.warning_count, 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compile_errors_are_reported_not_raised() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let compiler = fake_compiler(temp_dir.path(), 1, "3 error(s), 0 warning(s)");

        let report = compiler.compile(&session("var = ;")).await.unwrap();
        assert_eq!(report.error_count, 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_crash_without_errors_is_an_engine_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let compiler = fake_compiler(temp_dir.path(), 2, "Exception in thread main");

        let result = compiler.compile(&session("var a;")).await;
        assert!(matches!(result, Err(OptimizeError::Engine(_))));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let compiler = ClosureCompiler::new(EngineCommand::for_path(
            Path::new("/nonexistent/closure-compiler-binary"),
            None,
        ));
        let result = compiler.compile(&session("var a;")).await;
        assert!(matches!(result, Err(OptimizeError::MissingDependency(_))));
    }
}
