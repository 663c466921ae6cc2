//! # Engine Interface
//!
//! The narrow surface the processor needs from an optimization engine: a
//! precondition check on the argument list and a single-unit compile that
//! reports transformed text plus diagnostic counts.
//!
//! Each `compile` call gets its own `EngineSession`; implementations must not
//! keep state between calls.

use crate::error::OptimizeError;
use crate::options::{ArgumentSet, FLAG_ENV};
use std::future::Future;

/// Built-in declaration set the engine compiles against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Browser and core language externs
    #[default]
    Browser,
    /// No built-in externs
    Custom,
}

impl Environment {
    /// Read `--env` from the argument set, `Browser` when absent
    pub fn from_arguments(args: &ArgumentSet) -> Result<Self, OptimizeError> {
        match args.get(FLAG_ENV) {
            None => Ok(Self::Browser),
            Some(value) => Self::parse(value)
                .ok_or_else(|| OptimizeError::InvalidArguments(format!("unknown environment '{}'", value))),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("browser") {
            Some(Self::Browser)
        } else if value.eq_ignore_ascii_case("custom") {
            Some(Self::Custom)
        } else {
            None
        }
    }

    pub fn as_flag_value(&self) -> &'static str {
        match self {
            Self::Browser => "BROWSER",
            Self::Custom => "CUSTOM",
        }
    }
}

/// The one source file compiled by a session
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub name: String,
    pub text: String,
}

/// Everything one engine run needs
#[derive(Debug, Clone)]
pub struct EngineSession {
    pub args: Vec<String>,
    pub environment: Environment,
    pub source: SourceUnit,
}

/// What the engine's diagnostic manager reported for one run
#[derive(Debug, Clone, Default)]
pub struct EngineReport {
    pub output: String,
    pub error_count: usize,
    pub warning_count: usize,
    /// Raw diagnostic lines, for logging
    pub diagnostics: Vec<String>,
}

/// External optimization engine
pub trait Engine: Send + Sync {
    /// Short identifier used in log lines
    fn name(&self) -> &str;

    /// Reject argument lists the engine would refuse to run with
    fn check_arguments(&self, args: &[String]) -> Result<(), OptimizeError>;

    /// Compile exactly one source unit
    fn compile(
        &self,
        session: &EngineSession,
    ) -> impl Future<Output = Result<EngineReport, OptimizeError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_arguments() {
        let args = ArgumentSet::with_defaults();
        assert_eq!(Environment::from_arguments(&args).unwrap(), Environment::Browser);

        let args = ArgumentSet::from_tokens(["--env", "custom"]);
        assert_eq!(Environment::from_arguments(&args).unwrap(), Environment::Custom);

        let args = ArgumentSet::from_tokens(["--env", "NODE"]);
        assert!(matches!(
            Environment::from_arguments(&args),
            Err(OptimizeError::InvalidArguments(_))
        ));
    }
}
