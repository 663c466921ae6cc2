//! # Option Translation Module
//!
//! Maps the caller-facing option vocabulary onto the Closure Compiler's native
//! command-line flags.
//!
//! ## Responsibilities:
//! - Seeds every argument set with safe defaults (ADVANCED, newest input
//!   language, ES5 output for legacy runtimes)
//! - Translates `failOnWarning`, `languageIn`, `languageOut` and
//!   `compilationLevel` (keys are case-insensitive)
//! - Passes keys starting with `-` through untouched as native flags
//! - Drops everything else without complaint
//! - Serializes the merged set into an argument vector, flag before value
//!
//! ## Precedence:
//! ```text
//! defaults < additional params (host config) < caller options, last one wins
//! ```
//!
//! ## Example:
//! ```rust,ignore
//! let args = translate([("compilationLevel", "whitespace"), ("languageOut", "ECMASCRIPT_2015")]);
//! assert_eq!(args.get("--compilation_level"), Some("WHITESPACE_ONLY"));
//! ```

use tracing::{debug, warn};

pub const FLAG_COMPILATION_LEVEL: &str = "--compilation_level";
pub const FLAG_LANGUAGE_IN: &str = "--language_in";
pub const FLAG_LANGUAGE_OUT: &str = "--language_out";
pub const FLAG_JSCOMP_ERROR: &str = "--jscomp_error";
pub const FLAG_STRICT_MODE_INPUT: &str = "--strict_mode_input";
pub const FLAG_ENV: &str = "--env";

pub const DEFAULT_LANGUAGE_IN: &str = "ECMASCRIPT_NEXT";
/// ES5 keeps the output runnable on Rhino-era script engines
pub const DEFAULT_LANGUAGE_OUT: &str = "ECMASCRIPT5";

/// Escalate every diagnostic group to an error
const ALL_DIAGNOSTIC_GROUPS: &str = "*";

/// Optimization level understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilationLevel {
    Simple,
    WhitespaceOnly,
    Advanced,
}

impl CompilationLevel {
    /// Parse the caller spelling (`simple`, `whitespace`, `advanced`).
    /// Anything unrecognized falls back to `Simple`.
    pub fn from_option(value: &str) -> Self {
        if value.eq_ignore_ascii_case("simple") {
            Self::Simple
        } else if value.eq_ignore_ascii_case("whitespace") {
            Self::WhitespaceOnly
        } else if value.eq_ignore_ascii_case("advanced") {
            Self::Advanced
        } else {
            debug!("Unknown compilation level '{}', using SIMPLE", value);
            Self::Simple
        }
    }

    /// Native spelling for `--compilation_level`
    pub fn as_flag_value(&self) -> &'static str {
        match self {
            Self::Simple => "SIMPLE",
            Self::WhitespaceOnly => "WHITESPACE_ONLY",
            Self::Advanced => "ADVANCED",
        }
    }
}

/// Ordered flag → value mapping in the engine's vocabulary.
///
/// Flags are unique. Setting an existing flag replaces its value but keeps
/// its original position, so the serialized form is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentSet {
    entries: Vec<(String, String)>,
}

impl ArgumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed default set every translation starts from
    pub fn with_defaults() -> Self {
        let mut set = Self::new();
        set.set(FLAG_COMPILATION_LEVEL, CompilationLevel::Advanced.as_flag_value());
        set.set(FLAG_LANGUAGE_IN, DEFAULT_LANGUAGE_IN);
        set.set(FLAG_LANGUAGE_OUT, DEFAULT_LANGUAGE_OUT);
        set
    }

    /// Parse command-line style tokens (`--flag value`, `--flag=value`, `--flag`).
    ///
    /// Stray tokens that are neither a flag nor a flag's value are skipped.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let mut set = Self::new();
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            if !token.starts_with('-') {
                warn!("Ignoring stray engine parameter '{}'", token);
                i += 1;
                continue;
            }

            if let Some((flag, value)) = token.split_once('=') {
                set.set(flag, value);
                i += 1;
            } else if tokens.get(i + 1).is_some_and(|next| !next.starts_with('-')) {
                set.set(token.as_str(), tokens[i + 1].as_str());
                i += 2;
            } else {
                set.set(token.as_str(), "");
                i += 1;
            }
        }
        set
    }

    /// Assign a flag, overwriting any previous value.
    ///
    /// A `--flag=inline` key is stored as `--flag` with the inline value; a
    /// non-blank `value` is appended to it after another `=`.
    pub fn set(&mut self, flag: impl Into<String>, value: impl Into<String>) {
        let mut flag = flag.into();
        let mut value = value.into();
        if let Some(pos) = flag.find('=') {
            let inline = flag.split_off(pos + 1);
            flag.truncate(pos);
            value = if value.trim().is_empty() {
                inline
            } else {
                format!("{}={}", inline, value)
            };
        }
        match self.entries.iter_mut().find(|(f, _)| *f == flag) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((flag, value)),
        }
    }

    pub fn get(&self, flag: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| f == flag)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.get(flag).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v.as_str()))
    }

    /// Flatten into an argument vector. Flag-only entries emit no value token.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.entries.len() * 2);
        for (flag, value) in &self.entries {
            args.push(flag.clone());
            if !value.trim().is_empty() {
                args.push(value.clone());
            }
        }
        args
    }
}

/// Translate a single caller option into a native (flag, value) pair.
///
/// `None` means the option contributes nothing.
fn translate_option(key: &str, value: &str) -> Option<(String, String)> {
    if key.starts_with('-') {
        return Some((key.to_string(), value.to_string()));
    }

    if key.eq_ignore_ascii_case("failOnWarning") {
        return value
            .eq_ignore_ascii_case("true")
            .then(|| (FLAG_JSCOMP_ERROR.to_string(), ALL_DIAGNOSTIC_GROUPS.to_string()));
    }

    if key.eq_ignore_ascii_case("languageIn") {
        Some((FLAG_LANGUAGE_IN.to_string(), value.to_string()))
    } else if key.eq_ignore_ascii_case("languageOut") {
        Some((FLAG_LANGUAGE_OUT.to_string(), value.to_string()))
    } else if key.eq_ignore_ascii_case("compilationLevel") {
        let level = CompilationLevel::from_option(value);
        Some((FLAG_COMPILATION_LEVEL.to_string(), level.as_flag_value().to_string()))
    } else {
        debug!("Dropping unrecognized option '{}'", key);
        None
    }
}

/// Translate caller options on top of the default set
pub fn translate<I, K, V>(options: I) -> ArgumentSet
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    translate_with_base(ArgumentSet::with_defaults(), options)
}

/// Translate caller options on top of an already seeded set
pub fn translate_with_base<I, K, V>(base: ArgumentSet, options: I) -> ArgumentSet
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut set = base;
    for (key, value) in options {
        if let Some((flag, value)) = translate_option(key.as_ref(), value.as_ref()) {
            set.set(flag, value);
        }
    }
    set
}
