//! # Error Types Module
//!
//! Custom error types for the script processor.
//!
//! ## Categories:
//! - `Io`: reading a script resource or writing the output sink failed
//! - `InvalidArguments`: the native argument list was rejected before compiling
//! - `Engine`: the optimization engine crashed or produced unreadable output
//! - `MissingDependency`: no engine executable could be located
//! - `Config`: configuration values out of range or unreadable
//! - `Audit`: the content store refused an operation during a tree audit
//!
//! Expected outcomes (unsupported kind, compilation errors, unknown options)
//! are not errors: `ScriptProcessor::process` reports them as `Ok(false)`.
//! Only the variants above cross the processor boundary.
//!
//! ## Example:
//! ```rust,ignore
//! if resolver.resolve().is_none() {
//!     return Err(OptimizeError::MissingDependency("closure-compiler".to_string()));
//! }
//! ```

/// Custom error types for script optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid engine arguments: {0}")]
    InvalidArguments(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Content store error at {path}: {message}")]
    Audit { path: String, message: String },
}
