//! # Script Optimizer Library
//!
//! Script processing stage for client library pipelines: translates a small,
//! engine-agnostic option vocabulary into Closure Compiler flags, compiles one
//! script per call and reports success, warnings or failure.
//!
//! ## Module layout:
//! - `options`: option translation and the ordered native argument set
//! - `processor`: invocation, classification and output writing
//! - `engine`: the trait the processor talks to
//! - `closure`: Closure Compiler engine (external process)
//! - `tool_resolver`: locating the compiler executable
//! - `library`: library kinds and script resources
//! - `config`: host configuration
//! - `error`: error types
//! - `audit`: content tree audit (binary property listing)
//! - `batch`, `progress`, `json_output`: directory-level host used by the CLI
//!
//! ## Usage:
//! ```rust,ignore
//! use script_optimizer::{ClosureCompiler, Config, FileScript, LibraryKind, ScriptProcessor, ToolPathResolver};
//!
//! let config = Config::default();
//! let engine = ClosureCompiler::locate(&ToolPathResolver::new(config.engine_path.clone()))?;
//! let processor = ScriptProcessor::new(&config, engine);
//! let mut out = Vec::new();
//! let ok = processor
//!     .process(LibraryKind::Script, &FileScript::new("app.js"), &mut out, [("languageOut", "ECMASCRIPT5")])
//!     .await?;
//! ```

pub mod audit;
pub mod batch;
pub mod closure;
pub mod config;
pub mod engine;
pub mod error;
pub mod json_output;
pub mod library;
pub mod options;
pub mod processor;
pub mod progress;
pub mod tool_resolver;

pub use closure::ClosureCompiler;
pub use config::Config;
pub use engine::{Engine, EngineReport, EngineSession, Environment, SourceUnit};
pub use error::OptimizeError;
pub use library::{FileScript, InlineScript, LibraryKind, ScriptResource};
pub use options::{translate, ArgumentSet, CompilationLevel};
pub use processor::{Classification, CompilationOutcome, Processed, ScriptProcessor};
pub use tool_resolver::ToolPathResolver;
