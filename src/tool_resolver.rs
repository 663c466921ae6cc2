//! # Engine Path Resolver
//!
//! This module handles finding the Closure Compiler in different environments:
//! - Explicit path from the configuration file
//! - `CLOSURE_COMPILER` environment variable (binary or `.jar`)
//! - Bundled tools directory (`TOOLS_DIR`, or `tools/` next to the executable)
//! - System-installed `google-closure-compiler` / `closure-compiler`
//! - `CLOSURE_COMPILER_JAR` run through `java -jar`

use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Native executables shipped by the Closure Compiler npm/brew packages
const ENGINE_BINARIES: &[&str] = &["google-closure-compiler", "closure-compiler"];

/// How to launch the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: PathBuf,
    /// Arguments placed before the engine flags (`-jar <path>` for jars)
    pub leading_args: Vec<String>,
}

impl EngineCommand {
    /// Launch a path directly, or through `java -jar` when it is a jar
    pub fn for_path(path: &Path, java: Option<PathBuf>) -> Self {
        let is_jar = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("jar"))
            .unwrap_or(false);

        if is_jar {
            Self {
                program: java.unwrap_or_else(|| PathBuf::from("java")),
                leading_args: vec!["-jar".to_string(), path.to_string_lossy().to_string()],
            }
        } else {
            Self {
                program: path.to_path_buf(),
                leading_args: Vec::new(),
            }
        }
    }

    pub fn describe(&self) -> String {
        if self.leading_args.is_empty() {
            self.program.display().to_string()
        } else {
            format!("{} {}", self.program.display(), self.leading_args.join(" "))
        }
    }
}

/// Engine path resolver for different deployment environments
pub struct ToolPathResolver {
    /// Path configured explicitly by the host
    engine_path: Option<PathBuf>,
    /// Base directory where tools are bundled
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    /// Create a new path resolver
    pub fn new(engine_path: Option<PathBuf>) -> Self {
        Self {
            engine_path,
            tools_dir: Self::detect_bundled_tools_dir(),
        }
    }

    /// Detect the bundled tools directory
    fn detect_bundled_tools_dir() -> Option<PathBuf> {
        // Strategy 1: TOOLS_DIR environment variable (direct override)
        if let Ok(tools_dir) = env::var("TOOLS_DIR") {
            let tools_path = PathBuf::from(tools_dir);
            debug!("Checking TOOLS_DIR environment variable: {:?}", tools_path);
            if tools_path.exists() {
                return Some(tools_path);
            }
        }

        // Strategy 2: tools/ next to the executable
        if let Ok(exe_path) = env::current_exe() {
            if let Some(app_dir) = exe_path.parent() {
                let possible_paths = [app_dir.join("tools"), app_dir.join("resources").join("tools")];
                for path in &possible_paths {
                    debug!("Checking bundled path: {:?}", path);
                    if path.exists() {
                        return Some(path.clone());
                    }
                }
            }
        }

        debug!("No bundled tools directory found");
        None
    }

    /// Resolve the engine launch command
    pub fn resolve_engine(&self) -> Option<EngineCommand> {
        if let Some(ref path) = self.engine_path {
            if path.exists() {
                debug!("Using configured engine: {:?}", path);
                return Some(EngineCommand::for_path(path, self.resolve_tool("java")));
            }
            warn!("Configured engine path does not exist: {}", path.display());
        }

        if let Ok(path) = env::var("CLOSURE_COMPILER") {
            let path = PathBuf::from(path);
            if path.exists() {
                debug!("Using engine from CLOSURE_COMPILER: {:?}", path);
                return Some(EngineCommand::for_path(&path, self.resolve_tool("java")));
            }
        }

        for binary in ENGINE_BINARIES {
            if let Some(path) = self.resolve_tool(binary) {
                return Some(EngineCommand::for_path(&path, None));
            }
        }

        if let Ok(jar) = env::var("CLOSURE_COMPILER_JAR") {
            let jar = PathBuf::from(jar);
            if let (true, Some(java)) = (jar.exists(), self.resolve_tool("java")) {
                debug!("Using engine jar {:?} with {:?}", jar, java);
                return Some(EngineCommand::for_path(&jar, Some(java)));
            }
        }

        warn!("Closure Compiler not found");
        None
    }

    /// Resolve the path to a specific tool, bundled first, then system PATH
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        if let Some(ref tools_dir) = self.tools_dir {
            let bundled_path = self.get_bundled_tool_path(tools_dir, tool_name);
            if bundled_path.exists() {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled_path);
                return Some(bundled_path);
            }
        }

        self.find_in_system_path(tool_name)
    }

    /// Expected path for a bundled tool: tools/{platform}/{tool_name}
    fn get_bundled_tool_path(&self, tools_dir: &Path, tool_name: &str) -> PathBuf {
        let platform = if cfg!(target_os = "macos") { "darwin" } else { env::consts::OS };
        let extension = if cfg!(target_os = "windows") { ".exe" } else { "" };

        tools_dir.join(platform).join(format!("{}{}", tool_name, extension))
    }

    /// Find tool in system PATH
    fn find_in_system_path(&self, tool_name: &str) -> Option<PathBuf> {
        let extension = if cfg!(windows) { ".exe" } else { "" };
        let tool_with_ext = format!("{}{}", tool_name, extension);

        env::split_paths(&env::var_os("PATH")?)
            .map(|dir| dir.join(&tool_with_ext))
            .find(|path| path.is_file())
    }

    /// Check if the engine is available and provide installation instructions if not
    pub fn check_engine_with_instructions(&self) -> Result<EngineCommand, String> {
        self.resolve_engine().ok_or_else(|| {
            format!(
                "Closure Compiler not found.\n\
                Install it with:\n  {}\n\
                or point CLOSURE_COMPILER at a binary or jar.",
                Self::install_instructions()
            )
        })
    }

    fn install_instructions() -> &'static str {
        if cfg!(target_os = "macos") {
            "brew install closure-compiler"
        } else {
            "npm install -g google-closure-compiler"
        }
    }

    /// Get a report of engine availability
    pub fn get_tools_report(&self) -> String {
        let mut report = String::new();
        report.push_str("Engine Resolver Report\n");
        report.push_str(&format!("Configured engine path: {:?}\n", self.engine_path));
        report.push_str(&format!("Bundled tools dir: {:?}\n", self.tools_dir));
        report.push_str("\nCandidates:\n");

        for binary in ENGINE_BINARIES {
            match self.resolve_tool(binary) {
                Some(path) => report.push_str(&format!("  ✅ {} -> {:?}\n", binary, path)),
                None => report.push_str(&format!("  ❌ {}\n", binary)),
            }
        }
        match self.resolve_tool("java") {
            Some(path) => report.push_str(&format!("  ✅ java -> {:?}\n", path)),
            None => report.push_str("  ❌ java\n"),
        }

        report.push_str("\nSelected:\n");
        match self.check_engine_with_instructions() {
            Ok(command) => report.push_str(&format!("  {}\n", command.describe())),
            Err(msg) => report.push_str(&format!("  none\n\n{}\n", msg)),
        }

        report
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new(None)
    }
}
