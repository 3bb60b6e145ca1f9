use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use crate::resolve::{resolve, Resolution, SearchPath};

/// A single pipeline stage: its argv tokens and where its executable lives.
///
/// The C strings handed to `execv` are built here, in the parent, so the
/// child has nothing left to allocate between `fork` and `exec`.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    tokens: Vec<String>,
    target: Option<ExecTarget>,
}

#[derive(Debug, Clone)]
pub struct ExecTarget {
    pub path: PathBuf,
    pub c_path: CString,
    pub c_args: Vec<CString>,
}

impl CommandSpec {
    /// Split a raw command string on whitespace and resolve its program.
    pub fn parse(raw: &str, search: &SearchPath) -> Self {
        let tokens: Vec<String> = raw.split_whitespace().map(|s| s.to_string()).collect();

        let target = match tokens.first().map(|name| resolve(name, search)) {
            Some(Resolution::Found(path)) => ExecTarget::new(path, &tokens),
            _ => None,
        };

        Self { tokens, target }
    }

    /// Program name as typed, used in diagnostics.
    pub fn name(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or("")
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn target(&self) -> Option<&ExecTarget> {
        self.target.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

impl ExecTarget {
    fn new(path: PathBuf, tokens: &[String]) -> Option<Self> {
        let c_path = CString::new(path.as_os_str().as_bytes()).ok()?;
        let c_args = tokens
            .iter()
            .map(|t| CString::new(t.as_bytes()))
            .collect::<Result<Vec<_>, _>>()
            .ok()?;
        Some(Self {
            path,
            c_path,
            c_args,
        })
    }
}
