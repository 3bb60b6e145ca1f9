use std::env;
use std::path::PathBuf;

use tracing::debug;

use crate::error::PipexError;
use crate::resolve::SearchPath;

pub const HEREDOC_KEYWORD: &str = "here_doc";
pub const HEREDOC_STORE: &str = ".heredoc.tmp";
pub const HEREDOC_PROMPT: &str = "here_doc > ";
pub const OUTPUT_MODE: u32 = 0o644;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

pub const USAGE: &str = "Usage: ./pipex file1 cmd1 cmd2 ... cmdn file2.";
pub const HEREDOC_USAGE: &str = "Usage: ./pipex here_doc LIMITER cmd1 cmd2 ... cmdn file2.";

/// Where the pipeline's overall input comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    File { input: PathBuf },
    Heredoc { limiter: String },
}

impl Mode {
    pub fn is_heredoc(&self) -> bool {
        matches!(self, Mode::Heredoc { .. })
    }
}

/// One parsed command line: input mode, raw command strings, output path.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub mode: Mode,
    pub commands: Vec<String>,
    pub output: PathBuf,
}

impl Invocation {
    /// Parse the arguments that follow the program name.
    pub fn from_args(args: &[String]) -> Result<Self, PipexError> {
        let heredoc = args.first().is_some_and(|a| a == HEREDOC_KEYWORD);

        if heredoc {
            // here_doc LIMITER cmd1 cmd2 ... outfile
            if args.len() < 5 {
                return Err(PipexError::Usage(HEREDOC_USAGE));
            }
            let output = PathBuf::from(&args[args.len() - 1]);
            Ok(Self {
                mode: Mode::Heredoc {
                    limiter: args[1].clone(),
                },
                commands: args[2..args.len() - 1].to_vec(),
                output,
            })
        } else {
            // infile cmd1 cmd2 ... outfile
            if args.len() < 4 {
                return Err(PipexError::Usage(USAGE));
            }
            let output = PathBuf::from(&args[args.len() - 1]);
            Ok(Self {
                mode: Mode::File {
                    input: PathBuf::from(&args[0]),
                },
                commands: args[1..args.len() - 1].to_vec(),
                output,
            })
        }
    }
}

/// Ambient configuration read from the inherited environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub search_path: SearchPath,
}

impl Settings {
    pub fn from_env() -> Result<Self, PipexError> {
        if env::vars_os().next().is_none() {
            return Err(PipexError::Environment);
        }

        let search_path = env::var_os("PATH")
            .map(SearchPath::parse)
            .unwrap_or_default();
        if search_path.is_empty() {
            debug!("PATH unset or empty, resolving commands by direct access only");
        }

        Ok(Self { search_path })
    }
}
