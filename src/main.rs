use std::env;
use std::io;
use std::path::Path;
use std::process;

mod command;
mod config;
mod endpoints;
mod error;
mod heredoc;
mod logging;
mod pipeline;
mod pipes;
mod reaper;
mod resolve;

use config::{Invocation, Mode, Settings, DEFAULT_LOG_LEVEL, HEREDOC_PROMPT, HEREDOC_STORE};
use endpoints::Endpoints;
use error::PipexError;
use heredoc::HeredocStore;
use pipeline::{Pipeline, Plan};

fn print_help() {
    println!("pipex - run commands as a shell pipeline");
    println!();
    println!("Usage: pipex file1 cmd1 cmd2 ... cmdn file2");
    println!("       pipex here_doc LIMITER cmd1 cmd2 ... cmdn file2");
    println!("  -h, --help       Print this help");
    println!("  -V, --version    Print version");
    println!();
    println!("Set PIPEX_LOG=debug to trace pipeline setup on stderr.");
}

fn print_version() {
    println!("pipex v {}", env!("CARGO_PKG_VERSION"));
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // only a lone flag is ours; anything else is a pipeline argument
    if args.len() == 2 {
        match args[1].as_str() {
            "-h" | "--help" => {
                print_help();
                process::exit(0);
            }
            "-v" | "-V" | "--version" => {
                print_version();
                process::exit(0);
            }
            _ => {}
        }
    }

    logging::init(DEFAULT_LOG_LEVEL);

    let code = match run(args.get(1..).unwrap_or_default()) {
        Ok(code) => code,
        Err(e) => {
            logging::report(&e);
            e.exit_code()
        }
    };

    process::exit(code);
}

/// Set up and run one pipeline. Every resource it creates is released
/// before it returns, on success and on error.
fn run(args: &[String]) -> Result<i32, PipexError> {
    let invocation = Invocation::from_args(args)?;
    let settings = Settings::from_env()?;
    let plan = Plan::new(invocation.commands.as_slice(), &settings.search_path);

    let (store, input) = match &invocation.mode {
        Mode::Heredoc { limiter } => {
            let store = HeredocStore::create(
                Path::new(HEREDOC_STORE),
                limiter,
                HEREDOC_PROMPT,
                io::stdin().lock(),
                &mut io::stdout(),
            )
            .map_err(PipexError::Heredoc)?;
            let input = endpoints::open_heredoc(&store)?;
            (Some(store), input)
        }
        Mode::File { input } => (None, endpoints::open_input(input)?),
    };
    let output = endpoints::open_output(&invocation.output, invocation.mode.is_heredoc())?;

    let pipeline = Pipeline::new(plan, Endpoints::new(input, output))?;
    let status = pipeline.run();

    drop(store);
    status
}
