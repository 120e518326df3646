//! CLI tool to inspect and check shell scripts.
//!
//! Usage:
//!   shellparse tokens script.sh     # Print the token stream
//!   shellparse tree script.sh       # Print the syntax tree
//!   shellparse check *.sh           # Report syntax errors

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shellparse_rs::{ParseOptions, SyntaxTree, format_tokens, format_tree, parse, tokenize_with};

/// Shell script lexer and parser
#[derive(Parser, Debug)]
#[command(name = "shellparse")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Disable the bash extensions (`;&`, `|&`, `coproc`, ...)
    #[arg(long, global = true)]
    posix: bool,

    /// Treat `$name=value` as an assignment, as in `eval` arguments
    #[arg(long, global = true)]
    eval: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the token stream of each file
    Tokens {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the syntax tree of each file
    Tree {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Report syntax errors; exits non-zero if any file has one
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Command {
    fn files(&self) -> &[PathBuf] {
        match self {
            Self::Tokens { files } | Self::Tree { files } | Self::Check { files } => files,
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Print the errors of `tree`; returns whether there were any.
fn report(path: &Path, tree: &SyntaxTree) -> bool {
    if tree.is_ok() {
        eprintln!("{}: valid", path.display());
        return false;
    }
    for error in &tree.errors {
        eprintln!("{}: {error}", path.display());
    }
    true
}

fn main() -> ExitCode {
    let args = Args::parse();
    let options = ParseOptions::new()
        .extended(!args.posix)
        .eval_mode(args.eval);

    let mut had_error = false;

    for path in args.command.files() {
        let content = match read(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("{e:#}");
                had_error = true;
                continue;
            }
        };

        match &args.command {
            Command::Tokens { .. } => {
                let lexed = tokenize_with(&content, &options);
                print!("{}", format_tokens(&lexed.tokens));
                for error in &lexed.errors {
                    eprintln!("{}: {error}", path.display());
                }
            }
            Command::Tree { .. } => {
                print!("{}", format_tree(&parse(&content, &options)));
            }
            Command::Check { .. } => {
                had_error |= report(path, &parse(&content, &options));
            }
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
