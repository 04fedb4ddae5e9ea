//! varscope cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use varscope::scope::Scope;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run from this directory, relative paths are resolved against it
    ///
    /// Repeatable, each directory is entered from the previous one.
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List variables in display order
    ///
    /// Reads a variable listing from stdin unless any other source is provided (via --input-*)
    #[command(alias = "ls")]
    Sort(SortCommand),

    /// Scopes a variable may be written to
    Scopes(ScopesCommand),

    /// Check if a key may be written at a scope
    CheckKey(CheckKeyCommand),

    /// Turn a .env file or JSON object into an import request
    Import(ImportCommand),

    /// Report integrity issues of a variable listing
    Check(CheckCommand),

    /// Check that variables can be deleted together and print the order to delete them in
    Delete(DeleteCommand),
}

#[derive(Parser, Debug)]
pub struct SortCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Only keep variables whose key (or one of their aliases) contains this
    #[clap(short = 's', long = "search")]
    pub search: Option<String>,

    /// Show secret values instead of masking them
    #[clap(long = "show-secrets")]
    pub show_secrets: bool,
}

#[derive(Parser, Debug)]
pub struct ScopesCommand {
    #[clap(flatten)]
    pub output: OutputArgs,

    /// Scope of the page the flow is opened from
    #[clap(long = "context")]
    pub context: Option<Scope>,

    /// Scope of the variable being edited or derived from
    #[clap(long = "current")]
    pub current: Option<Scope>,

    /// The variable is an override of --current
    #[clap(long = "override", requires("current"))]
    pub is_override: bool,

    /// Offer BUILT_IN for a new variable
    #[clap(long = "built-in")]
    pub include_built_in: bool,
}

#[derive(Parser, Debug)]
pub struct CheckKeyCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Scope the key is written at
    #[clap(long = "scope")]
    pub scope: Option<Scope>,

    /// Service scope of the page, other service scopes are ignored
    #[clap(long = "context")]
    pub context: Option<Scope>,

    /// Update existing variables at the same scope
    #[clap(long = "overwrite")]
    pub overwrite: bool,

    pub key: String,
}

#[derive(Parser, Debug)]
pub struct ImportCommand {
    /// Existing variables to check the imported keys against
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Scope of the page the import is opened from
    #[clap(long = "context", default_value_t = Scope::Environment)]
    pub context: Scope,

    /// Scope for every row instead of the default one
    #[clap(long = "scope")]
    pub scope: Option<Scope>,

    /// Mark every row as secret
    #[clap(long = "secret")]
    pub secret: bool,

    /// Update existing variables at the same scope
    #[clap(long = "overwrite")]
    pub overwrite: bool,

    /// File to import, `-` for stdin
    pub payload: PathBuf,
}

#[derive(Parser, Debug)]
pub struct CheckCommand {
    #[clap(flatten)]
    pub input: InputArgs,
}

#[derive(Parser, Debug)]
pub struct DeleteCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Ids of the selected variables
    #[clap(required = true)]
    pub ids: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Load a listing file (.json, .yaml, .yml)
    #[clap(short = 'f', long = "input-file")]
    pub files: Vec<PathBuf>,

    /// Load all listing files from given directory
    #[clap(short = 'd', long = "input-dir")]
    pub directories: Vec<PathBuf>,
}

impl InputArgs {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    /// Format of the report written to stdout
    #[arg(short = 'F', long = "output-format", value_enum, default_value = "yaml")]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    Json,
    Yaml,
}
