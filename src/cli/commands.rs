use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "strata")]
#[command(
    author,
    version,
    about = "A headless content-management core: declarative lists in, relational and GraphQL schemas out"
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (DEBUG) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write structured JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the schema artifacts (relational, GraphQL, types)
    #[command(visible_alias = "gen")]
    Generate,

    /// Validate the committed schema artifacts against the current schema
    Validate,

    /// Print a generated schema face to stdout
    Print {
        /// Which face to print
        #[arg(value_enum)]
        target: PrintTarget,
    },

    /// Execute a GraphQL query against the built-in demo system
    #[command(visible_alias = "q")]
    Query {
        /// GraphQL query string
        query: String,

        /// Variables as JSON
        #[arg(long)]
        variables: Option<String>,

        /// Act as the seeded user with this email (anonymous by default)
        #[arg(long = "as")]
        act_as: Option<String>,

        /// Bypass access control entirely
        #[arg(long)]
        sudo: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PrintTarget {
    Graphql,
    Relational,
    Types,
}
