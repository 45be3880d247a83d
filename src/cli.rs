use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "corpref")]
#[command(about = "Resolve a company website to its reference article, then resolve its subsidiaries and acquisitions to their own domains")]
#[command(version)]
pub struct Cli {
    /// Create default configuration file at ./config/corpref.toml
    #[arg(long)]
    pub init: bool,

    /// Company website to resolve (e.g. https://www.acme.com)
    #[arg(short, long, value_name = "URL")]
    pub website: Option<String>,

    /// Configuration file (defaults to ./config/corpref.toml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<String>,

    /// Write the JSON result to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Verbose logging (use -v for INFO, -vv for DEBUG)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Export execution logs to a file (specify file path)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<String>,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,

    /// Print only the JSON result and errors
    #[arg(short, long)]
    pub quiet: bool,
}
