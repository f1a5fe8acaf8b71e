//! CLI tool for arcwalk archive operations.

mod commands;
mod exit_codes;
mod output;
mod password;
mod progress;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use exit_codes::ExitCode;

/// Inspect and extract zip, tar, RAR and ISO9660 archives
#[derive(Parser)]
#[command(name = "arcwalk")]
#[command(author, version, about = "Inspect and extract zip, tar, RAR and ISO9660 archives", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the archive comment, encryption flag and top-level tree (alias: m)
    #[command(alias = "m")]
    Meta {
        /// Archive file (first volume for multi-volume sets)
        archive: PathBuf,

        /// Password (will prompt if needed and not provided)
        #[arg(short = 'p', long, env = "ARCWALK_PASSWORD")]
        password: Option<String>,
    },

    /// List the immediate children of a path inside the archive (alias: l)
    #[command(alias = "l")]
    Ls {
        /// Archive file (first volume for multi-volume sets)
        archive: PathBuf,

        /// Path inside the archive
        #[arg(default_value = "/")]
        inner: String,

        /// Password (will prompt if needed and not provided)
        #[arg(short = 'p', long, env = "ARCWALK_PASSWORD")]
        password: Option<String>,
    },

    /// Write one entry to standard output
    Cat {
        /// Archive file (first volume for multi-volume sets)
        archive: PathBuf,

        /// Path of the entry inside the archive
        inner: String,

        /// Password (will prompt if needed and not provided)
        #[arg(short = 'p', long, env = "ARCWALK_PASSWORD")]
        password: Option<String>,
    },

    /// Extract the whole archive or one path inside it (alias: x)
    #[command(alias = "x")]
    Extract {
        /// Archive file (first volume for multi-volume sets)
        archive: PathBuf,

        /// Path inside the archive; "/" extracts everything
        #[arg(default_value = "/")]
        inner: String,

        /// Output directory
        #[arg(short = 'o', long, default_value = ".")]
        output: PathBuf,

        /// Password (will prompt if needed and not provided)
        #[arg(short = 'p', long, env = "ARCWALK_PASSWORD")]
        password: Option<String>,
    },

    /// Show the supported formats and their extensions
    Formats,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    // Set up Ctrl+C handler
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted");
        std::process::exit(exit_codes::USER_INTERRUPT);
    })
    .ok();

    let cli = Cli::parse();
    let registry = arcwalk::Registry::with_defaults();

    let exit_code = match cli.command {
        Commands::Meta { archive, password } => {
            commands::meta(&registry, &archive, password, cli.format)
        }

        Commands::Ls {
            archive,
            inner,
            password,
        } => commands::list(&registry, &archive, &inner, password, cli.format),

        Commands::Cat {
            archive,
            inner,
            password,
        } => commands::cat(&registry, &archive, &inner, password),

        Commands::Extract {
            archive,
            inner,
            output,
            password,
        } => commands::extract(&commands::ExtractConfig {
            registry: &registry,
            archive_path: &archive,
            inner: &inner,
            output_dir: &output,
            password,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Formats => commands::formats(&registry, cli.format),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
