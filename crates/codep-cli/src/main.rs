//! codep CLI - keeps codependencies aligned across manifests.

mod cli;
mod commands;

use clap::Parser;
use codep_config::{CodepConfig, Language, OutputFormat, PythonBackend};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code for configuration, policy and resolution errors
const EXIT_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "codep")]
#[command(about = "Checks and updates codependencies in package.json, go.mod and Python manifests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Packages to track, optionally pinned with `name@version`
    ///
    /// Examples:
    ///   codep -c react -c lodash         # keep both at the latest release
    ///   codep -c react@18.2.0            # keep react at 18.2.0
    ///   codep -c @types/node@20.11.0     # scoped packages work too
    #[arg(short, long = "codependency", value_name = "PACKAGE")]
    codependencies: Vec<String>,

    /// Update everything except the tracked packages to "latest"
    #[arg(short, long)]
    permissive: bool,

    /// Manifest glob patterns, relative to the root directory
    #[arg(short, long = "files", value_name = "PATTERN")]
    files: Vec<String>,

    /// Ignore patterns (can be specified multiple times)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    ignore: Vec<String>,

    /// Directory to search for manifests
    #[arg(short, long, value_name = "DIR")]
    root_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rewrite manifests that are out of date
    #[arg(short, long)]
    update: bool,

    /// Report what --update would write without writing
    #[arg(long)]
    dry_run: bool,

    /// Look up Node versions with yarn instead of npm
    #[arg(long)]
    yarn_config: bool,

    /// Skip the version cache
    #[arg(long)]
    no_cache: bool,

    /// Ecosystem of the manifests
    #[arg(short, long, value_enum)]
    language: Option<LanguageArg>,

    /// Python lookup tool
    #[arg(long, value_enum)]
    python_backend: Option<PythonBackendArg>,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value = "table")]
    format: FormatArg,

    /// Seconds before an external lookup is abandoned
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Seconds a resolved version stays cached
    #[arg(long, value_name = "SECS")]
    cache_ttl: Option<u64>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "debug")]
    quiet: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Inspect codep configuration
    Config {
        #[command(subcommand)]
        command: commands::ConfigCommand,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum LanguageArg {
    Nodejs,
    Go,
    Python,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum PythonBackendArg {
    Pip,
    Uv,
    Conda,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum FormatArg {
    Table,
    Json,
    Markdown,
}

impl Cli {
    /// Configuration record holding only what was given on the command line
    fn overrides(&self) -> CodepConfig {
        CodepConfig {
            codependencies: (!self.codependencies.is_empty()).then(|| {
                self.codependencies
                    .iter()
                    .map(|arg| cli::parse_codependency(arg))
                    .collect()
            }),
            permissive: self.permissive,
            files: (!self.files.is_empty()).then(|| self.files.clone()),
            root_dir: self.root_dir.clone(),
            ignore: (!self.ignore.is_empty()).then(|| self.ignore.clone()),
            update: self.update,
            dry_run: self.dry_run,
            yarn_config: self.yarn_config,
            no_cache: self.no_cache,
            language: self.language.map(|language| match language {
                LanguageArg::Nodejs => Language::NodeJs,
                LanguageArg::Go => Language::Go,
                LanguageArg::Python => Language::Python,
            }),
            python_backend: self.python_backend.map(|backend| match backend {
                PythonBackendArg::Pip => PythonBackend::Pip,
                PythonBackendArg::Uv => PythonBackend::Uv,
                PythonBackendArg::Conda => PythonBackend::Conda,
            }),
            format: match self.format {
                FormatArg::Table => OutputFormat::Table,
                FormatArg::Json => OutputFormat::Json,
                FormatArg::Markdown => OutputFormat::Markdown,
            },
            testing: false,
            timeout_secs: self.timeout,
            cache_ttl_secs: self.cache_ttl,
            debug: self.debug,
            quiet: self.quiet,
        }
    }
}

fn setup_logging(debug: bool, quiet: bool) {
    let filter = if debug {
        EnvFilter::new("codep=debug")
    } else if quiet {
        EnvFilter::new("codep=error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("codep=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.debug, cli.quiet);

    let result = match &cli.command {
        Some(Command::Config { command }) => {
            commands::handle_config_command(command, cli.config.clone(), cli.overrides())
                .map(|()| 0)
        }
        None => cli::run_reconcile(cli.config.clone(), cli.overrides()),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codep_config::CodependencyItem;

    #[test]
    fn test_overrides_from_flags() {
        let cli = Cli::parse_from([
            "codep",
            "-c",
            "react",
            "-c",
            "lodash@4.17.21",
            "--update",
            "--language",
            "nodejs",
            "-o",
            "json",
        ]);
        let overrides = cli.overrides();

        assert_eq!(
            overrides.codependencies(),
            &[
                CodependencyItem::Name("react".to_string()),
                CodependencyItem::Pinned {
                    name: "lodash".to_string(),
                    version: "4.17.21".to_string(),
                },
            ]
        );
        assert!(overrides.update);
        assert_eq!(overrides.language, Some(Language::NodeJs));
        assert_eq!(overrides.format, OutputFormat::Json);
        assert_eq!(overrides.files, None);
    }

    #[test]
    fn test_overrides_leave_file_values_alone() {
        let cli = Cli::parse_from(["codep"]);
        let file = CodepConfig {
            codependencies: Some(vec!["vue".into()]),
            files: Some(vec!["apps/*/package.json".to_string()]),
            ..Default::default()
        };

        let merged = file.clone().merge(cli.overrides());
        assert_eq!(merged.codependencies, file.codependencies);
        assert_eq!(merged.files, file.files);
    }

    #[test]
    fn test_debug_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["codep", "--debug", "--quiet"]).is_err());
    }
}
