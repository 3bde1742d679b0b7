use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use shelp_install::config::{self, CheckSettings, Overrides, Settings};
use shelp_install::download::HttpFetcher;
use shelp_install::{PlatformKey, ResolveError, Resolver, resolver, ui};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "shelp-install")]
#[command(author, version, about = "Install verified prebuilt shelp releases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Options shared by every command that resolves an artifact.
#[derive(clap::Args)]
struct ReleaseArgs {
    /// Release version to install (defaults to the latest known release)
    #[arg(long = "release", value_name = "VERSION")]
    version: Option<String>,

    /// Target platform as OS-ARCH, e.g. linux-arm64 (defaults to this machine)
    #[arg(long, value_parser = parse_platform)]
    platform: Option<PlatformKey>,

    /// JSON release manifest to use instead of the builtin table
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, verify and install the release binary
    Install {
        #[command(flatten)]
        release: ReleaseArgs,

        /// Directory to install into
        #[arg(long, value_name = "DIR")]
        bin_dir: Option<PathBuf>,

        /// Download timeout in seconds
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },

    /// Print the artifact URL and checksum without downloading
    Url {
        #[command(flatten)]
        release: ReleaseArgs,
    },

    /// List every platform in the release table
    Platforms {
        /// JSON release manifest to use instead of the builtin table
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,
    },

    /// Run the version self-check against an installed binary
    Check {
        /// Release version the binary should report
        #[arg(long = "release", value_name = "VERSION")]
        version: Option<String>,

        /// Directory the binary is installed in
        #[arg(long, value_name = "DIR")]
        bin_dir: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn parse_platform(s: &str) -> Result<PlatformKey, String> {
    s.parse().map_err(|e: ResolveError| e.to_string())
}

fn overrides(release: ReleaseArgs, bin_dir: Option<PathBuf>) -> Overrides {
    Overrides {
        platform: release.platform,
        version: release.version,
        bin_dir,
        manifest: release.manifest,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays scriptable
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
    ui::init_colors();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ResolveError>() {
                Some(resolve) => eprintln!("{}", ui::format_error(resolve)),
                None => eprintln!("{} {:#}", "✗".red(), err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Install {
            release,
            bin_dir,
            timeout,
        }) => {
            let settings = Settings::from_env(overrides(release, bin_dir))?;
            let fetcher = HttpFetcher::new(Duration::from_secs(timeout))
                .context("Failed to create HTTP client")?
                .with_progress(ui::show_progress());
            let resolver = Resolver::new(settings.table, fetcher);
            let report = resolver.install(&settings.config).await?;
            ui::print_report(&report);
        }
        Some(Commands::Url { release }) => {
            let settings = Settings::from_env(overrides(release, None))?;
            let config = &settings.config;
            let entry = resolver::resolve(&settings.table, config.platform, &config.version)?;
            println!("{}", entry.url);
            println!("{}", entry.sha256);
        }
        Some(Commands::Platforms { manifest }) => {
            let table = config::release_table(manifest, |key| std::env::var(key).ok())?;
            ui::print_table(&table);
        }
        Some(Commands::Check { version, bin_dir }) => {
            let settings = CheckSettings::from_env(Overrides {
                version,
                bin_dir,
                ..Default::default()
            })?;
            let path = resolver::check_installed(&settings).await?;
            println!(
                "{} {} reports version {}",
                "✓".green(),
                path.display(),
                settings.version.to_string().cyan()
            );
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "shelp-install",
                &mut std::io::stdout(),
            );
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
