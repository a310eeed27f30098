use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use licenscan::{
    config::Config,
    exec::{ContainerContext, ContainerOptions, ExecContext, LocalContext},
    layout::manager_binary_candidates,
    model::{ManagerKind, ScanReport},
    output::{print_report, render_table, write_reports, OutputFormat},
    pipeline::ScanPipeline,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const UNKNOWN_LICENSE: u8 = 2;
}

#[derive(Parser)]
#[command(name = "licenscan")]
#[command(
    author,
    version,
    about = "Resolve package licenses and harvest copyright files from container images"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an image (or the local filesystem) for package licenses
    Scan {
        /// Image reference, e.g. debian:12
        image: Option<String>,

        /// Scan the host instead of an image, optionally below ROOT
        #[arg(long, value_name = "ROOT", num_args = 0..=1, default_missing_value = "/")]
        local: Option<PathBuf>,

        /// Output format (table, csv, json, all)
        #[arg(short, long)]
        format: Option<String>,

        /// Directory receiving the report files and copyright mirror
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Print a single format to stdout instead of writing files
        #[arg(long)]
        stdout: bool,

        /// Skip copyright file harvesting
        #[arg(long)]
        no_copyright: bool,

        /// Skip the README/plain-text content inspection pass
        #[arg(long)]
        no_content_sniff: bool,

        /// Timeout for package listing commands, in seconds
        #[arg(long)]
        command_timeout: Option<u64>,

        /// Enumerate package managers one after another
        #[arg(long)]
        no_parallel: bool,

        /// Exit with status 2 if any package license is unknown
        #[arg(long)]
        fail_on_unknown: bool,
    },

    /// List supported package managers
    ListManagers,

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

struct ScanArgs {
    image: Option<String>,
    local: Option<PathBuf>,
    format: OutputFormat,
    to_stdout: bool,
    fail_on_unknown: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("licenscan={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<u8> {
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable config file");
        Config::default()
    });

    match cli.command {
        Commands::Scan {
            image,
            local,
            format,
            output_dir,
            stdout,
            no_copyright,
            no_content_sniff,
            command_timeout,
            no_parallel,
            fail_on_unknown,
        } => {
            let format_str = format.unwrap_or(config.default_format.clone());
            let format = OutputFormat::from_str(&format_str).map_err(|e| anyhow::anyhow!(e))?;

            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(secs) = command_timeout {
                config.command_timeout_secs = secs;
            }
            config.harvest.enabled &= !no_copyright;
            config.harvest.content_sniff &= !no_content_sniff;
            config.parallel &= !no_parallel;

            let args = ScanArgs {
                image,
                local,
                format,
                to_stdout: stdout,
                fail_on_unknown,
            };
            run_scan(&config, args).await
        }
        Commands::ListManagers => {
            list_managers();
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

async fn run_scan(config: &Config, args: ScanArgs) -> Result<u8> {
    let interactive = !args.to_stdout && std::io::stdout().is_terminal();
    let pipeline = ScanPipeline::from_config(config);

    let report = match (&args.local, &args.image) {
        (Some(root), image) => {
            let ctx = LocalContext::with_root(root.clone())?;
            let label = image
                .clone()
                .unwrap_or_else(|| format!("local:{}", root.display()));
            scan_with(&pipeline, &ctx, &label, interactive).await
        }
        (None, Some(image)) => {
            let progress = spinner(interactive, format!("Preparing {}...", image));
            let opened = ContainerContext::open(image, &ContainerOptions::default()).await;
            if let Some(pb) = progress {
                pb.finish_and_clear();
            }
            let ctx = opened?;

            let report = scan_with(&pipeline, &ctx, image, interactive).await;
            ctx.close().await;
            report
        }
        (None, None) => bail!("An image reference or --local is required"),
    };

    if args.to_stdout {
        print_report(&report, args.format)?;
    } else {
        let written = write_reports(&report, &config.output_dir, args.format)?;
        if matches!(args.format, OutputFormat::Table | OutputFormat::All) && interactive {
            print!("{}", render_table(&report));
        }
        for path in &written {
            println!("Report written to: {}", path.display());
        }
        if !report.copyright_files.is_empty() {
            println!(
                "Copyright files copied to: {}",
                config.copyright_dir().display()
            );
        }
    }

    Ok(determine_exit_code(&report, args.fail_on_unknown))
}

async fn scan_with(
    pipeline: &ScanPipeline,
    ctx: &dyn ExecContext,
    label: &str,
    interactive: bool,
) -> ScanReport {
    info!(context = %ctx.describe(), "scan started");

    let progress = spinner(interactive, "Resolving package licenses...".to_string());
    let mut report = pipeline.scan_packages(ctx, label).await;
    if let Some(pb) = progress {
        pb.finish_with_message(format!("Resolved {} packages", report.packages.len()));
    }

    let progress = spinner(interactive, "Harvesting copyright files...".to_string());
    pipeline.harvest(ctx, &mut report).await;
    if let Some(pb) = progress {
        pb.finish_with_message(format!(
            "Harvested {} copyright files",
            report.copyright_files.len()
        ));
    }

    report
}

fn spinner(enabled: bool, message: String) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    Some(pb)
}

fn determine_exit_code(report: &ScanReport, fail_on_unknown: bool) -> u8 {
    if fail_on_unknown && report.unknown_count() > 0 {
        exit_codes::UNKNOWN_LICENSE
    } else {
        exit_codes::SUCCESS
    }
}

fn list_managers() {
    println!("Supported package managers:");
    println!();

    for kind in ManagerKind::PROBED {
        let candidates = manager_binary_candidates(kind);
        println!("  {:<6} {}", kind.as_str(), kind.display_name());
        println!("  {:<6} Probed at: {}", "", candidates.join(", "));
        println!();
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    // Show current config
    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'licenscan config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
