//! `provision`: set up a conda-based voice-cloning toolkit install.
//!
//! Verifies the host, bootstraps conda and the named env, clones the toolkit,
//! installs its Python dependencies and pretrained checkpoints, smoke-tests
//! the result and writes launcher scripts into the working directory.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use provisioner::core::plan::Mode;
use provisioner::exit_codes;
use provisioner::io::config::{DEFAULT_CONFIG_FILE, load_config, render_config};
use provisioner::io::confirm::{Confirm, DeclineAll, StdinConfirm};
use provisioner::io::process::SystemRunner;
use provisioner::io::terminal;
use provisioner::logging;
use provisioner::pipeline::run_pipeline;
use provisioner::stages::StageContext;
use provisioner::stages::preflight::MissingPrerequisite;

#[derive(Parser, Debug)]
#[command(
    name = "provision",
    version,
    about = "Provision a conda environment, sources and checkpoints for a voice-cloning toolkit",
    after_help = "Without a mode flag the full setup runs. Existing directories and envs are \
                  reused unless you confirm recreating them."
)]
struct Cli {
    /// Only run the installation smoke test.
    #[arg(long, conflicts_with = "no_models")]
    test_only: bool,

    /// Run the full setup but skip downloading model checkpoints.
    #[arg(long)]
    no_models: bool,

    /// Config file (default: provision.toml in the working directory, if present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory to provision into (default: current directory).
    #[arg(long, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Answer every prompt with the default ("no") instead of asking.
    #[arg(long)]
    non_interactive: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,

    /// Increase diagnostic logging (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.test_only {
            Mode::TestOnly
        } else if self.no_models {
            Mode::NoModels
        } else {
            Mode::Full
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let code = match run(&cli) {
        Ok(()) => exit_codes::OK,
        Err(err) => match err.downcast_ref::<MissingPrerequisite>() {
            Some(missing) => {
                terminal::error(&missing.to_string());
                exit_codes::MISSING_PREREQUISITE
            }
            None => {
                terminal::error(&format!("{err:#}"));
                exit_codes::FAILED
            }
        },
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<()> {
    let workdir = match &cli.workdir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("resolve current directory")?,
    };
    let config_path = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} not found", path.display());
            }
            path.clone()
        }
        None => workdir.join(DEFAULT_CONFIG_FILE),
    };
    let config = load_config(&config_path)?;

    if cli.print_config {
        print!("{}", render_config(&config)?);
        return Ok(());
    }

    let runner = SystemRunner::new(config.command_timeout_secs.map(Duration::from_secs));
    let confirm: &dyn Confirm = if cli.non_interactive {
        &DeclineAll
    } else {
        &StdinConfirm
    };
    let ctx = StageContext {
        config: &config,
        runner: &runner,
        confirm,
    };
    run_pipeline(cli.mode(), &ctx, &workdir)?;
    Ok(())
}
