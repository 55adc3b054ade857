//! Shows what the coordinator would do for a given command line.
//!
//! By default child processes and the shell are replaced with printing
//! stand-ins. The manifest copy and the version query still happen.
//! Pass `--execute` to launch processes for real.
//!
//! ```text
//! cargo run --example startup_demo -- --channel beta --exe-path C:\Brave\app-1.0.0\brave.exe -- --squirrel-firstrun
//! ```
use std::{ffi::OsString, fs::File, path::Path, path::PathBuf};

use clap::Parser;
use squirrel_startup::{
    channel::Channel,
    config::CoordinatorConfig,
    error::CoordinatorError,
    gate::{NeverExit, SquirrelShortcutGate},
    invocation::{Environment, Invocation, InvocationArgs},
    os::{ProcessLauncher, SystemLauncher},
    shell::{AppShell, ProcessShell, RelaunchRequest},
    Coordinator,
};
use tracing::level_filters::LevelFilter;

/// Entry point
pub fn main() -> anyhow::Result<()> {
    init_logging()?;

    let result = main2();

    if let Err(error) = &result {
        tracing::error!(?error, "main error");
    }

    result
}

fn main2() -> anyhow::Result<()> {
    let args = Args::parse();

    let channel: Channel = args.channel.parse()?;
    let config = match &args.config {
        Some(path) => CoordinatorConfig::load(path)?,
        None => CoordinatorConfig::default(),
    };
    let exe_path = match args.exe_path {
        Some(path) => path,
        None => std::env::current_exe()?,
    };

    let invocation = Invocation::new(
        InvocationArgs::new(std::iter::once(exe_path.clone().into_os_string()).chain(args.app_args)),
        Environment::from_process(),
        &exe_path,
    );

    let coordinator = Coordinator::new(invocation, &channel, &config);
    let coordinator = if args.skip_shortcuts {
        coordinator.with_exit_gate(NeverExit)
    } else {
        coordinator.with_exit_gate(SquirrelShortcutGate)
    };

    if args.execute {
        let mut shell = ProcessShell::new().with_exe_path(&exe_path);
        let report = coordinator.with_launcher(SystemLauncher).run(&mut shell)?;

        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let report = coordinator
            .with_launcher(PrintingLauncher)
            .run(&mut PrintingShell)?;

        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

/// Initialize logging for debugging
fn init_logging() -> anyhow::Result<()> {
    let log_filename = format!("squirrel_startup_demo_{}.log", whoami::username());
    let log_file = File::options()
        .create(true)
        .append(true)
        .open(tempfile::env::temp_dir().join(log_filename))?;

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(LevelFilter::TRACE)
        .with_writer(log_file)
        .init();

    Ok(())
}

struct PrintingLauncher;

impl ProcessLauncher for PrintingLauncher {
    fn spawn_detached(&self, program: &Path, args: &[OsString]) -> Result<(), CoordinatorError> {
        println!("would start {program:?} {args:?} (detached)");
        Ok(())
    }

    fn spawn_and_wait(&self, program: &Path, args: &[OsString]) -> Result<i32, CoordinatorError> {
        println!("would run {program:?} {args:?} and wait");
        Ok(0)
    }

    fn output(&self, program: &Path, args: &[OsString]) -> Result<String, CoordinatorError> {
        SystemLauncher.output(program, args)
    }
}

struct PrintingShell;

impl AppShell for PrintingShell {
    fn register_app_user_model_id(&mut self, id: &str) {
        println!("would set app user model id {id}");
    }

    fn relaunch(&mut self, request: &RelaunchRequest) -> Result<(), CoordinatorError> {
        println!("would relaunch with {:?}", request.args);
        Ok(())
    }

    fn exit(&mut self, code: i32) {
        println!("would exit with {code}");
    }
}

// Clap arguments:
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Release channel (nightly, developer, beta, dev, release)
    #[arg(long, default_value = "release")]
    channel: String,

    /// Path of the browser executable to pretend to be
    #[arg(long)]
    exe_path: Option<PathBuf>,

    /// RON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not run the updater shortcut handling
    #[arg(long)]
    skip_shortcuts: bool,

    /// Actually start processes, exit, and relaunch
    #[arg(long)]
    execute: bool,

    /// Arguments the browser was started with
    #[arg(last = true)]
    app_args: Vec<OsString>,
}
