//! esxi-vm CLI - Create VMs on a bare ESXi host over SSH.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use esxi_vm_core::config::{default_config_path, load_defaults, save_defaults};
use esxi_vm_core::report::{append_log, final_line};
use esxi_vm_core::vmx::split_options;
use esxi_vm_core::{
    create_vm, CreateOptions, CreatePhase, Error, PartialSettings, ProgressCallback, RunLog,
    Settings, SshExecutor, Summary,
};

/// Create a virtual machine on an ESXi host without vCenter.
///
/// Options not given on the command line come from ~/.esxi-vm.yml, then from
/// built-in defaults.
#[derive(Parser)]
#[command(name = "esxi-vm-create")]
#[command(about, long_about = None, disable_version_flag = true)]
struct Cli {
    /// Enable Dry Run mode.
    #[arg(short = 'd', long = "dry")]
    dry_run: bool,

    /// ESXi Host/IP.
    #[arg(short = 'H', long = "Host")]
    host: Option<String>,

    /// ESXi Host username.
    #[arg(short = 'U', long = "User")]
    user: Option<String>,

    /// ESXi Host password.
    #[arg(short = 'P', long = "Password")]
    password: Option<String>,

    /// VM name.
    #[arg(short = 'n', long = "name")]
    name: Option<String>,

    /// Number of vCPUs.
    #[arg(short = 'c', long = "cpu")]
    cpu: Option<u32>,

    /// Memory in GB.
    #[arg(short = 'm', long = "mem")]
    mem: Option<u32>,

    /// Size of virtual disk in GB.
    #[arg(short = 'v', long = "vdisk")]
    vdisk: Option<u32>,

    /// CDROM ISO path or file name | None.
    #[arg(short = 'i', long = "iso")]
    iso: Option<String>,

    /// Network interface | None.
    #[arg(short = 'N', long = "net")]
    net: Option<String>,

    /// MAC address.
    #[arg(short = 'M', long = "mac")]
    mac: Option<String>,

    /// vmfs Store | LeastUsed.
    #[arg(short = 'S', long = "store")]
    store: Option<String>,

    /// Guest OS.
    #[arg(short = 'g', long = "guestos")]
    guest_os: Option<String>,

    /// Comma list of VMX options (key=value). An empty list clears the defaults.
    #[arg(short = 'o', long = "options")]
    options: Option<String>,

    /// Enable Verbose mode.
    #[arg(short = 'V', long = "verbose")]
    verbose: bool,

    /// Display Summary.
    #[arg(long = "summary")]
    summary: bool,

    /// Update default VM settings stored in ~/.esxi-vm.yml.
    #[arg(short = 'u', long = "updateDefaults")]
    update_defaults: bool,
}

impl Cli {
    /// The settings layer given on the command line.
    ///
    /// Flags can only switch a mode on; leaving one out keeps the default.
    fn overrides(&self) -> PartialSettings {
        PartialSettings {
            dry_run: self.dry_run.then_some(true),
            verbose: self.verbose.then_some(true),
            summary: self.summary.then_some(true),
            host: self.host.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            cpu: self.cpu,
            mem: self.mem,
            hdisk: self.vdisk,
            iso: self.iso.clone(),
            net: self.net.clone(),
            store: self.store.clone(),
            guest_os: self.guest_os.clone(),
            vmx_opts: self.options.as_deref().map(split_options),
            ..Default::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            println!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = default_config_path();
    let file_layer = load_defaults(&config_path)
        .with_context(|| format!("Error reading defaults from {}", config_path.display()))?
        .unwrap_or_default();
    let settings = Settings::default().layer(file_layer).layer(cli.overrides());

    init_tracing(settings.verbose);

    if cli.update_defaults {
        println!("Saving new Defaults to ~/.esxi-vm.yml");
        save_defaults(&config_path, &settings)
            .with_context(|| format!("Error saving defaults to {}", config_path.display()))?;
        if cli.name.is_none() {
            return Ok(ExitCode::SUCCESS);
        }
    }

    let started = Local::now();

    let Some(name) = cli.name.as_deref().filter(|n| !n.is_empty()) else {
        println!("ERROR: Missing required option --name");
        return Ok(ExitCode::from(1));
    };

    let mut ssh = SshExecutor::connect(&settings.host, &settings.user, &settings.password)
        .map_err(|e| access_error(e, &settings.host, &settings.user))?;

    let request = settings.request(name, cli.mac.as_deref().unwrap_or_default());
    let options = CreateOptions::new(&settings.host, &settings.user, settings.dry_run);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let callback: ProgressCallback = {
        let spinner = spinner.clone();
        Box::new(move |phase: CreatePhase| {
            spinner.set_message(format!("{}...", phase));
        })
    };

    let outcome = create_vm(&mut ssh, &request, &options, Some(callback));
    spinner.finish_and_clear();
    let outcome = outcome.map_err(|e| access_error(e, &settings.host, &settings.user))?;

    for issue in outcome.issues.issues() {
        println!("ERROR: {}", issue.message);
    }

    if settings.verbose {
        println!("VMX file:");
        print!("{}", outcome.vmx);
        if outcome.dry_run {
            if let Some(plan) = &outcome.plan {
                println!("Commands:");
                for command in plan.commands() {
                    println!("{}", command);
                }
            }
        }
    }

    let entry = RunLog::new(&outcome, &settings.host, settings.verbose, started);
    if let Err(e) = append_log(&settings.log, &entry) {
        eprintln!("Error writing to log file: {} ({})", settings.log.display(), e);
    }

    if settings.summary {
        println!();
        print!("{}", Summary::new(&outcome, &settings.host, settings.verbose));
    }

    if let Some(line) = final_line(&outcome) {
        println!("{}", line);
    }

    Ok(ExitCode::from(outcome.exit_code() as u8))
}

/// Failures reaching the host or probing it carry the host and user.
fn access_error(err: Error, host: &str, user: &str) -> anyhow::Error {
    match err {
        Error::Ssh { .. } | Error::Io { .. } | Error::NotEsxiHost { .. } => {
            anyhow::Error::new(err)
                .context(format!("Unable to access ESXi Host: {}, username: {}", host, user))
        }
        other => other.into(),
    }
}

/// Diagnostics go to stderr: warnings by default, debug with --verbose.
/// `RUST_LOG` overrides both.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
