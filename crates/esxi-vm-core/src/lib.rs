//! esxi-vm Core Library
//!
//! This crate creates virtual machines on a standalone ESXi host that has no
//! vCenter, using nothing but SSH and the host's own command-line tools.
//!
//! # Overview
//!
//! A run reads what the host has (datastores, portgroups, registered VMs),
//! locates the install ISO, validates the request against all of it while
//! collecting every problem, builds the VMX document, and then either stops
//! (dry run) or creates the directory, VMX file and disk, registers the VM
//! and powers it on. The main entry point is [`create_vm`].
//!
//! # Modules
//!
//! - [`error`] - Error types and Result alias
//! - [`remote`] - Remote command executor trait
//! - [`ssh`] - SSH transport
//! - [`commands`] - Remote command lines
//! - [`inventory`] - Host inventory parsing
//! - [`iso`] - ISO lookup
//! - [`request`] - The requested VM
//! - [`validate`] - Request validation
//! - [`vmx`] - VMX document building
//! - [`plan`] - Mutating command plan
//! - [`create`] - Create orchestrator
//! - [`config`] - Settings layering and the defaults file
//! - [`report`] - Run log and summary
//!
//! # Quick Start
//!
//! ```no_run
//! use esxi_vm_core::{create_vm, CreateOptions, Settings, SshExecutor};
//!
//! let settings = Settings::default();
//! let mut ssh = SshExecutor::connect(&settings.host, &settings.user, &settings.password).unwrap();
//! let request = settings.request("web01", "");
//! let options = CreateOptions::new(&settings.host, &settings.user, true);
//!
//! let outcome = create_vm(&mut ssh, &request, &options, None).unwrap();
//! std::process::exit(outcome.exit_code());
//! ```

pub mod commands;
pub mod config;
pub mod create;
pub mod error;
pub mod inventory;
pub mod iso;
pub mod plan;
pub mod remote;
pub mod report;
pub mod request;
pub mod ssh;
pub mod validate;
pub mod vmx;

pub use error::{Error, Result};

// Re-export the create entry point and its types for convenience
pub use create::{
    create_vm, CreateOptions, CreateOutcome, ProgressCallback, RunResult, CREATE_FAILED_MESSAGE,
};

pub use config::{PartialSettings, Settings};
pub use inventory::{Datastore, HostInventory, RegisteredVm};
pub use iso::IsoStatus;
pub use plan::{CreatePhase, ExecutionPlan, PlanStep};
pub use remote::{CommandOutput, RemoteExecutor};
pub use report::{RunLog, Summary};
pub use request::VmRequest;
pub use ssh::SshExecutor;
pub use validate::{Issue, IssueKind, ValidationReport};
pub use vmx::{Directive, VmxDocument};
