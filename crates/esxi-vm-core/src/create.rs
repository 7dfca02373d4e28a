//! Create orchestrator.
//!
//! This module runs one provisioning pass against a host:
//! 1. Probe the host and collect datastores and portgroups
//! 2. Resolve the ISO and list registered VMs
//! 3. Validate the request and build the VMX document and plan
//! 4. Unless this is a dry run or validation failed, run the plan
//!
//! Failures in steps 1-2 are fatal and returned as `Err`. Everything after
//! that ends up in the returned [`CreateOutcome`].
//!
//! # Example
//!
//! ```no_run
//! use esxi_vm_core::{create_vm, CreateOptions, Settings, SshExecutor};
//!
//! let settings = Settings::default();
//! let request = settings.request("web01", "");
//! let mut ssh = SshExecutor::connect("esxi", "root", "secret").unwrap();
//! let options = CreateOptions::new("esxi", "root", true);
//!
//! let outcome = create_vm(&mut ssh, &request, &options, None).unwrap();
//! println!("{}", outcome.result);
//! ```

use std::fmt;

use tracing::{debug, error, warn};

use crate::commands;
use crate::error::{Error, Result};
use crate::inventory::{list_registered_vms, probe_host, HostInventory};
use crate::iso::{resolve_iso, IsoStatus};
use crate::plan::{CreatePhase, ExecutionPlan, PlanStep};
use crate::remote::RemoteExecutor;
use crate::request::VmRequest;
use crate::validate::{
    resolve_datastore, target_dir, validate, IssueKind, RemoteChecks, Validation,
    ValidationReport,
};
use crate::vmx::{build_vmx, VmxDocument};

/// Message recorded when the execute phase fails part way.
pub const CREATE_FAILED_MESSAGE: &str = "There was an error creating the VM.";

/// Options for a create run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    /// Host name, for messages.
    pub host: String,
    /// User name, for messages.
    pub user: String,
    /// Validate and plan only.
    pub dry_run: bool,
}

impl CreateOptions {
    /// Create options for `user@host`.
    pub fn new(host: impl Into<String>, user: impl Into<String>, dry_run: bool) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            dry_run,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    /// Validation passed; the VM was created (or would have been, for a dry run).
    Success,
    /// Validation failed; nothing was changed.
    Errors,
    /// The execute phase failed or the VM did not power on.
    Fail,
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunResult::Success => write!(f, "Success"),
            RunResult::Errors => write!(f, "Errors"),
            RunResult::Fail => write!(f, "Fail"),
        }
    }
}

/// Type alias for the progress callback function.
pub type ProgressCallback = Box<dyn Fn(CreatePhase) + Send>;

/// Everything a run found out and did.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    /// The request as given.
    pub request: VmRequest,
    /// Whether mutating steps were skipped on purpose.
    pub dry_run: bool,
    /// Datastores, networks and VMs seen on the host.
    pub inventory: HostInventory,
    /// ISO lookup result.
    pub iso: IsoStatus,
    /// VM-id of an existing VM with the requested name.
    pub existing_vm_id: Option<u32>,
    /// Validation result with the resolved datastore and MAC.
    pub validation: Validation,
    /// Validation issues plus any execute failure, in order.
    pub issues: ValidationReport,
    /// The VMX document, overrides applied.
    pub vmx: VmxDocument,
    /// The mutating steps; `None` when the datastore did not resolve.
    pub plan: Option<ExecutionPlan>,
    /// VM-id assigned by registration.
    pub vm_id: Option<u32>,
    /// MAC address read back from the host's copy of the VMX file.
    pub generated_mac: String,
    /// How the run ended.
    pub result: RunResult,
}

impl CreateOutcome {
    /// Process exit code for this outcome.
    ///
    /// Only validation errors exit non-zero. A run that failed after it
    /// started changing the host still exits 0 with [`RunResult::Fail`].
    pub fn exit_code(&self) -> i32 {
        match self.result {
            RunResult::Errors => 1,
            RunResult::Success | RunResult::Fail => 0,
        }
    }

    /// Datastore path the VM went to, or "".
    pub fn store_used(&self) -> &str {
        self.validation
            .datastore
            .as_ref()
            .map(|ds| ds.path.as_str())
            .unwrap_or_default()
    }

    /// Datastore label the VM went to, or "".
    pub fn store_label(&self) -> &str {
        self.validation
            .datastore
            .as_ref()
            .map(|ds| ds.label.as_str())
            .unwrap_or_default()
    }
}

/// What the execute phase produced.
#[derive(Debug, Default)]
struct Execution {
    vm_id: Option<u32>,
    generated_mac: String,
    power_on_failed: bool,
}

/// Run one provisioning pass.
///
/// # Errors
///
/// Returns an error if the host is not ESXi, reports no datastores, or the
/// transport fails before validation completes. Problems with the request
/// and failures while creating the VM are reported in the outcome instead.
pub fn create_vm<E: RemoteExecutor>(
    exec: &mut E,
    request: &VmRequest,
    options: &CreateOptions,
    progress_callback: Option<ProgressCallback>,
) -> Result<CreateOutcome> {
    let report_progress = |phase: CreatePhase| {
        if let Some(ref callback) = progress_callback {
            callback(phase);
        }
    };

    debug!(request = %request, dry_run = options.dry_run, "create run");

    report_progress(CreatePhase::HostProbe);
    probe_host(exec, &options.host, &options.user)?;

    report_progress(CreatePhase::InventoryCollect);
    let mut inventory = HostInventory::query(exec, &options.host)?;

    report_progress(CreatePhase::IsoResolve);
    let iso = resolve_iso(exec, &request.iso)?;

    report_progress(CreatePhase::VmExistenceCheck);
    inventory.existing_vms = list_registered_vms(exec)?;
    let existing_vm_id = inventory.find_vm(&request.name);
    if let Some(id) = existing_vm_id {
        debug!(name = %request.name, vm_id = id, "VM already registered");
    }

    report_progress(CreatePhase::Validate);
    let (_, datastore) = resolve_datastore(&request.store, &inventory);
    let target_dir_exists = datastore
        .map(|ds| directory_exists(exec, &target_dir(ds, &request.name)))
        .unwrap_or(false);
    let checks = RemoteChecks {
        iso: iso.clone(),
        target_dir_exists,
    };
    let validation = validate(request, &inventory, &checks);
    for issue in validation.report.issues() {
        debug!(code = issue.kind.code(), "{}", issue.message);
    }

    report_progress(CreatePhase::Plan);
    let vmx = build_vmx(request, iso.path(), validation.mac.as_deref());
    let plan = validation
        .target_dir(&request.name)
        .map(|dir| ExecutionPlan::new(request, &dir, &vmx));

    let mut issues = validation.report.clone();
    let mut result = if issues.has_errors() {
        RunResult::Errors
    } else {
        RunResult::Success
    };

    let mut execution = Execution::default();
    if !options.dry_run && result == RunResult::Success {
        if let Some(plan) = &plan {
            match run_plan(exec, plan, &mut execution, &report_progress) {
                Ok(()) => {
                    if execution.power_on_failed {
                        result = RunResult::Fail;
                    }
                }
                Err(e) => {
                    error!(error = %e, "create failed");
                    issues.push(IssueKind::CreateFailed, CREATE_FAILED_MESSAGE);
                    result = RunResult::Fail;
                }
            }
        }
    }

    report_progress(CreatePhase::Complete);

    Ok(CreateOutcome {
        request: request.clone(),
        dry_run: options.dry_run,
        inventory,
        iso,
        existing_vm_id,
        validation,
        issues,
        vmx,
        plan,
        vm_id: execution.vm_id,
        generated_mac: execution.generated_mac,
        result,
    })
}

/// Check whether `dir` exists on the host.
///
/// Transport failures count as "does not exist".
pub fn directory_exists<E: RemoteExecutor>(exec: &mut E, dir: &str) -> bool {
    match exec.execute(&commands::list_dir(dir)) {
        Ok(output) => output.has_output() && !output.has_errors(),
        Err(e) => {
            warn!(dir, error = %e, "directory check failed, assuming it does not exist");
            false
        }
    }
}

/// Run every plan step in order, stopping at the first transport failure.
///
/// Steps already done are not undone.
fn run_plan<E, F>(
    exec: &mut E,
    plan: &ExecutionPlan,
    execution: &mut Execution,
    report_progress: &F,
) -> Result<()>
where
    E: RemoteExecutor,
    F: Fn(CreatePhase),
{
    let mut phase = None;
    for step in &plan.steps {
        if phase != Some(step.phase()) {
            phase = Some(step.phase());
            report_progress(step.phase());
        }

        let command = step
            .command(execution.vm_id)
            .ok_or_else(|| Error::remote("no VM-id to power on"))?;

        match step {
            PlanStep::CreateDisk { .. } => {
                let output = exec.execute_with_pty(&command)?;
                for line in &output.stdout {
                    debug!(line = %line, "vmkfstools");
                }
            }
            PlanStep::Register { .. } => {
                let output = exec.execute(&command)?;
                let vm_id = output
                    .first_line()
                    .and_then(|l| l.trim().parse::<u32>().ok())
                    .ok_or_else(|| {
                        Error::remote(format!("no VM-id in output of `{}`", command))
                    })?;
                execution.vm_id = Some(vm_id);
            }
            PlanStep::PowerOn => {
                let output = exec.execute(&command)?;
                if output.has_errors() {
                    warn!(stderr = ?output.stderr, "power on failed");
                    execution.power_on_failed = true;
                }
            }
            PlanStep::ReadGeneratedMac { .. } => {
                let output = exec.execute(&command)?;
                let mac = output
                    .first_line()
                    .map(|l| l.trim().trim_matches('"'))
                    .filter(|l| !l.is_empty())
                    .ok_or_else(|| {
                        Error::remote(format!("no MAC address in output of `{}`", command))
                    })?;
                execution.generated_mac = mac.to_string();
            }
            PlanStep::MakeDirectory { .. } | PlanStep::WriteVmxLine { .. } => {
                exec.execute(&command)?;
            }
        }
    }
    Ok(())
}
