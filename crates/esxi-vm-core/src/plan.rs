//! The mutating command sequence for a new VM.
//!
//! An [`ExecutionPlan`] is built for every run, dry or not, so the exact
//! commands can be shown without running them.

use std::fmt;

use crate::commands;
use crate::request::VmRequest;
use crate::vmx::VmxDocument;

/// Phase of a create run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatePhase {
    /// Checking that the host is ESXi.
    HostProbe,
    /// Listing datastores and portgroups.
    InventoryCollect,
    /// Locating the ISO.
    IsoResolve,
    /// Listing registered VMs.
    VmExistenceCheck,
    /// Checking the request.
    Validate,
    /// Building the VMX document and command plan.
    Plan,
    /// Creating the VM directory.
    MakeDirectory,
    /// Writing the VMX file.
    WriteVmx,
    /// Creating the virtual disk.
    CreateDisk,
    /// Registering the VM.
    Register,
    /// Powering the VM on.
    PowerOn,
    /// Reading back the MAC the host assigned.
    ReadGeneratedMac,
    /// Run finished.
    Complete,
}

impl fmt::Display for CreatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CreatePhase::HostProbe => "Probing host",
            CreatePhase::InventoryCollect => "Collecting inventory",
            CreatePhase::IsoResolve => "Resolving ISO",
            CreatePhase::VmExistenceCheck => "Checking existing VMs",
            CreatePhase::Validate => "Validating",
            CreatePhase::Plan => "Planning",
            CreatePhase::MakeDirectory => "Creating directory",
            CreatePhase::WriteVmx => "Writing VMX",
            CreatePhase::CreateDisk => "Creating disk",
            CreatePhase::Register => "Registering VM",
            CreatePhase::PowerOn => "Powering on",
            CreatePhase::ReadGeneratedMac => "Reading MAC",
            CreatePhase::Complete => "Complete",
        };
        f.write_str(s)
    }
}

/// One mutating step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    MakeDirectory { path: String },
    WriteVmxLine { line: String, vmx_path: String },
    CreateDisk {
        size_gb: u32,
        disk_format: String,
        vmdk_path: String,
    },
    Register { vmx_path: String },
    /// Takes the VM-id printed by [`PlanStep::Register`].
    PowerOn,
    ReadGeneratedMac { vmx_path: String },
}

impl PlanStep {
    /// The phase this step belongs to.
    pub fn phase(&self) -> CreatePhase {
        match self {
            PlanStep::MakeDirectory { .. } => CreatePhase::MakeDirectory,
            PlanStep::WriteVmxLine { .. } => CreatePhase::WriteVmx,
            PlanStep::CreateDisk { .. } => CreatePhase::CreateDisk,
            PlanStep::Register { .. } => CreatePhase::Register,
            PlanStep::PowerOn => CreatePhase::PowerOn,
            PlanStep::ReadGeneratedMac { .. } => CreatePhase::ReadGeneratedMac,
        }
    }

    /// The command line for this step.
    ///
    /// `vm_id` is only used by [`PlanStep::PowerOn`]; without it the step has
    /// no command yet.
    pub fn command(&self, vm_id: Option<u32>) -> Option<String> {
        let cmd = match self {
            PlanStep::MakeDirectory { path } => commands::make_dir(path),
            PlanStep::WriteVmxLine { line, vmx_path } => commands::append_line(line, vmx_path),
            PlanStep::CreateDisk {
                size_gb,
                disk_format,
                vmdk_path,
            } => commands::create_disk(*size_gb, disk_format, vmdk_path),
            PlanStep::Register { vmx_path } => commands::register_vm(vmx_path),
            PlanStep::PowerOn => commands::power_on(vm_id?),
            PlanStep::ReadGeneratedMac { vmx_path } => commands::read_generated_mac(vmx_path),
        };
        Some(cmd)
    }
}

/// The ordered steps that create, register and start a VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// `<datastore path>/<name>`.
    pub vm_dir: String,
    /// `<vm_dir>/<name>.vmx`.
    pub vmx_path: String,
    /// `<vm_dir>/<name>.vmdk`.
    pub vmdk_path: String,
    /// Steps in execution order.
    pub steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    /// Plan the creation of `request` in `vm_dir` with the given VMX content.
    pub fn new(request: &VmRequest, vm_dir: &str, vmx: &VmxDocument) -> Self {
        let base = format!("{}/{}", vm_dir, request.name);
        let vmx_path = format!("{}.vmx", base);
        let vmdk_path = format!("{}.vmdk", base);

        let mut steps = vec![PlanStep::MakeDirectory {
            path: vm_dir.to_string(),
        }];
        steps.extend(vmx.directives().iter().map(|d| PlanStep::WriteVmxLine {
            line: d.to_string(),
            vmx_path: vmx_path.clone(),
        }));
        steps.push(PlanStep::CreateDisk {
            size_gb: request.disk_gb,
            disk_format: request.disk_format.clone(),
            vmdk_path: vmdk_path.clone(),
        });
        steps.push(PlanStep::Register {
            vmx_path: vmx_path.clone(),
        });
        steps.push(PlanStep::PowerOn);
        if request.wants_network() {
            steps.push(PlanStep::ReadGeneratedMac {
                vmx_path: vmx_path.clone(),
            });
        }

        Self {
            vm_dir: vm_dir.to_string(),
            vmx_path,
            vmdk_path,
            steps,
        }
    }

    /// Every command line, with `<vmid>` standing in for the VM-id.
    pub fn commands(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|step| {
                step.command(None)
                    .unwrap_or_else(|| commands::power_on("<vmid>"))
            })
            .collect()
    }
}
