//! Request validation.
//!
//! Every check runs, whatever the earlier ones found, so a dry run reports
//! everything wrong with a request at once. Validation itself is pure: the
//! remote lookups it depends on are done beforehand and passed in as
//! [`RemoteChecks`].

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;

use crate::inventory::{Datastore, HostInventory};
use crate::iso::IsoStatus;
use crate::request::{VmRequest, LEAST_USED, NO_NETWORK};

/// Valid vCPU counts.
pub const CPU_RANGE: RangeInclusive<u32> = 1..=128;
/// Valid memory sizes in GiB.
pub const MEM_RANGE: RangeInclusive<u32> = 1..=4080;
/// Valid virtual disk sizes in GiB.
pub const DISK_RANGE: RangeInclusive<u32> = 1..=63488;

/// VMware's MAC address prefix.
pub const VMWARE_OUI: &str = "00:50:56";

static MAC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$").expect("valid MAC regex")
});

/// What kind of problem an [`Issue`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    InvalidMac,
    VmExists,
    CpuOutOfRange,
    MemoryOutOfRange,
    DiskOutOfRange,
    UnknownDatastore,
    UnknownNetwork,
    IsoNotFound,
    DirectoryExists,
    /// A step of the execute phase failed.
    CreateFailed,
}

impl IssueKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            IssueKind::InvalidMac => "invalid-mac",
            IssueKind::VmExists => "vm-exists",
            IssueKind::CpuOutOfRange => "cpu-out-of-range",
            IssueKind::MemoryOutOfRange => "memory-out-of-range",
            IssueKind::DiskOutOfRange => "disk-out-of-range",
            IssueKind::UnknownDatastore => "unknown-datastore",
            IssueKind::UnknownNetwork => "unknown-network",
            IssueKind::IsoNotFound => "iso-not-found",
            IssueKind::DirectoryExists => "directory-exists",
            IssueKind::CreateFailed => "create-failed",
        }
    }
}

/// One problem found with a request or a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Ordered, append-only list of issues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    issues: Vec<Issue>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue.
    pub fn push(&mut self, kind: IssueKind, message: impl Into<String>) {
        self.issues.push(Issue {
            kind,
            message: message.into(),
        });
    }

    /// True once anything has been recorded.
    pub fn has_errors(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Recorded issues, in order.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// True if an issue of `kind` was recorded.
    pub fn contains(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

/// Results of the remote lookups validation depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteChecks {
    /// Outcome of the ISO lookup.
    pub iso: IsoStatus,
    /// True if `<datastore>/<name>` already exists on the host.
    pub target_dir_exists: bool,
}

/// The outcome of validating a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// Everything wrong with the request.
    pub report: ValidationReport,
    /// Datastore selector after "LeastUsed" substitution.
    pub store_selector: String,
    /// The datastore the VM goes on, if the selector matched one.
    pub datastore: Option<Datastore>,
    /// Fully-qualified MAC with colons, if one was given and is valid.
    pub mac: Option<String>,
}

impl Validation {
    /// Directory the VM's files go in, if the datastore resolved.
    pub fn target_dir(&self, name: &str) -> Option<String> {
        self.datastore.as_ref().map(|ds| target_dir(ds, name))
    }
}

/// `<datastore path>/<vm name>`.
pub fn target_dir(datastore: &Datastore, name: &str) -> String {
    format!("{}/{}", datastore.path, name)
}

/// Normalize a MAC address.
///
/// Accepts a full six-octet address or the last three octets of a VMware
/// address, with `:` or `-` separators. Returns the colon-separated full form,
/// or `None` if neither form matches.
pub fn normalize_mac(mac: &str) -> Option<String> {
    if MAC_RE.is_match(mac) {
        Some(mac.replace('-', ":"))
    } else if MAC_RE.is_match(&format!("{}:{}", VMWARE_OUI, mac)) {
        Some(format!("{}:{}", VMWARE_OUI, mac.replace('-', ":")))
    } else {
        None
    }
}

/// Substitute "LeastUsed" (or an empty selector) and look the datastore up.
pub fn resolve_datastore<'a>(
    selector: &str,
    inventory: &'a HostInventory,
) -> (String, Option<&'a Datastore>) {
    let selector = if selector.is_empty() || selector == LEAST_USED {
        inventory
            .least_used_datastore()
            .map(|ds| ds.label.clone())
            .unwrap_or_default()
    } else {
        selector.to_string()
    };
    let datastore = inventory.find_datastore(&selector);
    (selector, datastore)
}

/// Validate a request against the host inventory.
pub fn validate(
    request: &VmRequest,
    inventory: &HostInventory,
    checks: &RemoteChecks,
) -> Validation {
    let mut report = ValidationReport::new();

    let mac = if request.mac.is_empty() {
        None
    } else {
        let normalized = normalize_mac(&request.mac);
        if normalized.is_none() {
            report.push(
                IssueKind::InvalidMac,
                format!("{} Invalid MAC address.", request.mac),
            );
        }
        normalized
    };

    if inventory.find_vm(&request.name).is_some() {
        report.push(
            IssueKind::VmExists,
            format!("VM {} already exists.", request.name),
        );
    }

    if !CPU_RANGE.contains(&request.cpu) {
        report.push(
            IssueKind::CpuOutOfRange,
            format!(
                "{} CPU out of range. [{}-{}].",
                request.cpu,
                CPU_RANGE.start(),
                CPU_RANGE.end()
            ),
        );
    }

    if !MEM_RANGE.contains(&request.mem_gb) {
        report.push(
            IssueKind::MemoryOutOfRange,
            format!(
                "{} GB Memory out of range. [{}-{}].",
                request.mem_gb,
                MEM_RANGE.start(),
                MEM_RANGE.end()
            ),
        );
    }

    if !DISK_RANGE.contains(&request.disk_gb) {
        report.push(
            IssueKind::DiskOutOfRange,
            format!(
                "Virtual Disk size {} GB out of range. [{}-{}].",
                request.disk_gb,
                DISK_RANGE.start(),
                DISK_RANGE.end()
            ),
        );
    }

    let (store_selector, datastore) = resolve_datastore(&request.store, inventory);
    if datastore.is_none() {
        let least_used = inventory
            .least_used_datastore()
            .map(|ds| ds.label.as_str())
            .unwrap_or_default();
        report.push(
            IssueKind::UnknownDatastore,
            format!(
                "Disk Storage {} doesn't exist. Available Disk Stores: {:?}. LeastUsed Disk Store: {}.",
                store_selector,
                inventory.datastore_labels(),
                least_used
            ),
        );
    }

    if request.net != NO_NETWORK && !inventory.has_network(&request.net) {
        report.push(
            IssueKind::UnknownNetwork,
            format!(
                "Virtual NIC {} doesn't exist. Available VM NICs: {:?} or '{}'.",
                request.net, inventory.networks, NO_NETWORK
            ),
        );
    }

    if let IsoStatus::Missing { path } = &checks.iso {
        report.push(
            IssueKind::IsoNotFound,
            format!("ISO {} not found. Use full path to ISO.", path),
        );
    }

    if let Some(ds) = datastore {
        if checks.target_dir_exists {
            report.push(
                IssueKind::DirectoryExists,
                format!("Directory {} already exists.", target_dir(ds, &request.name)),
            );
        }
    }

    Validation {
        report,
        store_selector,
        datastore: datastore.cloned(),
        mac,
    }
}
