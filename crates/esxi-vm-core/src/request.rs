//! The VM the user asked for.

use std::fmt;

/// Datastore selector meaning "whichever store the host listed last".
pub const LEAST_USED: &str = "LeastUsed";

/// Network selector meaning "no virtual NIC".
pub const NO_NETWORK: &str = "None";

/// A requested virtual machine, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRequest {
    /// VM display name, also the directory and file stem on the datastore.
    pub name: String,
    /// Number of virtual CPUs.
    pub cpu: u32,
    /// Memory in GiB.
    pub mem_gb: u32,
    /// Virtual disk size in GiB.
    pub disk_gb: u32,
    /// `vmkfstools -d` disk format (thin, zeroedthick, eagerzeroedthick).
    pub disk_format: String,
    /// SCSI controller device type, recorded in the run log.
    pub virt_dev: String,
    /// "LeastUsed", a mount path, or a datastore label.
    pub store: String,
    /// Portgroup name or "None".
    pub net: String,
    /// Empty/"None", a bare ISO file name, or a full path.
    pub iso: String,
    /// Empty, a full MAC, or the last three octets of a VMware MAC.
    pub mac: String,
    /// Guest OS identifier written to `guestOS`.
    pub guest_os: String,
    /// Extra `key=value` VMX directives.
    pub vmx_options: Vec<String>,
}

impl VmRequest {
    /// True if a virtual NIC was requested.
    pub fn wants_network(&self) -> bool {
        self.net != NO_NETWORK
    }
}

impl fmt::Display for VmRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} vCPU, {} GB memory, {} GB disk)",
            self.name, self.cpu, self.mem_gb, self.disk_gb
        )
    }
}
