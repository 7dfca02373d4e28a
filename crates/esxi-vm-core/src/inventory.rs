//! Host inventory: datastores, portgroups and registered VMs.
//!
//! The parsers are pure functions over the text printed by `esxcli` and
//! `vim-cmd`; [`HostInventory::collect`] runs the queries and feeds them.

use tracing::debug;

use crate::commands;
use crate::error::{Error, Result};
use crate::remote::RemoteExecutor;

/// A mounted VMFS datastore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datastore {
    /// Mount path (e.g., "/vmfs/volumes/5d99349b-7d6bc489-9769-d050995bdb9e").
    pub path: String,
    /// Volume label (e.g., "datastore1").
    pub label: String,
}

/// A VM registered on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredVm {
    /// Host-assigned VM-id.
    pub id: u32,
    /// Display name (first whitespace-delimited token only).
    pub name: String,
}

/// What the host has to offer, rebuilt on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInventory {
    /// Datastores in host-reported order.
    pub datastores: Vec<Datastore>,
    /// Portgroup names in host-reported order.
    pub networks: Vec<String>,
    /// Registered VMs in host-reported order.
    pub existing_vms: Vec<RegisteredVm>,
}

impl HostInventory {
    /// Probe the host and collect datastores and networks.
    ///
    /// `existing_vms` is left empty; fill it with [`list_registered_vms`] once
    /// the ISO has been resolved.
    pub fn collect<E: RemoteExecutor>(exec: &mut E, host: &str, user: &str) -> Result<Self> {
        probe_host(exec, host, user)?;
        Self::query(exec, host)
    }

    /// Collect datastores and networks from an already-probed host.
    pub fn query<E: RemoteExecutor>(exec: &mut E, host: &str) -> Result<Self> {
        let output = exec.execute(commands::DATASTORE_LIST)?;
        let datastores = parse_datastores(&output.stdout);
        if datastores.is_empty() {
            return Err(Error::inventory(format!(
                "no VMFS datastores reported by {}",
                host
            )));
        }
        debug!(count = datastores.len(), "datastores");

        let output = exec.execute(commands::PORTGROUP_LIST)?;
        let networks = parse_portgroups(&output.stdout);
        debug!(count = networks.len(), "portgroups");

        Ok(Self {
            datastores,
            networks,
            existing_vms: Vec::new(),
        })
    }

    /// The datastore "LeastUsed" stands for: the last one the host listed.
    ///
    /// This trusts the `sort -nk7` in the listing command to put the store
    /// with the most free space last. It does not compare sizes itself.
    pub fn least_used_datastore(&self) -> Option<&Datastore> {
        self.datastores.last()
    }

    /// Find a datastore by mount path or label. Later entries win.
    pub fn find_datastore(&self, selector: &str) -> Option<&Datastore> {
        self.datastores
            .iter()
            .rev()
            .find(|ds| ds.path == selector || ds.label == selector)
    }

    /// All datastore labels, in host order.
    pub fn datastore_labels(&self) -> Vec<&str> {
        self.datastores.iter().map(|ds| ds.label.as_str()).collect()
    }

    /// True if `name` is a known portgroup.
    pub fn has_network(&self, name: &str) -> bool {
        self.networks.iter().any(|n| n == name)
    }

    /// VM-id of a registered VM called `name`. The last match wins.
    pub fn find_vm(&self, name: &str) -> Option<u32> {
        self.existing_vms
            .iter()
            .rev()
            .find(|vm| vm.name == name)
            .map(|vm| vm.id)
    }
}

/// Check that the host answers like ESXi.
pub fn probe_host<E: RemoteExecutor>(exec: &mut E, host: &str, user: &str) -> Result<()> {
    let output = exec.execute(commands::VERSION_PROBE)?;
    if is_esxi_version(&output.stdout) {
        Ok(())
    } else {
        Err(Error::not_esxi_host(host, user))
    }
}

/// True if the version probe printed a `Version` line.
pub fn is_esxi_version(lines: &[String]) -> bool {
    lines.iter().any(|l| l.trim_start().starts_with("Version"))
}

/// Run the registered-VM listing and parse it.
pub fn list_registered_vms<E: RemoteExecutor>(exec: &mut E) -> Result<Vec<RegisteredVm>> {
    let output = exec.execute(commands::REGISTERED_VMS)?;
    Ok(parse_registered_vms(&output.stdout))
}

/// Parse `esxcli storage filesystem list` lines.
///
/// Token 0 is the mount path, token 1 the label. Lines with fewer than two
/// tokens are skipped.
pub fn parse_datastores<S: AsRef<str>>(lines: &[S]) -> Vec<Datastore> {
    lines
        .iter()
        .filter_map(|line| {
            let mut tokens = line.as_ref().split_whitespace();
            let path = tokens.next()?;
            let label = tokens.next()?;
            Some(Datastore {
                path: path.to_string(),
                label: label.to_string(),
            })
        })
        .collect()
}

/// Parse portgroup lines: each is a comma-separated list of names.
pub fn parse_portgroups<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .flat_map(|line| line.as_ref().split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `vim-cmd vmsvc/getallvms` lines.
///
/// Rows start with a numeric VM-id; the header and annotation continuation
/// lines do not, and are skipped.
pub fn parse_registered_vms<S: AsRef<str>>(lines: &[S]) -> Vec<RegisteredVm> {
    lines
        .iter()
        .filter_map(|line| {
            let mut tokens = line.as_ref().split_whitespace();
            let id = tokens.next()?.parse::<u32>().ok()?;
            let name = tokens.next()?;
            Some(RegisteredVm {
                id,
                name: name.to_string(),
            })
        })
        .collect()
}
