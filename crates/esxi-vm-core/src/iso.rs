//! ISO lookup on the host.

use tracing::debug;

use crate::commands;
use crate::error::Result;
use crate::remote::RemoteExecutor;

/// Where the requested ISO ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsoStatus {
    /// No ISO requested (empty or "None").
    Disabled,
    /// Requested, but not located or not readable.
    Missing { path: String },
    /// Located and confirmed with `ls`.
    Found { path: String },
}

impl IsoStatus {
    /// True when an ISO was requested.
    pub fn is_requested(&self) -> bool {
        !matches!(self, IsoStatus::Disabled)
    }

    /// True when the ISO exists on the host.
    pub fn is_found(&self) -> bool {
        matches!(self, IsoStatus::Found { .. })
    }

    /// The resolved path, or the selector when it could not be resolved.
    pub fn path(&self) -> Option<&str> {
        match self {
            IsoStatus::Disabled => None,
            IsoStatus::Missing { path } | IsoStatus::Found { path } => Some(path),
        }
    }
}

/// True if `selector` means "no ISO".
pub fn is_disabled(selector: &str) -> bool {
    selector.is_empty() || selector == "None"
}

/// Resolve an ISO selector to a confirmed path on the host.
///
/// A bare file name is searched for under `/vmfs/volumes/` and the first hit
/// is taken. A name with a `/` is used as given. Either way the path is then
/// confirmed with `ls`: found means stdout has content and stderr has none.
pub fn resolve_iso<E: RemoteExecutor>(exec: &mut E, selector: &str) -> Result<IsoStatus> {
    if is_disabled(selector) {
        return Ok(IsoStatus::Disabled);
    }

    let path = if selector.contains('/') {
        selector.to_string()
    } else {
        let output = exec.execute(&commands::find_iso(selector))?;
        match output.stdout.iter().map(|l| l.trim()).find(|l| !l.is_empty()) {
            Some(found) => {
                debug!(iso = found, "found ISO path");
                found.to_string()
            }
            None => {
                return Ok(IsoStatus::Missing {
                    path: selector.to_string(),
                })
            }
        }
    };

    let output = exec.execute(&commands::list_file(&path))?;
    if output.has_output() && !output.has_errors() {
        Ok(IsoStatus::Found { path })
    } else {
        Ok(IsoStatus::Missing { path })
    }
}
