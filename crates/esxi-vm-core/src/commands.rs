//! Remote command lines.
//!
//! These strings are what actually runs on the host through `sh`, and the
//! parsers in [`inventory`](crate::inventory) depend on their exact output.
//! Keep them byte-for-byte stable.

use std::fmt;

/// Prints the `Version:` line of the host's product version.
pub const VERSION_PROBE: &str = "esxcli system version get |grep Version";

/// Mounted VMFS datastores, sorted on the free-space column.
pub const DATASTORE_LIST: &str =
    "esxcli storage filesystem list |grep '/vmfs/volumes/.*true  VMFS' |sort -nk7";

/// Portgroups of every standard vswitch, one comma-separated line per vswitch.
pub const PORTGROUP_LIST: &str =
    "esxcli network vswitch standard list|grep Portgroups|sed 's/^   Portgroups: //g'";

/// Registered VMs, with a header line.
pub const REGISTERED_VMS: &str = "vim-cmd vmsvc/getallvms";

/// Root of every datastore mount.
pub const VOLUMES_ROOT: &str = "/vmfs/volumes/";

/// Find the first file called `file_name` under the datastore mounts.
pub fn find_iso(file_name: &str) -> String {
    format!(
        "find {} -type f -name {} -exec sh -c 'echo $1; kill $PPID' sh {{}} 2>/dev/null \\;",
        VOLUMES_ROOT, file_name
    )
}

/// List a file.
pub fn list_file(path: &str) -> String {
    format!("ls {}", path)
}

/// List a directory entry itself.
pub fn list_dir(path: &str) -> String {
    format!("ls -d {}", path)
}

/// Create a directory.
pub fn make_dir(path: &str) -> String {
    format!("mkdir {}", path)
}

/// Append one line to a file.
pub fn append_line(line: &str, file: &str) -> String {
    format!("echo '{}' >>{}", line, file)
}

/// Create a virtual disk of `size_gb` GiB.
pub fn create_disk(size_gb: u32, disk_format: &str, vmdk_path: &str) -> String {
    format!("vmkfstools -c {}G -d {} {}", size_gb, disk_format, vmdk_path)
}

/// Register a VMX file; prints the new VM-id.
pub fn register_vm(vmx_path: &str) -> String {
    format!("vim-cmd solo/registervm {}", vmx_path)
}

/// Power on a registered VM.
pub fn power_on(vm_id: impl fmt::Display) -> String {
    format!("vim-cmd vmsvc/power.on {}", vm_id)
}

/// Print the (quoted) ethernet0 address the host wrote into a VMX file.
pub fn read_generated_mac(vmx_path: &str) -> String {
    format!(
        "grep -i 'ethernet0.*ddress = ' {} |tail -1|awk '{{print $NF}}'",
        vmx_path
    )
}

/// Commands that change state on the host.
pub fn is_mutating(command: &str) -> bool {
    const PREFIXES: [&str; 5] = [
        "mkdir ",
        "echo ",
        "vmkfstools ",
        "vim-cmd solo/registervm ",
        "vim-cmd vmsvc/power.on ",
    ];
    PREFIXES.iter().any(|p| command.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_iso() {
        assert_eq!(
            find_iso("isoarg"),
            r"find /vmfs/volumes/ -type f -name isoarg -exec sh -c 'echo $1; kill $PPID' sh {} 2>/dev/null \;"
        );
    }

    #[test]
    fn test_append_line() {
        assert_eq!(
            append_line(r#"numvcpus = "2""#, "/vmfs/volumes/ds1/vm/vm.vmx"),
            r#"echo 'numvcpus = "2"' >>/vmfs/volumes/ds1/vm/vm.vmx"#
        );
    }

    #[test]
    fn test_create_disk() {
        assert_eq!(
            create_disk(20, "thin", "/vmfs/volumes/ds1/vm/vm.vmdk"),
            "vmkfstools -c 20G -d thin /vmfs/volumes/ds1/vm/vm.vmdk"
        );
    }

    #[test]
    fn test_read_generated_mac() {
        assert_eq!(
            read_generated_mac("/vmfs/volumes/ds1/vm/vm.vmx"),
            "grep -i 'ethernet0.*ddress = ' /vmfs/volumes/ds1/vm/vm.vmx |tail -1|awk '{print $NF}'"
        );
    }

    #[test]
    fn test_is_mutating() {
        assert!(is_mutating("mkdir /vmfs/volumes/ds1/vm"));
        assert!(is_mutating(&power_on(7)));
        assert!(!is_mutating(REGISTERED_VMS));
        assert!(!is_mutating(&list_dir("/vmfs/volumes/ds1/vm")));
        assert!(!is_mutating(&find_iso("x.iso")));
    }
}
