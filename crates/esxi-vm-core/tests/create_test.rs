//! End-to-end create runs against a scripted host.

mod common;

use std::sync::{Arc, Mutex};

use common::{
    request, ScriptedHost, GENERATED_MAC, ISO_FOUND_PATH, LEAST_USED_PATH, SPLUNK_PATH,
};
use esxi_vm_core::{
    create_vm, CreateOptions, CreatePhase, Error, IssueKind, ProgressCallback, RunResult,
    CREATE_FAILED_MESSAGE,
};

fn dry() -> CreateOptions {
    CreateOptions::new("hostarg", "userarg", true)
}

fn real() -> CreateOptions {
    CreateOptions::new("hostarg", "userarg", false)
}

#[test]
fn test_dry_run_end_to_end() {
    let mut host = ScriptedHost::esxi();
    let outcome = create_vm(&mut host, &request(), &dry(), None).expect("dry run");

    assert!(!outcome.issues.has_errors(), "unexpected issues: {}", outcome.issues);
    assert_eq!(outcome.result, RunResult::Success);
    assert_eq!(outcome.exit_code(), 0);

    assert_eq!(outcome.vmx.get("memsize"), Some("101376"));
    assert_eq!(outcome.vmx.get("numvcpus"), Some("9"));
    assert_eq!(outcome.vmx.get("ide1:0.fileName"), Some(ISO_FOUND_PATH));
    assert_eq!(outcome.vmx.get("ethernet0.networkName"), Some("VM Network"));
    assert_eq!(outcome.vmx.get("ethernet0.addressType"), Some("static"));
    assert_eq!(outcome.vmx.get("ethernet0.address"), Some("00:50:56:12:34:56"));
    assert_eq!(outcome.vmx.get("vmxoptone"), Some("1"));

    assert_eq!(outcome.store_label(), "VM-FreeNAS-ds");
    assert_eq!(outcome.store_used(), LEAST_USED_PATH);
    assert_eq!(outcome.validation.store_selector, "VM-FreeNAS-ds");

    assert!(host.mutating().is_empty(), "dry run mutated: {:?}", host.mutating());
    assert!(host
        .issued
        .contains(&format!("ls -d {}/namearg", LEAST_USED_PATH)));
    assert_eq!(outcome.vm_id, None);
    assert!(outcome.generated_mac.is_empty());
}

#[test]
fn test_dry_run_still_plans_every_command() {
    let mut host = ScriptedHost::esxi();
    let outcome = create_vm(&mut host, &request(), &dry(), None).unwrap();

    let plan = outcome.plan.expect("plan");
    let vmx_path = format!("{}/namearg/namearg.vmx", LEAST_USED_PATH);
    assert_eq!(plan.vmx_path, vmx_path);

    let cmds = plan.commands();
    assert_eq!(cmds[0], format!("mkdir {}/namearg", LEAST_USED_PATH));
    assert!(cmds.contains(&format!(
        "vmkfstools -c 999G -d thin {}/namearg/namearg.vmdk",
        LEAST_USED_PATH
    )));
    assert!(cmds.contains(&"vim-cmd vmsvc/power.on <vmid>".to_string()));
    assert_eq!(cmds.len(), 1 + outcome.vmx.len() + 4);
}

#[test]
fn test_dry_run_phases() {
    let phases = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&phases);
    let callback: ProgressCallback =
        Box::new(move |phase: CreatePhase| seen.lock().unwrap().push(phase));

    let mut host = ScriptedHost::esxi();
    create_vm(&mut host, &request(), &dry(), Some(callback)).unwrap();

    assert_eq!(
        *phases.lock().unwrap(),
        vec![
            CreatePhase::HostProbe,
            CreatePhase::InventoryCollect,
            CreatePhase::IsoResolve,
            CreatePhase::VmExistenceCheck,
            CreatePhase::Validate,
            CreatePhase::Plan,
            CreatePhase::Complete,
        ]
    );
}

#[test]
fn test_unknown_network_is_the_only_issue() {
    let mut r = request();
    r.net = "Nope".to_string();

    let mut host = ScriptedHost::esxi();
    let outcome = create_vm(&mut host, &r, &dry(), None).unwrap();

    let issues = outcome.issues.issues();
    assert_eq!(issues.len(), 1, "{}", outcome.issues);
    assert_eq!(issues[0].kind, IssueKind::UnknownNetwork);
    assert_eq!(
        issues[0].message,
        "Virtual NIC Nope doesn't exist. Available VM NICs: [\"Mgmt Temp PG 1\", \
         \"Mgmt Temp PG 0\", \"VM Network\", \"Management Network\", \"IP over IB PG 1\", \
         \"Management Net IB 0\", \"VM Network 1\", \"IP over IB PG 2\", \
         \"Management IB Net 1\", \"IPoIB Net 0\", \"Management IB Net 0\"] or 'None'."
    );
    assert_eq!(outcome.result, RunResult::Errors);
    assert_eq!(outcome.exit_code(), 1);
}

#[test]
fn test_existing_vm_name_is_reported() {
    let mut r = request();
    r.name = "othervm".to_string();

    let mut host = ScriptedHost::esxi();
    let outcome = create_vm(&mut host, &r, &dry(), None).unwrap();

    assert_eq!(outcome.existing_vm_id, Some(10));
    assert!(outcome.issues.contains(IssueKind::VmExists));
    assert_eq!(outcome.exit_code(), 1);
}

#[test]
fn test_existing_directory_is_reported() {
    let dir = format!("{}/namearg", LEAST_USED_PATH);
    let mut host = ScriptedHost::esxi().on(&format!("ls -d {}", dir), &dir);
    let outcome = create_vm(&mut host, &request(), &dry(), None).unwrap();

    assert!(outcome.issues.contains(IssueKind::DirectoryExists));
    assert_eq!(outcome.result, RunResult::Errors);
}

#[test]
fn test_directory_check_failure_is_ignored() {
    let mut host = ScriptedHost::esxi().fail_prefix("ls -d ", "channel timeout");
    let outcome = create_vm(&mut host, &request(), &dry(), None).unwrap();

    assert!(!outcome.issues.has_errors(), "{}", outcome.issues);
    assert_eq!(outcome.result, RunResult::Success);
}

#[test]
fn test_not_esxi_is_fatal() {
    let mut host = ScriptedHost::esxi().on(esxi_vm_core::commands::VERSION_PROBE, "Linux");
    let err = create_vm(&mut host, &request(), &dry(), None).unwrap_err();

    assert!(matches!(err, Error::NotEsxiHost { .. }));
    assert_eq!(
        err.to_string(),
        "Unable to determine if this is a ESXi Host: hostarg, username: userarg"
    );
    assert_eq!(host.issued.len(), 1);
}

#[test]
fn test_inventory_transport_failure_is_fatal() {
    let mut host =
        ScriptedHost::esxi().fail(esxi_vm_core::commands::DATASTORE_LIST, "connection reset");
    let err = create_vm(&mut host, &request(), &dry(), None).unwrap_err();
    assert!(matches!(err, Error::Ssh { .. }));
}

#[test]
fn test_no_datastores_is_fatal() {
    let mut host = ScriptedHost::esxi().on(esxi_vm_core::commands::DATASTORE_LIST, "");
    let err = create_vm(&mut host, &request(), &dry(), None).unwrap_err();
    assert!(matches!(err, Error::Inventory { .. }));
}

#[test]
fn test_validation_errors_block_execution() {
    let mut r = request();
    r.cpu = 129;

    let mut host = ScriptedHost::esxi();
    let outcome = create_vm(&mut host, &r, &real(), None).unwrap();

    assert!(outcome.issues.contains(IssueKind::CpuOutOfRange));
    assert_eq!(outcome.result, RunResult::Errors);
    assert!(host.mutating().is_empty());
}

#[test]
fn test_create_runs_plan_in_order() {
    let mut host = ScriptedHost::esxi();
    let outcome = create_vm(&mut host, &request(), &real(), None).expect("create");

    assert_eq!(outcome.result, RunResult::Success);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.vm_id, Some(42));
    assert_eq!(outcome.generated_mac, GENERATED_MAC);

    let dir = format!("{}/namearg", LEAST_USED_PATH);
    let mutating = host.mutating();
    assert_eq!(mutating.len(), 1 + outcome.vmx.len() + 3);
    assert_eq!(mutating[0], format!("mkdir {}", dir));
    assert_eq!(
        mutating[1],
        format!("echo 'config.version = \"8\"' >>{}/namearg.vmx", dir)
    );
    assert_eq!(
        mutating[outcome.vmx.len() + 1],
        format!("vmkfstools -c 999G -d thin {}/namearg.vmdk", dir)
    );
    assert_eq!(
        mutating[outcome.vmx.len() + 2],
        format!("vim-cmd solo/registervm {}/namearg.vmx", dir)
    );
    assert_eq!(mutating[outcome.vmx.len() + 3], "vim-cmd vmsvc/power.on 42");

    assert_eq!(
        host.pty_issued,
        vec![format!("vmkfstools -c 999G -d thin {}/namearg.vmdk", dir)]
    );
    assert!(host
        .issued
        .last()
        .is_some_and(|c| c.starts_with("grep -i 'ethernet0.*ddress = ' ")));
}

#[test]
fn test_create_phases_include_execute_steps() {
    let phases = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&phases);
    let callback: ProgressCallback =
        Box::new(move |phase: CreatePhase| seen.lock().unwrap().push(phase));

    let mut host = ScriptedHost::esxi();
    create_vm(&mut host, &request(), &real(), Some(callback)).unwrap();

    let phases = phases.lock().unwrap();
    let tail: Vec<_> = phases.iter().skip(6).copied().collect();
    assert_eq!(
        tail,
        vec![
            CreatePhase::MakeDirectory,
            CreatePhase::WriteVmx,
            CreatePhase::CreateDisk,
            CreatePhase::Register,
            CreatePhase::PowerOn,
            CreatePhase::ReadGeneratedMac,
            CreatePhase::Complete,
        ]
    );
}

#[test]
fn test_power_on_error_is_fail_but_exit_zero() {
    let mut host =
        ScriptedHost::esxi().on_prefix_stderr("vim-cmd vmsvc/power.on ", "Power on failed");
    let outcome = create_vm(&mut host, &request(), &real(), None).unwrap();

    assert_eq!(outcome.result, RunResult::Fail);
    assert_eq!(outcome.exit_code(), 0);
    assert!(!outcome.issues.has_errors());
    assert_eq!(outcome.generated_mac, GENERATED_MAC);
}

#[test]
fn test_register_without_vm_id_aborts() {
    let mut host = ScriptedHost::esxi().on_prefix("vim-cmd solo/registervm ", "");
    let outcome = create_vm(&mut host, &request(), &real(), None).unwrap();

    assert_eq!(outcome.result, RunResult::Fail);
    assert_eq!(outcome.exit_code(), 0);
    assert!(outcome.issues.contains(IssueKind::CreateFailed));
    assert_eq!(outcome.issues.to_string(), CREATE_FAILED_MESSAGE);
    assert!(!host.issued.iter().any(|c| c.starts_with("vim-cmd vmsvc/power.on")));
    assert_eq!(outcome.vm_id, None);
}

#[test]
fn test_disk_failure_aborts_remaining_steps() {
    let mut host = ScriptedHost::esxi().fail_prefix("vmkfstools ", "channel closed");
    let outcome = create_vm(&mut host, &request(), &real(), None).unwrap();

    assert_eq!(outcome.result, RunResult::Fail);
    assert!(outcome.issues.contains(IssueKind::CreateFailed));
    assert!(!host.issued.iter().any(|c| c.starts_with("vim-cmd solo/registervm")));
    // mkdir and the VMX lines stay on the host.
    assert!(host.issued.iter().any(|c| c.starts_with("mkdir ")));
}

#[test]
fn test_no_network_skips_mac_readback() {
    let mut r = request();
    r.net = "None".to_string();
    r.mac = String::new();

    let mut host = ScriptedHost::esxi();
    let outcome = create_vm(&mut host, &r, &real(), None).unwrap();

    assert_eq!(outcome.result, RunResult::Success);
    assert!(outcome.generated_mac.is_empty());
    assert!(!host.issued.iter().any(|c| c.starts_with("grep ")));
    assert_eq!(outcome.vmx.get("ethernet0.present"), None);
}

#[test]
fn test_store_by_path() {
    let mut r = request();
    r.store = SPLUNK_PATH.to_string();

    let mut host = ScriptedHost::esxi();
    let outcome = create_vm(&mut host, &r, &dry(), None).unwrap();

    assert_eq!(outcome.store_label(), "VM-Splunk-ds");
    assert_eq!(outcome.store_used(), SPLUNK_PATH);
}
