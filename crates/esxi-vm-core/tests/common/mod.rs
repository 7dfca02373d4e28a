//! Shared test helpers: a scripted ESXi host.

#![allow(dead_code)]

use esxi_vm_core::commands;
use esxi_vm_core::{CommandOutput, Error, RemoteExecutor, Result, VmRequest};

pub const FILESYSTEM_LIST: &str = include_str!("../fixtures/filesystem_list.txt");
pub const PORTGROUPS: &str = include_str!("../fixtures/portgroups.txt");
pub const GETALLVMS: &str = include_str!("../fixtures/getallvms.txt");

pub const ISO_NAME: &str = "isoarg";
pub const ISO_FOUND_PATH: &str = "/vmfs/volumes/test/ISOs/isoarg";
pub const LEAST_USED_PATH: &str = "/vmfs/volumes/5c2125df-7d95f6bd-1be1-001517d9a462";
pub const SPLUNK_PATH: &str = "/vmfs/volumes/5d99349b-7d6bc489-9769-d050995bdb9e";
pub const GENERATED_MAC: &str = "00:0c:29:aa:bb:cc";

enum Reply {
    Output(CommandOutput),
    Fail(String),
}

struct Rule {
    command: String,
    prefix: bool,
    reply: Reply,
}

/// A fake host that answers commands from a script.
///
/// Exact rules are tried before prefix rules; among rules of the same kind
/// the one added last wins. Unknown commands print nothing.
pub struct ScriptedHost {
    rules: Vec<Rule>,
    /// Every command issued, in order.
    pub issued: Vec<String>,
    /// Commands issued through `execute_with_pty`.
    pub pty_issued: Vec<String>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            issued: Vec::new(),
            pty_issued: Vec::new(),
        }
    }

    /// A healthy host with three datastores, five vswitches, three VMs and
    /// one ISO, that accepts every mutating command.
    pub fn esxi() -> Self {
        Self::new()
            .on(commands::VERSION_PROBE, "Version: 6.5.0")
            .on(commands::DATASTORE_LIST, FILESYSTEM_LIST)
            .on(commands::PORTGROUP_LIST, PORTGROUPS)
            .on(&commands::find_iso(ISO_NAME), ISO_FOUND_PATH)
            .on(&commands::list_file(ISO_FOUND_PATH), ISO_FOUND_PATH)
            .on(commands::REGISTERED_VMS, GETALLVMS)
            .on_prefix("ls -d ", "")
            .on_prefix("vim-cmd solo/registervm ", "42")
            .on_prefix("vim-cmd vmsvc/power.on ", "Powering on VM:")
            .on_prefix("grep -i 'ethernet0", &format!("\"{}\"", GENERATED_MAC))
    }

    pub fn on(self, command: &str, stdout: &str) -> Self {
        self.rule(command, false, Reply::Output(CommandOutput::from_text(stdout, "")))
    }

    pub fn on_prefix(self, prefix: &str, stdout: &str) -> Self {
        self.rule(prefix, true, Reply::Output(CommandOutput::from_text(stdout, "")))
    }

    pub fn on_prefix_stderr(self, prefix: &str, stderr: &str) -> Self {
        self.rule(prefix, true, Reply::Output(CommandOutput::from_text("", stderr)))
    }

    pub fn fail(self, command: &str, message: &str) -> Self {
        self.rule(command, false, Reply::Fail(message.to_string()))
    }

    pub fn fail_prefix(self, prefix: &str, message: &str) -> Self {
        self.rule(prefix, true, Reply::Fail(message.to_string()))
    }

    fn rule(mut self, command: &str, prefix: bool, reply: Reply) -> Self {
        self.rules.push(Rule {
            command: command.to_string(),
            prefix,
            reply,
        });
        self
    }

    /// Issued commands that would have changed the host.
    pub fn mutating(&self) -> Vec<&str> {
        self.issued
            .iter()
            .map(String::as_str)
            .filter(|c| commands::is_mutating(c))
            .collect()
    }

    fn reply(&self, command: &str) -> Result<CommandOutput> {
        let exact = self
            .rules
            .iter()
            .rev()
            .find(|r| !r.prefix && r.command == command);
        let rule = exact.or_else(|| {
            self.rules
                .iter()
                .rev()
                .find(|r| r.prefix && command.starts_with(&r.command))
        });
        match rule.map(|r| &r.reply) {
            Some(Reply::Output(output)) => Ok(output.clone()),
            Some(Reply::Fail(message)) => Err(Error::ssh(message.clone())),
            None => Ok(CommandOutput::default()),
        }
    }
}

impl RemoteExecutor for ScriptedHost {
    fn execute(&mut self, command: &str) -> Result<CommandOutput> {
        self.issued.push(command.to_string());
        self.reply(command)
    }

    fn execute_with_pty(&mut self, command: &str) -> Result<CommandOutput> {
        self.pty_issued.push(command.to_string());
        self.execute(command)
    }
}

/// The request used across the end-to-end tests.
pub fn request() -> VmRequest {
    VmRequest {
        name: "namearg".to_string(),
        cpu: 9,
        mem_gb: 99,
        disk_gb: 999,
        disk_format: "thin".to_string(),
        virt_dev: "pvscsi".to_string(),
        store: String::new(),
        net: "VM Network".to_string(),
        iso: ISO_NAME.to_string(),
        mac: "12:34:56".to_string(),
        guest_os: "guestosarg".to_string(),
        vmx_options: vec!["vmxoptone=1".to_string()],
    }
}
