//! VMX document construction.
//!
//! This module builds the `key = "value"` directives of a new VM's VMX file
//! and merges user-supplied `key=value` overrides into them.

use std::fmt;

use crate::request::VmRequest;

/// `config.version` and `virtualHW.version` of generated VMs.
pub const HW_VERSION: &str = "8";

/// Number of PCIe root ports generated (pciBridge4 through pciBridge7).
const PCIE_ROOT_PORTS: [u32; 4] = [4, 5, 6, 7];

/// One line of a VMX file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    key: String,
    separator: String,
    value: String,
}

impl Directive {
    /// A `key = "value"` directive.
    pub fn quoted(key: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            key: key.into(),
            separator: " = ".to_string(),
            value: format!("\"{}\"", value),
        }
    }

    /// A `key = value` directive with the value written as given.
    pub fn literal(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            separator: " = ".to_string(),
            value: value.into(),
        }
    }

    /// The directive key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value with surrounding double quotes removed.
    pub fn value(&self) -> &str {
        let v = self.value.as_str();
        if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
            &v[1..v.len() - 1]
        } else {
            v
        }
    }

    /// True if `key` names this directive, ignoring ASCII case.
    pub fn matches(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }

    /// Replace the value in place.
    ///
    /// The new line is the old key text, including the blank before `=`,
    /// followed by ` = ` and the new value exactly as supplied. Replacing
    /// `numvcpus = "9"` with `"7"` therefore gives `numvcpus  = "7"`.
    fn replace_value(&mut self, value: &str) {
        let pad: String = self
            .separator
            .chars()
            .take_while(|c| c.is_whitespace())
            .collect();
        self.separator = format!("{} = ", pad);
        self.value = value.to_string();
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.key, self.separator, self.value)
    }
}

/// An ordered VMX file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmxDocument {
    directives: Vec<Directive>,
}

impl VmxDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a quoted directive.
    pub fn push(&mut self, key: &str, value: impl fmt::Display) {
        self.directives.push(Directive::quoted(key, value));
    }

    /// Value of the first directive named `key`, ignoring ASCII case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.directives
            .iter()
            .find(|d| d.matches(key))
            .map(Directive::value)
    }

    /// Directives in file order.
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Rendered lines in file order.
    pub fn lines(&self) -> Vec<String> {
        self.directives.iter().map(ToString::to_string).collect()
    }

    /// Number of directives.
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    /// True if there are no directives.
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Apply one override.
    ///
    /// The first directive whose key matches (ignoring case) gets the new
    /// value. Otherwise a new `key = value` line is appended, provided both
    /// sides are non-empty.
    pub fn apply_override(&mut self, key: &str, value: &str) {
        if let Some(d) = self.directives.iter_mut().find(|d| d.matches(key)) {
            d.replace_value(value);
        } else if !key.is_empty() && !value.is_empty() {
            self.directives.push(Directive::literal(key, value));
        }
    }

    /// Apply `key=value` override tokens in order. Malformed tokens are skipped.
    pub fn apply_options<S: AsRef<str>>(&mut self, options: &[S]) {
        for option in options {
            if let Some((key, value)) = parse_option(option.as_ref()) {
                self.apply_override(key, value);
            }
        }
    }
}

impl fmt::Display for VmxDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.directives {
            writeln!(f, "{}", d)?;
        }
        Ok(())
    }
}

/// Split a `key=value` token. Exactly one `=` is required; both sides are trimmed.
pub fn parse_option(option: &str) -> Option<(&str, &str)> {
    let mut parts = option.split('=');
    let key = parts.next()?;
    let value = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((key.trim(), value.trim()))
}

/// Split a comma-separated option list as given on the command line.
pub fn split_options(list: &str) -> Vec<String> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Build the VMX document for a validated request.
///
/// `iso_path` attaches the ISO as a CD-ROM image; without it an empty,
/// disconnected CD-ROM is emitted. `mac` switches the NIC (if any) to a
/// static address. Request overrides are applied last.
pub fn build_vmx(request: &VmRequest, iso_path: Option<&str>, mac: Option<&str>) -> VmxDocument {
    let mut vmx = VmxDocument::new();

    vmx.push("config.version", HW_VERSION);
    vmx.push("virtualHW.version", HW_VERSION);
    vmx.push("vmci0.present", "TRUE");
    vmx.push("displayName", &request.name);
    vmx.push("floppy0.present", "FALSE");
    vmx.push("numvcpus", request.cpu);
    vmx.push("scsi0.present", "TRUE");
    vmx.push("scsi0.sharedBus", "none");
    vmx.push("scsi0.virtualDev", "pvscsi");
    vmx.push("memsize", u64::from(request.mem_gb) * 1024);
    vmx.push("scsi0:0.present", "TRUE");
    vmx.push("scsi0:0.fileName", format!("{}.vmdk", request.name));
    vmx.push("scsi0:0.deviceType", "scsi-hardDisk");

    vmx.push("ide1:0.present", "TRUE");
    match iso_path {
        None => {
            vmx.push("ide1:0.fileName", "emptyBackingString");
            vmx.push("ide1:0.deviceType", "atapi-cdrom");
            vmx.push("ide1:0.startConnected", "FALSE");
            vmx.push("ide1:0.clientDevice", "TRUE");
        }
        Some(path) => {
            vmx.push("ide1:0.fileName", path);
            vmx.push("ide1:0.deviceType", "cdrom-image");
        }
    }

    vmx.push("pciBridge0.present", "TRUE");
    for port in PCIE_ROOT_PORTS {
        vmx.push(&format!("pciBridge{}.present", port), "TRUE");
        vmx.push(&format!("pciBridge{}.virtualDev", port), "pcieRootPort");
        vmx.push(&format!("pciBridge{}.functions", port), "8");
    }

    vmx.push("guestOS", &request.guest_os);

    if request.wants_network() {
        vmx.push("ethernet0.virtualDev", "vmxnet3");
        vmx.push("ethernet0.present", "TRUE");
        vmx.push("ethernet0.networkName", &request.net);
        match mac {
            None => vmx.push("ethernet0.addressType", "generated"),
            Some(mac) => {
                vmx.push("ethernet0.addressType", "static");
                vmx.push("ethernet0.address", mac);
            }
        }
    }

    vmx.apply_options(&request.vmx_options);
    vmx
}
