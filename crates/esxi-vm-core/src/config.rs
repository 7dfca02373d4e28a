//! Program settings.
//!
//! Settings come from three layers, later ones winning field by field:
//! built-in defaults, the YAML defaults file (`~/.esxi-vm.yml`), and the
//! command line.
//!
//! ```
//! use esxi_vm_core::config::{PartialSettings, Settings};
//!
//! let file = PartialSettings { cpu: Some(4), ..Default::default() };
//! let cli = PartialSettings { host: Some("esxi01".to_string()), ..Default::default() };
//!
//! let settings = Settings::default().layer(file).layer(cli);
//! assert_eq!(settings.cpu, 4);
//! assert_eq!(settings.host, "esxi01");
//! assert_eq!(settings.mem, 4);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::request::{VmRequest, LEAST_USED, NO_NETWORK};
use crate::vmx::split_options;

/// Name of the defaults file in the home directory.
pub const DEFAULTS_FILE_NAME: &str = ".esxi-vm.yml";

/// Name of the run log in the home directory.
pub const LOG_FILE_NAME: &str = "esxi-vm.log";

/// Path of the defaults file.
pub fn default_config_path() -> PathBuf {
    home_dir().join(DEFAULTS_FILE_NAME)
}

/// Path of the run log.
pub fn default_log_path() -> PathBuf {
    home_dir().join(LOG_FILE_NAME)
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_default()
}

/// Fully-resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    #[serde(rename = "LOG")]
    pub log: PathBuf,
    #[serde(rename = "isDryRun")]
    pub dry_run: bool,
    #[serde(rename = "isVerbose")]
    pub verbose: bool,
    #[serde(rename = "isSummary")]
    pub summary: bool,
    #[serde(rename = "HOST")]
    pub host: String,
    #[serde(rename = "USER")]
    pub user: String,
    #[serde(rename = "PASSWORD")]
    pub password: String,
    /// vCPU count.
    #[serde(rename = "CPU")]
    pub cpu: u32,
    /// Memory in GiB.
    #[serde(rename = "MEM")]
    pub mem: u32,
    /// Boot disk size in GiB.
    #[serde(rename = "HDISK")]
    pub hdisk: u32,
    /// thin, zeroedthick or eagerzeroedthick.
    #[serde(rename = "DISKFORMAT")]
    pub disk_format: String,
    #[serde(rename = "VIRTDEV")]
    pub virt_dev: String,
    /// Datastore selector.
    #[serde(rename = "STORE")]
    pub store: String,
    /// Network selector.
    #[serde(rename = "NET")]
    pub net: String,
    /// ISO selector.
    #[serde(rename = "ISO")]
    pub iso: String,
    #[serde(rename = "GUESTOS")]
    pub guest_os: String,
    /// Extra `key=value` VMX directives.
    #[serde(rename = "VMXOPTS")]
    pub vmx_opts: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log: default_log_path(),
            dry_run: false,
            verbose: false,
            summary: false,
            host: "esxi".to_string(),
            user: "root".to_string(),
            password: String::new(),
            cpu: 2,
            mem: 4,
            hdisk: 20,
            disk_format: "thin".to_string(),
            virt_dev: "pvscsi".to_string(),
            store: LEAST_USED.to_string(),
            net: NO_NETWORK.to_string(),
            iso: "None".to_string(),
            guest_os: "centos-64".to_string(),
            vmx_opts: Vec::new(),
        }
    }
}

/// One settings layer: only the fields it sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PartialSettings {
    #[serde(rename = "LOG")]
    pub log: Option<PathBuf>,
    #[serde(rename = "isDryRun")]
    pub dry_run: Option<bool>,
    #[serde(rename = "isVerbose")]
    pub verbose: Option<bool>,
    #[serde(rename = "isSummary")]
    pub summary: Option<bool>,
    #[serde(rename = "HOST")]
    pub host: Option<String>,
    #[serde(rename = "USER")]
    pub user: Option<String>,
    #[serde(rename = "PASSWORD")]
    pub password: Option<String>,
    #[serde(rename = "CPU")]
    pub cpu: Option<u32>,
    #[serde(rename = "MEM")]
    pub mem: Option<u32>,
    #[serde(rename = "HDISK")]
    pub hdisk: Option<u32>,
    #[serde(rename = "DISKFORMAT")]
    pub disk_format: Option<String>,
    #[serde(rename = "VIRTDEV")]
    pub virt_dev: Option<String>,
    #[serde(rename = "STORE")]
    pub store: Option<String>,
    #[serde(rename = "NET")]
    pub net: Option<String>,
    #[serde(rename = "ISO")]
    pub iso: Option<String>,
    #[serde(rename = "GUESTOS")]
    pub guest_os: Option<String>,
    /// A YAML list, or a comma-separated string.
    #[serde(rename = "VMXOPTS", deserialize_with = "deserialize_options")]
    pub vmx_opts: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OptionList {
    List(Vec<String>),
    Text(String),
}

fn deserialize_options<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<OptionList>::deserialize(deserializer)?;
    Ok(raw.map(|list| match list {
        OptionList::List(options) => options,
        OptionList::Text(text) => split_options(&text),
    }))
}

macro_rules! layer_fields {
    ($dst:ident, $src:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $src.$field {
                $dst.$field = value;
            }
        )+
    };
}

impl Settings {
    /// Apply a layer on top of these settings.
    ///
    /// An empty store selector afterwards means "LeastUsed".
    pub fn layer(mut self, layer: PartialSettings) -> Self {
        layer_fields!(
            self, layer, log, dry_run, verbose, summary, host, user, password, cpu, mem, hdisk,
            disk_format, virt_dev, store, net, iso, guest_os, vmx_opts,
        );
        if self.store.is_empty() {
            self.store = LEAST_USED.to_string();
        }
        self
    }

    /// The VM request these settings describe.
    pub fn request(&self, name: &str, mac: &str) -> VmRequest {
        VmRequest {
            name: name.to_string(),
            cpu: self.cpu,
            mem_gb: self.mem,
            disk_gb: self.hdisk,
            disk_format: self.disk_format.clone(),
            virt_dev: self.virt_dev.clone(),
            store: self.store.clone(),
            net: self.net.clone(),
            iso: self.iso.clone(),
            mac: mac.to_string(),
            guest_os: self.guest_os.clone(),
            vmx_options: self.vmx_opts.clone(),
        }
    }
}

/// Load the defaults file. A missing file is not an error.
pub fn load_defaults(path: &Path) -> Result<Option<PartialSettings>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| Error::io(e, path))?;
    if content.trim().is_empty() {
        return Ok(Some(PartialSettings::default()));
    }
    let layer = serde_yaml::from_str(&content)
        .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(layer))
}

/// Write settings as the new defaults file.
pub fn save_defaults(path: &Path, settings: &Settings) -> Result<()> {
    let yaml = serde_yaml::to_string(settings)
        .map_err(|e| Error::config(format!("unable to serialize settings: {}", e)))?;
    fs::write(path, yaml).map_err(|e| Error::io(e, path))
}
