//! Run log and human summary.
//!
//! Every run appends one JSON object to the log file, whatever its result.
//! The summary and final line are what the user sees on stdout.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::create::{CreateOutcome, RunResult};
use crate::error::{Error, Result};
use crate::iso::IsoStatus;

/// Local time with microseconds, e.g. `2019-11-03T14:02:51.123456`.
pub fn timestamp(time: DateTime<Local>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn title_bool(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

/// One line of the run log. Field order is the key order on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunLog {
    pub datetime: String,
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "CPU")]
    pub cpu: String,
    #[serde(rename = "Mem")]
    pub mem: String,
    #[serde(rename = "Hdisk")]
    pub hdisk: String,
    #[serde(rename = "DiskFormat")]
    pub disk_format: String,
    #[serde(rename = "Virtual Device")]
    pub virt_dev: String,
    #[serde(rename = "Store")]
    pub store: String,
    #[serde(rename = "Store Used")]
    pub store_used: String,
    #[serde(rename = "Network")]
    pub network: String,
    #[serde(rename = "ISO")]
    pub iso: String,
    #[serde(rename = "ISO used")]
    pub iso_used: String,
    #[serde(rename = "Guest OS")]
    pub guest_os: String,
    #[serde(rename = "MAC")]
    pub mac: String,
    #[serde(rename = "MAC Used")]
    pub mac_used: String,
    #[serde(rename = "Dry Run")]
    pub dry_run: String,
    #[serde(rename = "Verbose")]
    pub verbose: String,
    #[serde(rename = "Error Message", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "Result")]
    pub result: String,
    #[serde(rename = "Completion Time")]
    pub completion_time: String,
}

impl RunLog {
    /// Build the log line for a finished run that started at `started`.
    pub fn new(
        outcome: &CreateOutcome,
        host: &str,
        verbose: bool,
        started: DateTime<Local>,
    ) -> Self {
        let request = &outcome.request;
        let error_message = if outcome.issues.has_errors() {
            Some(outcome.issues.to_string())
        } else {
            None
        };
        Self {
            datetime: timestamp(started),
            host: host.to_string(),
            name: request.name.clone(),
            cpu: request.cpu.to_string(),
            mem: request.mem_gb.to_string(),
            hdisk: request.disk_gb.to_string(),
            disk_format: request.disk_format.clone(),
            virt_dev: request.virt_dev.clone(),
            store: outcome.validation.store_selector.clone(),
            store_used: outcome.store_used().to_string(),
            network: request.net.clone(),
            iso: request.iso.clone(),
            iso_used: match &outcome.iso {
                IsoStatus::Disabled => String::new(),
                iso => iso.path().unwrap_or(&request.iso).to_string(),
            },
            guest_os: request.guest_os.clone(),
            mac: request.mac.clone(),
            mac_used: outcome.generated_mac.clone(),
            dry_run: title_bool(outcome.dry_run),
            verbose: title_bool(verbose),
            error_message,
            result: outcome.result.to_string(),
            completion_time: timestamp(Local::now()),
        }
    }

    /// The log line as JSON, without a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::config(format!("unable to serialize run log: {}", e)))
    }
}

/// Append `entry` to the log file at `path`, creating it if needed.
pub fn append_log(path: &Path, entry: &RunLog) -> Result<()> {
    let line = entry.to_json()?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(e, path))?;
    writeln!(file, "{}", line).map_err(|e| Error::io(e, path))
}

/// The human-readable summary of a run.
pub struct Summary<'a> {
    outcome: &'a CreateOutcome,
    host: &'a str,
    verbose: bool,
}

impl<'a> Summary<'a> {
    pub fn new(outcome: &'a CreateOutcome, host: &'a str, verbose: bool) -> Self {
        Self {
            outcome,
            host,
            verbose,
        }
    }
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = self.outcome;
        let request = &outcome.request;

        if outcome.dry_run {
            writeln!(f, "Dry Run summary:")?;
        } else {
            writeln!(f, "Create VM Success:")?;
        }
        if self.verbose {
            writeln!(f, "ESXi Host: {}", self.host)?;
        }
        writeln!(f, "VM NAME: {}", request.name)?;
        writeln!(f, "vCPU: {}", request.cpu)?;
        writeln!(f, "Memory: {}GB", request.mem_gb)?;
        writeln!(f, "VM Disk: {}GB", request.disk_gb)?;
        if self.verbose {
            writeln!(f, "Format: {}", request.disk_format)?;
        }
        writeln!(f, "DS Store: {}", outcome.store_label())?;
        writeln!(f, "Network: {}", request.net)?;
        if let Some(iso) = outcome.iso.path() {
            writeln!(f, "ISO: {}", iso)?;
        }
        if self.verbose {
            writeln!(f, "Guest OS: {}", request.guest_os)?;
            writeln!(f, "MAC: {}", outcome.generated_mac)?;
        }
        Ok(())
    }
}

/// Last line printed for a run, if any.
///
/// Dry runs say whether they passed; a real run prints the MAC the host
/// assigned. A real run that failed validation prints nothing here.
pub fn final_line(outcome: &CreateOutcome) -> Option<String> {
    match (outcome.result, outcome.dry_run) {
        (RunResult::Errors, true) => Some("Dry Run: Failed.".to_string()),
        (RunResult::Errors, false) => None,
        (_, true) => Some("Dry Run: Success.".to_string()),
        (_, false) => Some(outcome.generated_mac.clone()),
    }
}
