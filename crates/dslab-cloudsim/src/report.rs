//! Per-cloudlet results of a simulation run.

use std::fs::File;

use serde::Serialize;

use dslab_core::Id;

use crate::core::cloudlet::Cloudlet;

/// Single row of cloudlet results.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CloudletRecord {
    pub cloudlet_id: u32,
    pub status: String,
    pub datacenter_id: Option<Id>,
    pub host_id: Option<u32>,
    pub vm_id: Option<u32>,
    pub cpu_time: Option<f64>,
    pub start_time: Option<f64>,
    pub finish_time: Option<f64>,
}

impl From<&Cloudlet> for CloudletRecord {
    fn from(cloudlet: &Cloudlet) -> Self {
        Self {
            cloudlet_id: cloudlet.id,
            status: cloudlet.status().to_string(),
            datacenter_id: cloudlet.datacenter_id(),
            host_id: cloudlet.host_id(),
            vm_id: cloudlet.vm_id(),
            cpu_time: cloudlet.actual_cpu_time(),
            start_time: cloudlet.exec_start_time(),
            finish_time: cloudlet.finish_time(),
        }
    }
}

fn format_opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn format_time(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

/// Formats cloudlets as a text table, times are rounded to two decimals.
pub fn cloudlet_table(cloudlets: &[Cloudlet]) -> String {
    let mut out = format!(
        "{:>11} {:>9} {:>10} {:>5} {:>5} {:>10} {:>10} {:>11}\n",
        "Cloudlet ID", "STATUS", "Datacenter", "Host", "VM", "Time", "Start Time", "Finish Time"
    );
    for record in cloudlets.iter().map(CloudletRecord::from) {
        out.push_str(&format!(
            "{:>11} {:>9} {:>10} {:>5} {:>5} {:>10} {:>10} {:>11}\n",
            record.cloudlet_id,
            record.status,
            format_opt(record.datacenter_id),
            format_opt(record.host_id),
            format_opt(record.vm_id),
            format_time(record.cpu_time),
            format_time(record.start_time),
            format_time(record.finish_time),
        ));
    }
    out
}

/// Saves cloudlet records to CSV file.
pub fn save_csv(path: &str, cloudlets: &[Cloudlet]) -> Result<(), csv::Error> {
    let file = File::create(path)?;
    let mut wtr = csv::Writer::from_writer(file);
    for cloudlet in cloudlets {
        wtr.serialize(CloudletRecord::from(cloudlet))?;
    }
    wtr.flush()?;
    Ok(())
}
