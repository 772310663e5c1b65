//! Simulation configuration.

use serde::{Deserialize, Serialize};

use dslab_core::Id;

use crate::core::cloudlet::Cloudlet;
use crate::core::common::InvalidRequest;
use crate::core::host::HostSpec;
use crate::core::vm::VmSpec;

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationConfig {
    pub message_delay: Option<f64>,
    pub allocation_retry_period: Option<f64>,
    pub vm_allocation_timeout: Option<f64>,
    pub datacenters: Option<Vec<DatacenterConfig>>,
    pub vms: Option<Vec<VmConfig>>,
    pub cloudlets: Option<Vec<CloudletConfig>>,
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Number of processing elements.
    pub pes: u32,
    /// Rate of each processing element in MIPS.
    pub pe_mips: f64,
    /// Memory capacity in MB.
    pub memory: u64,
    /// Storage capacity in MB.
    pub storage: u64,
    /// Network bandwidth in Mbit/s.
    pub bandwidth: u64,
    /// Number of such hosts.
    pub count: Option<u32>,
}

/// Holds configuration of a datacenter.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct DatacenterConfig {
    /// Datacenter name, also used as simulation component name.
    pub name: String,
    /// VM allocation policy, `SpaceShared` if not set.
    pub vm_allocation_policy: Option<String>,
    /// Hosts of the datacenter, ids are assigned in the listed order.
    pub hosts: Vec<HostConfig>,
}

/// Holds configuration of a single VM or a set of identical VMs.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct VmConfig {
    /// Rate of each VM core in MIPS.
    pub mips: f64,
    /// Number of VM cores.
    pub pes: u32,
    /// Memory in MB.
    pub memory: u64,
    /// Bandwidth in Mbit/s.
    pub bandwidth: u64,
    /// Image size in MB.
    pub size: u64,
    /// Cloudlet scheduler, `SpaceShared` if not set.
    pub scheduler: Option<String>,
    /// Number of such VMs.
    pub count: Option<u32>,
}

/// Holds configuration of a single cloudlet or a set of identical cloudlets.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct CloudletConfig {
    /// Length in MI.
    pub length: u64,
    /// Number of required cores.
    pub pes: u32,
    /// Input file size in MB.
    pub file_size: u64,
    /// Output size in MB.
    pub output_size: u64,
    /// Number of such cloudlets.
    pub count: Option<u32>,
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Message delay in seconds for communications between broker and datacenters.
    pub message_delay: f64,
    /// Period in seconds for waiting before retrying failed VM creation.
    pub allocation_retry_period: f64,
    /// Timeout in seconds after which unallocated VM becomes failed.
    pub vm_allocation_timeout: f64,
    /// Configurations of datacenters.
    pub datacenters: Vec<DatacenterConfig>,
    /// Configurations of VMs submitted by the broker.
    pub vms: Vec<VmConfig>,
    /// Configurations of cloudlets submitted by the broker.
    pub cloudlets: Vec<CloudletConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::from_raw(RawSimulationConfig {
            message_delay: None,
            allocation_retry_period: None,
            vm_allocation_timeout: None,
            datacenters: None,
            vms: None,
            cloudlets: None,
        })
    }
}

impl SimulationConfig {
    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Self {
        let raw: RawSimulationConfig = serde_yaml::from_str(
            &std::fs::read_to_string(file_name).unwrap_or_else(|_| panic!("Can't read file {}", file_name)),
        )
        .unwrap_or_else(|e| panic!("Can't parse YAML from file {}: {}", file_name, e));
        Self::from_raw(raw)
    }

    /// Parses simulation config from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let raw: RawSimulationConfig = serde_yaml::from_str(yaml)?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawSimulationConfig) -> Self {
        Self {
            message_delay: raw.message_delay.unwrap_or(0.),
            allocation_retry_period: raw.allocation_retry_period.unwrap_or(1.),
            vm_allocation_timeout: raw.vm_allocation_timeout.unwrap_or(50.),
            datacenters: raw.datacenters.unwrap_or_default(),
            vms: raw.vms.unwrap_or_default(),
            cloudlets: raw.cloudlets.unwrap_or_default(),
        }
    }
}

impl DatacenterConfig {
    pub fn policy(&self) -> &str {
        self.vm_allocation_policy.as_deref().unwrap_or("SpaceShared")
    }

    /// Expands host configs into validated host specs with sequential ids.
    pub fn host_specs(&self) -> Result<Vec<HostSpec>, InvalidRequest> {
        let mut specs = Vec::new();
        for host in &self.hosts {
            for _ in 0..host.count.unwrap_or(1) {
                let id = specs.len() as u32;
                specs.push(HostSpec::new(
                    id,
                    host.pes,
                    host.pe_mips,
                    host.memory,
                    host.storage,
                    host.bandwidth,
                )?);
            }
        }
        Ok(specs)
    }
}

/// Expands VM configs into validated VM specs with sequential ids owned by `owner`.
pub fn vm_specs(configs: &[VmConfig], owner: Id) -> Result<Vec<VmSpec>, InvalidRequest> {
    let mut specs = Vec::new();
    for vm in configs {
        for _ in 0..vm.count.unwrap_or(1) {
            let id = specs.len() as u32;
            let spec = VmSpec::new(id, owner, vm.mips, vm.pes, vm.memory, vm.bandwidth, vm.size)?;
            specs.push(match &vm.scheduler {
                Some(scheduler) => spec.with_scheduler(scheduler)?,
                None => spec,
            });
        }
    }
    Ok(specs)
}

/// Expands cloudlet configs into validated cloudlets with sequential ids owned by `owner`.
pub fn cloudlets(configs: &[CloudletConfig], owner: Id) -> Result<Vec<Cloudlet>, InvalidRequest> {
    let mut result = Vec::new();
    for cloudlet in configs {
        for _ in 0..cloudlet.count.unwrap_or(1) {
            let id = result.len() as u32;
            result.push(Cloudlet::new(
                id,
                owner,
                cloudlet.length,
                cloudlet.pes,
                cloudlet.file_size,
                cloudlet.output_size,
            )?);
        }
    }
    Ok(result)
}

/// Parses config value string, which consists of two parts - name and options.
/// Example: SpaceShared[option=value] parts are name SpaceShared and options string "option=value".
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.split_once('[') {
        Some((l, r)) => (l.to_string(), Some(r.to_string().replace(']', ""))),
        None => (config_str.to_string(), None),
    }
}
