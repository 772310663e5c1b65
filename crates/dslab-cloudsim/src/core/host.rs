//! Physical host and the pool of hosts of a datacenter.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::common::{AllocationError, InvalidRequest, ResourceKind};
use crate::core::pe::ProcessingElement;
use crate::core::provisioner::{PeProvisioner, ResourceProvisioner};
use crate::core::vm::{VmKey, VmSpec};

/// Host description used to build a [`Host`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HostSpec {
    pub id: u32,
    pub pes: u32,
    pub pe_mips: f64,
    pub memory: u64,
    pub storage: u64,
    pub bandwidth: u64,
}

impl HostSpec {
    pub fn new(
        id: u32,
        pes: u32,
        pe_mips: f64,
        memory: u64,
        storage: u64,
        bandwidth: u64,
    ) -> Result<Self, InvalidRequest> {
        if pes == 0 {
            return Err(InvalidRequest::ZeroCores {
                entity: "host".to_string(),
                id,
            });
        }
        if !(pe_mips > 0.) {
            return Err(InvalidRequest::NonPositiveMips {
                entity: "host".to_string(),
                id,
            });
        }
        for (resource, capacity) in [
            (ResourceKind::Memory, memory),
            (ResourceKind::Storage, storage),
            (ResourceKind::Bandwidth, bandwidth),
        ] {
            if capacity == 0 {
                return Err(InvalidRequest::ZeroCapacity { host_id: id, resource });
            }
        }
        Ok(Self {
            id,
            pes,
            pe_mips,
            memory,
            storage,
            bandwidth,
        })
    }
}

/// Physical machine: a fixed set of PEs plus memory, bandwidth and storage capacities.
#[derive(Clone, Debug)]
pub struct Host {
    pub id: u32,
    pes: PeProvisioner,
    memory: ResourceProvisioner,
    bandwidth: ResourceProvisioner,
    storage: ResourceProvisioner,
}

impl Host {
    pub fn new(spec: &HostSpec) -> Self {
        let pes = PeProvisioner::uniform(spec.id, spec.pes, spec.pe_mips);
        Self::from_parts(spec.id, pes, spec.memory, spec.bandwidth, spec.storage)
    }

    /// Creates host with an explicit (possibly heterogeneous) list of PEs with unique ids.
    pub fn with_pes(
        id: u32,
        pes: Vec<ProcessingElement>,
        memory: u64,
        bandwidth: u64,
        storage: u64,
    ) -> Result<Self, InvalidRequest> {
        let pes = PeProvisioner::new(id, pes)?;
        Ok(Self::from_parts(id, pes, memory, bandwidth, storage))
    }

    fn from_parts(id: u32, pes: PeProvisioner, memory: u64, bandwidth: u64, storage: u64) -> Self {
        Self {
            id,
            pes,
            memory: ResourceProvisioner::new(id, ResourceKind::Memory, memory),
            bandwidth: ResourceProvisioner::new(id, ResourceKind::Bandwidth, bandwidth),
            storage: ResourceProvisioner::new(id, ResourceKind::Storage, storage),
        }
    }

    /// Checks all resource dimensions, reporting the first one that does not fit.
    pub fn can_allocate(&self, vm: &VmSpec) -> Result<(), AllocationError> {
        self.pes.can_allocate(vm.cores, vm.mips)?;
        self.memory.can_allocate(vm.memory)?;
        self.bandwidth.can_allocate(vm.bandwidth)?;
        self.storage.can_allocate(vm.size)?;
        Ok(())
    }

    /// Reserves resources for the VM in all dimensions or in none of them.
    pub fn allocate(&mut self, vm: &VmSpec) -> Result<Vec<u32>, AllocationError> {
        let key = vm.key();
        if let Some(allocation) = self.pes.allocation(key) {
            return Ok(allocation.pe_ids.clone());
        }
        self.can_allocate(vm)?;
        let pe_ids = self.pes.allocate(key, vm.cores, vm.mips)?;
        self.memory.allocate(key, vm.memory)?;
        self.bandwidth.allocate(key, vm.bandwidth)?;
        self.storage.allocate(key, vm.size)?;
        Ok(pe_ids)
    }

    /// Releases everything reserved for the VM. Returns false if nothing was reserved.
    pub fn release(&mut self, vm: VmKey) -> bool {
        let released = self.pes.release(vm).is_some();
        self.memory.release(vm);
        self.bandwidth.release(vm);
        self.storage.release(vm);
        released
    }

    /// Returns the rates of PEs dedicated to the VM, one entry per PE.
    pub fn allocated_mips(&self, vm: VmKey) -> Vec<f64> {
        match self.pes.allocation(vm) {
            Some(allocation) => vec![allocation.mips; allocation.pe_ids.len()],
            None => Vec::new(),
        }
    }

    pub fn allocated_pes(&self, vm: VmKey) -> Option<&[u32]> {
        self.pes.allocation(vm).map(|allocation| allocation.pe_ids.as_slice())
    }

    pub fn pes(&self) -> &[ProcessingElement] {
        self.pes.pes()
    }

    pub fn pe_count(&self) -> u32 {
        self.pes.pe_count()
    }

    pub fn free_pe_count(&self) -> u32 {
        self.pes.free_pe_count()
    }

    pub fn memory(&self) -> &ResourceProvisioner {
        &self.memory
    }

    pub fn bandwidth(&self) -> &ResourceProvisioner {
        &self.bandwidth
    }

    pub fn storage(&self) -> &ResourceProvisioner {
        &self.storage
    }
}

/// Hosts of a datacenter indexed by id. Iteration order is ascending host id.
#[derive(Clone, Debug, Default)]
pub struct HostPool {
    hosts: BTreeMap<u32, Host>,
}

impl HostPool {
    pub fn new() -> Self {
        Self { hosts: BTreeMap::new() }
    }

    pub fn add_host(&mut self, host: Host) {
        self.hosts.insert(host.id, host);
    }

    pub fn get_hosts_list(&self) -> Vec<u32> {
        self.hosts.keys().cloned().collect()
    }

    pub fn get_host_count(&self) -> u32 {
        self.hosts.len() as u32
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.hosts.get(&host_id)
    }

    pub fn host_mut(&mut self, host_id: u32) -> Option<&mut Host> {
        self.hosts.get_mut(&host_id)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }
}

impl FromIterator<Host> for HostPool {
    fn from_iter<I: IntoIterator<Item = Host>>(iter: I) -> Self {
        let mut pool = HostPool::new();
        for host in iter {
            pool.add_host(host);
        }
        pool
    }
}
