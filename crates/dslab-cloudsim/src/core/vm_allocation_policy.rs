//! Virtual machine allocation policies.

use std::collections::BTreeMap;

use crate::core::common::{AllocationError, InvalidRequest};
use crate::core::config::parse_config_value;
use crate::core::host::HostPool;
use crate::core::vm::{VmKey, VmSpec};

/// Trait for implementation of VM allocation policies.
///
/// The policy decides on which host of the pool a VM is placed, reserves the host resources for it and keeps the
/// VM to host mapping. VMs are identified by [`VmKey`], so VM ids of different owners never clash.
/// Hosts are owned by the datacenter and passed to every call.
pub trait VmAllocationPolicy {
    /// Places the VM on the given host, or on a host chosen by the policy if `host_id` is `None`.
    fn allocate_host_for_vm(
        &mut self,
        vm: &VmSpec,
        host_id: Option<u32>,
        hosts: &mut HostPool,
    ) -> Result<u32, AllocationError>;

    /// Releases resources of the VM. Does nothing if the VM is not allocated.
    fn deallocate_host_for_vm(&mut self, vm: VmKey, hosts: &mut HostPool);

    /// Returns the host currently running the VM.
    fn get_host(&self, vm: VmKey) -> Option<u32>;
}

pub fn vm_allocation_policy_resolver(config_str: &str) -> Result<Box<dyn VmAllocationPolicy>, InvalidRequest> {
    let (policy_name, _options) = parse_config_value(config_str);
    match policy_name.as_str() {
        "SpaceShared" => Ok(Box::new(SpaceSharedVmAllocationPolicy::new())),
        _ => Err(InvalidRequest::UnknownPolicy {
            name: config_str.to_string(),
        }),
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Space-shared policy: each VM gets dedicated PEs on the first host (by id) that can accommodate it.
#[derive(Default)]
pub struct SpaceSharedVmAllocationPolicy {
    vm_hosts: BTreeMap<VmKey, u32>,
}

impl SpaceSharedVmAllocationPolicy {
    pub fn new() -> Self {
        Self {
            vm_hosts: BTreeMap::new(),
        }
    }

    fn select_host(&self, vm: &VmSpec, hosts: &HostPool) -> Option<u32> {
        hosts.hosts().find(|host| host.can_allocate(vm).is_ok()).map(|host| host.id)
    }
}

impl VmAllocationPolicy for SpaceSharedVmAllocationPolicy {
    fn allocate_host_for_vm(
        &mut self,
        vm: &VmSpec,
        host_id: Option<u32>,
        hosts: &mut HostPool,
    ) -> Result<u32, AllocationError> {
        if let Some(&current) = self.vm_hosts.get(&vm.key()) {
            return Err(AllocationError::AlreadyAllocated {
                vm_id: vm.id,
                host_id: current,
            });
        }
        let target = match host_id {
            Some(id) => id,
            None => self
                .select_host(vm, hosts)
                .ok_or(AllocationError::NoSuitableHost { vm_id: vm.id })?,
        };
        let host = hosts
            .host_mut(target)
            .ok_or(AllocationError::HostNotFound { host_id: target })?;
        host.allocate(vm)?;
        self.vm_hosts.insert(vm.key(), target);
        Ok(target)
    }

    fn deallocate_host_for_vm(&mut self, vm: VmKey, hosts: &mut HostPool) {
        if let Some(host_id) = self.vm_hosts.remove(&vm) {
            if let Some(host) = hosts.host_mut(host_id) {
                host.release(vm);
            }
        }
    }

    fn get_host(&self, vm: VmKey) -> Option<u32> {
        self.vm_hosts.get(&vm).copied()
    }
}
