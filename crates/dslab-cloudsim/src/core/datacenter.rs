//! Component owning hosts and running VMs placed on them.

use std::collections::BTreeMap;

use dslab_core::cast;
use dslab_core::event::EventId;
use dslab_core::{log_debug, log_trace, log_warn};
use dslab_core::{Event, EventHandler, Id, SimulationContext};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_scheduler::cloudlet_scheduler_resolver;
use crate::core::common::AllocationError;
use crate::core::events::cloudlet::{CloudletCancelRequest, CloudletReturned, CloudletSubmit, VmProcessingUpdate};
use crate::core::events::vm::{VmCreateFailed, VmCreateRequest, VmCreated, VmDestroyRequest, VmDestroyed};
use crate::core::host::{Host, HostPool};
use crate::core::vm::{VirtualMachine, VmKey, VmSpec};
use crate::core::vm_allocation_policy::VmAllocationPolicy;

/// Datacenter processes VM creation and cloudlet submission requests coming from brokers.
///
/// VM placement is delegated to the configured VM allocation policy, cloudlet execution to the cloudlet scheduler
/// of each VM. VMs are identified by owner and VM id, so several brokers can share one datacenter.
/// For every VM with running cloudlets the datacenter keeps exactly one pending processing update
/// event scheduled at the next predicted cloudlet completion.
pub struct Datacenter {
    pub id: Id,
    hosts: HostPool,
    vm_allocation_policy: Box<dyn VmAllocationPolicy>,
    vms: BTreeMap<VmKey, VirtualMachine>,
    pending_updates: BTreeMap<VmKey, EventId>,
    message_delay: f64,
    ctx: SimulationContext,
}

impl Datacenter {
    pub fn new(
        hosts: HostPool,
        vm_allocation_policy: Box<dyn VmAllocationPolicy>,
        message_delay: f64,
        ctx: SimulationContext,
    ) -> Self {
        Self {
            id: ctx.id(),
            hosts,
            vm_allocation_policy,
            vms: BTreeMap::new(),
            pending_updates: BTreeMap::new(),
            message_delay,
            ctx,
        }
    }

    pub fn hosts(&self) -> &HostPool {
        &self.hosts
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.hosts.host(host_id)
    }

    /// Returns the host running the VM.
    pub fn vm_host(&self, vm: VmKey) -> Option<u32> {
        self.vm_allocation_policy.get_host(vm)
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    pub fn free_pes(&self, host_id: u32) -> Option<u32> {
        self.hosts.host(host_id).map(|host| host.free_pe_count())
    }

    /// Returns status of a cloudlet currently held by the VM scheduler.
    pub fn cloudlet_status(&self, vm: VmKey, cloudlet_id: u32) -> Option<CloudletStatus> {
        self.vms.get(&vm)?.scheduler.cloudlet_status(cloudlet_id)
    }

    fn return_cloudlet(&mut self, cloudlet: Cloudlet) {
        log_debug!(
            self.ctx,
            "cloudlet {} of vm {:?} returned with status {}",
            cloudlet.id,
            cloudlet.vm_id(),
            cloudlet.status()
        );
        let owner = cloudlet.owner;
        self.ctx.emit(CloudletReturned { cloudlet }, owner, self.message_delay);
    }

    fn on_vm_create_request(&mut self, vm: VmSpec, requester: Id) {
        let vm_id = vm.id;
        let result = cloudlet_scheduler_resolver(&vm.scheduler, vm.cores)
            .map_err(|reason| AllocationError::Rejected { vm_id, reason })
            .and_then(|scheduler| {
                self.vm_allocation_policy
                    .allocate_host_for_vm(&vm, None, &mut self.hosts)
                    .map(|host_id| (host_id, scheduler))
            });
        match result {
            Ok((host_id, scheduler)) => {
                log_debug!(self.ctx, "vm {} allocated on host {}", vm.key(), host_id);
                self.vms.insert(vm.key(), VirtualMachine::new(vm, host_id, scheduler));
                self.ctx.emit(
                    VmCreated {
                        vm_id,
                        host_id,
                        datacenter_id: self.id,
                    },
                    requester,
                    self.message_delay,
                );
            }
            Err(reason) => {
                log_debug!(self.ctx, "failed to create vm {}: {}", vm.key(), reason);
                self.ctx.emit(
                    VmCreateFailed {
                        vm_id,
                        datacenter_id: self.id,
                        reason,
                    },
                    requester,
                    self.message_delay,
                );
            }
        }
    }

    fn on_cloudlet_submit(&mut self, mut cloudlet: Cloudlet) {
        let time = self.ctx.time();
        let owner = cloudlet.owner;
        let vm = match cloudlet
            .vm_id()
            .map(|vm_id| VmKey::new(owner, vm_id))
            .filter(|vm| self.vms.contains_key(vm))
        {
            Some(vm) => vm,
            None => {
                log_warn!(self.ctx, "cloudlet {} submitted to unknown vm {:?}", cloudlet.id, cloudlet.vm_id());
                cloudlet.set_status(CloudletStatus::Failed);
                self.return_cloudlet(cloudlet);
                return;
            }
        };
        if let Some(placed) = self.vms.get_mut(&vm) {
            if cloudlet.status() == CloudletStatus::Created {
                cloudlet.set_placement(self.id, placed.host_id);
            }
            log_trace!(self.ctx, "cloudlet {} submitted to vm {}", cloudlet.id, vm);
            if let Err(e) = placed.scheduler.cloudlet_submit(cloudlet, time) {
                log_warn!(self.ctx, "{}", e);
            }
        }
        self.update_vm_processing(vm);
    }

    /// Advances cloudlet execution on the VM, returns finished cloudlets and reschedules the next update.
    fn update_vm_processing(&mut self, vm: VmKey) {
        let time = self.ctx.time();
        let placed = match self.vms.get_mut(&vm) {
            Some(placed) => placed,
            None => return,
        };
        let mips_share = self
            .hosts
            .host(placed.host_id)
            .map(|host| host.allocated_mips(vm))
            .unwrap_or_default();
        let next_completion = placed.scheduler.update_vm_processing(time, &mips_share);
        let finished = placed.scheduler.cloudlet_finished();

        if let Some(event_id) = self.pending_updates.remove(&vm) {
            self.ctx.cancel_event(event_id);
        }
        if let Some(next_time) = next_completion {
            let event_id = self
                .ctx
                .emit_self(VmProcessingUpdate { vm }, (next_time - time).max(0.));
            self.pending_updates.insert(vm, event_id);
        }
        for cloudlet in finished {
            self.return_cloudlet(cloudlet);
        }
    }

    fn on_vm_processing_update(&mut self, vm: VmKey) {
        self.pending_updates.remove(&vm);
        self.update_vm_processing(vm);
    }

    fn on_cloudlet_cancel_request(&mut self, cloudlet_id: u32, vm: VmKey) {
        self.update_vm_processing(vm);
        let time = self.ctx.time();
        let canceled = self
            .vms
            .get_mut(&vm)
            .and_then(|placed| placed.scheduler.cloudlet_cancel(cloudlet_id, time));
        match canceled {
            Some(cloudlet) => {
                self.return_cloudlet(cloudlet);
                self.update_vm_processing(vm);
            }
            None => log_trace!(
                self.ctx,
                "cloudlet {} is not active on vm {}, nothing to cancel",
                cloudlet_id,
                vm
            ),
        }
    }

    fn on_vm_destroy_request(&mut self, vm: VmKey, requester: Id) {
        self.update_vm_processing(vm);
        if let Some(event_id) = self.pending_updates.remove(&vm) {
            self.ctx.cancel_event(event_id);
        }
        if let Some(mut placed) = self.vms.remove(&vm) {
            let time = self.ctx.time();
            for cloudlet in placed.scheduler.cancel_all(time) {
                self.return_cloudlet(cloudlet);
            }
            log_debug!(self.ctx, "vm {} destroyed on host {}", vm, placed.host_id);
        }
        self.vm_allocation_policy.deallocate_host_for_vm(vm, &mut self.hosts);
        self.ctx.emit(
            VmDestroyed {
                vm_id: vm.vm_id,
                datacenter_id: self.id,
            },
            requester,
            self.message_delay,
        );
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        let src = event.src;
        cast!(match event.data {
            VmCreateRequest { vm } => {
                self.on_vm_create_request(vm, src);
            }
            CloudletSubmit { cloudlet } => {
                self.on_cloudlet_submit(cloudlet);
            }
            VmProcessingUpdate { vm } => {
                self.on_vm_processing_update(vm);
            }
            CloudletCancelRequest { cloudlet_id, vm_id } => {
                self.on_cloudlet_cancel_request(cloudlet_id, VmKey::new(src, vm_id));
            }
            VmDestroyRequest { vm_id } => {
                self.on_vm_destroy_request(VmKey::new(src, vm_id), src);
            }
        })
    }
}
