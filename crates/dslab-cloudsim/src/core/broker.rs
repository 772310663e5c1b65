//! Component submitting VMs and cloudlets on behalf of a user.

use std::collections::{BTreeMap, HashMap};

use dslab_core::cast;
use dslab_core::{log_debug, log_info, log_warn};
use dslab_core::{Event, EventHandler, Id, SimulationContext};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::common::AllocationError;
use crate::core::config::SimulationConfig;
use crate::core::events::cloudlet::{CloudletCancelRequest, CloudletReturned, CloudletSubmit};
use crate::core::events::vm::{VmCreateFailed, VmCreateRequest, VmCreateRetry, VmCreated, VmDestroyRequest, VmDestroyed};
use crate::core::vm::{VmSpec, VmStatus};

#[derive(Clone, Debug)]
struct VmRequestState {
    spec: VmSpec,
    status: VmStatus,
    /// Index of the datacenter the last creation request was sent to.
    datacenter_idx: usize,
    datacenter_id: Option<Id>,
    host_id: Option<u32>,
    submission_time: f64,
}

/// Broker creates VMs in datacenters, submits cloudlets to the created VMs and collects the results.
///
/// VM creation is attempted in datacenters in the order they were set. If no datacenter can accommodate the VM,
/// the attempt is repeated after `allocation_retry_period` until `vm_allocation_timeout` expires.
/// A VM rejected for a reason other than lack of capacity fails at once.
/// Cloudlets are submitted once every VM is either created or failed: a cloudlet bound to a VM goes to that VM,
/// the others are spread over the created VMs in round-robin order.
/// After all submitted cloudlets are returned, the created VMs are destroyed.
pub struct Broker {
    pub id: Id,
    datacenters: Vec<Id>,
    vms: BTreeMap<u32, VmRequestState>,
    vm_order: Vec<u32>,
    cloudlets: Vec<Cloudlet>,
    bindings: HashMap<u32, u32>,
    cloudlet_vms: BTreeMap<u32, u32>,
    cloudlets_submitted: bool,
    submitted_count: usize,
    returned_count: usize,
    received: Vec<Cloudlet>,
    message_delay: f64,
    allocation_retry_period: f64,
    vm_allocation_timeout: f64,
    ctx: SimulationContext,
}

impl Broker {
    pub fn new(ctx: SimulationContext, sim_config: &SimulationConfig) -> Self {
        Self {
            id: ctx.id(),
            datacenters: Vec::new(),
            vms: BTreeMap::new(),
            vm_order: Vec::new(),
            cloudlets: Vec::new(),
            bindings: HashMap::new(),
            cloudlet_vms: BTreeMap::new(),
            cloudlets_submitted: false,
            submitted_count: 0,
            returned_count: 0,
            received: Vec::new(),
            message_delay: sim_config.message_delay,
            allocation_retry_period: sim_config.allocation_retry_period,
            vm_allocation_timeout: sim_config.vm_allocation_timeout,
            ctx,
        }
    }

    /// Sets datacenters used for VM creation, in the order of preference.
    pub fn set_datacenters(&mut self, datacenters: Vec<Id>) {
        self.datacenters = datacenters;
    }

    pub fn datacenters(&self) -> &[Id] {
        &self.datacenters
    }

    /// Adds VMs to create. The broker becomes their owner.
    pub fn submit_vm_list(&mut self, vms: Vec<VmSpec>) {
        for mut spec in vms {
            spec.owner = self.id;
            self.vm_order.push(spec.id);
            self.vms.insert(
                spec.id,
                VmRequestState {
                    spec,
                    status: VmStatus::Requested,
                    datacenter_idx: 0,
                    datacenter_id: None,
                    host_id: None,
                    submission_time: 0.,
                },
            );
        }
    }

    pub fn submit_cloudlet_list(&mut self, cloudlets: Vec<Cloudlet>) {
        let owner = self.id;
        self.cloudlets.extend(cloudlets.into_iter().map(|mut cloudlet| {
            cloudlet.owner = owner;
            cloudlet
        }));
    }

    /// Makes the cloudlet run on the specified VM instead of the round-robin choice.
    pub fn bind_cloudlet_to_vm(&mut self, cloudlet_id: u32, vm_id: u32) {
        self.bindings.insert(cloudlet_id, vm_id);
    }

    /// Sends creation requests for all submitted VMs.
    pub fn start(&mut self) {
        log_info!(
            self.ctx,
            "starting with {} vms and {} cloudlets",
            self.vm_order.len(),
            self.cloudlets.len()
        );
        if self.datacenters.is_empty() {
            log_warn!(self.ctx, "no datacenters available");
            for state in self.vms.values_mut() {
                state.status = VmStatus::FailedToAllocate;
            }
        }
        let time = self.ctx.time();
        if let Some(&datacenter) = self.datacenters.first() {
            for vm_id in self.vm_order.clone() {
                if let Some(state) = self.vms.get_mut(&vm_id) {
                    state.submission_time = time;
                    state.datacenter_idx = 0;
                    self.ctx.emit(
                        VmCreateRequest {
                            vm: state.spec.clone(),
                        },
                        datacenter,
                        self.message_delay,
                    );
                }
            }
        }
        self.check_vms_resolved();
    }

    /// Requests cancellation of a submitted cloudlet.
    pub fn cancel_cloudlet(&mut self, cloudlet_id: u32) {
        if let Some(&vm_id) = self.cloudlet_vms.get(&cloudlet_id) {
            if let Some(datacenter) = self.vms.get(&vm_id).and_then(|state| state.datacenter_id) {
                self.ctx
                    .emit(CloudletCancelRequest { cloudlet_id, vm_id }, datacenter, self.message_delay);
            }
        }
    }

    /// Requests destruction of a created VM.
    pub fn destroy_vm(&mut self, vm_id: u32) {
        if let Some(state) = self.vms.get(&vm_id) {
            if state.status == VmStatus::Created {
                if let Some(datacenter) = state.datacenter_id {
                    self.ctx.emit(VmDestroyRequest { vm_id }, datacenter, self.message_delay);
                }
            }
        }
    }

    /// Returns cloudlets received back from datacenters (or failed before submission), in arrival order.
    pub fn cloudlet_received_list(&self) -> &[Cloudlet] {
        &self.received
    }

    pub fn vm_status(&self, vm_id: u32) -> Option<VmStatus> {
        self.vms.get(&vm_id).map(|state| state.status)
    }

    /// Returns host of a created VM.
    pub fn vm_host(&self, vm_id: u32) -> Option<u32> {
        self.vms.get(&vm_id).and_then(|state| state.host_id)
    }

    /// Returns IDs of VMs which were created, in submission order.
    pub fn created_vms(&self) -> Vec<u32> {
        self.vms_with_status(&[VmStatus::Created, VmStatus::Destroyed])
    }

    pub fn failed_vms(&self) -> Vec<u32> {
        self.vms_with_status(&[VmStatus::FailedToAllocate])
    }

    fn vms_with_status(&self, statuses: &[VmStatus]) -> Vec<u32> {
        self.vm_order
            .iter()
            .filter(|vm_id| {
                self.vms
                    .get(vm_id)
                    .map_or(false, |state| statuses.contains(&state.status))
            })
            .cloned()
            .collect()
    }

    fn on_vm_created(&mut self, vm_id: u32, host_id: u32, datacenter_id: Id) {
        log_debug!(
            self.ctx,
            "vm {} created on host {} of {}",
            vm_id,
            host_id,
            self.ctx.lookup_name(datacenter_id)
        );
        if let Some(state) = self.vms.get_mut(&vm_id) {
            state.status = VmStatus::Created;
            state.datacenter_id = Some(datacenter_id);
            state.host_id = Some(host_id);
        }
        self.check_vms_resolved();
    }

    fn on_vm_create_failed(&mut self, vm_id: u32, datacenter_id: Id, reason: AllocationError) {
        log_debug!(
            self.ctx,
            "vm {} was not created in {}: {}",
            vm_id,
            self.ctx.lookup_name(datacenter_id),
            reason
        );
        let time = self.ctx.time();
        let state = match self.vms.get_mut(&vm_id) {
            Some(state) => state,
            None => return,
        };
        if !reason.is_recoverable() {
            log_warn!(self.ctx, "vm {} can't be allocated: {}", vm_id, reason);
            state.status = VmStatus::FailedToAllocate;
            self.check_vms_resolved();
            return;
        }
        state.datacenter_idx += 1;
        if let Some(&next) = self.datacenters.get(state.datacenter_idx) {
            self.ctx
                .emit(VmCreateRequest { vm: state.spec.clone() }, next, self.message_delay);
        } else if time + self.allocation_retry_period <= state.submission_time + self.vm_allocation_timeout {
            state.datacenter_idx = 0;
            self.ctx.emit_self(VmCreateRetry { vm_id }, self.allocation_retry_period);
        } else {
            log_warn!(self.ctx, "failed to allocate vm {}", vm_id);
            state.status = VmStatus::FailedToAllocate;
            self.check_vms_resolved();
        }
    }

    fn on_vm_create_retry(&mut self, vm_id: u32) {
        if let (Some(state), Some(&datacenter)) = (self.vms.get(&vm_id), self.datacenters.first()) {
            self.ctx
                .emit(VmCreateRequest { vm: state.spec.clone() }, datacenter, self.message_delay);
        }
    }

    fn check_vms_resolved(&mut self) {
        if self.cloudlets_submitted || self.vms.values().any(|state| state.status == VmStatus::Requested) {
            return;
        }
        self.cloudlets_submitted = true;
        self.submit_cloudlets();
    }

    fn submit_cloudlets(&mut self) {
        let created = self.created_vms();
        let mut next_vm = 0;
        for mut cloudlet in std::mem::take(&mut self.cloudlets) {
            let target = match self.bindings.get(&cloudlet.id) {
                Some(vm_id) => created.iter().find(|&id| id == vm_id).copied(),
                None if created.is_empty() => None,
                None => {
                    let vm_id = created[next_vm % created.len()];
                    next_vm += 1;
                    Some(vm_id)
                }
            };
            let datacenter = target.and_then(|vm_id| self.vms.get(&vm_id)).and_then(|state| state.datacenter_id);
            match (target, datacenter) {
                (Some(vm_id), Some(datacenter)) => {
                    log_debug!(self.ctx, "sending cloudlet {} to vm {}", cloudlet.id, vm_id);
                    cloudlet.set_vm_id(vm_id);
                    self.cloudlet_vms.insert(cloudlet.id, vm_id);
                    self.submitted_count += 1;
                    self.ctx
                        .emit(CloudletSubmit { cloudlet }, datacenter, self.message_delay);
                }
                _ => {
                    log_warn!(self.ctx, "no vm available for cloudlet {}", cloudlet.id);
                    cloudlet.set_status(CloudletStatus::Failed);
                    self.received.push(cloudlet);
                }
            }
        }
        if self.submitted_count == 0 {
            self.destroy_created_vms();
        }
    }

    fn on_cloudlet_returned(&mut self, cloudlet: Cloudlet) {
        log_debug!(
            self.ctx,
            "cloudlet {} returned with status {}",
            cloudlet.id,
            cloudlet.status()
        );
        self.received.push(cloudlet);
        self.returned_count += 1;
        if self.returned_count == self.submitted_count {
            log_info!(self.ctx, "all {} cloudlets returned", self.returned_count);
            self.destroy_created_vms();
        }
    }

    fn destroy_created_vms(&mut self) {
        for vm_id in self.vm_order.clone() {
            self.destroy_vm(vm_id);
        }
    }

    fn on_vm_destroyed(&mut self, vm_id: u32) {
        log_debug!(self.ctx, "vm {} destroyed", vm_id);
        if let Some(state) = self.vms.get_mut(&vm_id) {
            if state.status == VmStatus::Created {
                state.status = VmStatus::Destroyed;
            }
        }
    }
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmCreated {
                vm_id,
                host_id,
                datacenter_id,
            } => {
                self.on_vm_created(vm_id, host_id, datacenter_id);
            }
            VmCreateFailed {
                vm_id,
                datacenter_id,
                reason,
            } => {
                self.on_vm_create_failed(vm_id, datacenter_id, reason);
            }
            VmCreateRetry { vm_id } => {
                self.on_vm_create_retry(vm_id);
            }
            CloudletReturned { cloudlet } => {
                self.on_cloudlet_returned(cloudlet);
            }
            VmDestroyed { vm_id, datacenter_id: _ } => {
                self.on_vm_destroyed(vm_id);
            }
        })
    }
}
