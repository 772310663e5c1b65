//! Representations of virtual machine and its status.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use dslab_core::Id;

use crate::core::cloudlet_scheduler::{cloudlet_scheduler_resolver, CloudletScheduler};
use crate::core::common::InvalidRequest;

/// Status of virtual machine as seen by its broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VmStatus {
    Requested,
    Created,
    FailedToAllocate,
    Destroyed,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Requested => write!(f, "requested"),
            VmStatus::Created => write!(f, "created"),
            VmStatus::FailedToAllocate => write!(f, "failed_to_allocate"),
            VmStatus::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Identifies a VM inside a datacenter. VM ids are assigned by each owner independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VmKey {
    pub owner: Id,
    pub vm_id: u32,
}

impl VmKey {
    pub fn new(owner: Id, vm_id: u32) -> Self {
        Self { owner, vm_id }
    }
}

impl Display for VmKey {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} of {}", self.vm_id, self.owner)
    }
}

/// Resource request of a VM: what has to be reserved on a host to run it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VmSpec {
    pub id: u32,
    pub owner: Id,
    /// Required rate of each core in MIPS.
    pub mips: f64,
    pub cores: u32,
    pub memory: u64,
    pub bandwidth: u64,
    /// Image size.
    pub size: u64,
    /// Name of the cloudlet scheduler used inside the VM.
    pub scheduler: String,
}

impl VmSpec {
    /// Creates VM request with the space-shared cloudlet scheduler.
    pub fn new(
        id: u32,
        owner: Id,
        mips: f64,
        cores: u32,
        memory: u64,
        bandwidth: u64,
        size: u64,
    ) -> Result<Self, InvalidRequest> {
        if cores == 0 {
            return Err(InvalidRequest::ZeroCores {
                entity: "vm".to_string(),
                id,
            });
        }
        if !(mips > 0.) {
            return Err(InvalidRequest::NonPositiveMips {
                entity: "vm".to_string(),
                id,
            });
        }
        Ok(Self {
            id,
            owner,
            mips,
            cores,
            memory,
            bandwidth,
            size,
            scheduler: "SpaceShared".to_string(),
        })
    }

    /// Replaces the cloudlet scheduler, the name must be known to [`cloudlet_scheduler_resolver`].
    pub fn with_scheduler(mut self, scheduler: &str) -> Result<Self, InvalidRequest> {
        cloudlet_scheduler_resolver(scheduler, self.cores)?;
        self.scheduler = scheduler.to_string();
        Ok(self)
    }

    pub fn key(&self) -> VmKey {
        VmKey::new(self.owner, self.id)
    }
}

/// VM placed in a datacenter.
///
/// Owns the cloudlet scheduler executing its workload. Host is referenced by id only.
pub struct VirtualMachine {
    pub spec: VmSpec,
    pub host_id: u32,
    pub scheduler: Box<dyn CloudletScheduler>,
}

impl VirtualMachine {
    pub fn new(spec: VmSpec, host_id: u32, scheduler: Box<dyn CloudletScheduler>) -> Self {
        Self {
            spec,
            host_id,
            scheduler,
        }
    }

    pub fn id(&self) -> u32 {
        self.spec.id
    }

    pub fn owner(&self) -> Id {
        self.spec.owner
    }

    pub fn key(&self) -> VmKey {
        self.spec.key()
    }
}
