//! Error types shared by allocation and scheduling.

use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::core::cloudlet::CloudletStatus;

/// Host resource dimension checked during VM placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ResourceKind {
    Pes,
    Memory,
    Bandwidth,
    Storage,
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ResourceKind::Pes => write!(f, "pes"),
            ResourceKind::Memory => write!(f, "memory"),
            ResourceKind::Bandwidth => write!(f, "bandwidth"),
            ResourceKind::Storage => write!(f, "storage"),
        }
    }
}

/// Reason why a VM could not be placed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum AllocationError {
    /// The host cannot accommodate the VM in some resource dimension.
    InsufficientCapacity {
        host_id: u32,
        resource: ResourceKind,
        requested: u64,
        available: u64,
    },
    /// No host in the pool can accommodate the VM right now.
    NoSuitableHost { vm_id: u32 },
    /// Explicitly requested host does not exist.
    HostNotFound { host_id: u32 },
    /// VM is already placed on some host.
    AlreadyAllocated { vm_id: u32, host_id: u32 },
    /// VM request itself is malformed, no host will ever accept it.
    Rejected { vm_id: u32, reason: InvalidRequest },
}

impl AllocationError {
    /// Whether the same request may succeed later or in another datacenter.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AllocationError::InsufficientCapacity { .. } | AllocationError::NoSuitableHost { .. }
        )
    }
}

impl Display for AllocationError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            AllocationError::InsufficientCapacity {
                host_id,
                resource,
                requested,
                available,
            } => write!(
                f,
                "not enough {} on host {}: requested {}, available {}",
                resource, host_id, requested, available
            ),
            AllocationError::NoSuitableHost { vm_id } => write!(f, "no suitable host for vm {}", vm_id),
            AllocationError::HostNotFound { host_id } => write!(f, "host {} not found", host_id),
            AllocationError::AlreadyAllocated { vm_id, host_id } => {
                write!(f, "vm {} is already allocated on host {}", vm_id, host_id)
            }
            AllocationError::Rejected { vm_id, reason } => write!(f, "vm {} rejected: {}", vm_id, reason),
        }
    }
}

impl Error for AllocationError {}

/// Reason why a cloudlet was rejected by a cloudlet scheduler.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SchedulingError {
    /// Cloudlet requires more cores than the VM has, so it can never run.
    Unschedulable {
        cloudlet_id: u32,
        required_cores: u32,
        core_budget: u32,
    },
    /// Only cloudlets which were never submitted before can be accepted.
    NotSubmittable { cloudlet_id: u32, status: CloudletStatus },
}

impl Display for SchedulingError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            SchedulingError::Unschedulable {
                cloudlet_id,
                required_cores,
                core_budget,
            } => write!(
                f,
                "cloudlet {} requires {} cores, vm has only {}",
                cloudlet_id, required_cores, core_budget
            ),
            SchedulingError::NotSubmittable { cloudlet_id, status } => {
                write!(f, "cloudlet {} can't be submitted in status {}", cloudlet_id, status)
            }
        }
    }
}

impl Error for SchedulingError {}

/// Rejected input: entities with such parameters are never constructed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum InvalidRequest {
    NonPositiveLength { cloudlet_id: u32 },
    ZeroCores { entity: String, id: u32 },
    NonPositiveMips { entity: String, id: u32 },
    ZeroCapacity { host_id: u32, resource: ResourceKind },
    DuplicatePe { host_id: u32, pe_id: u32 },
    UnknownPolicy { name: String },
}

impl Display for InvalidRequest {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            InvalidRequest::NonPositiveLength { cloudlet_id } => {
                write!(f, "cloudlet {} must have positive length", cloudlet_id)
            }
            InvalidRequest::ZeroCores { entity, id } => write!(f, "{} {} must have at least one core", entity, id),
            InvalidRequest::NonPositiveMips { entity, id } => write!(f, "{} {} must have positive mips", entity, id),
            InvalidRequest::ZeroCapacity { host_id, resource } => {
                write!(f, "host {} must have positive {} capacity", host_id, resource)
            }
            InvalidRequest::DuplicatePe { host_id, pe_id } => {
                write!(f, "host {} has more than one pe with id {}", host_id, pe_id)
            }
            InvalidRequest::UnknownPolicy { name } => write!(f, "can't resolve policy: {}", name),
        }
    }
}

impl Error for InvalidRequest {}
