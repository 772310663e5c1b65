//! Per-host capacity bookkeeping.
//!
//! Each host dimension is tracked as a fixed capacity plus a map of per-VM reservations.
//! Reservations are released as a whole, so releasing twice is a no-op.

use std::collections::BTreeMap;

use crate::core::common::{AllocationError, InvalidRequest, ResourceKind};
use crate::core::pe::{PeStatus, ProcessingElement};
use crate::core::vm::VmKey;

/// Scalar resource (memory, bandwidth or storage) of a host.
#[derive(Clone, Debug)]
pub struct ResourceProvisioner {
    host_id: u32,
    resource: ResourceKind,
    capacity: u64,
    allocated: u64,
    allocations: BTreeMap<VmKey, u64>,
}

impl ResourceProvisioner {
    pub fn new(host_id: u32, resource: ResourceKind, capacity: u64) -> Self {
        Self {
            host_id,
            resource,
            capacity,
            allocated: 0,
            allocations: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    pub fn available(&self) -> u64 {
        self.capacity - self.allocated
    }

    /// Returns the amount reserved for the VM, if any.
    pub fn allocated_for(&self, vm: VmKey) -> Option<u64> {
        self.allocations.get(&vm).copied()
    }

    /// Checks whether `amount` more units fit into the remaining capacity.
    pub fn can_allocate(&self, amount: u64) -> Result<(), AllocationError> {
        if amount > self.available() {
            return Err(AllocationError::InsufficientCapacity {
                host_id: self.host_id,
                resource: self.resource,
                requested: amount,
                available: self.available(),
            });
        }
        Ok(())
    }

    /// Reserves `amount` units for the VM. A VM holds at most one reservation per dimension.
    pub fn allocate(&mut self, vm: VmKey, amount: u64) -> Result<(), AllocationError> {
        let previous = self.allocations.get(&vm).copied().unwrap_or(0);
        if amount > self.available() + previous {
            return Err(AllocationError::InsufficientCapacity {
                host_id: self.host_id,
                resource: self.resource,
                requested: amount,
                available: self.available() + previous,
            });
        }
        self.allocated = self.allocated - previous + amount;
        self.allocations.insert(vm, amount);
        Ok(())
    }

    /// Drops the VM reservation, returning the released amount.
    pub fn release(&mut self, vm: VmKey) -> Option<u64> {
        let amount = self.allocations.remove(&vm)?;
        self.allocated -= amount;
        Some(amount)
    }
}

/// Set of PEs dedicated to a single VM.
#[derive(Clone, Debug)]
pub struct PeAllocation {
    pub pe_ids: Vec<u32>,
    pub mips: f64,
}

/// Processing elements of a host. Each PE is either free or dedicated to exactly one VM.
#[derive(Clone, Debug)]
pub struct PeProvisioner {
    host_id: u32,
    pes: Vec<ProcessingElement>,
    allocations: BTreeMap<VmKey, PeAllocation>,
}

impl PeProvisioner {
    /// Creates provisioner for `count` identical PEs with ids `0..count`.
    pub fn uniform(host_id: u32, count: u32, mips: f64) -> Self {
        Self {
            host_id,
            pes: (0..count).map(|id| ProcessingElement::new(id, mips)).collect(),
            allocations: BTreeMap::new(),
        }
    }

    /// Creates provisioner for an explicit list of PEs. PE ids must be unique and rates positive.
    pub fn new(host_id: u32, mut pes: Vec<ProcessingElement>) -> Result<Self, InvalidRequest> {
        if pes.is_empty() {
            return Err(InvalidRequest::ZeroCores {
                entity: "host".to_string(),
                id: host_id,
            });
        }
        pes.sort_by_key(|pe| pe.id);
        if let Some(pair) = pes.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(InvalidRequest::DuplicatePe {
                host_id,
                pe_id: pair[0].id,
            });
        }
        if pes.iter().any(|pe| !(pe.mips() > 0.)) {
            return Err(InvalidRequest::NonPositiveMips {
                entity: "host".to_string(),
                id: host_id,
            });
        }
        Ok(Self {
            host_id,
            pes,
            allocations: BTreeMap::new(),
        })
    }

    pub fn pes(&self) -> &[ProcessingElement] {
        &self.pes
    }

    pub fn pe_count(&self) -> u32 {
        self.pes.len() as u32
    }

    pub fn free_pe_count(&self) -> u32 {
        self.pes.iter().filter(|pe| pe.is_free()).count() as u32
    }

    pub fn allocation(&self, vm: VmKey) -> Option<&PeAllocation> {
        self.allocations.get(&vm)
    }

    /// Lowest-id free PEs fast enough to run at `mips`, at most `count` of them.
    fn select_pes(&self, count: u32, mips: f64) -> Vec<u32> {
        self.pes
            .iter()
            .filter(|pe| pe.is_free() && pe.mips() >= mips)
            .take(count as usize)
            .map(|pe| pe.id)
            .collect()
    }

    pub fn can_allocate(&self, count: u32, mips: f64) -> Result<(), AllocationError> {
        let suitable = self.select_pes(count, mips).len() as u64;
        if suitable < count as u64 {
            return Err(AllocationError::InsufficientCapacity {
                host_id: self.host_id,
                resource: ResourceKind::Pes,
                requested: count as u64,
                available: suitable,
            });
        }
        Ok(())
    }

    /// Dedicates `count` PEs to the VM and returns their ids.
    pub fn allocate(&mut self, vm: VmKey, count: u32, mips: f64) -> Result<Vec<u32>, AllocationError> {
        if let Some(existing) = self.allocations.get(&vm) {
            return Ok(existing.pe_ids.clone());
        }
        self.can_allocate(count, mips)?;
        let pe_ids = self.select_pes(count, mips);
        for pe in self.pes.iter_mut().filter(|pe| pe_ids.contains(&pe.id)) {
            pe.set_status(PeStatus::Busy);
        }
        self.allocations.insert(
            vm,
            PeAllocation {
                pe_ids: pe_ids.clone(),
                mips,
            },
        );
        Ok(pe_ids)
    }

    /// Frees PEs of the VM, returning their ids.
    pub fn release(&mut self, vm: VmKey) -> Option<Vec<u32>> {
        let allocation = self.allocations.remove(&vm)?;
        for pe in self.pes.iter_mut().filter(|pe| allocation.pe_ids.contains(&pe.id)) {
            pe.set_status(PeStatus::Free);
        }
        Some(allocation.pe_ids)
    }
}
