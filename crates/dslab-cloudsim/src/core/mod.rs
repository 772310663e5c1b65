//! Capacity model, allocation and scheduling policies, and the simulation components built on them.

pub mod broker;
pub mod cloudlet;
pub mod cloudlet_scheduler;
pub mod common;
pub mod config;
pub mod datacenter;
pub mod events;
pub mod host;
pub mod pe;
pub mod provisioner;
pub mod vm;
pub mod vm_allocation_policy;
