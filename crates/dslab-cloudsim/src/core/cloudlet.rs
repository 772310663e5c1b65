//! Cloudlet (unit of computational work) and its lifecycle.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use dslab_core::Id;

use crate::core::common::InvalidRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CloudletStatus {
    Created,
    Queued,
    Running,
    Success,
    Failed,
    Canceled,
}

impl CloudletStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CloudletStatus::Success | CloudletStatus::Failed | CloudletStatus::Canceled
        )
    }

    fn can_become(&self, next: CloudletStatus) -> bool {
        use CloudletStatus::*;
        matches!(
            (self, next),
            (Created, Queued)
                | (Created, Running)
                | (Created, Failed)
                | (Created, Canceled)
                | (Queued, Running)
                | (Queued, Canceled)
                | (Running, Success)
                | (Running, Canceled)
        )
    }
}

impl Display for CloudletStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CloudletStatus::Created => write!(f, "CREATED"),
            CloudletStatus::Queued => write!(f, "QUEUED"),
            CloudletStatus::Running => write!(f, "RUNNING"),
            CloudletStatus::Success => write!(f, "SUCCESS"),
            CloudletStatus::Failed => write!(f, "FAILED"),
            CloudletStatus::Canceled => write!(f, "CANCELED"),
        }
    }
}

/// Unit of work with fixed length (in MI) and core requirement.
///
/// Timestamps are filled in as the cloudlet moves through the scheduler, `None` means the
/// corresponding stage was never reached.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cloudlet {
    pub id: u32,
    pub owner: Id,
    pub length: u64,
    pub cores: u32,
    pub file_size: u64,
    pub output_size: u64,
    status: CloudletStatus,
    submission_time: Option<f64>,
    exec_start_time: Option<f64>,
    finish_time: Option<f64>,
    vm_id: Option<u32>,
    datacenter_id: Option<Id>,
    host_id: Option<u32>,
}

impl Cloudlet {
    pub fn new(
        id: u32,
        owner: Id,
        length: u64,
        cores: u32,
        file_size: u64,
        output_size: u64,
    ) -> Result<Self, InvalidRequest> {
        if length == 0 {
            return Err(InvalidRequest::NonPositiveLength { cloudlet_id: id });
        }
        if cores == 0 {
            return Err(InvalidRequest::ZeroCores {
                entity: "cloudlet".to_string(),
                id,
            });
        }
        Ok(Self {
            id,
            owner,
            length,
            cores,
            file_size,
            output_size,
            status: CloudletStatus::Created,
            submission_time: None,
            exec_start_time: None,
            finish_time: None,
            vm_id: None,
            datacenter_id: None,
            host_id: None,
        })
    }

    pub fn status(&self) -> CloudletStatus {
        self.status
    }

    /// Moves cloudlet to the next status. Returns false (keeping the status) if such transition is not allowed.
    pub fn set_status(&mut self, status: CloudletStatus) -> bool {
        if !self.status.can_become(status) {
            return false;
        }
        self.status = status;
        true
    }

    pub fn submission_time(&self) -> Option<f64> {
        self.submission_time
    }

    pub fn exec_start_time(&self) -> Option<f64> {
        self.exec_start_time
    }

    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    /// Time spent executing, available once the cloudlet has finished.
    pub fn actual_cpu_time(&self) -> Option<f64> {
        Some(self.finish_time? - self.exec_start_time?)
    }

    pub fn vm_id(&self) -> Option<u32> {
        self.vm_id
    }

    pub fn datacenter_id(&self) -> Option<Id> {
        self.datacenter_id
    }

    pub fn host_id(&self) -> Option<u32> {
        self.host_id
    }

    pub fn set_vm_id(&mut self, vm_id: u32) {
        self.vm_id = Some(vm_id);
    }

    pub(crate) fn set_placement(&mut self, datacenter_id: Id, host_id: u32) {
        self.datacenter_id = Some(datacenter_id);
        self.host_id = Some(host_id);
    }

    pub(crate) fn set_submission_time(&mut self, time: f64) {
        self.submission_time = Some(time);
    }

    pub(crate) fn set_exec_start_time(&mut self, time: f64) {
        self.exec_start_time = Some(time);
    }

    pub(crate) fn set_finish_time(&mut self, time: f64) {
        self.finish_time = Some(time);
    }
}
