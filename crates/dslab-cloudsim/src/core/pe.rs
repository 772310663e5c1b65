//! Processing element (a single core of a host).

use std::fmt::{Display, Formatter};

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PeStatus {
    Free,
    Busy,
}

impl Display for PeStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            PeStatus::Free => write!(f, "free"),
            PeStatus::Busy => write!(f, "busy"),
        }
    }
}

/// Schedulable core with a fixed computation rate in MIPS.
#[derive(Clone, Debug, Serialize)]
pub struct ProcessingElement {
    pub id: u32,
    mips: f64,
    status: PeStatus,
}

impl ProcessingElement {
    pub fn new(id: u32, mips: f64) -> Self {
        Self {
            id,
            mips,
            status: PeStatus::Free,
        }
    }

    pub fn mips(&self) -> f64 {
        self.mips
    }

    pub fn status(&self) -> PeStatus {
        self.status
    }

    pub fn is_free(&self) -> bool {
        self.status == PeStatus::Free
    }

    pub(crate) fn set_status(&mut self, status: PeStatus) {
        self.status = status;
    }
}
