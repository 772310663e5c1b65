//! Cloudlet scheduling policies executed inside a VM.

use std::collections::VecDeque;

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::common::{InvalidRequest, SchedulingError};
use crate::core::config::parse_config_value;

/// Two time points closer than this (relative to their magnitude) are considered equal.
pub const TIME_EPSILON: f64 = 1e-12;

/// Remaining length (in MI) below which a cloudlet is considered complete.
pub const LENGTH_EPSILON: f64 = 1e-9;

/// Trait for implementation of cloudlet schedulers.
///
/// Scheduler owns the cloudlets submitted to a VM until they are drained via [`cloudlet_finished`] and tracks their
/// execution progress. The current simulation time is passed explicitly to every call.
///
/// [`cloudlet_finished`]: CloudletScheduler::cloudlet_finished
pub trait CloudletScheduler {
    /// Accepts the cloudlet for execution.
    ///
    /// Only cloudlets in `Created` status are accepted, any other one is handed back unchanged through the finished
    /// set. A cloudlet which can never run on this VM is moved to the finished set with `Failed` status.
    fn cloudlet_submit(&mut self, cloudlet: Cloudlet, time: f64) -> Result<(), SchedulingError>;

    /// Advances execution up to `time` using `mips_share` (rate of each VM core).
    ///
    /// Returns the time of the next expected cloudlet completion.
    fn update_vm_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64>;

    /// Returns status of a queued, running or finished (not yet drained) cloudlet.
    fn cloudlet_status(&self, cloudlet_id: u32) -> Option<CloudletStatus>;

    /// Drains finished cloudlets in order of completion.
    fn cloudlet_finished(&mut self) -> Vec<Cloudlet>;

    fn has_finished_cloudlets(&self) -> bool;

    /// Withdraws a queued or running cloudlet.
    fn cloudlet_cancel(&mut self, cloudlet_id: u32, time: f64) -> Option<Cloudlet>;

    /// Withdraws all queued and running cloudlets.
    fn cancel_all(&mut self, time: f64) -> Vec<Cloudlet>;

    fn running_count(&self) -> usize;

    fn queued_count(&self) -> usize;

    /// Number of VM cores occupied by running cloudlets.
    fn cores_in_use(&self) -> u32;

    /// Total number of VM cores.
    fn core_budget(&self) -> u32;
}

fn time_tolerance(time: f64) -> f64 {
    TIME_EPSILON * time.abs().max(1.)
}

pub fn cloudlet_scheduler_resolver(config_str: &str, cores: u32) -> Result<Box<dyn CloudletScheduler>, InvalidRequest> {
    let (scheduler_name, _options) = parse_config_value(config_str);
    match scheduler_name.as_str() {
        "SpaceShared" => Ok(Box::new(SpaceSharedCloudletScheduler::new(cores))),
        _ => Err(InvalidRequest::UnknownPolicy {
            name: config_str.to_string(),
        }),
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug)]
struct RunningCloudlet {
    cloudlet: Cloudlet,
    remaining_length: f64,
    /// Time up to which `remaining_length` is accounted.
    last_update: f64,
}

impl RunningCloudlet {
    fn rate(&self, mips_per_core: f64) -> f64 {
        mips_per_core * self.cloudlet.cores as f64
    }

    fn predicted_finish(&self, mips_per_core: f64) -> f64 {
        let rate = self.rate(mips_per_core);
        if self.remaining_length <= LENGTH_EPSILON {
            self.last_update
        } else if rate > 0. {
            self.last_update + self.remaining_length / rate
        } else {
            f64::INFINITY
        }
    }

    fn advance(&mut self, time: f64, mips_per_core: f64) {
        if time <= self.last_update {
            return;
        }
        self.remaining_length -= (time - self.last_update) * self.rate(mips_per_core);
        if self.remaining_length < 0. {
            self.remaining_length = 0.;
        }
        self.last_update = time;
    }
}

/// Space-shared scheduler: each running cloudlet holds its cores exclusively until completion.
///
/// Cloudlets which do not fit into free cores wait in a FIFO queue. The queue is strict: a cloudlet is never
/// admitted ahead of an earlier submitted one, even if it would fit.
pub struct SpaceSharedCloudletScheduler {
    core_budget: u32,
    cores_in_use: u32,
    queue: VecDeque<Cloudlet>,
    running: Vec<RunningCloudlet>,
    finished: Vec<Cloudlet>,
}

impl SpaceSharedCloudletScheduler {
    pub fn new(core_budget: u32) -> Self {
        Self {
            core_budget,
            cores_in_use: 0,
            queue: VecDeque::new(),
            running: Vec::new(),
            finished: Vec::new(),
        }
    }

    fn free_cores(&self) -> u32 {
        self.core_budget - self.cores_in_use
    }

    fn start(&mut self, mut cloudlet: Cloudlet, time: f64) {
        cloudlet.set_status(CloudletStatus::Running);
        cloudlet.set_exec_start_time(time);
        self.cores_in_use += cloudlet.cores;
        self.running.push(RunningCloudlet {
            remaining_length: cloudlet.length as f64,
            last_update: time,
            cloudlet,
        });
    }

    /// Starts queued cloudlets in FIFO order while the queue head fits into free cores.
    fn admit_queued(&mut self, time: f64) {
        while let Some(head) = self.queue.front() {
            if head.cores > self.free_cores() {
                break;
            }
            if let Some(cloudlet) = self.queue.pop_front() {
                self.start(cloudlet, time);
            }
        }
    }

    fn next_completion(&self, mips_per_core: f64) -> Option<f64> {
        self.running
            .iter()
            .map(|r| r.predicted_finish(mips_per_core))
            .filter(|t| t.is_finite())
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Completes all running cloudlets predicted to finish not later than `time`.
    fn complete_until(&mut self, time: f64, mips_per_core: f64) {
        let mut i = 0;
        while i < self.running.len() {
            let finish_time = self.running[i].predicted_finish(mips_per_core);
            if finish_time <= time + time_tolerance(time) {
                let mut done = self.running.remove(i);
                done.remaining_length = 0.;
                self.cores_in_use -= done.cloudlet.cores;
                done.cloudlet.set_status(CloudletStatus::Success);
                done.cloudlet.set_finish_time(finish_time);
                self.finished.push(done.cloudlet);
            } else {
                i += 1;
            }
        }
    }
}

impl CloudletScheduler for SpaceSharedCloudletScheduler {
    fn cloudlet_submit(&mut self, mut cloudlet: Cloudlet, time: f64) -> Result<(), SchedulingError> {
        if cloudlet.status() != CloudletStatus::Created {
            let error = SchedulingError::NotSubmittable {
                cloudlet_id: cloudlet.id,
                status: cloudlet.status(),
            };
            self.finished.push(cloudlet);
            return Err(error);
        }
        cloudlet.set_submission_time(time);
        if cloudlet.cores > self.core_budget {
            let error = SchedulingError::Unschedulable {
                cloudlet_id: cloudlet.id,
                required_cores: cloudlet.cores,
                core_budget: self.core_budget,
            };
            cloudlet.set_status(CloudletStatus::Failed);
            self.finished.push(cloudlet);
            return Err(error);
        }
        if self.queue.is_empty() && cloudlet.cores <= self.free_cores() {
            self.start(cloudlet, time);
        } else {
            cloudlet.set_status(CloudletStatus::Queued);
            self.queue.push_back(cloudlet);
        }
        Ok(())
    }

    fn update_vm_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64> {
        let mips_per_core = if mips_share.is_empty() {
            0.
        } else {
            mips_share.iter().sum::<f64>() / mips_share.len() as f64
        };

        // process completions inside the elapsed interval in time order,
        // admitting queued cloudlets at the moment cores are freed
        while let Some(next) = self.next_completion(mips_per_core) {
            if next > time + time_tolerance(time) {
                break;
            }
            self.complete_until(next, mips_per_core);
            self.admit_queued(next);
        }

        for running in self.running.iter_mut() {
            running.advance(time, mips_per_core);
        }
        self.next_completion(mips_per_core)
    }

    fn cloudlet_status(&self, cloudlet_id: u32) -> Option<CloudletStatus> {
        self.running
            .iter()
            .map(|r| &r.cloudlet)
            .chain(self.queue.iter())
            .chain(self.finished.iter())
            .find(|c| c.id == cloudlet_id)
            .map(|c| c.status())
    }

    fn cloudlet_finished(&mut self) -> Vec<Cloudlet> {
        std::mem::take(&mut self.finished)
    }

    fn has_finished_cloudlets(&self) -> bool {
        !self.finished.is_empty()
    }

    fn cloudlet_cancel(&mut self, cloudlet_id: u32, time: f64) -> Option<Cloudlet> {
        if let Some(pos) = self.queue.iter().position(|c| c.id == cloudlet_id) {
            let mut cloudlet = self.queue.remove(pos)?;
            cloudlet.set_status(CloudletStatus::Canceled);
            // the head may have changed
            self.admit_queued(time);
            return Some(cloudlet);
        }
        let pos = self.running.iter().position(|r| r.cloudlet.id == cloudlet_id)?;
        let mut cloudlet = self.running.remove(pos).cloudlet;
        self.cores_in_use -= cloudlet.cores;
        cloudlet.set_status(CloudletStatus::Canceled);
        self.admit_queued(time);
        Some(cloudlet)
    }

    fn cancel_all(&mut self, _time: f64) -> Vec<Cloudlet> {
        let mut canceled: Vec<Cloudlet> = self.queue.drain(..).collect();
        canceled.extend(self.running.drain(..).map(|r| r.cloudlet));
        self.cores_in_use = 0;
        for cloudlet in canceled.iter_mut() {
            cloudlet.set_status(CloudletStatus::Canceled);
        }
        canceled
    }

    fn running_count(&self) -> usize {
        self.running.len()
    }

    fn queued_count(&self) -> usize {
        self.queue.len()
    }

    fn cores_in_use(&self) -> u32 {
        self.cores_in_use
    }

    fn core_budget(&self) -> u32 {
        self.core_budget
    }
}
