use dslab_cloudsim::core::cloudlet::{Cloudlet, CloudletStatus};
use dslab_cloudsim::core::cloudlet_scheduler::{
    cloudlet_scheduler_resolver, CloudletScheduler, SpaceSharedCloudletScheduler,
};
use dslab_cloudsim::core::common::SchedulingError;

fn cloudlet(id: u32, length: u64, cores: u32) -> Cloudlet {
    Cloudlet::new(id, 0, length, cores, 300, 300).unwrap()
}

fn ids(cloudlets: &[Cloudlet]) -> Vec<u32> {
    cloudlets.iter().map(|c| c.id).collect()
}

#[test]
// 40000 MI on a single 25000 MIPS core takes 1.6 seconds.
fn test_single_cloudlet_completion() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(1);
    scheduler.cloudlet_submit(cloudlet(0, 40000, 1), 0.).unwrap();
    assert_eq!(scheduler.cloudlet_status(0), Some(CloudletStatus::Running));

    assert_eq!(scheduler.update_vm_processing(0., &[25000.]), Some(1.6));
    assert!(!scheduler.has_finished_cloudlets());
    assert_eq!(scheduler.update_vm_processing(1.6, &[25000.]), None);

    let finished = scheduler.cloudlet_finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].status(), CloudletStatus::Success);
    assert_eq!(finished[0].submission_time(), Some(0.));
    assert_eq!(finished[0].exec_start_time(), Some(0.));
    assert_eq!(finished[0].finish_time(), Some(1.6));
    assert_eq!(scheduler.cores_in_use(), 0);
}

#[test]
fn test_completion_with_late_submission() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(1);
    scheduler.update_vm_processing(2., &[25000.]);
    scheduler.cloudlet_submit(cloudlet(0, 50000, 1), 2.).unwrap();
    assert_eq!(scheduler.update_vm_processing(2., &[25000.]), Some(4.));
    assert_eq!(scheduler.update_vm_processing(4., &[25000.]), None);
    let finished = scheduler.cloudlet_finished();
    assert_eq!(finished[0].exec_start_time(), Some(2.));
    assert_eq!(finished[0].finish_time(), Some(4.));
    assert_eq!(finished[0].actual_cpu_time(), Some(2.));
}

#[test]
// Multi-core cloudlet is processed at the rate of all its cores.
fn test_multi_core_rate() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(2);
    scheduler.cloudlet_submit(cloudlet(0, 100000, 2), 0.).unwrap();
    assert_eq!(scheduler.update_vm_processing(0., &[20000., 30000.]), Some(2.));
    assert_eq!(scheduler.cores_in_use(), 2);
}

#[test]
fn test_fifo_admission_at_completion_time() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(2);
    scheduler.cloudlet_submit(cloudlet(0, 100000, 2), 0.).unwrap();
    scheduler.cloudlet_submit(cloudlet(1, 25000, 2), 0.).unwrap();
    assert_eq!(scheduler.cloudlet_status(1), Some(CloudletStatus::Queued));
    assert_eq!(scheduler.queued_count(), 1);

    let share = [25000., 25000.];
    assert_eq!(scheduler.update_vm_processing(0., &share), Some(2.));
    assert_eq!(scheduler.update_vm_processing(2., &share), Some(2.5));
    assert_eq!(scheduler.cloudlet_status(1), Some(CloudletStatus::Running));
    assert_eq!(ids(&scheduler.cloudlet_finished()), vec![0]);

    assert_eq!(scheduler.update_vm_processing(2.5, &share), None);
    let finished = scheduler.cloudlet_finished();
    assert_eq!(finished[0].exec_start_time(), Some(2.));
    assert_eq!(finished[0].finish_time(), Some(2.5));
}

#[test]
// A small cloudlet waits behind a larger queued one even if it would fit.
fn test_strict_fifo_head_of_line() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(2);
    scheduler.cloudlet_submit(cloudlet(0, 100000, 1), 0.).unwrap();
    scheduler.cloudlet_submit(cloudlet(1, 50000, 2), 0.).unwrap();
    scheduler.cloudlet_submit(cloudlet(2, 25000, 1), 0.).unwrap();
    assert_eq!(scheduler.running_count(), 1);
    assert_eq!(scheduler.cloudlet_status(2), Some(CloudletStatus::Queued));

    let share = [25000., 25000.];
    assert_eq!(scheduler.update_vm_processing(0., &share), Some(4.));
    assert_eq!(scheduler.update_vm_processing(4., &share), Some(5.));
    assert_eq!(scheduler.cloudlet_status(1), Some(CloudletStatus::Running));
    assert_eq!(scheduler.cloudlet_status(2), Some(CloudletStatus::Queued));
    assert_eq!(scheduler.update_vm_processing(5., &share), Some(6.));
    assert_eq!(scheduler.update_vm_processing(6., &share), None);

    let finished = scheduler.cloudlet_finished();
    assert_eq!(ids(&finished), vec![0, 1, 2]);
    let starts: Vec<Option<f64>> = finished.iter().map(|c| c.exec_start_time()).collect();
    assert_eq!(starts, vec![Some(0.), Some(4.), Some(5.)]);
    let finishes: Vec<Option<f64>> = finished.iter().map(|c| c.finish_time()).collect();
    assert_eq!(finishes, vec![Some(4.), Some(5.), Some(6.)]);
}

#[test]
// A single update covering several completions interpolates the exact timestamps.
fn test_interpolation_over_long_interval() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(1);
    scheduler.cloudlet_submit(cloudlet(0, 25000, 1), 0.).unwrap();
    scheduler.cloudlet_submit(cloudlet(1, 50000, 1), 0.).unwrap();

    assert_eq!(scheduler.update_vm_processing(10., &[25000.]), None);
    let finished = scheduler.cloudlet_finished();
    assert_eq!(ids(&finished), vec![0, 1]);
    assert_eq!(finished[0].finish_time(), Some(1.));
    assert_eq!(finished[1].exec_start_time(), Some(1.));
    assert_eq!(finished[1].finish_time(), Some(3.));
}

#[test]
fn test_partial_progress() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(1);
    scheduler.cloudlet_submit(cloudlet(0, 100000, 1), 0.).unwrap();
    assert_eq!(scheduler.update_vm_processing(0., &[25000.]), Some(4.));
    assert_eq!(scheduler.update_vm_processing(1., &[25000.]), Some(4.));
    // repeated update at the same time changes nothing
    assert_eq!(scheduler.update_vm_processing(1., &[25000.]), Some(4.));
    assert_eq!(scheduler.cloudlet_status(0), Some(CloudletStatus::Running));
    assert_eq!(scheduler.update_vm_processing(4., &[25000.]), None);
    assert_eq!(scheduler.cloudlet_finished()[0].finish_time(), Some(4.));
}

#[test]
fn test_unschedulable_cloudlet() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(1);
    let result = scheduler.cloudlet_submit(cloudlet(0, 1000, 2), 0.);
    assert_eq!(
        result,
        Err(SchedulingError::Unschedulable {
            cloudlet_id: 0,
            required_cores: 2,
            core_budget: 1,
        })
    );
    assert_eq!(scheduler.cloudlet_status(0), Some(CloudletStatus::Failed));
    assert_eq!(scheduler.running_count(), 0);
    assert_eq!(scheduler.queued_count(), 0);

    // other cloudlets are not affected
    scheduler.cloudlet_submit(cloudlet(1, 1000, 1), 0.).unwrap();
    assert_eq!(scheduler.update_vm_processing(0., &[1000.]), Some(1.));

    let failed = scheduler.cloudlet_finished();
    assert_eq!(ids(&failed), vec![0]);
    assert_eq!(failed[0].status(), CloudletStatus::Failed);
    assert_eq!(failed[0].exec_start_time(), None);
    assert_eq!(failed[0].finish_time(), None);
}

#[test]
fn test_core_budget_never_exceeded() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(4);
    for (id, cores) in [1, 2, 3, 1, 2, 1].iter().enumerate() {
        scheduler.cloudlet_submit(cloudlet(id as u32, 10000 * (id as u64 + 1), *cores), 0.).unwrap();
        assert!(scheduler.cores_in_use() <= scheduler.core_budget());
    }
    let share = [10000.; 4];
    let mut time = 0.;
    let mut done = 0;
    while let Some(next) = scheduler.update_vm_processing(time, &share) {
        assert!(scheduler.cores_in_use() <= scheduler.core_budget());
        assert!(next >= time);
        done += scheduler.cloudlet_finished().len();
        time = next;
    }
    done += scheduler.cloudlet_finished().len();
    assert_eq!(done, 6);
    assert_eq!(scheduler.cores_in_use(), 0);
}

#[test]
fn test_cancel_running_admits_queued() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(1);
    scheduler.cloudlet_submit(cloudlet(0, 100000, 1), 0.).unwrap();
    scheduler.cloudlet_submit(cloudlet(1, 1000, 1), 0.).unwrap();
    scheduler.update_vm_processing(1., &[1000.]);

    let canceled = scheduler.cloudlet_cancel(0, 1.).unwrap();
    assert_eq!(canceled.status(), CloudletStatus::Canceled);
    assert_eq!(canceled.finish_time(), None);
    assert_eq!(scheduler.cloudlet_status(1), Some(CloudletStatus::Running));
    assert_eq!(scheduler.update_vm_processing(1., &[1000.]), Some(2.));
    assert!(scheduler.cloudlet_cancel(0, 1.).is_none());
    assert!(scheduler.cloudlet_cancel(99, 1.).is_none());
}

#[test]
fn test_cancel_queued() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(1);
    scheduler.cloudlet_submit(cloudlet(0, 1000, 1), 0.).unwrap();
    scheduler.cloudlet_submit(cloudlet(1, 1000, 1), 0.).unwrap();
    scheduler.cloudlet_submit(cloudlet(2, 1000, 1), 0.).unwrap();

    let canceled = scheduler.cloudlet_cancel(1, 0.).unwrap();
    assert_eq!(canceled.status(), CloudletStatus::Canceled);
    assert_eq!(canceled.exec_start_time(), None);
    assert_eq!(scheduler.queued_count(), 1);
    assert_eq!(scheduler.cloudlet_status(1), None);

    assert_eq!(scheduler.update_vm_processing(5., &[1000.]), None);
    assert_eq!(ids(&scheduler.cloudlet_finished()), vec![0, 2]);
}

#[test]
fn test_cancel_all() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(2);
    scheduler.cloudlet_submit(cloudlet(0, 1000, 2), 0.).unwrap();
    scheduler.cloudlet_submit(cloudlet(1, 1000, 1), 0.).unwrap();
    let canceled = scheduler.cancel_all(0.5);
    assert_eq!(ids(&canceled), vec![1, 0]);
    assert!(canceled.iter().all(|c| c.status() == CloudletStatus::Canceled));
    assert_eq!(scheduler.cores_in_use(), 0);
    assert_eq!(scheduler.update_vm_processing(1., &[1000., 1000.]), None);
}

#[test]
fn test_finished_drained_once() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(1);
    scheduler.cloudlet_submit(cloudlet(0, 1000, 1), 0.).unwrap();
    scheduler.update_vm_processing(1., &[1000.]);
    assert_eq!(scheduler.cloudlet_status(0), Some(CloudletStatus::Success));
    assert_eq!(scheduler.cloudlet_finished().len(), 1);
    assert!(scheduler.cloudlet_finished().is_empty());
    assert_eq!(scheduler.cloudlet_status(0), None);
}

#[test]
// A cloudlet which already went through a scheduler is handed back untouched.
fn test_resubmitted_finished_cloudlet_is_rejected() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(1);
    scheduler.cloudlet_submit(cloudlet(0, 1000, 1), 0.).unwrap();
    scheduler.update_vm_processing(1., &[1000.]);
    let done = scheduler.cloudlet_finished().pop().unwrap();
    assert_eq!(done.status(), CloudletStatus::Success);

    assert_eq!(
        scheduler.cloudlet_submit(done, 5.),
        Err(SchedulingError::NotSubmittable {
            cloudlet_id: 0,
            status: CloudletStatus::Success,
        })
    );
    assert_eq!(scheduler.cores_in_use(), 0);
    assert_eq!(scheduler.queued_count(), 0);
    assert_eq!(scheduler.update_vm_processing(5., &[1000.]), None);

    let returned = scheduler.cloudlet_finished();
    assert_eq!(returned.len(), 1);
    assert_eq!(returned[0].status(), CloudletStatus::Success);
    assert_eq!(returned[0].submission_time(), Some(0.));
    assert_eq!(returned[0].exec_start_time(), Some(0.));
    assert_eq!(returned[0].finish_time(), Some(1.));
}

#[test]
fn test_resubmitted_canceled_cloudlet_is_rejected() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(1);
    scheduler.cloudlet_submit(cloudlet(0, 1000, 1), 0.).unwrap();
    let canceled = scheduler.cloudlet_cancel(0, 0.5).unwrap();

    let mut other = SpaceSharedCloudletScheduler::new(1);
    assert_eq!(
        other.cloudlet_submit(canceled, 1.),
        Err(SchedulingError::NotSubmittable {
            cloudlet_id: 0,
            status: CloudletStatus::Canceled,
        })
    );
    assert_eq!(other.cores_in_use(), 0);
    assert_eq!(other.update_vm_processing(1., &[1000.]), None);
    let returned = other.cloudlet_finished();
    assert_eq!(returned[0].status(), CloudletStatus::Canceled);
    assert_eq!(returned[0].submission_time(), Some(0.));
    assert_eq!(returned[0].finish_time(), None);
}

#[test]
fn test_deterministic_schedule() {
    let run = || {
        let mut scheduler = SpaceSharedCloudletScheduler::new(3);
        for id in 0..10u32 {
            scheduler.cloudlet_submit(cloudlet(id, 1000 + 700 * id as u64, 1 + id % 3), 0.).unwrap();
        }
        let mut time = 0.;
        let mut finished = Vec::new();
        while let Some(next) = scheduler.update_vm_processing(time, &[1000.; 3]) {
            finished.extend(scheduler.cloudlet_finished());
            time = next;
        }
        finished.extend(scheduler.cloudlet_finished());
        finished
    };
    let first = run();
    assert_eq!(first.len(), 10);
    assert_eq!(first, run());
}

#[test]
fn test_status_transitions() {
    let mut c = cloudlet(0, 1000, 1);
    assert_eq!(c.status(), CloudletStatus::Created);
    assert!(c.set_status(CloudletStatus::Queued));
    assert!(!c.set_status(CloudletStatus::Success));
    assert!(c.set_status(CloudletStatus::Running));
    assert!(c.set_status(CloudletStatus::Success));
    assert!(!c.set_status(CloudletStatus::Canceled));
    assert_eq!(c.status(), CloudletStatus::Success);
    assert!(c.status().is_terminal());
    assert_eq!(CloudletStatus::Success.to_string(), "SUCCESS");
}

#[test]
fn test_scheduler_resolver() {
    let scheduler = cloudlet_scheduler_resolver("SpaceShared", 4).unwrap();
    assert_eq!(scheduler.core_budget(), 4);
    assert!(cloudlet_scheduler_resolver("TimeShared", 4).is_err());
}
