mod common;

use std::sync::Arc;
use std::time::Duration;

use certmail::jobs::{Janitor, JobStatus, JobStore, MailJob, MemoryJobStore};
use uuid::Uuid;

use common::recipient;

#[tokio::test]
async fn sweep_fails_only_stale_processing_jobs() {
    let jobs = Arc::new(MemoryJobStore::new());
    let group_id = Uuid::new_v4();

    let stale = MailJob::new(group_id, vec![recipient("a@example.com", "A")]);
    jobs.create(&stale).await.unwrap();
    jobs.set_status(stale.id, JobStatus::Processing).await.unwrap();

    // Let the stale job age past the grace period before the fresh one
    // starts.
    tokio::time::sleep(Duration::from_millis(150)).await;

    let fresh = MailJob::new(group_id, vec![recipient("b@example.com", "B")]);
    jobs.create(&fresh).await.unwrap();
    jobs.set_status(fresh.id, JobStatus::Processing).await.unwrap();

    let janitor = Janitor::new(jobs.clone()).grace_period(Duration::from_millis(100));
    let swept = janitor.sweep().await.unwrap();

    assert_eq!(swept, 1);
    assert_eq!(
        jobs.get(stale.id).await.unwrap().unwrap().status,
        JobStatus::Failed
    );
    assert_eq!(
        jobs.get(fresh.id).await.unwrap().unwrap().status,
        JobStatus::Processing
    );
}

#[tokio::test]
async fn sweep_ignores_pending_and_terminal_jobs() {
    let jobs = Arc::new(MemoryJobStore::new());
    let group_id = Uuid::new_v4();

    let pending = MailJob::new(group_id, vec![recipient("a@example.com", "A")]);
    jobs.create(&pending).await.unwrap();

    let completed = MailJob::new(group_id, vec![recipient("b@example.com", "B")]);
    jobs.create(&completed).await.unwrap();
    jobs.set_status(completed.id, JobStatus::Completed)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let janitor = Janitor::new(jobs.clone()).grace_period(Duration::from_millis(10));
    let swept = janitor.sweep().await.unwrap();

    assert_eq!(swept, 0);
    assert_eq!(
        jobs.get(pending.id).await.unwrap().unwrap().status,
        JobStatus::Pending
    );
    assert_eq!(
        jobs.get(completed.id).await.unwrap().unwrap().status,
        JobStatus::Completed
    );
}
