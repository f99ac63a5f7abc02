//! Admission uniqueness and basic dispatch end to end, against the
//! in-memory KV adapter.

use std::sync::Arc;

use convoy_core::application::Convoy;
use convoy_core::domain::{AdmitStatus, Job, QueueOptions};
use convoy_core::port::kv_store::mocks::InMemoryKvStore;
use convoy_core::port::KvStore;

fn in_memory_convoy() -> Convoy {
    Convoy::new("convoy", 86_400, || async {
        Ok(Arc::new(InMemoryKvStore::new()) as Arc<dyn KvStore>)
    })
}

/// Scenario 1: single enqueue/dequeue.
#[tokio::test]
async fn single_enqueue_dequeue() {
    let convoy = in_memory_convoy();
    let queue = convoy.create_queue("single", QueueOptions::default()).await.unwrap();

    queue.add_job(&Job::new("1")).await.unwrap();

    queue.start_processing(|job| async move {
        assert_eq!(job.id, "1");
        Ok(())
    });

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    assert_eq!(queue.count_queued().await.unwrap(), 0);
    assert_eq!(queue.count_committed().await.unwrap(), 0);

    queue.close().await;
}

/// Scenario 2 / P1 / P7: duplicate submit returns Added then Committed and
/// never grows the queued list.
#[tokio::test]
async fn duplicate_submit_is_idempotent() {
    let convoy = in_memory_convoy();
    let queue = convoy.create_queue("dupes", QueueOptions::default()).await.unwrap();

    assert_eq!(queue.add_job(&Job::new("1")).await.unwrap(), AdmitStatus::Added);
    assert_eq!(queue.add_job(&Job::new("1")).await.unwrap(), AdmitStatus::Committed);
    assert_eq!(queue.add_job(&Job::new("1")).await.unwrap(), AdmitStatus::Committed);

    assert_eq!(queue.count_queued().await.unwrap(), 1);
}

/// P1: N concurrent admissions of the same id against an empty queue yield
/// exactly one `Added`.
#[tokio::test]
async fn concurrent_admission_of_the_same_id_is_exclusive() {
    let convoy = in_memory_convoy();
    let queue = Arc::new(convoy.create_queue("racing", QueueOptions::default()).await.unwrap());

    let mut handles = Vec::new();
    for _ in 0..20 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move { queue.add_job(&Job::new("racer")).await.unwrap() }));
    }

    let mut added = 0;
    for handle in handles {
        if handle.await.unwrap() == AdmitStatus::Added {
            added += 1;
        }
    }

    assert_eq!(added, 1);
    assert_eq!(queue.count_queued().await.unwrap(), 1);
}

/// Scenario 3: fan-in across many convoys sharing one queue's KV store.
#[tokio::test]
async fn fan_in_across_many_convoys() {
    let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());

    let mut handles = Vec::new();
    for convoy_idx in 0..10 {
        let kv = kv.clone();
        handles.push(tokio::spawn(async move {
            let convoy = Convoy::new("convoy", 86_400, move || {
                let kv = kv.clone();
                async move { Ok(kv) }
            });
            let queue = convoy.create_queue("fanin", QueueOptions::default()).await.unwrap();
            for job_idx in 0..20 {
                queue
                    .add_job(&Job::new(format!("c{convoy_idx}-j{job_idx}")))
                    .await
                    .unwrap();
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let convoy = Convoy::new("convoy", 86_400, move || {
        let kv = kv.clone();
        async move { Ok(kv) }
    });
    let queue = convoy.create_queue("fanin", QueueOptions::default()).await.unwrap();
    assert_eq!(queue.count_queued().await.unwrap(), 200);
}
