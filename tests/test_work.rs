use crossbeam::channel::unbounded;
use spanrs::work::{ActiveObject, LeaderFollowers, Pipeline, Task};
use spanrs::Error;
use std::thread::sleep;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn test_active_object_runs_in_submission_order() {
    let active = ActiveObject::new("ordered");
    let (tx, rx) = unbounded();
    active.start().unwrap();

    for i in 0..1000 {
        let tx = tx.clone();
        active
            .enqueue(Task::new(move || {
                tx.send(i)?;
                Ok(i.to_string())
            }))
            .unwrap();
    }
    active.stop();

    assert_eq!(rx.try_iter().collect::<Vec<_>>(), (0..1000).collect::<Vec<_>>());
}

#[test]
fn test_value_relayed_through_three_stages() {
    let (tx, rx) = unbounded();
    let mut pipeline = Pipeline::new();
    for stage in 0..3 {
        let tx = tx.clone();
        pipeline
            .add_task(Task::new(move || {
                tx.send(stage)?;
                Ok(format!("stage {stage} ready"))
            }))
            .unwrap();
    }
    pipeline.start().unwrap();

    let value = pipeline.execute("A").unwrap().wait().unwrap();
    assert_eq!(value, "A");
    pipeline.stop();

    let mut ran = rx.try_iter().collect::<Vec<_>>();
    ran.sort_unstable();
    assert_eq!(ran, vec![0, 1, 2]);
}

#[test]
fn test_pool_runs_tasks_in_parallel() {
    let pool = LeaderFollowers::new(2).unwrap();
    let (tx, rx) = unbounded();
    let started = Instant::now();
    for i in 0..4 {
        let tx = tx.clone();
        pool.add_task(Task::new(move || {
            sleep(Duration::from_millis(50));
            tx.send(i)?;
            Ok(i.to_string())
        }))
        .unwrap();
    }
    pool.stop();
    let elapsed = started.elapsed();

    // Two rounds of two parallel tasks; serial execution would take 200ms.
    assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(190), "{elapsed:?}");

    let mut ran = rx.try_iter().collect::<Vec<_>>();
    ran.sort_unstable();
    assert_eq!(ran, vec![0, 1, 2, 3]);
    assert_eq!(pool.stats().executed, 4);
    assert_eq!(pool.stats().max_concurrent_leaders, 1);
}

#[test]
fn test_failing_tasks_do_not_stop_workers() {
    let (tx, rx) = unbounded();

    let active = ActiveObject::new("faulty");
    active.start().unwrap();
    active.enqueue(Task::new(|| panic!("stage exploded"))).unwrap();
    let after = tx.clone();
    active
        .enqueue(Task::new(move || {
            after.send("active")?;
            Ok(String::new())
        }))
        .unwrap();

    let pool = LeaderFollowers::new(1).unwrap();
    pool.add_task(Task::new(|| Err(anyhow::anyhow!("bad input")))).unwrap();
    pool.add_task(Task::new(|| panic!("worker exploded"))).unwrap();
    pool.add_task(Task::new(move || {
        tx.send("pool")?;
        Ok(String::new())
    }))
    .unwrap();

    let mut seen = vec![rx.recv_timeout(TIMEOUT).unwrap(), rx.recv_timeout(TIMEOUT).unwrap()];
    seen.sort_unstable();
    assert_eq!(seen, vec!["active", "pool"]);
    assert_eq!(pool.stats().failed, 2);
}

#[test]
fn test_stop_drains_then_rejects() {
    let (tx, rx) = unbounded();
    let active = ActiveObject::new("draining");
    let pool = LeaderFollowers::new(3).unwrap();
    active.start().unwrap();

    for i in 0..20 {
        let tx = tx.clone();
        let task = Task::new(move || {
            sleep(Duration::from_millis(2));
            tx.send(i)?;
            Ok(String::new())
        });
        if i % 2 == 0 {
            active.enqueue(task).unwrap();
        } else {
            pool.add_task(task).unwrap();
        }
    }
    active.stop();
    pool.stop();
    active.stop();
    pool.stop();

    assert_eq!(rx.try_iter().count(), 20);
    assert!(matches!(
        active.enqueue(Task::relay("late".into())),
        Err(Error::Stopped(_))
    ));
    assert!(matches!(
        pool.add_task(Task::relay("late".into())),
        Err(Error::Stopped(_))
    ));
}
