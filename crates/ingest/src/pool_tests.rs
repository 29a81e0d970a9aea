use super::*;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
    },
    time::{Duration, Instant},
};

#[test]
fn never_runs_more_than_worker_count_jobs_at_once() {
    let pool = WorkerPool::new();
    pool.start(3).expect("start");

    let running = Arc::new(AtomicUsize::new(0));
    let high_water = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));

    for _ in 0..20 {
        let running = Arc::clone(&running);
        let high_water = Arc::clone(&high_water);
        let done = Arc::clone(&done);

        pool.queue(move || {
            let now = running.fetch_add(1, AtomicOrdering::SeqCst) + 1;
            high_water.fetch_max(now, AtomicOrdering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            running.fetch_sub(1, AtomicOrdering::SeqCst);
            done.fetch_add(1, AtomicOrdering::SeqCst);
        });
    }

    pool.stop();

    let high = high_water.load(AtomicOrdering::SeqCst);
    assert!(high <= 3, "saw {high} concurrent jobs");
    assert!(high > 1, "jobs never overlapped");
    assert_eq!(done.load(AtomicOrdering::SeqCst), 20);
}

#[test]
fn stop_waits_for_accepted_jobs() {
    let pool = WorkerPool::new();
    pool.start(2).expect("start");

    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..2 {
        let done = Arc::clone(&done);
        pool.queue(move || {
            thread::sleep(Duration::from_millis(100));
            done.fetch_add(1, AtomicOrdering::SeqCst);
        });
    }

    pool.stop();
    assert_eq!(done.load(AtomicOrdering::SeqCst), 2);
}

#[test]
fn queue_after_stop_is_a_silent_no_op() {
    let pool = WorkerPool::new();
    pool.start(1).expect("start");
    pool.stop();

    let ran = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&ran);

    let started = Instant::now();
    pool.queue(move || {
        flag.fetch_add(1, AtomicOrdering::SeqCst);
    });

    assert!(started.elapsed() < Duration::from_millis(100));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(ran.load(AtomicOrdering::SeqCst), 0);
}

#[test]
fn stop_twice_returns_immediately() {
    let pool = WorkerPool::new();
    pool.start(2).expect("start");

    pool.stop();
    let started = Instant::now();
    pool.stop();
    assert!(started.elapsed() < Duration::from_millis(50));
    assert_eq!(pool.worker_count(), 0);
}

#[test]
fn queue_blocks_until_a_worker_is_free() {
    let pool = Arc::new(WorkerPool::new());
    pool.start(1).expect("start");

    let (release_tx, release_rx) = channel::bounded::<()>(0);
    pool.queue(move || {
        let _ = release_rx.recv();
    });

    let accepted = Arc::new(AtomicUsize::new(0));
    let submitter = {
        let pool = Arc::clone(&pool);
        let accepted = Arc::clone(&accepted);
        thread::spawn(move || {
            pool.queue(|| {});
            accepted.fetch_add(1, AtomicOrdering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert_eq!(
        accepted.load(AtomicOrdering::SeqCst),
        0,
        "queue returned while the only worker was busy"
    );

    release_tx.send(()).expect("release first job");
    submitter.join().expect("submitter thread");
    assert_eq!(accepted.load(AtomicOrdering::SeqCst), 1);

    pool.stop();
}

#[test]
fn blocked_submitter_is_released_by_stop() {
    // No workers: nothing ever takes the job.
    let pool = Arc::new(WorkerPool::new());

    let ran = Arc::new(AtomicUsize::new(0));
    let submitter = {
        let pool = Arc::clone(&pool);
        let ran = Arc::clone(&ran);
        thread::spawn(move || {
            pool.queue(move || {
                ran.fetch_add(1, AtomicOrdering::SeqCst);
            });
        })
    };

    thread::sleep(Duration::from_millis(50));
    pool.stop();

    submitter.join().expect("submitter thread");
    assert_eq!(ran.load(AtomicOrdering::SeqCst), 0);
}

#[test]
fn panicking_job_does_not_kill_its_worker() {
    let pool = WorkerPool::new();
    pool.start(1).expect("start");

    pool.queue(|| panic!("bad payload"));

    let ran = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&ran);
    pool.queue(move || {
        flag.fetch_add(1, AtomicOrdering::SeqCst);
    });

    pool.stop();
    assert_eq!(ran.load(AtomicOrdering::SeqCst), 1);
}

#[test]
fn start_validates_and_runs_once() {
    let pool = WorkerPool::new();

    assert!(matches!(pool.start(0), Err(IngestError::InvalidConfig(_))));

    pool.start(4).expect("start");
    assert_eq!(pool.worker_count(), 4);
    assert!(matches!(pool.start(2), Err(IngestError::AlreadyStarted)));
    assert_eq!(pool.worker_count(), 4);

    pool.stop();
    assert!(matches!(pool.start(1), Err(IngestError::Stopped)));
}

#[test]
fn panic_message_extracts_strings() {
    let boxed: Box<dyn Any + Send> = Box::new("static message");
    assert_eq!(panic_message(boxed.as_ref()), "static message");

    let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
    assert_eq!(panic_message(boxed.as_ref()), "owned message");

    let boxed: Box<dyn Any + Send> = Box::new(42u8);
    assert_eq!(panic_message(boxed.as_ref()), "<non-string panic payload>");
}
