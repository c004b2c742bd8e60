/*!
 * Handle Tests
 * Write-once semantics under concurrent observers and cancellers
 */

use std::sync::Arc;
use std::sync::Barrier;
use std::time::Duration;
use vtask::{ExecutorConfig, Handle, TaskError, TaskExecutor};

#[test]
fn test_many_observers_see_same_value() {
    let executor = TaskExecutor::new(ExecutorConfig::default().with_worker_threads(2)).unwrap();
    let handle = executor
        .spawn(async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            vec![1u8, 2, 3]
        })
        .unwrap();

    let observers: Vec<_> = (0..8)
        .map(|_| {
            let handle = handle.clone();
            std::thread::spawn(move || handle.wait_blocking())
        })
        .collect();

    for observer in observers {
        assert_eq!(observer.join().unwrap(), Ok(vec![1, 2, 3]));
    }
    assert_eq!(handle.result(), Some(&Ok(vec![1, 2, 3])));
}

#[test]
fn test_concurrent_cancel_exactly_once() {
    let executor = TaskExecutor::new(ExecutorConfig::single_worker()).unwrap();
    let handle = executor
        .spawn(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
        })
        .unwrap();

    let barrier = Arc::new(Barrier::new(16));
    let cancellers: Vec<_> = (0..16)
        .map(|_| {
            let handle = handle.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                handle.cancel()
            })
        })
        .collect();

    let wins = cancellers
        .into_iter()
        .map(|c| c.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(wins, 1);
    assert_eq!(handle.result(), Some(&Err(TaskError::Cancelled)));
    executor.shutdown_blocking();
    assert_eq!(executor.stats().cancelled, 1);
}

#[test]
fn test_terminal_state_never_reverts() {
    let handle = Handle::ready(Ok("fixed"));
    assert!(!handle.cancel());
    for _ in 0..3 {
        assert!(handle.is_finished());
        assert_eq!(handle.wait_blocking(), Ok("fixed"));
    }
}

#[test]
fn test_debug_format() {
    let handle = Handle::<u8>::ready(Ok(1));
    let rendered = format!("{:?}", handle);
    assert!(rendered.starts_with("Handle"));
    assert!(rendered.contains("completed"));
}
