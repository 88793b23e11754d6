//! Concurrent access tests for atomic writes and lock files
//!
//! Verifies that readers never observe a torn write and that the lock file
//! serializes read-modify-write cycles.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use tempfile::tempdir;
use toys_fs::{FileLock, RobustnessConfig, io};

#[test]
fn test_concurrent_writes_no_corruption() {
    let dir = tempdir().unwrap();
    let file_path = Arc::new(dir.path().join("concurrent.txt"));

    let num_threads = 8;
    let writes_per_thread = 20;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let path = Arc::clone(&file_path);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                for i in 0..writes_per_thread {
                    let content = format!("thread{}:write{}\n", thread_id, i);
                    io::write_atomic(&path, content.as_bytes(), RobustnessConfig::default())
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread should not panic");
    }

    let content = std::fs::read_to_string(file_path.as_ref()).unwrap();
    assert!(content.starts_with("thread"), "got: {}", content);
    assert_eq!(content.matches("thread").count(), 1, "writes interleaved: {}", content);
}

#[test]
fn test_locked_increments_are_not_lost() {
    let dir = tempdir().unwrap();
    let counter = Arc::new(dir.path().join("counter.txt"));
    std::fs::write(counter.as_ref(), "0").unwrap();

    let num_threads = 6;
    let increments = 15;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let counter = Arc::clone(&counter);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..increments {
                    let _lock = FileLock::exclusive(&counter, Duration::from_secs(30)).unwrap();
                    let value: u32 = io::read_text(&counter).unwrap().trim().parse().unwrap();
                    io::write_atomic(
                        &counter,
                        (value + 1).to_string().as_bytes(),
                        RobustnessConfig {
                            enable_fsync: false,
                            ..Default::default()
                        },
                    )
                    .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread should not panic");
    }

    let final_value: u32 = std::fs::read_to_string(counter.as_ref())
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert_eq!(final_value, (num_threads * increments) as u32);
}
