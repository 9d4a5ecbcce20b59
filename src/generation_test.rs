use super::*;

mod tempdir {
    use std::path::PathBuf;

    pub struct TempDir(pub PathBuf);

    impl TempDir {
        pub fn new(tag: &str) -> TempDir {
            let pid = std::process::id();
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos();
            let dir = std::env::temp_dir().join(format!("fsfs-core-{}-{}-{}", tag, pid, nanos));
            std::fs::create_dir_all(&dir).unwrap();
            TempDir(dir)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }
}

#[test]
fn test_open_defaults_to_zero_for_fresh_repository() {
    let dir = tempdir::TempDir::new("generation_fresh");
    let layout = Layout::new(dir.0.clone(), 1000);
    let tracker = GenerationTracker::open(&layout).unwrap();
    assert_eq!(tracker.current(), 0);
    assert!(!tracker.is_write_in_progress());
}

#[test]
fn test_begin_and_commit_round_trip_through_disk() {
    let dir = tempdir::TempDir::new("generation_round_trip");
    let layout = Layout::new(dir.0.clone(), 1000);
    let tracker = GenerationTracker::open(&layout).unwrap();

    let guard = tracker.begin_write().unwrap();
    assert_eq!(tracker.current(), 1);
    assert!(tracker.is_write_in_progress());
    guard.commit().unwrap();
    assert_eq!(tracker.current(), 2);
    assert!(!tracker.is_write_in_progress());

    let reopened = GenerationTracker::open(&layout).unwrap();
    assert_eq!(reopened.current(), 2);
}

#[test]
fn test_recover_if_stale_noop_when_even() {
    let dir = tempdir::TempDir::new("generation_noop_even");
    let layout = Layout::new(dir.0.clone(), 1000);
    let tracker = GenerationTracker::open(&layout).unwrap();
    assert!(!tracker.recover_if_stale().unwrap());
    assert_eq!(tracker.current(), 0);
}

#[test]
fn test_recover_if_stale_waits_before_timeout() {
    let dir = tempdir::TempDir::new("generation_waits");
    let layout = Layout::new(dir.0.clone(), 1000);
    let tracker = GenerationTracker::open(&layout).unwrap();
    let _guard = tracker.begin_write().unwrap();

    assert!(!tracker.recover_if_stale().unwrap());
    assert_eq!(tracker.current(), 1);
}

#[test]
fn test_recover_if_stale_bumps_past_expired_deadline() {
    let dir = tempdir::TempDir::new("generation_expired");
    let layout = Layout::new(dir.0.clone(), 1000);
    let tracker = GenerationTracker::open(&layout).unwrap();
    let guard = tracker.begin_write().unwrap();
    tracker.deadline.store(1, SeqCst);

    assert!(tracker.recover_if_stale().unwrap());
    assert_eq!(tracker.current(), 2);
    assert!(!tracker.is_write_in_progress());

    std::mem::forget(guard);
}
