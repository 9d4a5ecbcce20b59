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
fn test_acquire_creates_lock_file_and_releases_on_drop() {
    let dir = tempdir::TempDir::new("lock_basic");
    let layout = Layout::new(dir.0.clone(), 1000);
    assert!(!layout.write_lock().exists());

    {
        let _lock = WriteLock::acquire(&layout, Duration::from_millis(500)).unwrap();
        assert!(layout.write_lock().exists());
    }

    let _second = WriteLock::acquire(&layout, Duration::from_millis(500)).unwrap();
}

#[test]
fn test_acquire_blocks_while_held_then_succeeds_after_release() {
    let dir = tempdir::TempDir::new("lock_contend");
    let layout = Layout::new(dir.0.clone(), 1000);

    let holder = WriteLock::acquire(&layout, Duration::from_millis(500)).unwrap();
    let layout2 = layout.clone();
    let handle = thread::spawn(move || WriteLock::acquire(&layout2, Duration::from_secs(2)));

    thread::sleep(Duration::from_millis(150));
    drop(holder);

    let result = handle.join().unwrap();
    assert!(result.is_ok());
}

#[test]
fn test_acquire_times_out_while_held() {
    let dir = tempdir::TempDir::new("lock_timeout");
    let layout = Layout::new(dir.0.clone(), 1000);

    let _holder = WriteLock::acquire(&layout, Duration::from_millis(500)).unwrap();
    let result = WriteLock::acquire(&layout, Duration::from_millis(150));
    assert!(result.is_err());
}
