use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that read or write process environment variables.
pub fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|poison| poison.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn env_lock_is_usable_after_panic_in_prior_holder() {
        let handle = thread::spawn(|| {
            let _guard = env_lock();
            panic!("poison env lock");
        });

        assert!(handle.join().is_err());

        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let _guard = env_lock();
            tx.send(()).expect("send acquired");
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok(()));
        assert!(handle.join().is_ok());
    }
}
