use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerStatus {
    Idle,
    Running,
    Expired,
}

/// One-shot deadline clock for a single decision.
///
/// `start` spawns a waiter thread that flags the timer as expired once the budget has elapsed. The search polls `is_time_out` at every node, so cancellation is cooperative: a running node finishes its current step before noticing the deadline.
pub struct Timer {
    max_time: Duration,
    shared: Arc<Shared>,
    waiter: Option<thread::JoinHandle<()>>,
}

struct Shared {
    expired: AtomicBool,
    stop_requested: Mutex<bool>,
    wake_up: Condvar,
}

impl Timer {
    pub fn new(max_time: Duration) -> Self {
        Timer {
            max_time,
            shared: Arc::new(Shared {
                expired: AtomicBool::new(false),
                stop_requested: Mutex::new(false),
                wake_up: Condvar::new(),
            }),
            waiter: None,
        }
    }

    /// Starts the countdown. Returns false, and does nothing, if the budget is zero or the timer was already started.
    pub fn start(&mut self) -> bool {
        if self.max_time.is_zero() || self.waiter.is_some() {
            return false;
        }
        let shared = self.shared.clone();
        let max_time = self.max_time;
        let spawn_result = thread::Builder::new()
            .name("search-timer".to_string())
            .spawn(move || {
                let Ok(stop_requested) = shared.stop_requested.lock() else {
                    return;
                };
                let Ok((stop_requested, _)) =
                    shared
                        .wake_up
                        .wait_timeout_while(stop_requested, max_time, |stop| !*stop)
                else {
                    return;
                };
                if !*stop_requested {
                    shared.expired.store(true, Ordering::Release);
                }
            });
        match spawn_result {
            Ok(handle) => {
                self.waiter = Some(handle);
                true
            }
            Err(err) => {
                log::error!("Failed to spawn timer thread: {}", err);
                false
            }
        }
    }

    pub fn is_time_out(&self) -> bool {
        self.shared.expired.load(Ordering::Acquire)
    }

    pub fn status(&self) -> TimerStatus {
        if self.is_time_out() {
            TimerStatus::Expired
        } else if self.waiter.is_some() {
            TimerStatus::Running
        } else {
            TimerStatus::Idle
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Ok(mut stop_requested) = self.shared.stop_requested.lock() {
            *stop_requested = true;
        }
        self.shared.wake_up.notify_all();
        if let Some(waiter) = self.waiter.take() {
            if waiter.join().is_err() {
                log::error!("Timer thread panicked");
            }
        }
    }
}

#[test]
fn not_expired_right_after_start_test() {
    let mut timer = Timer::new(Duration::from_secs(1));
    assert_eq!(timer.status(), TimerStatus::Idle);
    assert!(timer.start());
    assert!(!timer.is_time_out());
    assert_eq!(timer.status(), TimerStatus::Running);
}

#[test]
fn expires_without_polling_test() {
    let mut timer = Timer::new(Duration::from_millis(200));
    assert!(timer.start());
    thread::sleep(Duration::from_millis(600));
    assert!(timer.is_time_out());
    assert_eq!(timer.status(), TimerStatus::Expired);
}

#[test]
fn zero_budget_never_starts_test() {
    let mut timer = Timer::new(Duration::ZERO);
    assert!(!timer.start());
    thread::sleep(Duration::from_millis(100));
    assert!(!timer.is_time_out());
    assert_eq!(timer.status(), TimerStatus::Idle);
}

#[test]
fn start_is_one_shot_test() {
    let mut timer = Timer::new(Duration::from_secs(5));
    assert!(timer.start());
    assert!(!timer.start());
}

#[test]
fn drop_joins_waiter_early_test() {
    let start = std::time::Instant::now();
    {
        let mut timer = Timer::new(Duration::from_secs(30));
        assert!(timer.start());
    }
    assert!(start.elapsed() < Duration::from_secs(5));
}
