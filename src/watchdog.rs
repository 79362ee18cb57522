//! Detection of connections that have been held for too long.
//!
//! A [`Watchdog`] is started once per process and handed to every
//! [`Connection`](crate::connection::Connection) that should be watched. Each connection owns a
//! [`ConnectionMonitor`] that records when and by which thread it was last used. A background
//! thread scans the registered monitors every `interval`; monitors of open connections unused
//! for longer than `threshold` are logged and, if `force_close` is set, their transport is shut
//! down. The owning thread then sees [`Error::ConnectionLost`](crate::error::Error) on its next
//! read instead of blocking forever.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::WatcherConfig;
use crate::conn::ShutdownHandle;
use crate::error::Result;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct MonitorState {
    open: bool,
    last_used: Instant,
    thread: Option<String>,
    transport: Option<ShutdownHandle>,
}

/// What the watchdog knows about one connection.
#[derive(Debug)]
pub struct ConnectionMonitor {
    id: u64,
    label: String,
    state: Mutex<MonitorState>,
}

impl ConnectionMonitor {
    /// A monitor for a closed connection, named `label` in log messages.
    pub fn new(label: impl Into<String>) -> Self {
        ConnectionMonitor {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
            state: Mutex::new(MonitorState {
                open: false,
                last_used: Instant::now(),
                thread: None,
                transport: None,
            }),
        }
    }

    /// The connection is open over a transport that `transport` shuts down.
    pub fn set_transport(&self, transport: ShutdownHandle) {
        let mut state = lock(&self.state);
        state.open = true;
        state.transport = Some(transport);
        state.last_used = Instant::now();
        state.thread = thread::current().name().map(str::to_string);
    }

    /// The connection is being used by the current thread.
    pub fn activate(&self) {
        let mut state = lock(&self.state);
        state.last_used = Instant::now();
        state.thread = thread::current().name().map(str::to_string);
    }

    /// The connection was closed by its owner.
    pub fn mark_closed(&self) {
        let mut state = lock(&self.state);
        state.open = false;
        state.transport = None;
        state.thread = None;
    }

    /// Whether the connection is open.
    pub fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    /// How long an open connection has gone unused. `None` if it is closed.
    pub fn idle_for(&self) -> Option<Duration> {
        let state = lock(&self.state);
        if state.open {
            Some(state.last_used.elapsed())
        } else {
            None
        }
    }

    /// Shut the transport down. Returns false if the connection was already closed.
    pub fn force_close(&self) -> bool {
        let transport = {
            let mut state = lock(&self.state);
            state.open = false;
            state.thread = None;
            state.transport.take()
        };
        match transport {
            Some(transport) => {
                transport.shutdown();
                true
            }
            None => false,
        }
    }

    fn last_thread(&self) -> Option<String> {
        lock(&self.state).thread.clone()
    }
}

#[derive(Debug)]
struct Shared {
    config: WatcherConfig,
    monitors: Mutex<HashMap<u64, Weak<ConnectionMonitor>>>,
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl Shared {
    fn scan(&self) -> usize {
        let monitors: Vec<Arc<ConnectionMonitor>> = {
            let mut registered = lock(&self.monitors);
            registered.retain(|_, monitor| monitor.strong_count() > 0);
            registered.values().filter_map(Weak::upgrade).collect()
        };

        let mut stale = 0;
        for monitor in monitors {
            let idle = match monitor.idle_for() {
                Some(idle) if idle > self.config.threshold => idle,
                _ => continue,
            };
            stale += 1;
            log::warn!(
                "connection {} unused for {:?}, last used by thread {}",
                monitor.label,
                idle,
                monitor.last_thread().as_deref().unwrap_or("<unnamed>")
            );
            if self.config.force_close && monitor.force_close() {
                log::warn!("closed connection {}", monitor.label);
            }
        }
        stale
    }

    fn run(&self) {
        let mut stopped = lock(&self.stopped);
        // a stop during a scan is not signalled again
        while !*stopped {
            let (guard, _) = self
                .wake
                .wait_timeout(stopped, self.config.interval)
                .unwrap_or_else(PoisonError::into_inner);
            stopped = guard;
            if *stopped {
                return;
            }
            drop(stopped);
            let stale = self.scan();
            if stale > 0 {
                log::debug!("watchdog scan found {} stale connections", stale);
            }
            stopped = lock(&self.stopped);
        }
    }
}

/// Periodically scans the registered connections.
#[derive(Debug)]
pub struct Watchdog {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// A watchdog that never scans on its own. [`Watchdog::scan`] still works.
    pub fn new(config: WatcherConfig) -> Self {
        Watchdog {
            shared: Arc::new(Shared {
                config,
                monitors: Mutex::new(HashMap::new()),
                stopped: Mutex::new(false),
                wake: Condvar::new(),
            }),
            thread: None,
        }
    }

    /// A watchdog scanning on a thread named `imap-watchdog`, unless `config` disables it.
    pub fn start(config: WatcherConfig) -> Result<Self> {
        let mut watchdog = Watchdog::new(config);
        if !watchdog.shared.config.enabled {
            log::debug!("connection watchdog disabled");
            return Ok(watchdog);
        }
        let shared = Arc::clone(&watchdog.shared);
        let thread = thread::Builder::new()
            .name("imap-watchdog".into())
            .spawn(move || shared.run())?;
        watchdog.thread = Some(thread);
        Ok(watchdog)
    }

    /// Watch `monitor` until the returned registration is dropped.
    pub fn register(&self, monitor: &Arc<ConnectionMonitor>) -> Registration {
        lock(&self.shared.monitors).insert(monitor.id, Arc::downgrade(monitor));
        Registration {
            shared: Arc::downgrade(&self.shared),
            id: monitor.id,
        }
    }

    /// Number of registered connections that still exist.
    pub fn len(&self) -> usize {
        lock(&self.shared.monitors)
            .values()
            .filter(|m| m.strong_count() > 0)
            .count()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scan once, now. Returns the number of stale connections found.
    pub fn scan(&self) -> usize {
        self.shared.scan()
    }

    /// Stop the background thread and wait for it.
    pub fn stop(&mut self) {
        *lock(&self.shared.stopped) = true;
        self.shared.wake.notify_all();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("watchdog thread panicked");
            }
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Keeps a connection registered with a [`Watchdog`].
#[derive(Debug)]
pub struct Registration {
    shared: Weak<Shared>,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.monitors).remove(&self.id);
        }
    }
}
