//! The background thread that periodically flushes every logger, so buffered records are lost for
//! at most one interval when the process dies.

use once_cell::sync::{Lazy, OnceCell};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use crate::logger::Logger;

/// Every logger built with a flush interval. Only weak references are kept so loggers that are
/// dropped simply disappear from the list.
static LOGGERS: Lazy<Mutex<Vec<Weak<Logger>>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Set once the flusher thread has been spawned. Contains the interval it runs at.
static FLUSHER_INTERVAL: OnceCell<Duration> = OnceCell::new();

/// Add `logger` to the loggers flushed in the background, starting the flusher thread if it isn't
/// running yet.
pub fn register(logger: &Arc<Logger>, interval: Duration) {
    LOGGERS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Arc::downgrade(logger));

    FLUSHER_INTERVAL.get_or_init(|| {
        let spawned = std::thread::Builder::new()
            .name(String::from("svc-log-flusher"))
            .spawn(move || loop {
                std::thread::sleep(interval);
                flush_all();
            });
        if let Err(err) = spawned {
            eprintln!("Could not spawn the log flusher thread, logs are only flushed on warnings: {err}");
        }

        interval
    });
}

/// Flush every registered logger that is still alive.
pub fn flush_all() {
    // The list is copied so a slow flush never holds up loggers being registered
    let loggers: Vec<Arc<Logger>> = {
        let mut loggers = LOGGERS.lock().unwrap_or_else(PoisonError::into_inner);
        loggers.retain(|logger| logger.strong_count() > 0);
        loggers.iter().filter_map(Weak::upgrade).collect()
    };

    for logger in loggers {
        logger.flush();
    }
}
