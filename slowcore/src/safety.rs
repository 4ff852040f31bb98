//! Safety utilities for crash-proof SlowOS applications.
//!
//! A panic inside one frame's drawing code should cost that frame, not
//! the whole app.

/// Run a closure, catching any panic. Returns the closure result on success,
/// or `fallback` on panic. Useful for per-frame rendering isolation.
pub fn catch_or<T>(fallback: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(val) => val,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("caught panic in frame, recovered: {}", msg);
            fallback
        }
    }
}
