//! Run-on-exit guards
//!
//! A [`ReleaseGuard`] runs its callback exactly once: when it is dropped, or
//! earlier through [`ReleaseGuard::release`]. Callback failures, whether a
//! returned error or a panic, are logged and discarded so they never replace
//! the outcome of the scope that owned the guard.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

type Callback<'a> = Box<dyn FnOnce() + Send + 'a>;

/// Guard returned by [`on_exit`] and [`on_exit_fallible`]
pub struct ReleaseGuard<'a> {
    label: &'static str,
    callback: Option<Callback<'a>>,
}

/// Run `callback` when the returned guard goes out of scope
pub fn on_exit<'a>(label: &'static str, callback: impl FnOnce() + Send + 'a) -> ReleaseGuard<'a> {
    ReleaseGuard {
        label,
        callback: Some(Box::new(callback)),
    }
}

/// Like [`on_exit`], for callbacks that report failure
pub fn on_exit_fallible<'a, E>(
    label: &'static str,
    callback: impl FnOnce() -> Result<(), E> + Send + 'a,
) -> ReleaseGuard<'a>
where
    E: fmt::Display,
{
    on_exit(label, move || {
        if let Err(e) = callback() {
            tracing::warn!(guard = label, error = %e, "Release callback failed");
        }
    })
}

impl ReleaseGuard<'_> {
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Whether the callback has not run yet
    pub fn is_armed(&self) -> bool {
        self.callback.is_some()
    }

    /// Run the callback now instead of at scope exit
    pub fn release(mut self) {
        self.do_release();
    }

    /// Drop the callback without running it
    pub fn defuse(mut self) {
        self.callback = None;
    }

    fn do_release(&mut self) {
        if let Some(callback) = self.callback.take() {
            if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
                tracing::warn!(guard = self.label, "Release callback panicked");
            }
        }
    }
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        self.do_release();
    }
}

impl fmt::Debug for ReleaseGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseGuard")
            .field("label", &self.label)
            .field("armed", &self.is_armed())
            .finish()
    }
}
