//! Cooperative cancellation and Ctrl+C handling.
//!
//! Every long-running engine task owns a [`CancelFlag`] checked at the top
//! of each loop iteration (per directory, per file, per batch). Raising the
//! flag guarantees the task reaches a terminal state within one iteration;
//! nothing is ever forcibly terminated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cooperative cancellation flag.
pub type CancelFlag = Arc<AtomicBool>;

/// Create a fresh, unset cancel flag.
#[must_use]
pub fn cancel_flag() -> CancelFlag {
    Arc::new(AtomicBool::new(false))
}

/// Check whether cancellation has been requested on a flag.
#[must_use]
pub fn is_cancelled(flag: &CancelFlag) -> bool {
    flag.load(Ordering::SeqCst)
}

/// Request cancellation on a flag.
pub fn request_cancel(flag: &CancelFlag) {
    flag.store(true, Ordering::SeqCst);
}

/// Install a Ctrl+C handler that raises the returned flag.
///
/// The first signal raises the flag so in-flight tasks wind down
/// cooperatively; running tasks then terminate in their `Cancelled` state.
///
/// # Errors
///
/// Returns an error if the process-wide handler cannot be installed
/// (it can only be installed once).
pub fn install_handler() -> Result<CancelFlag, ctrlc::Error> {
    let flag = cancel_flag();
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || {
        eprintln!("Interrupted, finishing current step...");
        handler_flag.store(true, Ordering::SeqCst);
    })?;
    Ok(flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_starts_unset() {
        let flag = cancel_flag();
        assert!(!is_cancelled(&flag));
    }

    #[test]
    fn request_is_visible_through_clones() {
        let flag = cancel_flag();
        let other = Arc::clone(&flag);
        request_cancel(&flag);
        assert!(is_cancelled(&other));
    }
}
