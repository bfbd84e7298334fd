//! Background task handles.
//!
//! Each engine operation runs on its own worker thread with its own
//! cancel flag. Handles follow last-query-wins at the caller's
//! discretion: cancel the previous handle, then spawn the replacement.

use std::thread::{self, JoinHandle};

use crate::error::EngineError;
use crate::signal::{cancel_flag, is_cancelled, request_cancel, CancelFlag};

/// Handle to one running engine task.
pub struct TaskHandle<T> {
    cancel: CancelFlag,
    handle: JoinHandle<Result<T, EngineError>>,
}

impl<T: Send + 'static> TaskHandle<T> {
    /// Spawn `f` on a worker thread with a fresh cancel flag.
    pub fn spawn<F>(f: F) -> Self
    where
        F: FnOnce(CancelFlag) -> Result<T, EngineError> + Send + 'static,
    {
        Self::spawn_with_flag(cancel_flag(), f)
    }

    /// Spawn `f` with an externally owned flag, e.g. one already wired
    /// to a Ctrl-C handler.
    pub fn spawn_with_flag<F>(cancel: CancelFlag, f: F) -> Self
    where
        F: FnOnce(CancelFlag) -> Result<T, EngineError> + Send + 'static,
    {
        let task_flag = CancelFlag::clone(&cancel);
        let handle = thread::spawn(move || f(task_flag));
        Self { cancel, handle }
    }

    /// Request cooperative cancellation. Returns immediately; the task
    /// reaches its terminal state on its own.
    pub fn cancel(&self) {
        request_cancel(&self.cancel);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        is_cancelled(&self.cancel)
    }

    /// Whether the worker has reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task's terminal result.
    ///
    /// # Errors
    ///
    /// Whatever the task itself returned, [`EngineError::Cancelled`]
    /// included. A panicking task propagates its panic.
    pub fn join(self) -> Result<T, EngineError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Cancel, then wait for the terminal state.
    ///
    /// # Errors
    ///
    /// See [`TaskHandle::join`]; typically [`EngineError::Cancelled`].
    pub fn cancel_and_join(self) -> Result<T, EngineError> {
        self.cancel();
        self.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn task_result_travels_through_join() {
        let handle = TaskHandle::spawn(|_| Ok(41 + 1));
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn task_error_travels_through_join() {
        let handle: TaskHandle<()> = TaskHandle::spawn(|_| Err(EngineError::EmptySelection));
        assert!(matches!(handle.join(), Err(EngineError::EmptySelection)));
    }

    #[test]
    fn cancel_reaches_a_looping_task() {
        let handle: TaskHandle<()> = TaskHandle::spawn(|cancel| loop {
            if is_cancelled(&cancel) {
                return Err(EngineError::Cancelled);
            }
            thread::sleep(Duration::from_millis(1));
        });
        let result = handle.cancel_and_join();
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[test]
    fn external_flag_is_shared_with_the_task() {
        let flag = cancel_flag();
        let handle: TaskHandle<bool> =
            TaskHandle::spawn_with_flag(CancelFlag::clone(&flag), |cancel| loop {
                if is_cancelled(&cancel) {
                    return Ok(true);
                }
                thread::sleep(Duration::from_millis(1));
            });
        request_cancel(&flag);
        assert!(handle.join().unwrap());
    }
}
