//! One-shot continue signal for blocking host phases.
//!
//! Asset emission is a checkpoint: the host does not move on until the
//! listener signals. A [`Continue`] fires exactly once, either when
//! [`Continue::resume`] is called or when the token is dropped, so no code
//! path can leave the host waiting.

use std::fmt;

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Completion token handed to [`BuildListener::on_artifacts_ready`].
///
/// [`BuildListener::on_artifacts_ready`]: crate::BuildListener::on_artifacts_ready
pub struct Continue {
    callback: Option<Callback>,
}

impl Continue {
    /// Wrap the host's continue callback.
    pub fn new(callback: impl FnOnce() + Send + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// A token for hosts that proceed as soon as the call returns.
    pub fn detached() -> Self {
        Self { callback: None }
    }

    /// Signal the host to proceed.
    pub fn resume(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }
}

impl Drop for Continue {
    fn drop(&mut self) {
        if self.callback.is_some() {
            tracing::debug!("continue token dropped without resume, releasing host");
            self.fire();
        }
    }
}

impl fmt::Debug for Continue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continue")
            .field("pending", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (Arc<AtomicUsize>, Continue) {
        let count = Arc::new(AtomicUsize::new(0));
        let token = {
            let count = Arc::clone(&count);
            Continue::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        (count, token)
    }

    #[test]
    fn test_resume_fires_once() {
        let (count, token) = counting();
        token.resume();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_fires_when_not_resumed() {
        let (count, token) = counting();
        drop(token);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detached_is_noop() {
        Continue::detached().resume();
    }
}
