use std::fmt;
use tokio::sync::mpsc;

type CancelHook = Box<dyn FnOnce() + Send>;

/// Continuous feed from a store.
///
/// Stops delivering as soon as [`Subscription::unsubscribe`] returns or the
/// value is dropped. `recv` yields `None` once the feed is stopped or the
/// store has closed it.
pub struct Subscription<T> {
    rx: Option<mpsc::UnboundedReceiver<T>>,
    cancel: Option<CancelHook>,
}

impl<T> Subscription<T> {
    pub fn new<F>(rx: mpsc::UnboundedReceiver<T>, cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            rx: Some(rx),
            cancel: Some(Box::new(cancel)),
        }
    }

    pub async fn recv(&mut self) -> Option<T> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }

    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
        self.rx = None;
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
