use tokio::sync::watch;

/// Receiving half of the stop request raised on Ctrl-C.
///
/// Work loops poll [`Shutdown::is_requested`] at entity boundaries; the
/// scheduler awaits [`Shutdown::wait`] while sleeping between iterations.
#[derive(Clone, Debug)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn shutdown_channel() -> (watch::Sender<bool>, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (tx, Shutdown { rx })
}

impl Shutdown {
    /// A signal that is never raised.
    pub fn never() -> Self {
        shutdown_channel().1
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                // sender gone without a request: nothing will ever arrive
                std::future::pending::<()>().await;
            }
        }
    }
}
