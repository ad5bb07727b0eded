//! # Signal subscriptions.
//!
//! A [`SignalSource`] turns a set of [`SignalKind`]s into a [`SignalListener`]:
//! an armed subscription that yields each tracked signal as it arrives.
//!
//! ```text
//! listen(kinds) ──► one forwarder per kind ──► mpsc ──► SignalListener::recv()
//!                                                          │
//!                                   drop(listener) ────────┘ aborts forwarders,
//!                                                            releasing the OS handlers
//! ```
//!
//! ## Sources
//! - [`OsSignals`] process signals via `tokio::signal` (Unix: INT/TERM/HUP/QUIT;
//!   elsewhere only `Interrupt` maps to Ctrl-C, other kinds never fire).
//! - [`ManualSignals`] in-process trigger, for tests and programmatic shutdown.
//!
//! ## Rules
//! - Registration errors surface from `listen`, before anything is spawned.
//! - A listener whose forwarders have all ended returns `None` forever; it
//!   never reports a signal that did not happen.
//! - Dropping the listener disarms it on every path (RAII).

use std::io;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::policies::SignalKind;

/// Produces armed signal subscriptions.
pub trait SignalSource: Send + Sync + 'static {
    /// Arms observation of `kinds`.
    fn listen(&self, kinds: &[SignalKind]) -> io::Result<SignalListener>;
}

/// An armed signal subscription. Disarmed on drop.
#[derive(Debug)]
pub struct SignalListener {
    rx: mpsc::UnboundedReceiver<SignalKind>,
    forwarders: Vec<JoinHandle<()>>,
}

impl SignalListener {
    fn channel() -> (mpsc::UnboundedSender<SignalKind>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                rx,
                forwarders: Vec::new(),
            },
        )
    }

    /// Waits for the next tracked signal.
    ///
    /// Returns `None` once every forwarder has ended.
    pub async fn recv(&mut self) -> Option<SignalKind> {
        self.rx.recv().await
    }
}

impl Drop for SignalListener {
    fn drop(&mut self) {
        for h in &self.forwarders {
            h.abort();
        }
    }
}

/// Process signals delivered by the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsSignals;

#[cfg(unix)]
impl SignalSource for OsSignals {
    fn listen(&self, kinds: &[SignalKind]) -> io::Result<SignalListener> {
        use tokio::signal::unix::{self, signal};

        let (tx, mut listener) = SignalListener::channel();
        for &kind in kinds {
            let os_kind = match kind {
                SignalKind::Interrupt => unix::SignalKind::interrupt(),
                SignalKind::Terminate => unix::SignalKind::terminate(),
                SignalKind::Hangup => unix::SignalKind::hangup(),
                SignalKind::Quit => unix::SignalKind::quit(),
            };
            // On error `listener` drops here and aborts what was already spawned.
            let mut stream = signal(os_kind)?;
            let tx = tx.clone();
            listener.forwarders.push(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if tx.send(kind).is_err() {
                        break;
                    }
                }
            }));
        }
        Ok(listener)
    }
}

#[cfg(not(unix))]
impl SignalSource for OsSignals {
    fn listen(&self, kinds: &[SignalKind]) -> io::Result<SignalListener> {
        let (tx, mut listener) = SignalListener::channel();
        if kinds.contains(&SignalKind::Interrupt) {
            let mut stream = tokio::signal::windows::ctrl_c()?;
            listener.forwarders.push(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if tx.send(SignalKind::Interrupt).is_err() {
                        break;
                    }
                }
            }));
        }
        Ok(listener)
    }
}

/// In-process signal trigger.
///
/// Every armed listener whose set contains the raised kind receives it.
/// Raising while nothing is armed is a no-op, exactly like a signal with
/// no handler installed would be ignored by this crate.
#[derive(Clone, Debug)]
pub struct ManualSignals {
    tx: broadcast::Sender<SignalKind>,
}

impl ManualSignals {
    /// Creates a trigger with no armed listeners.
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(16);
        Self { tx }
    }

    /// Delivers `kind` to armed listeners; returns how many subscriptions saw it.
    pub fn raise(&self, kind: SignalKind) -> usize {
        self.tx.send(kind).unwrap_or(0)
    }
}

impl Default for ManualSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSource for ManualSignals {
    fn listen(&self, kinds: &[SignalKind]) -> io::Result<SignalListener> {
        let (tx, mut listener) = SignalListener::channel();
        let mut rx = self.tx.subscribe();
        let kinds = kinds.to_vec();

        listener.forwarders.push(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(kind) if kinds.contains(&kind) => {
                        if tx.send(kind).is_err() {
                            break;
                        }
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
        Ok(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_delivers_tracked_kinds_only() {
        let source = ManualSignals::new();
        let mut listener = source.listen(&[SignalKind::Terminate]).unwrap();

        assert_eq!(source.raise(SignalKind::Interrupt), 1);
        assert_eq!(source.raise(SignalKind::Terminate), 1);
        assert_eq!(listener.recv().await, Some(SignalKind::Terminate));
    }

    #[tokio::test]
    async fn test_raise_without_listener_is_noop() {
        let source = ManualSignals::new();
        assert_eq!(source.raise(SignalKind::Interrupt), 0);
    }

    #[tokio::test]
    async fn test_each_listener_gets_its_own_copy() {
        let source = ManualSignals::new();
        let mut a = source.listen(&[SignalKind::Hangup]).unwrap();
        let mut b = source.listen(&[SignalKind::Hangup]).unwrap();

        assert_eq!(source.raise(SignalKind::Hangup), 2);
        assert_eq!(a.recv().await, Some(SignalKind::Hangup));
        assert_eq!(b.recv().await, Some(SignalKind::Hangup));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_os_listener_arms_and_disarms() {
        let listener = OsSignals.listen(&[SignalKind::Hangup]).unwrap();
        drop(listener);
    }
}
