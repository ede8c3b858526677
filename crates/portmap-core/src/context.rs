//! Per-call cancellation
//!
//! Every remote call made by the mapper goes through [`CallContext::run`],
//! which tags failures with the step they happened in and aborts the call
//! when the caller cancels. Aborting drops the in-flight future; whatever
//! the remote already applied stays applied.

use crate::error::{Error, RemoteStep, Result};
use std::future::Future;
use tokio::sync::watch;

/// Caller-supplied cancellation scope for one MapPorts/UnmapPorts call
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: Option<watch::Receiver<bool>>,
}

impl CallContext {
    /// Context that is never cancelled
    pub fn background() -> Self {
        Self::default()
    }

    /// Context cancelled once `true` is published on the channel
    pub fn with_cancel(cancel: watch::Receiver<bool>) -> Self {
        Self {
            cancel: Some(cancel),
        }
    }

    /// Whether cancellation has already been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Await one capability call as `step`
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if the context was or becomes cancelled first
    /// - [`Error::Remote`] wrapping the capability's own error
    pub async fn run<T, F>(&self, step: RemoteStep, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let Some(cancel) = &self.cancel else {
            return call.await.map_err(|e| Error::remote(step, e));
        };

        if *cancel.borrow() {
            return Err(Error::Cancelled { step });
        }

        let mut cancel = cancel.clone();
        let cancelled = async move {
            // A dropped sender can no longer cancel us.
            if cancel.wait_for(|c| *c).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = call => result.map_err(|e| Error::remote(step, e)),
            _ = cancelled => Err(Error::Cancelled { step }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_background_passes_result_through() {
        let ctx = CallContext::background();
        let out = tokio_test::block_on(ctx.run(RemoteStep::ZoneLookup, async { Ok(7) }));
        assert_eq!(out.unwrap(), 7);
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_error_is_tagged_with_step() {
        let ctx = CallContext::background();
        let err = tokio_test::block_on(ctx.run::<(), _>(RemoteStep::CnameList, async {
            Err(Error::http("boom"))
        }))
        .unwrap_err();
        assert_eq!(err.step(), Some(RemoteStep::CnameList));
        assert!(matches!(err, Error::Remote { .. }));
    }

    #[test]
    fn test_already_cancelled_skips_call() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let ctx = CallContext::with_cancel(rx);
        assert!(ctx.is_cancelled());

        let polled = std::cell::Cell::new(false);
        let err = tokio_test::block_on(ctx.run(RemoteStep::IngressUpdate, async {
            polled.set(true);
            Ok(())
        }))
        .unwrap_err();
        assert!(matches!(err, Error::Cancelled { step: RemoteStep::IngressUpdate }));
        assert!(!polled.get());
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_call() {
        let (tx, rx) = watch::channel(false);
        let ctx = CallContext::with_cancel(rx);

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(true).unwrap();
        });

        let err = ctx
            .run(RemoteStep::CnameInsert, async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await
            .unwrap_err();

        canceller.await.unwrap();
        assert!(matches!(err, Error::Cancelled { step: RemoteStep::CnameInsert }));
    }

    #[tokio::test]
    async fn test_dropped_sender_never_cancels() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let ctx = CallContext::with_cancel(rx);
        let out = ctx
            .run(RemoteStep::TunnelLookup, async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok("T1")
            })
            .await;
        assert_eq!(out.unwrap(), "T1");
    }
}
