use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, warn};

use crate::clients::mail::Mailer;
use crate::domain::events::NotificationEvent;
use crate::services::mail_templates;

/// Handle to the mail outbox.
///
/// Events are pushed onto a bounded queue and delivered by a single background
/// worker. Enqueueing never blocks and never fails the caller.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<NotificationEvent>,
    in_flight: Arc<InFlight>,
}

/// Events accepted by the queue and not yet handled by the worker.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn done(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

impl Notifier {
    /// Spawn the delivery worker and return a handle to its queue.
    #[must_use]
    pub fn start(mailer: Arc<dyn Mailer>, team: String, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let in_flight = Arc::new(InFlight::default());
        tokio::spawn(run_worker(rx, mailer, team, in_flight.clone()));
        Self { tx, in_flight }
    }

    pub fn enqueue(&self, event: NotificationEvent) {
        let kind = event.kind();
        self.in_flight.count.fetch_add(1, Ordering::AcqRel);
        match self.tx.try_send(event) {
            Ok(()) => {
                debug!(kind, "Notification queued");
            }
            Err(TrySendError::Full(event)) => {
                self.in_flight.done();
                metrics::counter!("mail_dropped_total", "kind" => kind).increment(1);
                warn!(kind, to = %event.recipient(), "Mail outbox full, dropping notification");
            }
            Err(TrySendError::Closed(_)) => {
                self.in_flight.done();
                metrics::counter!("mail_dropped_total", "kind" => kind).increment(1);
                error!(kind, "Mail outbox worker stopped, dropping notification");
            }
        }
    }

    /// Wait until every queued notification has been handled.
    ///
    /// Returns `false` if the queue did not drain within `timeout`.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let idle = self.in_flight.idle.notified();
            if self.in_flight.count.load(Ordering::Acquire) == 0 {
                return true;
            }
            if tokio::time::timeout_at(deadline, idle).await.is_err() {
                return self.in_flight.count.load(Ordering::Acquire) == 0;
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<NotificationEvent>,
    mailer: Arc<dyn Mailer>,
    team: String,
    in_flight: Arc<InFlight>,
) {
    while let Some(event) = rx.recv().await {
        let kind = event.kind();
        let message = mail_templates::render(&event, &team);

        match mailer.send(&message).await {
            Ok(()) => {
                metrics::counter!("mail_sent_total", "kind" => kind, "transport" => mailer.name())
                    .increment(1);
            }
            Err(e) => {
                metrics::counter!("mail_failed_total", "kind" => kind, "transport" => mailer.name())
                    .increment(1);
                warn!(kind, to = %message.to, error = %e, "Failed to deliver notification");
            }
        }
        in_flight.done();
    }

    debug!("Mail outbox closed");
}
