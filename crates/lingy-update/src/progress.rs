use tokio::sync::mpsc;

use crate::install::InstallState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateProgress {
    Checking,
    UpdateAvailable { version: String },
    Downloading { downloaded: u64, total: u64 },
    Verifying,
    Extracting,
    Applying,
    HandedOff(InstallState),
}

/// Best-effort progress channel.
///
/// Events are dropped when the receiver is gone or lagging; reporting never
/// stalls the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender(Option<mpsc::Sender<UpdateProgress>>);

impl ProgressSender {
    #[must_use]
    pub fn new(sender: mpsc::Sender<UpdateProgress>) -> Self {
        Self(Some(sender))
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self(None)
    }

    pub fn send(&self, progress: UpdateProgress) {
        if let Some(sender) = &self.0 {
            let _ = sender.try_send(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::{ProgressSender, UpdateProgress};

    #[test]
    fn send_delivers_while_capacity_remains() {
        let (tx, mut rx) = mpsc::channel(1);
        let progress = ProgressSender::new(tx);

        progress.send(UpdateProgress::Checking);
        progress.send(UpdateProgress::Extracting);

        assert_eq!(rx.try_recv(), Ok(UpdateProgress::Checking));
        assert!(rx.try_recv().is_err(), "overflowing event should be dropped");
    }

    #[test]
    fn disabled_and_closed_senders_are_noops() {
        ProgressSender::disabled().send(UpdateProgress::Applying);

        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        ProgressSender::new(tx).send(UpdateProgress::Verifying);
    }
}
