//! Fire-and-forget CO2 alert dispatch.
//!
//! The write path only hands a message to a bounded queue; the worker task
//! fans it out to the institution's users. A slow or failing push provider
//! can therefore never delay or fail an ingestion request.

mod worker;

pub use worker::AlertWorker;

use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub institution_name: String,
    pub serial_num: String,
    pub co2: f64,
}

#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<AlertMessage>,
}

impl Notifier {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AlertMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Non-blocking enqueue; a full or closed queue drops the alert with a
    /// warning.
    pub fn co2_alert(&self, institution_name: String, serial_num: String, co2: f64) {
        let message = AlertMessage { institution_name, serial_num, co2 };
        if let Err(e) = self.tx.try_send(message) {
            warn!(error = %e, "alert queue unavailable, dropping CO2 alert");
        }
    }
}
