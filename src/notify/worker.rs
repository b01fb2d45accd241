use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::{
    models::User,
    store::{keys, SharedStore},
};

use super::AlertMessage;

/// Drains the alert queue and pushes one message per notification target.
/// Delivery is best-effort: failures are logged, never retried.
pub struct AlertWorker {
    rx: tokio::sync::mpsc::Receiver<AlertMessage>,
    store: SharedStore,
    http: Client,
    push_endpoint: Option<String>,
}

impl AlertWorker {
    pub fn new(
        rx: tokio::sync::mpsc::Receiver<AlertMessage>,
        store: SharedStore,
        push_endpoint: Option<String>,
    ) -> Self {
        Self {
            rx,
            store,
            http: Client::new(),
            push_endpoint,
        }
    }

    pub async fn run(mut self) {
        info!("alert worker started");
        while let Some(alert) = self.rx.recv().await {
            match self.alert_targets(&alert).await {
                Ok(targets) => {
                    for target in targets {
                        self.push(&target, &alert).await;
                    }
                }
                Err(e) => error!(error = %e, "failed to enumerate alert targets"),
            }
        }
    }

    /// Notification targets of every user in the alert's institution that
    /// has one registered.
    async fn alert_targets(
        &self,
        alert: &AlertMessage,
    ) -> Result<Vec<String>, crate::store::StoreError> {
        let user_keys = self.store.keys_by_prefix(keys::USER_PREFIX).await?;

        let mut targets = Vec::new();
        for key in user_keys {
            let fields = self.store.hash_get_all(&key).await?;
            let Some(user) = User::from_fields(&fields) else {
                continue;
            };
            if user.institution_name != alert.institution_name {
                continue;
            }
            if let Some(token) = user.fcm_token {
                targets.push(token);
            }
        }
        Ok(targets)
    }

    async fn push(&self, fcm_token: &str, alert: &AlertMessage) {
        let Some(endpoint) = self.push_endpoint.as_deref() else {
            debug!("no push endpoint configured, dropping alert");
            return;
        };

        let payload = json!({
            "to": fcm_token,
            "notification": {
                "title": "CO2 alert",
                "body": format!(
                    "Sensor {} reported CO2 at {:.0} ppm",
                    alert.serial_num, alert.co2
                ),
            },
        });

        let result = self.http.post(endpoint).json(&payload).send().await;
        match result.and_then(|resp| resp.error_for_status()) {
            Ok(_) => debug!(serial_num = %alert.serial_num, "CO2 alert delivered"),
            Err(e) => warn!(serial_num = %alert.serial_num, error = %e, "CO2 alert delivery failed"),
        }
    }
}
