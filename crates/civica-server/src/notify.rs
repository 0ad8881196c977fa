use async_trait::async_trait;
use civica_model::{Complaint, ComplaintStatus, EmailAddress};
use serde_json::json;
use std::time::Duration;
use tracing::info;

#[derive(Debug)]
pub struct NotifyError(pub String);

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for NotifyError {}

/// Outbound email notifications. Every call site is best-effort: a
/// delivery failure is logged and never fails the triggering write.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn complaint_submitted(
        &self,
        to: &EmailAddress,
        complaint: &Complaint,
    ) -> Result<(), NotifyError>;

    async fn status_changed(
        &self,
        to: &EmailAddress,
        complaint: &Complaint,
        previous: ComplaintStatus,
    ) -> Result<(), NotifyError>;

    async fn long_pending_reported(
        &self,
        to: &EmailAddress,
        complaint: &Complaint,
    ) -> Result<(), NotifyError>;
}

/// Posts one JSON message to the configured relay. One attempt, no
/// retry.
pub struct HttpNotifier {
    client: reqwest::Client,
    relay_url: String,
    token: Option<String>,
    from: String,
}

impl HttpNotifier {
    pub fn new(
        relay_url: String,
        token: Option<String>,
        from: String,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError(format!("relay client build failed: {e}")))?;
        Ok(Self {
            client,
            relay_url,
            token,
            from,
        })
    }

    async fn send(&self, to: &EmailAddress, subject: &str, body: String) -> Result<(), NotifyError> {
        let mut req = self.client.post(&self.relay_url).json(&json!({
            "from": self.from,
            "to": to.as_str(),
            "subject": subject,
            "body": body,
        }));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| NotifyError(format!("relay request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(NotifyError(format!("relay returned {}", resp.status())));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn complaint_submitted(
        &self,
        to: &EmailAddress,
        complaint: &Complaint,
    ) -> Result<(), NotifyError> {
        self.send(
            to,
            "Complaint received",
            format!(
                "Your complaint {} ({}) was received and is pending review.",
                complaint.id,
                complaint.title.as_str()
            ),
        )
        .await
    }

    async fn status_changed(
        &self,
        to: &EmailAddress,
        complaint: &Complaint,
        previous: ComplaintStatus,
    ) -> Result<(), NotifyError> {
        self.send(
            to,
            "Complaint status updated",
            format!(
                "Complaint {} moved from {} to {}.",
                complaint.id, previous, complaint.status
            ),
        )
        .await
    }

    async fn long_pending_reported(
        &self,
        to: &EmailAddress,
        complaint: &Complaint,
    ) -> Result<(), NotifyError> {
        self.send(
            to,
            "Long-pending complaint reported",
            format!(
                "Complaint {} ({}) has been pending beyond the review window.",
                complaint.id,
                complaint.title.as_str()
            ),
        )
        .await
    }
}

/// Used when no relay is configured: logs the attempt and succeeds.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn complaint_submitted(
        &self,
        to: &EmailAddress,
        complaint: &Complaint,
    ) -> Result<(), NotifyError> {
        info!(to = to.as_str(), complaint = %complaint.id, "email: complaint submitted");
        Ok(())
    }

    async fn status_changed(
        &self,
        to: &EmailAddress,
        complaint: &Complaint,
        previous: ComplaintStatus,
    ) -> Result<(), NotifyError> {
        info!(
            to = to.as_str(),
            complaint = %complaint.id,
            from = %previous,
            status = %complaint.status,
            "email: status changed"
        );
        Ok(())
    }

    async fn long_pending_reported(
        &self,
        to: &EmailAddress,
        complaint: &Complaint,
    ) -> Result<(), NotifyError> {
        info!(to = to.as_str(), complaint = %complaint.id, "email: long-pending reported");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyRecord {
    Submitted { to: String, complaint: String },
    StatusChanged {
        to: String,
        complaint: String,
        from: ComplaintStatus,
        to_status: ComplaintStatus,
    },
    LongPendingReported { to: String, complaint: String },
}

/// Test double that records every attempt.
#[derive(Default)]
pub struct RecordingNotifier {
    records: tokio::sync::Mutex<Vec<NotifyRecord>>,
}

impl RecordingNotifier {
    pub async fn records(&self) -> Vec<NotifyRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn complaint_submitted(
        &self,
        to: &EmailAddress,
        complaint: &Complaint,
    ) -> Result<(), NotifyError> {
        self.records.lock().await.push(NotifyRecord::Submitted {
            to: to.as_str().to_string(),
            complaint: complaint.id.as_str().to_string(),
        });
        Ok(())
    }

    async fn status_changed(
        &self,
        to: &EmailAddress,
        complaint: &Complaint,
        previous: ComplaintStatus,
    ) -> Result<(), NotifyError> {
        self.records.lock().await.push(NotifyRecord::StatusChanged {
            to: to.as_str().to_string(),
            complaint: complaint.id.as_str().to_string(),
            from: previous,
            to_status: complaint.status,
        });
        Ok(())
    }

    async fn long_pending_reported(
        &self,
        to: &EmailAddress,
        complaint: &Complaint,
    ) -> Result<(), NotifyError> {
        self.records
            .lock()
            .await
            .push(NotifyRecord::LongPendingReported {
                to: to.as_str().to_string(),
                complaint: complaint.id.as_str().to_string(),
            });
        Ok(())
    }
}
