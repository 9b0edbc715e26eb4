use async_trait::async_trait;
use tracing::info;

use crate::app::ports::MessageSenderPort;
use crate::outreach::model::OutreachMessage;

/// Sender that only logs. Used for dry runs; real delivery is a collaborator's job.
pub struct LogOnlySender;

#[async_trait]
impl MessageSenderPort for LogOnlySender {
    async fn send(&self, to: &str, message: &OutreachMessage) -> Result<(), String> {
        info!(
            to,
            thread_id = %message.thread_id,
            message_id = %message.id,
            subject = %message.subject,
            "Dry-run send"
        );
        Ok(())
    }
}
