// Notification sink used by the daemon: every notification becomes a log event

use async_trait::async_trait;
use shiftline_core::domain::Notification;
use shiftline_core::port::NotificationService;
use tracing::info;

pub struct TracingNotifier;

#[async_trait]
impl NotificationService for TracingNotifier {
    async fn notify(&self, notification: Notification) {
        info!(
            target: "shiftline::notifications",
            user_id = %notification.user_id,
            kind = ?notification.kind,
            title = %notification.title,
            message = %notification.message,
            payload = ?notification.payload,
            "Notification"
        );
    }
}
