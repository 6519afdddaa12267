// Notification Service Port
//
// Fire-and-forget: callers never observe delivery success or failure and
// only notify after the transition has committed.

use crate::domain::Notification;
use async_trait::async_trait;

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn notify(&self, notification: Notification);
}

pub mod mocks {
    use super::*;
    use crate::domain::NotificationKind;
    use std::sync::Mutex;

    /// Keeps every notification in memory
    #[derive(Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<Notification> {
            self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }

        pub fn sent_to(&self, user_id: &str) -> Vec<Notification> {
            self.sent()
                .into_iter()
                .filter(|n| n.user_id == user_id)
                .collect()
        }

        pub fn count_of(&self, kind: NotificationKind) -> usize {
            self.sent().iter().filter(|n| n.kind == kind).count()
        }

        pub fn clear(&self) {
            self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }
    }

    #[async_trait]
    impl NotificationService for RecordingNotifier {
        async fn notify(&self, notification: Notification) {
            self.sent
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(notification);
        }
    }
}
