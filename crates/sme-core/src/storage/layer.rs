//! tracing layer that copies WARN and ERROR events into `system_logs`

use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use super::store::LogStore;
use super::types::NewSystemLog;

const STORAGE_TARGET: &str = "sme_core::storage";

/// Persists WARN/ERROR events through a [`LogStore`]
///
/// Recognised fields: the message, `user_id`, and `error_details` (or
/// `error`). Events from the storage module itself are skipped so a failing
/// write cannot feed back into the database.
#[derive(Clone)]
pub struct SystemLogLayer {
    store: LogStore,
}

impl SystemLogLayer {
    pub fn new(store: LogStore) -> Self {
        Self { store }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    user_id: Option<String>,
    error_details: Option<String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.store(field, format!("{:?}", value));
    }
}

impl FieldVisitor {
    fn store(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            "user_id" => self.user_id = Some(value),
            "error_details" | "error" => self.error_details = Some(value),
            _ => {}
        }
    }
}

impl<S: Subscriber> Layer<S> for SystemLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > Level::WARN || meta.target().starts_with(STORAGE_TARGET) {
            return;
        }
        if !self.store.is_enabled() {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.store.log_system(NewSystemLog {
            level: meta.level().to_string(),
            message: visitor.message.unwrap_or_default(),
            user_id: visitor.user_id,
            error_details: visitor.error_details,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_warn_and_error_are_persisted() {
        let store = LogStore::in_memory().unwrap();
        let subscriber = tracing_subscriber::registry().with(SystemLogLayer::new(store.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("not stored");
            tracing::warn!(user_id = "U1", "slow reply");
            tracing::error!(error_details = "timeout", "model call failed");
        });

        let logs = store.system_logs(1, 20, None).unwrap();
        assert_eq!(logs.total, 2);

        let error = logs.items.iter().find(|l| l.level == "ERROR").unwrap();
        assert_eq!(error.message, "model call failed");
        assert_eq!(error.error_details.as_deref(), Some("timeout"));

        let warn = logs.items.iter().find(|l| l.level == "WARN").unwrap();
        assert_eq!(warn.user_id.as_deref(), Some("U1"));
    }
}
