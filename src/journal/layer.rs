//! Tracing layer that mirrors log events into the active journal

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use super::registry::JournalRegistry;

/// Forwards every event to whichever journal is active in the registry
pub struct JournalLayer {
    registry: Arc<JournalRegistry>,
}

impl JournalLayer {
    pub fn new(registry: Arc<JournalRegistry>) -> Self {
        Self { registry }
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: Map<String, Value>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields
                .insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .insert(field.name().to_string(), Value::String(format!("{value:?}")));
        }
    }
}

impl<S: Subscriber> Layer<S> for JournalLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let Some(journal) = self.registry.get_global() else {
            return;
        };

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        journal.store_message(
            metadata.level().as_str(),
            metadata.target(),
            &visitor.message,
            Value::Object(visitor.fields),
        );
    }
}
