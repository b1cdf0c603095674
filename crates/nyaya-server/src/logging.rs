use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use serde_json::{Map, Value};
use tokio::sync::broadcast;

pub(crate) const RING_CAPACITY: usize = 500;

pub(crate) type LogRing = Arc<Mutex<VecDeque<String>>>;

/// Tracing layer that mirrors events as JSON lines into a bounded ring and
/// a broadcast channel, for the `/api/logs` stream.
pub(crate) struct BroadcastLayer {
    pub tx: broadcast::Sender<String>,
    pub ring: LogRing,
}

impl BroadcastLayer {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self {
            tx,
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(RING_CAPACITY))),
        }
    }
}

impl Default for BroadcastLayer {
    fn default() -> Self {
        Self::new()
    }
}

struct FieldVisitor<'a> {
    message: &'a mut String,
    fields: &'a mut Map<String, Value>,
}

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            *self.message = value.to_string();
        } else {
            self.fields.insert(field.name().into(), value.into());
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.insert(field.name().into(), value.into());
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.insert(field.name().into(), value.into());
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields.insert(field.name().into(), value.into());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let mut rendered = format!("{value:?}");
        // Strip surrounding quotes added by Debug on &str
        if rendered.len() >= 2 && rendered.starts_with('"') && rendered.ends_with('"') {
            rendered = rendered[1..rendered.len() - 1].to_string();
        }
        if field.name() == "message" {
            *self.message = rendered;
        } else {
            self.fields.insert(field.name().into(), rendered.into());
        }
    }
}

/// Coarse grouping for the log viewer.
pub(crate) fn category(target: &str) -> &'static str {
    if target.starts_with("nyaya_agent") {
        "llm"
    } else if target.starts_with("nyaya_core") {
        "court"
    } else {
        "system"
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for BroadcastLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let level = match *event.metadata().level() {
            tracing::Level::ERROR => "err",
            tracing::Level::WARN => "warn",
            tracing::Level::INFO => "info",
            tracing::Level::DEBUG => "debug",
            tracing::Level::TRACE => return,
        };

        let mut message = String::new();
        let mut fields = Map::new();
        event.record(&mut FieldVisitor {
            message: &mut message,
            fields: &mut fields,
        });

        let json = serde_json::json!({
            "ts": chrono::Utc::now().timestamp(),
            "level": level,
            "category": category(event.metadata().target()),
            "message": message,
            "fields": fields,
        })
        .to_string();

        let _ = self.tx.send(json.clone());
        if let Ok(mut ring) = self.ring.lock() {
            ring.push_back(json);
            if ring.len() > RING_CAPACITY {
                ring.pop_front();
            }
        }
    }
}
