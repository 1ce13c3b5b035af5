// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structured log events for hosts that want to show engine activity.
//!
//! [`LogSinkLayer`] plugs into a `tracing_subscriber` registry and forwards
//! every event it sees as a [`LogEvent`] over an `mpsc` channel.

use std::fmt::Write as _;
use std::sync::mpsc;
use std::time::SystemTime;

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Very verbose diagnostics
    Trace,
    /// Diagnostics
    Debug,
    /// Normal activity
    Info,
    /// Something was skipped or failed locally
    Warn,
    /// Something failed
    Error,
}

impl LogLevel {
    /// Upper-case name
    pub fn name(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    /// Text colour used when the event is shown in the canvas status line
    pub fn color(self) -> egui::Color32 {
        match self {
            Self::Trace => egui::Color32::from_rgb(100, 100, 100),
            Self::Debug => egui::Color32::from_rgb(150, 150, 150),
            Self::Info => egui::Color32::from_rgb(200, 200, 200),
            Self::Warn => egui::Color32::from_rgb(255, 200, 80),
            Self::Error => egui::Color32::from_rgb(255, 100, 100),
        }
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Self::Trace,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::ERROR => Self::Error,
        }
    }
}

/// One captured log event
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// Severity
    pub level: LogLevel,
    /// Message text, followed by any extra fields
    pub text: String,
    /// Module path that emitted the event
    pub target: String,
    /// When the event was captured
    pub timestamp: SystemTime,
}

impl LogEvent {
    /// Render as `HH:MM:SS LEVEL text` (UTC)
    pub fn format_line(&self) -> String {
        format!(
            "{} {:<5} {}",
            format_system_time(&self.timestamp),
            self.level.name(),
            self.text
        )
    }
}

fn format_system_time(time: &SystemTime) -> String {
    let secs = time
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}

/// A `tracing_subscriber::Layer` that forwards events as [`LogEvent`]s
#[derive(Debug)]
pub struct LogSinkLayer {
    sender: mpsc::Sender<LogEvent>,
}

impl LogSinkLayer {
    /// Create a layer and the receiving end of its channel
    pub fn new() -> (Self, mpsc::Receiver<LogEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl<S> tracing_subscriber::Layer<S> for LogSinkLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let meta = event.metadata();
        // A dropped receiver only means nobody is listening any more
        let _ = self.sender.send(LogEvent {
            level: LogLevel::from(*meta.level()),
            text: visitor.finish(),
            target: meta.target().to_string(),
            timestamp: SystemTime::now(),
        });
    }
}

/// Collects the `message` field plus any other fields as `name = value`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn push_field(&mut self, name: &str, value: &dyn std::fmt::Display) {
        if !self.fields.is_empty() {
            self.fields.push_str(", ");
        }
        let _ = write!(self.fields, "{name} = {value}");
    }

    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} ({})", self.message, self.fields),
        }
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field.name(), &format_args!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), &value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_events_are_forwarded() {
        let (layer, receiver) = LogSinkLayer::new();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Added node {}", "node-1");
            tracing::warn!(edge = "a -> b", "Skipping edge");
        });

        let events: Vec<LogEvent> = receiver.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, LogLevel::Info);
        assert_eq!(events[0].text, "Added node node-1");
        assert_eq!(events[1].level, LogLevel::Warn);
        assert_eq!(events[1].text, "Skipping edge (edge = a -> b)");
        assert!(events[1].target.contains("log_sink"));
    }

    #[test]
    fn test_format_line() {
        let event = LogEvent {
            level: LogLevel::Warn,
            text: "Hook failed".into(),
            target: "noodle_editor_graph".into(),
            timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(3600 + 2 * 60 + 5),
        };
        assert_eq!(event.format_line(), "01:02:05 WARN  Hook failed");
    }
}
