// Copyright 2025 The OntoCore Authors.

//! Event sink: synchronous notifications of parametric changes
//!
//! Replaces a pub-sub dispatcher with a small sink interface the core
//! invokes at well-defined points: individual value changes, deletions,
//! and the end of a recompute pass. The default [`NullSink`] ignores
//! everything; a GUI or sync layer supplies its own.

/// Receiver of parametric change notifications
pub trait EventSink {
    /// A parameter value was set
    fn on_parameter_changed(&mut self, _oid: &str, _pid: &str) {}

    /// A parameter was deleted from an object
    fn on_parameter_deleted(&mut self, _oid: &str, _pid: &str) {}

    /// A data element value was set
    fn on_data_element_changed(&mut self, _oid: &str, _deid: &str) {}

    /// A data element was deleted from an object
    fn on_data_element_deleted(&mut self, _oid: &str, _deid: &str) {}

    /// A full recompute pass finished
    fn on_parameters_recomputed(&mut self) {}
}

/// Sink that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {}

/// Sink that records events; for tests and diagnostics
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    /// Recorded events, as `(kind, oid, id)` triples
    pub events: Vec<(String, String, String)>,
}

impl EventSink for RecordingSink {
    fn on_parameter_changed(&mut self, oid: &str, pid: &str) {
        self.events
            .push(("parm set".to_string(), oid.to_string(), pid.to_string()));
    }

    fn on_parameter_deleted(&mut self, oid: &str, pid: &str) {
        self.events
            .push(("parm del".to_string(), oid.to_string(), pid.to_string()));
    }

    fn on_data_element_changed(&mut self, oid: &str, deid: &str) {
        self.events
            .push(("de set".to_string(), oid.to_string(), deid.to_string()));
    }

    fn on_data_element_deleted(&mut self, oid: &str, deid: &str) {
        self.events
            .push(("de del".to_string(), oid.to_string(), deid.to_string()));
    }

    fn on_parameters_recomputed(&mut self) {
        self.events.push((
            "recomputed".to_string(),
            String::new(),
            String::new(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink() {
        let mut sink = RecordingSink::default();
        sink.on_parameter_changed("o1", "m");
        sink.on_parameter_deleted("o1", "m");
        sink.on_parameters_recomputed();
        assert_eq!(sink.events.len(), 3);
        assert_eq!(sink.events[0].0, "parm set");
        assert_eq!(sink.events[2].0, "recomputed");
    }

    #[test]
    fn test_null_sink_is_silent() {
        let mut sink = NullSink;
        sink.on_parameter_changed("o1", "m");
        sink.on_parameters_recomputed();
    }
}
