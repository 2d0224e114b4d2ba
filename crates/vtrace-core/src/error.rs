//! Error types for log parsing and causal graph construction.

use thiserror::Error;

use crate::event::EventId;

/// Errors raised while constructing a vector timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The clock has no entry for the host that owns it.
    #[error("local host \"{host}\" is missing from timestamp")]
    MissingOwnHost {
        /// Host the timestamp was declared for
        host: String,
    },
}

/// Misuse of the [`NodeGraph`](crate::node::NodeGraph) primitive.
///
/// These signal a contract violation by the caller, never bad input data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NodeError {
    /// A node cannot be inserted after a tail sentinel.
    #[error("cannot insert after a tail node")]
    InsertAfterTail,

    /// A node cannot be inserted before a head sentinel.
    #[error("cannot insert before a head node")]
    InsertBeforeHead,

    /// Head and tail sentinels cannot be removed or moved.
    #[error("cannot remove a head or tail node")]
    RemoveSentinel,

    /// Head and tail sentinels take no part in family relations.
    #[error("head and tail nodes cannot have family")]
    SentinelFamily,

    /// Family relations link nodes on different hosts only.
    #[error("a node cannot be family of a node on its own host")]
    SameHostFamily,

    /// The operation needs a node that is linked into a host sequence.
    #[error("node is not linked into a host sequence")]
    Detached,

    /// The node id does not belong to this graph.
    #[error("unknown node: {0}")]
    UnknownNode(usize),
}

/// Errors that can occur while parsing logs or building the causal graph.
#[derive(Debug, Error)]
pub enum TraceError {
    /// A pattern lacks a capture group the parser depends on.
    #[error("pattern {pattern:?} does not define the named capture group \"{group}\"")]
    MissingGroup {
        /// The offending pattern source
        pattern: String,
        /// The group that must be present
        group: &'static str,
    },

    /// A pattern names the same capture group more than once.
    #[error("duplicate named capture group \"{group}\"")]
    DuplicateGroup {
        /// The repeated group name
        group: String,
    },

    /// A pattern failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A captured clock is not valid JSON.
    #[error("line {line}: could not parse vector timestamp {text:?}: {source}")]
    ClockSyntax {
        /// 1-indexed line of the match within its execution
        line: usize,
        /// Raw clock text as captured
        text: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// A captured clock parsed but is not a valid vector timestamp.
    #[error("line {line}: invalid vector timestamp {text:?}: {reason}")]
    InvalidClock {
        /// 1-indexed line of the match within its execution
        line: usize,
        /// Raw clock text as captured
        text: String,
        /// What is wrong with it
        reason: String,
    },

    /// Two executions resolved to the same label.
    #[error("execution labels must be unique, found \"{0}\" twice")]
    DuplicateLabel(String),

    /// An execution segment produced no events.
    #[error("pattern does not capture any events for execution \"{0}\"")]
    EmptyExecution(String),

    /// No event on `host` carries the clock value another event observed.
    #[error("event {event} observed {host}={clock} but no event on {host} has that clock value")]
    MissingCausalSource {
        /// The event whose happened-before edge was being resolved
        event: EventId,
        /// Host whose event is missing
        host: String,
        /// Clock value that was looked up
        clock: u64,
    },

    /// Rank assignment would have to revisit a host it is still processing.
    #[error("happened-before relation is cyclic around host \"{host}\"")]
    CausalCycle {
        /// Host that was re-entered
        host: String,
    },

    /// Structural misuse of the node primitive.
    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Result type alias for parsing and graph operations.
pub type Result<T> = std::result::Result<T, TraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = TraceError::DuplicateLabel("run-1".to_string());
        assert_eq!(
            err.to_string(),
            "execution labels must be unique, found \"run-1\" twice"
        );

        let err = TraceError::EmptyExecution(String::new());
        assert_eq!(
            err.to_string(),
            "pattern does not capture any events for execution \"\""
        );

        let err = TraceError::MissingGroup {
            pattern: "(?P<event>.*)".to_string(),
            group: "clock",
        };
        assert!(err.to_string().contains("\"clock\""));
    }

    #[test]
    fn clock_errors_carry_line_and_text() {
        let source = serde_json::from_str::<serde_json::Value>("{a:1}").err();
        assert!(source.is_some());
        if let Some(source) = source {
            let err = TraceError::ClockSyntax {
                line: 7,
                text: "{a:1}".to_string(),
                source,
            };
            let msg = err.to_string();
            assert!(msg.starts_with("line 7:"));
            assert!(msg.contains("{a:1}"));
        }

        let err = TraceError::InvalidClock {
            line: 3,
            text: "{\"b\":1}".to_string(),
            reason: ClockError::MissingOwnHost { host: "a".into() }.to_string(),
        };
        assert!(err.to_string().contains("local host \"a\" is missing"));
    }

    #[test]
    fn missing_source_names_host_and_value() {
        let err = TraceError::MissingCausalSource {
            event: EventId(4),
            host: "b".to_string(),
            clock: 9,
        };
        let msg = err.to_string();
        assert!(msg.contains("b=9"));
        assert!(msg.contains("event 4"));
    }

    #[test]
    fn node_error_converts_transparently() {
        let err: TraceError = NodeError::RemoveSentinel.into();
        assert_eq!(err.to_string(), "cannot remove a head or tail node");
        assert!(matches!(err, TraceError::Node(NodeError::RemoveSentinel)));
    }

    #[test]
    fn invalid_regex_converts() {
        let compiled = regex::Regex::new("(unclosed");
        assert!(compiled.is_err());
        if let Err(e) = compiled {
            let err: TraceError = e.into();
            assert!(err.to_string().starts_with("invalid pattern"));
        }
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TraceError>();
        assert_send_sync::<NodeError>();
        assert_send_sync::<ClockError>();
    }
}
