//! Extraction of vector-clock events from raw log text.
//!
//! This module provides:
//! - [`LogParser`] - Splits raw text into executions and parses each one
//! - [`ExecutionParser`] - Matches events inside a single execution
//! - [`Execution`] / [`ParsedLog`] - Parse results
//!
//! The event pattern must define the named groups `clock`, `host` and
//! `event`. Every other named group becomes an entry in
//! [`LogEvent::fields`]. The delimiter pattern may define a `trace` group
//! whose capture labels the execution that follows it.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::clock::VectorTimestamp;
use crate::error::{Result, TraceError};
use crate::event::{IdAllocator, LogEvent};
use crate::pattern::NamedRegex;

/// Group holding the JSON-encoded vector clock.
pub const CLOCK_GROUP: &str = "clock";
/// Group holding the host that logged the event.
pub const HOST_GROUP: &str = "host";
/// Group holding the event text.
pub const EVENT_GROUP: &str = "event";
/// Optional delimiter group naming the execution that follows.
pub const TRACE_GROUP: &str = "trace";

const REQUIRED_GROUPS: [&str; 3] = [CLOCK_GROUP, HOST_GROUP, EVENT_GROUP];

/// Events extracted from one delimited section of a log.
#[derive(Debug, Clone)]
pub struct Execution {
    label: String,
    events: Vec<Arc<LogEvent>>,
}

impl Execution {
    /// Returns the execution label (empty for an unlabelled log).
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the events in match order.
    #[must_use]
    pub fn events(&self) -> &[Arc<LogEvent>] {
        &self.events
    }

    /// Returns the number of events. Never zero for a parsed execution.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the execution holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Consumes the execution, returning its events.
    #[must_use]
    pub fn into_events(self) -> Vec<Arc<LogEvent>> {
        self.events
    }
}

/// All executions found in one raw log, in source order.
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    executions: Vec<Execution>,
}

impl ParsedLog {
    /// Returns execution labels in source order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.executions.iter().map(Execution::label)
    }

    /// Looks up an execution by label.
    ///
    /// Only the empty label may repeat; it resolves to the first such
    /// execution.
    #[must_use]
    pub fn execution(&self, label: &str) -> Option<&Execution> {
        self.executions.iter().find(|e| e.label == label)
    }

    /// Returns all executions.
    #[must_use]
    pub fn executions(&self) -> &[Execution] {
        &self.executions
    }

    /// Consumes the log, returning its executions.
    #[must_use]
    pub fn into_executions(self) -> Vec<Execution> {
        self.executions
    }

    /// Returns the number of executions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.executions.len()
    }

    /// Returns true if no execution was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}

/// Parses the events of a single execution.
pub struct ExecutionParser<'p> {
    pattern: &'p NamedRegex,
}

impl<'p> ExecutionParser<'p> {
    /// Creates a parser for `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::MissingGroup`] if the pattern lacks `clock`,
    /// `host` or `event`.
    pub fn new(pattern: &'p NamedRegex) -> Result<Self> {
        pattern.require_groups(&REQUIRED_GROUPS)?;
        Ok(Self { pattern })
    }

    /// Extracts every event in `raw`, allocating ids from `ids`.
    ///
    /// Line numbers are 1-indexed and relative to `raw`.
    ///
    /// # Errors
    ///
    /// Fails on the first unparseable clock, or with
    /// [`TraceError::EmptyExecution`] if nothing matched.
    pub fn parse(&self, raw: &str, label: &str, ids: &mut IdAllocator) -> Result<Execution> {
        let mut events = Vec::new();
        let mut lines = LineCursor::new(raw);

        for caps in self.pattern.captures_iter(raw) {
            let Some(whole) = caps.get(0) else { continue };
            let line = lines.line_at(whole.start());
            let group = |name: &str| caps.name(name).map_or("", |m| m.as_str());

            let timestamp = parse_clock(group(CLOCK_GROUP), group(HOST_GROUP), line)?;

            let fields: BTreeMap<String, String> = self
                .pattern
                .names()
                .iter()
                .filter(|name| !REQUIRED_GROUPS.contains(&name.as_str()))
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect();

            let event = LogEvent::new(ids.allocate(), group(EVENT_GROUP), timestamp, line, fields);
            events.push(Arc::new(event));
        }

        if events.is_empty() {
            return Err(TraceError::EmptyExecution(label.to_string()));
        }

        debug!(label = %label, events = events.len(), "parsed execution");
        Ok(Execution {
            label: label.to_string(),
            events,
        })
    }
}

/// Splits a raw log into executions and parses each one.
///
/// The parser owns the id allocator for its session: events from every
/// call to [`parse`](Self::parse) get distinct, increasing ids.
#[derive(Debug)]
pub struct LogParser {
    pattern: NamedRegex,
    delimiter: Option<NamedRegex>,
    ids: IdAllocator,
}

impl LogParser {
    /// Creates a parser from an event pattern and optional delimiter.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::MissingGroup`] if the event pattern lacks a
    /// required group.
    pub fn new(pattern: NamedRegex, delimiter: Option<NamedRegex>) -> Result<Self> {
        pattern.require_groups(&REQUIRED_GROUPS)?;
        Ok(Self {
            pattern,
            delimiter,
            ids: IdAllocator::new(),
        })
    }

    /// Compiles both patterns and creates a parser.
    ///
    /// # Errors
    ///
    /// Returns any pattern error before parsing is attempted.
    pub fn from_patterns(pattern: &str, delimiter: Option<&str>) -> Result<Self> {
        let pattern = NamedRegex::new(pattern)?;
        let delimiter = delimiter.map(NamedRegex::new).transpose()?;
        Self::new(pattern, delimiter)
    }

    /// Returns the event pattern.
    #[must_use]
    pub const fn pattern(&self) -> &NamedRegex {
        &self.pattern
    }

    /// Returns the delimiter pattern, if any.
    #[must_use]
    pub const fn delimiter(&self) -> Option<&NamedRegex> {
        self.delimiter.as_ref()
    }

    /// Parses `raw` into labelled executions.
    ///
    /// # Errors
    ///
    /// Any failure aborts the whole parse: duplicate labels, an execution
    /// without events, or a malformed clock.
    pub fn parse(&mut self, raw: &str) -> Result<ParsedLog> {
        let segments = self.split(raw);
        let parser = ExecutionParser::new(&self.pattern)?;

        let mut seen = HashSet::new();
        let mut executions = Vec::with_capacity(segments.len());
        for (label, segment) in segments {
            if !label.is_empty() && !seen.insert(label.clone()) {
                return Err(TraceError::DuplicateLabel(label));
            }
            executions.push(parser.parse(segment, &label, &mut self.ids)?);
        }

        if executions.is_empty() {
            return Err(TraceError::EmptyExecution(String::new()));
        }

        debug!(executions = executions.len(), "parsed log");
        Ok(ParsedLog { executions })
    }

    /// Cuts `raw` at every delimiter match, dropping blank segments.
    ///
    /// The text before the first delimiter is labelled `""`. Text after a
    /// delimiter takes that match's `trace` capture, or `""` when the group
    /// is absent or did not participate.
    fn split<'t>(&self, raw: &'t str) -> Vec<(String, &'t str)> {
        let Some(delimiter) = &self.delimiter else {
            return vec![(String::new(), raw)];
        };

        let mut segments = Vec::new();
        let mut label = String::new();
        let mut start = 0;
        for caps in delimiter.captures_iter(raw) {
            let Some(whole) = caps.get(0) else { continue };
            segments.push((label, &raw[start..whole.start()]));
            label = caps
                .name(TRACE_GROUP)
                .map_or_else(String::new, |m| m.as_str().to_string());
            start = whole.end();
        }
        segments.push((label, &raw[start..]));

        segments.retain(|(_, text)| !text.trim().is_empty());
        segments
    }
}

/// Running line counter over one text, fed increasing byte offsets.
///
/// `\r\n`, `\r` and `\n` each end a line. A `\r` is judged against the
/// byte after it in the whole text, so a pair split across two calls still
/// counts once.
struct LineCursor<'t> {
    bytes: &'t [u8],
    offset: usize,
    line: usize,
}

impl<'t> LineCursor<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            bytes: text.as_bytes(),
            offset: 0,
            line: 1,
        }
    }

    /// Returns the 1-indexed line containing byte `offset`.
    ///
    /// Offsets must not decrease between calls.
    fn line_at(&mut self, offset: usize) -> usize {
        let end = offset.min(self.bytes.len());
        if end > self.offset {
            let bytes = self.bytes;
            self.line += (self.offset..end)
                .filter(|&i| match bytes[i] {
                    b'\n' => true,
                    b'\r' => bytes.get(i + 1) != Some(&b'\n'),
                    _ => false,
                })
                .count();
            self.offset = end;
        }
        self.line
    }
}

fn parse_clock(text: &str, host: &str, line: usize) -> Result<VectorTimestamp> {
    let invalid = |reason: String| TraceError::InvalidClock {
        line,
        text: text.to_string(),
        reason,
    };

    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|source| TraceError::ClockSyntax {
            line,
            text: text.to_string(),
            source,
        })?;
    let Some(entries) = value.as_object() else {
        return Err(invalid("expected an object mapping hosts to clock values".into()));
    };

    let mut clock = BTreeMap::new();
    for (name, value) in entries {
        let Some(value) = value.as_u64() else {
            return Err(invalid(format!(
                "clock value for \"{name}\" is not a non-negative integer"
            )));
        };
        clock.insert(name.clone(), value);
    }

    VectorTimestamp::new(host, clock).map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventId;
    use test_case::test_case;

    const SHIVIZ_PATTERN: &str = r"(?P<event>.*)\n(?P<host>\S*) (?P<clock>\{.*\})";

    fn parser(pattern: &str, delimiter: Option<&str>) -> LogParser {
        LogParser::from_patterns(pattern, delimiter).expect("valid patterns")
    }

    // ===========================================
    // Pattern validation
    // ===========================================

    #[test_case(r"(?P<host>\S+) (?P<clock>\{.*\})", "event" ; "no event")]
    #[test_case(r"(?P<event>.*) (?P<clock>\{.*\})", "host" ; "no host")]
    #[test_case(r"(?P<event>.*) (?P<host>\S+)", "clock" ; "no clock")]
    fn missing_required_group(pattern: &str, group: &str) {
        match LogParser::from_patterns(pattern, None) {
            Err(TraceError::MissingGroup { group: missing, .. }) => assert_eq!(missing, group),
            other => panic!("expected missing group, got {other:?}"),
        }
    }

    #[test]
    fn delimiter_pattern_errors_surface_before_parsing() {
        assert!(matches!(
            LogParser::from_patterns(SHIVIZ_PATTERN, Some("(?P<trace>x)(?P<trace>y)")),
            Err(TraceError::DuplicateGroup { .. })
        ));
    }

    // ===========================================
    // Event extraction
    // ===========================================

    #[test]
    fn parses_events_in_source_order_with_line_numbers() {
        let raw = "start\na {\"a\":1}\nsend\na {\"a\":2}\nrecv\nb {\"a\":2, \"b\":1}";
        let log = parser(SHIVIZ_PATTERN, None).parse(raw).expect("parse");
        assert_eq!(log.len(), 1);

        let exec = log.execution("").expect("default execution");
        let texts: Vec<_> = exec.events().iter().map(|e| e.text()).collect();
        assert_eq!(texts, ["start", "send", "recv"]);

        let lines: Vec<_> = exec.events().iter().map(|e| e.line()).collect();
        assert_eq!(lines, [1, 3, 5]);

        let hosts: Vec<_> = exec.events().iter().map(|e| e.host()).collect();
        assert_eq!(hosts, ["a", "a", "b"]);
        assert_eq!(exec.events()[2].timestamp().get("a"), Some(2));
    }

    #[test]
    fn two_line_event_format() {
        let raw = "[1] {\"a\":1} e1\n[2] a {\"a\":1} e1";
        let pattern = r"^\[\d+\] (?P<clock>\{[^}]*\}) (?P<event>.*)\n\[\d+\] (?P<host>\S+) .*$";
        let log = parser(pattern, None).parse(raw).expect("parse");

        let events = log.executions()[0].events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].host(), "a");
        assert_eq!(events[0].text(), "e1");
        assert_eq!(events[0].timestamp().get("a"), Some(1));
        assert_eq!(events[0].line(), 1);
    }

    #[test]
    fn extra_groups_become_fields() {
        let raw = "2024-01-01 a {\"a\":1} boot\n2024-01-02 a {\"a\":2} ready";
        let pattern =
            r"^(?P<date>\S+) (?P<host>\S+) (?P<clock>\{[^}]*\}) (?P<event>.*)$";
        let log = parser(pattern, None).parse(raw).expect("parse");

        let events = log.executions()[0].events();
        assert_eq!(events[0].field("date"), Some("2024-01-01"));
        assert_eq!(events[1].field("date"), Some("2024-01-02"));
        assert_eq!(events[0].fields().len(), 1);
    }

    #[test]
    fn ids_increase_across_parses_of_one_session() {
        let mut p = parser(SHIVIZ_PATTERN, None);
        let first = p.parse("x\na {\"a\":1}").expect("parse");
        let second = p.parse("y\na {\"a\":1}").expect("parse");
        let a = first.executions()[0].events()[0].id();
        let b = second.executions()[0].events()[0].id();
        assert_eq!(a, EventId(0));
        assert_eq!(b, EventId(1));
    }

    #[test]
    fn crlf_line_endings_count_once() {
        assert_eq!(LineCursor::new("a\r\nb\r\nc").line_at(6), 3);
        assert_eq!(LineCursor::new("a\rb\nc").line_at(4), 3);
        assert_eq!(LineCursor::new("abc").line_at(0), 1);
    }

    #[test]
    fn line_cursor_does_not_double_count_split_crlf() {
        let mut lines = LineCursor::new("a\r\nb\r\nc");
        assert_eq!(lines.line_at(2), 1);
        assert_eq!(lines.line_at(3), 2);
        assert_eq!(lines.line_at(5), 2);
        assert_eq!(lines.line_at(6), 3);
        assert_eq!(lines.line_at(6), 3);
    }

    #[test]
    fn line_numbers_hold_across_a_long_log() {
        let count = 5_000;
        let mut raw = String::new();
        for i in 1..=count {
            raw.push_str(&format!("step {i}\na {{\"a\":{i}}}\n"));
        }

        let log = parser(SHIVIZ_PATTERN, None).parse(&raw).expect("parse");
        let events = log.executions()[0].events();
        assert_eq!(events.len(), count);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.line(), 2 * i + 1);
        }
        assert_eq!(events[count - 1].text(), format!("step {count}"));
    }

    // ===========================================
    // Clock errors
    // ===========================================

    #[test]
    fn clock_syntax_error_reports_line_and_text() {
        let raw = "ok\na {\"a\":1}\nbroken\na {a:2}";
        match parser(SHIVIZ_PATTERN, None).parse(raw) {
            Err(TraceError::ClockSyntax { line, text, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(text, "{a:2}");
            }
            other => panic!("expected clock syntax error, got {other:?}"),
        }
    }

    #[test_case("{\"b\":1}" ; "owner missing")]
    #[test_case("{\"a\":-1}" ; "negative value")]
    #[test_case("{\"a\":\"1\"}" ; "string value")]
    #[test_case("{\"a\":1.5}" ; "fractional value")]
    fn invalid_clock_is_reported(clock: &str) {
        let raw = format!("event\na {clock}");
        match parser(SHIVIZ_PATTERN, None).parse(&raw) {
            Err(TraceError::InvalidClock { line, text, .. }) => {
                assert_eq!(line, 1);
                assert_eq!(text, clock);
            }
            other => panic!("expected invalid clock, got {other:?}"),
        }
    }

    // ===========================================
    // Executions
    // ===========================================

    #[test]
    fn splits_on_delimiter_with_trace_labels() {
        let raw = "=== run-1\nx\na {\"a\":1}\n=== run-2\ny\nb {\"b\":1}\nz\nb {\"b\":2}";
        let log = parser(SHIVIZ_PATTERN, Some(r"^=== (?P<trace>\S+)$"))
            .parse(raw)
            .expect("parse");

        let labels: Vec<_> = log.labels().collect();
        assert_eq!(labels, ["run-1", "run-2"]);
        assert_eq!(log.execution("run-1").map(Execution::len), Some(1));
        assert_eq!(log.execution("run-2").map(Execution::len), Some(2));
    }

    #[test]
    fn leading_segment_gets_empty_label() {
        let raw = "x\na {\"a\":1}\n---\ny\nb {\"b\":1}";
        let log = parser(SHIVIZ_PATTERN, Some("^---$")).parse(raw).expect("parse");
        let labels: Vec<_> = log.labels().collect();
        assert_eq!(labels, ["", ""]);
        assert_eq!(log.execution("").map(|e| e.events()[0].text()), Some("x"));
    }

    #[test]
    fn repeated_empty_labels_are_accepted() {
        let raw = "x\na {\"a\":1}\n===\ny\nb {\"b\":1}\n===2\nz\nc {\"c\":1}";
        let log = parser(SHIVIZ_PATTERN, Some(r"^===(?P<trace>\S*)$"))
            .parse(raw)
            .expect("parse");

        let labels: Vec<_> = log.labels().collect();
        assert_eq!(labels, ["", "", "2"]);
        assert_eq!(log.execution("").map(|e| e.events()[0].host()), Some("a"));
        assert_eq!(log.execution("2").map(|e| e.events()[0].host()), Some("c"));
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let raw = "=== t\nx\na {\"a\":1}\n=== t\ny\na {\"a\":1}";
        match parser(SHIVIZ_PATTERN, Some(r"^=== (?P<trace>\S+)$")).parse(raw) {
            Err(TraceError::DuplicateLabel(label)) => assert_eq!(label, "t"),
            other => panic!("expected duplicate label, got {other:?}"),
        }
    }

    #[test]
    fn execution_without_events_is_rejected() {
        let raw = "=== good\nx\na {\"a\":1}\n=== empty\nno events here";
        match parser(SHIVIZ_PATTERN, Some(r"^=== (?P<trace>\S+)$")).parse(raw) {
            Err(TraceError::EmptyExecution(label)) => assert_eq!(label, "empty"),
            other => panic!("expected empty execution, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            parser(SHIVIZ_PATTERN, None).parse(""),
            Err(TraceError::EmptyExecution(_))
        ));
    }

    #[test]
    fn line_numbers_are_relative_to_execution() {
        let raw = "=== one\nx\na {\"a\":1}\n=== two\ny\nb {\"b\":1}";
        let log = parser(SHIVIZ_PATTERN, Some(r"^=== (?P<trace>\S+)$"))
            .parse(raw)
            .expect("parse");
        let first = &log.execution("two").expect("two").events()[0];
        assert_eq!(first.text(), "y");
        assert_eq!(first.line(), 2);
    }
}
