//! End-to-end tests: raw log text through parsing, graph construction and
//! the node primitive.

use vtrace_core::{
    CausalGraph, EdgeKind, EventId, GraphConfig, LogEvent, LogFormat, LogParser, TraceError,
};

// ==================== Helper Functions ====================

const DELIMITER: &str = r"^=== (?P<trace>\S+)$";

fn parse_single(raw: &str) -> Vec<std::sync::Arc<LogEvent>> {
    let mut parser = LogFormat::default().parser().expect("default format compiles");
    let log = parser.parse(raw).expect("log parses");
    assert_eq!(log.len(), 1);
    log.into_executions().remove(0).into_events()
}

fn id_of(events: &[std::sync::Arc<LogEvent>], text: &str) -> EventId {
    events
        .iter()
        .find(|e| e.text() == text)
        .map(|e| e.id())
        .expect("event present")
}

// ==================== Two-Host Exchange ====================

#[test]
fn test_receive_resolves_to_external_edge() {
    let raw = "\
a-start
a {\"a\": 1}
a-send
a {\"a\": 2}
b-start
b {\"b\": 1}
b-recv
b {\"b\": 2, \"a\": 2}
";
    let events = parse_single(raw);
    let graph = CausalGraph::build(events.clone()).expect("graph builds");

    assert_eq!(graph.hosts(), ["a", "b"]);

    let recv = graph.node(id_of(&events, "b-recv")).expect("node");
    let hb = recv.happened_before().expect("has predecessor");
    assert_eq!(hb.kind, EdgeKind::External);
    assert_eq!(hb.source, id_of(&events, "a-send"));

    let send = graph.node(id_of(&events, "a-send")).expect("node");
    assert_eq!(
        send.happened_before().map(|hb| (hb.kind, hb.source)),
        Some((EdgeKind::Child, id_of(&events, "a-start")))
    );

    assert!(recv.pos() >= send.pos() + 1);
    assert_eq!(recv.pos(), 3);
    assert_eq!(graph.max_rank(), 3);
    assert_eq!(graph.edges().map(|n| n.id()).collect::<Vec<_>>(), [recv.id()]);
}

#[test]
fn test_node_graph_mirrors_causal_graph() {
    let raw = "\
ping
a {\"a\": 1}
pong
b {\"a\": 1, \"b\": 1}
done
a {\"a\": 2, \"b\": 1}
";
    let events = parse_single(raw);
    let graph = CausalGraph::build(events.clone()).expect("graph builds");
    let nodes = graph.to_node_graph().expect("node graph builds");

    let a = nodes.host_nodes("a");
    let b = nodes.host_nodes("b");
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 1);

    assert_eq!(nodes.payload(a[0]), Some(&id_of(&events, "ping")));
    assert_eq!(nodes.parent_on(b[0], "a"), Some(a[0]));
    assert_eq!(nodes.parent_on(a[1], "b"), Some(b[0]));
    assert_eq!(nodes.children(a[0]), [b[0]]);
}

// ==================== Delimited Executions ====================

#[test]
fn test_executions_are_parsed_and_laid_out_independently() {
    let raw = "\
=== first
x
a {\"a\": 1}
=== second
y
b {\"b\": 1}
z
a {\"a\": 1, \"b\": 1}
";
    let mut parser = LogParser::from_patterns(vtrace_core::DEFAULT_PATTERN, Some(DELIMITER))
        .expect("patterns compile");
    let log = parser.parse(raw).expect("log parses");

    assert_eq!(log.labels().collect::<Vec<_>>(), ["first", "second"]);

    let first = log.execution("first").expect("first");
    assert_eq!(first.len(), 1);
    assert_eq!(first.events()[0].line(), 2);

    let second = log.execution("second").expect("second");
    let ids: Vec<_> = second.events().iter().map(|e| e.id()).collect();
    assert!(ids.iter().all(|id| *id > first.events()[0].id()));

    let graph = CausalGraph::build(second.events().to_vec()).expect("graph builds");
    let z = graph.node(ids[1]).expect("node");
    assert_eq!(z.happened_before().map(|hb| hb.source), Some(ids[0]));
    assert!(z.is_external());
}

#[test]
fn test_custom_pattern_with_fields() {
    let pattern = concat!(
        r"^\[(?P<seq>\d+)\] (?P<clock>\{.*\}) (?P<event>.*)\n",
        r"\[\d+\] (?P<host>\S+) \{.*\} .*$",
    );
    let raw = "[1] {\"a\":1} e1\n[2] a {\"a\":1} e1";

    let mut parser = LogFormat::new(pattern).parser().expect("pattern compiles");
    let log = parser.parse(raw).expect("log parses");
    let events = log.executions()[0].events();

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.host(), "a");
    assert_eq!(event.text(), "e1");
    assert_eq!(event.timestamp().get("a"), Some(1));
    assert_eq!(event.line(), 1);
    assert_eq!(event.field("seq"), Some("1"));
}

// ==================== Failure Propagation ====================

#[test]
fn test_truncated_log_is_rejected_unless_lenient() {
    let raw = "\
lost-sender
a {\"a\": 1}
receiver
b {\"a\": 5, \"b\": 1}
";
    let events = parse_single(raw);

    let err = CausalGraph::build(events.clone()).expect_err("missing source");
    assert!(matches!(
        err,
        TraceError::MissingCausalSource { ref host, clock: 5, .. } if host == "a"
    ));

    let graph = CausalGraph::build_with(events, &GraphConfig::lenient()).expect("lenient");
    assert_eq!(graph.edges().count(), 0);
}

#[test]
fn test_bad_clock_aborts_whole_parse() {
    let raw = "\
=== ok
x
a {\"a\": 1}
=== broken
y
a {\"a\": }
";
    let mut parser = LogParser::from_patterns(vtrace_core::DEFAULT_PATTERN, Some(DELIMITER))
        .expect("patterns compile");
    let err = parser.parse(raw).expect_err("broken clock");
    assert!(matches!(err, TraceError::ClockSyntax { line: 2, .. }));
}
