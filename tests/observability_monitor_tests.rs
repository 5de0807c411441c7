use msgtab::core::{DecodedMessage, FieldValue, MessageField};
use msgtab::observability::{MetricsCollector, RecorderMonitor};
use msgtab::record::Recorder;
use msgtab::transport::SimulatedBus;

fn gps() -> DecodedMessage {
    DecodedMessage::new(1, "telemetry", 8, "GPS")
        .with_field(MessageField::new("alt", "int32", FieldValue::Int(100)))
}

#[test]
fn test_empty_report() {
    let monitor = RecorderMonitor::new(MetricsCollector::new());

    assert_eq!(monitor.generate_report(0), "No senders discovered");
}

#[test]
fn test_monitor_report() {
    let bus = SimulatedBus::new();
    let mut recorder = Recorder::new("monitor", bus.clone(), 10).unwrap();

    recorder.on_message_at(3, gps(), 1_000_000_000).unwrap();
    recorder.on_message_at(3, gps(), 2_000_000_000).unwrap();
    bus.publish(8, gps());
    recorder.pump();

    let monitor = RecorderMonitor::new(recorder.metrics().clone());
    let report = monitor.generate_report(4_000_000_000);

    assert!(report.contains("[Sender 3]"));
    assert!(report.contains("Recorded: 2 messages"));
    assert!(report.contains("Identities: 1"));
    assert!(report.contains("2.0s ago"));
    assert!(report.contains("[Sender 8]"));
    assert!(report.contains("Seen: 1"));
    assert!(report.contains("Last reception: never"));
}
