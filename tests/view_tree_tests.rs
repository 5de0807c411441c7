use msgtab::core::{DecodedMessage, FieldValue, MessageField};
use msgtab::record::{MessageIdentity, Recorder};
use msgtab::transport::SimulatedBus;
use msgtab::view::{MessageTree, PinKey, PinSet, PinState, PinnedRows, RowFilter, ViewError};

const SECOND: u64 = 1_000_000_000;

fn attitude(phi: f64) -> DecodedMessage {
    DecodedMessage::new(1, "telemetry", 6, "ATTITUDE")
        .with_field(
            MessageField::new("phi", "float", FieldValue::Float(phi))
                .with_unit("rad")
                .with_alt_unit("deg", 57.29578),
        )
        .with_field(MessageField::new("psi", "float", FieldValue::Float(0.0)).with_unit("rad"))
}

fn mode() -> DecodedMessage {
    DecodedMessage::new(1, "telemetry", 11, "PPRZ_MODE")
        .with_field(MessageField::new("ap_mode", "uint8", FieldValue::Int(2)).with_enum_label("AUTO2"))
}

fn recorder() -> Recorder {
    Recorder::new("test", SimulatedBus::new(), 10).unwrap()
}

#[test]
fn test_events_drive_tree() {
    let mut recorder = recorder();
    let events = recorder.subscribe_events();
    let mut tree = MessageTree::default();

    recorder.on_message_at(1, attitude(0.5), SECOND).unwrap();
    recorder.on_message_at(1, mode(), SECOND).unwrap();
    recorder.on_message_at(2, attitude(0.1), SECOND).unwrap();

    for event in events.try_iter() {
        tree.apply_event(&event, recorder.index(), SECOND).unwrap();
    }

    assert_eq!(tree.senders().len(), 2);
    assert_eq!(tree.message_count(1), 2);
    assert_eq!(tree.message_count(2), 1);

    let mode_row = tree.message(MessageIdentity::new(1, 1, 11)).unwrap();
    assert_eq!(mode_row.field("ap_mode").unwrap().value_text, "2 (AUTO2)");
}

#[test]
fn test_refresh_recovers_missed_events() {
    let mut recorder = recorder();
    let mut tree = MessageTree::default();

    recorder.on_message_at(3, attitude(0.5), SECOND).unwrap();
    recorder.on_message_at(3, attitude(0.6), 3 * SECOND).unwrap();

    assert_eq!(tree.refresh(recorder.index(), 4 * SECOND).unwrap(), 1);
    let row = tree.message(MessageIdentity::new(3, 1, 6)).unwrap();
    assert_eq!(row.age_secs, 1.0);
    assert_eq!(row.frequency_hz, 0.5);
    assert_eq!(row.reception, " 1s (0.5 Hz) ");
    assert_eq!(row.sort_key, 5);
    assert_eq!(row.field("phi").unwrap().value, FieldValue::Float(0.6));
}

#[test]
fn test_duplicate_class_is_reported() {
    let mut recorder = recorder();
    let mut tree = MessageTree::default();
    recorder.on_message_at(3, attitude(0.5), SECOND).unwrap();
    tree.refresh(recorder.index(), SECOND).unwrap();

    let err = tree.create_class(3, 1, "telemetry").unwrap_err();
    assert!(matches!(err, ViewError::ClassAlreadyExists { class_id: 1, .. }));
    assert!(err.to_string().contains("telemetry"));
}

#[test]
fn test_pins_filter_and_pinned_rows() {
    let mut recorder = recorder();
    recorder.on_message_at(1, attitude(0.5), SECOND).unwrap();
    recorder.on_message_at(2, attitude(0.7), SECOND).unwrap();
    recorder.on_message_at(2, mode(), SECOND).unwrap();

    let mut tree = MessageTree::default();
    tree.refresh(recorder.index(), SECOND).unwrap();

    let mut pins = PinSet::new(true);
    pins.set_message(MessageIdentity::new(1, 1, 6), true, recorder.index());
    tree.sync_pins(&pins);

    // Pinning propagated to sender 2
    let other = tree.message(MessageIdentity::new(2, 1, 6)).unwrap();
    assert_eq!(other.pin_state, PinState::Pinned);

    pins.set_field(&PinKey::new(MessageIdentity::new(2, 1, 6), "psi"), false, recorder.index());
    tree.sync_pins(&pins);
    assert_eq!(
        tree.message(MessageIdentity::new(1, 1, 6)).unwrap().pin_state,
        PinState::Partial
    );

    let mut filter = RowFilter::new();
    filter.set_pinned_only(true);
    assert_eq!(filter.message_count(&tree, 2), 1);

    let visible = filter.apply(&tree);
    let fields: Vec<&str> = visible[1].classes[0].messages[0].field_names().collect();
    assert_eq!(fields, vec!["phi"]);

    let rows = PinnedRows::collect(&pins, recorder.index(), 2 * SECOND, 5.0);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.rows()[0].reference, "1:telemetry:ATTITUDE:phi:57.29578");
    assert_eq!(rows.rows()[0].age_secs, 1.0);
}

#[test]
fn test_expand_threshold() {
    let mut recorder = recorder();
    recorder.on_message_at(1, attitude(0.5), SECOND).unwrap();
    recorder.on_message_at(1, mode(), SECOND).unwrap();

    let mut tree = MessageTree::default();
    tree.refresh(recorder.index(), SECOND).unwrap();

    let mut filter = RowFilter::new();
    assert!(filter.should_expand(&tree, 1, 5));
    assert!(!filter.should_expand(&tree, 1, 2));

    filter.set_pattern("mode").unwrap();
    assert!(filter.should_expand(&tree, 1, 2));
}
