use msgtab::core::{DecodedMessage, FieldValue, MessageField};
use msgtab::plot::{PlotBoard, PALETTE};
use msgtab::record::Recorder;
use msgtab::transport::SimulatedBus;

const SECOND: u64 = 1_000_000_000;

fn attitude(phi: f64) -> DecodedMessage {
    DecodedMessage::new(1, "telemetry", 6, "ATTITUDE").with_field(
        MessageField::new("phi", "float", FieldValue::Float(phi))
            .with_unit("rad")
            .with_alt_unit("deg", 57.29578),
    )
}

#[test]
fn test_sample_scaled_values_from_recorder() {
    let mut recorder = Recorder::new("plot", SimulatedBus::new(), 10).unwrap();
    recorder.on_message_at(3, attitude(1.0), SECOND).unwrap();
    recorder.on_message_at(3, attitude(2.0), 2 * SECOND).unwrap();

    let mut board = PlotBoard::new();
    assert_eq!(board.drop_text("3:telemetry:ATTITUDE:phi:2.0").unwrap(), 1);

    let data = board.sample(&recorder, 4 * SECOND);
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].colour, PALETTE[0]);
    assert_eq!(data[0].times_s, vec![-3.0, -2.0]);
    assert_eq!(data[0].values, vec![2.0, 4.0]);
}

#[test]
fn test_unrecorded_series_are_skipped() {
    let recorder = Recorder::new("plot", SimulatedBus::new(), 10).unwrap();
    let mut board = PlotBoard::new();
    board.drop_text("9:telemetry:ATTITUDE:phi:1.0").unwrap();

    assert_eq!(board.len(), 1);
    assert!(board.sample(&recorder, SECOND).is_empty());
}

#[test]
fn test_duplicate_drop_is_ignored() {
    let mut board = PlotBoard::new();

    assert_eq!(board.drop_text("3:telemetry:ATTITUDE:phi:1.0").unwrap(), 1);
    assert_eq!(board.drop_text("3:telemetry:ATTITUDE:phi:2.0").unwrap(), 0);
    assert_eq!(board.series()[0].scale, 1.0);
}

#[test]
fn test_series_reference_text() {
    let mut board = PlotBoard::new();
    board.drop_text("4:telemetry:ACTUATORS:values[1-2]:1.0").unwrap();

    let texts: Vec<String> = board.series().iter().map(|s| s.reference_text()).collect();
    assert_eq!(
        texts,
        vec![
            "4:telemetry:ACTUATORS:values[1]:1.0".to_string(),
            "4:telemetry:ACTUATORS:values[2]:1.0".to_string(),
        ]
    );
}
