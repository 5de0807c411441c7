use std::time::Duration;

use tokio::sync::broadcast;

use msgtab::config::{ConfigStore, RecorderConfig};
use msgtab::core::now_ns;
use msgtab::engine::EventLoop;
use msgtab::observability::RecorderMonitor;
use msgtab::plot::PlotBoard;
use msgtab::record::{MessageIdentity, Recorder};
use msgtab::transport::{SimulatedBus, SimulatedSender};
use msgtab::view::{PinKey, RowFilter, ViewNode};

const RUN_TIME: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => ConfigStore::new(path).load()?,
        None => RecorderConfig::default(),
    };

    println!("msgtab - message recorder demo");
    println!("==============================\n");

    let bus = SimulatedBus::from_config(&config);
    let recorder = Recorder::from_config(&config, bus.clone())?;
    let mut event_loop = EventLoop::new(recorder, config.clone());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
    let senders = vec![
        SimulatedSender::new(1, Duration::from_millis(100)).spawn(bus.clone(), shutdown_tx.subscribe()),
        SimulatedSender::new(2, Duration::from_millis(250)).spawn(bus.clone(), shutdown_tx.subscribe()),
    ];

    let stopper = {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(RUN_TIME).await;
            let _ = shutdown_tx.send(());
        })
    };

    println!("Recording for {:?}...\n", RUN_TIME);
    event_loop.run(shutdown_rx).await?;
    stopper.await?;
    for handle in senders {
        handle.await?;
    }

    let attitude = MessageIdentity::new(1, 1, 6);
    event_loop.pin_field(&PinKey::new(attitude, "phi"), true);
    event_loop.refresh(now_ns())?;
    event_loop.refresh_pinned(now_ns());

    for (depth, node) in event_loop.tree().walk() {
        let detail = match node {
            ViewNode::Message(m) => m.reception.clone(),
            ViewNode::Field(f) => format!("{}  {}", f.value_text, f.alt_value_text),
            _ => String::new(),
        };
        println!("{}{} {}", "  ".repeat(depth), node.label(), detail);
    }

    let mut filter = RowFilter::new();
    filter.set_pinned_only(true);
    println!(
        "\nPinned messages for sender 1: {}",
        filter.message_count(event_loop.tree(), 1)
    );
    println!(
        "Sender 1 fully expandable: {}",
        event_loop.should_expand(1, &RowFilter::new())
    );
    for row in event_loop.pinned().rows() {
        println!("  {} = {} ({:.1}s)", row.reference, row.value_text, row.age_secs);
    }

    let mut board = PlotBoard::new();
    if let Some(reference) = event_loop.tree().field_reference(attitude, "phi", None) {
        board.drop_text(&reference)?;
    }
    board.drop_text("2:telemetry:ACTUATORS:values[0-1]:1.0")?;
    for series in board.sample(event_loop.recorder(), now_ns()) {
        println!("\nPlot {}: {} points", series.index, series.values.len());
    }

    let monitor = RecorderMonitor::new(event_loop.recorder().metrics().clone());
    println!("\n{}", monitor.generate_report(now_ns()));

    Ok(())
}
