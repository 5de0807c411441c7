use super::MetricsCollector;

pub struct RecorderMonitor {
    collector: MetricsCollector,
}

impl RecorderMonitor {
    pub fn new(collector: MetricsCollector) -> Self {
        Self { collector }
    }

    /// Text report; `now_ns` is used to age the last reception
    pub fn generate_report(&self, now_ns: u64) -> String {
        let snapshot = self.collector.snapshot();

        if snapshot.is_empty() {
            return "No senders discovered".to_string();
        }

        let mut report = String::from("=== Recorder Metrics ===\n");

        for (sender_id, metrics) in snapshot.iter() {
            let last = if metrics.last_reception_ns == 0 {
                "never".to_string()
            } else {
                let age = now_ns.saturating_sub(metrics.last_reception_ns) as f64 / 1e9;
                format!("{:.1}s ago", age)
            };
            report.push_str(&format!(
                "\n[Sender {}]\n  Recorded: {} message{}\n  Seen: {}\n  Identities: {}\n  Last reception: {}\n",
                sender_id,
                metrics.messages_recorded,
                if metrics.messages_recorded == 1 { "" } else { "s" },
                metrics.messages_seen,
                metrics.identities_created,
                last
            ));
        }

        report
    }

    pub fn collector(&self) -> &MetricsCollector {
        &self.collector
    }
}
