//! taskboard bugs command implementation
//!
//! Performs one token exchange and fetch, then prints both counter maps.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::tracker::TrackerClient;

/// Options for `taskboard bugs`
pub struct BugsOptions {
    pub config: Config,
    pub output: OutputOptions,
}

pub fn run(options: BugsOptions) -> Result<()> {
    let client = TrackerClient::new(&options.config.tracker)?;
    let snapshot = super::runtime()?.block_on(client.fetch_counters())?;

    let mut human = HumanOutput::new(format!(
        "taskboard bugs: {} record(s) from {}",
        snapshot.records,
        client.base_url()
    ));
    push_counts(&mut human, "resolved", &snapshot.resolved);
    push_counts(&mut human, "unresolved", &snapshot.unresolved);

    emit_success(options.output, "bugs", &snapshot, Some(&human))
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "(unassigned)"
    } else {
        name
    }
}

fn push_counts(human: &mut HumanOutput, label: &str, counts: &BTreeMap<String, u64>) {
    human.push_summary(label, counts.values().sum::<u64>().to_string());
    for (name, count) in counts {
        human.push_detail(format!("{label} {}: {count}", display_name(name)));
    }
}
