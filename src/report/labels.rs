///! Channel labels with their virtual-channel mappings
use std::collections::HashMap;

use anyhow::Result;

use crate::store::{FilterTerm, Store, TableQuery, Value};

/// Builds `"27: 7.1 KAAA, 7.2 KAAA-2"` style labels for each real channel.
/// Virtual channels are listed in ascending virtual-number order; channels
/// with no mapping keep a bare numeric label.
pub fn channel_labels(store: &Store, real_channels: &[i64]) -> Result<HashMap<i64, String>> {
    let mut virtuals: HashMap<i64, Vec<String>> = HashMap::new();

    if !real_channels.is_empty() {
        let query = TableQuery::new("mapping")
            .columns(["channel", "virtual"])
            .filter(FilterTerm::any_of(
                "channel",
                real_channels.iter().map(|&c| Value::Integer(c)).collect(),
            ));
        let mapping = store.load(&query)?;

        let channels = mapping.column("channel").unwrap_or_default().to_vec();
        let names = mapping.column("virtual").unwrap_or_default().to_vec();

        let mut rows: Vec<(i64, String)> = channels
            .iter()
            .zip(&names)
            .filter_map(|(channel, name)| {
                Some((channel.as_i64()?, name.as_str()?.to_string()))
            })
            .collect();
        // Sort by the leading virtual-channel number; unparsable labels last
        rows.sort_by(|a, b| virtual_number(&a.1).total_cmp(&virtual_number(&b.1)));

        for (channel, name) in rows {
            virtuals.entry(channel).or_default().push(name);
        }
    }

    Ok(real_channels
        .iter()
        .map(|&channel| {
            let label = match virtuals.get(&channel) {
                Some(names) => format!("{channel}: {}", names.join(", ")),
                None => channel.to_string(),
            };
            (channel, label)
        })
        .collect())
}

/// Leading virtual-channel number of a `"7.1 KAAA"` style label.
fn virtual_number(label: &str) -> f64 {
    label
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<f64>().ok())
        .unwrap_or(f64::MAX)
}
