///! Channel tracking: signal measurements per channel over scan time
use std::collections::HashMap;

use anyhow::Result;

use crate::chart::{AxisValue, Figure, Marker, Trace};
use crate::fit::SIGNAL_MEASUREMENTS;
use crate::report::ids::{self, AntennaId};
use crate::report::labels::channel_labels;
use crate::store::{FilterTerm, Store, TableQuery, Value};

/// Fixed trace palette, cycled per channel.
const COLORS: [&str; 29] = [
    "#1f77b4",
    "#ff7f0e",
    "#2ca02c",
    "#d62728",
    "#9467bd",
    "#8c564b",
    "#e377c2",
    "#7f7f7f",
    "#bcbd22",
    "#17becf",
    "goldenrod",
    "darkseagreen",
    "palevioletred",
    "slateblue",
    "teal",
    "chocolate",
    "deepskyblue",
    "lightcoral",
    "greenyellow",
    "dodgerblue",
    "darksalmon",
    "khaki",
    "plum",
    "lightgreen",
    "mediumslateblue",
    "olive",
    "darkgray",
    "fuchsia",
    "ivory",
];

pub struct TrackChannels<'a> {
    store: &'a Store,
}

impl<'a> TrackChannels<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// One line per watchable channel per measurement, over scan start
    /// time. Only the default measurement (snq) starts visible; the
    /// rendering layer toggles the rest. Scans are restricted to those
    /// every channel reported, so the lines share an x domain.
    pub fn figure(&self, antenna: Option<i64>) -> Result<Figure> {
        let antenna = AntennaId::resolve(self.store, antenna)?;
        let channels = ids::watchable_channels(self.store, antenna)?;
        let labels = channel_labels(self.store, &channels)?;

        // Per channel: scan_instance -> [snq, ss, seq]
        let mut per_channel: HashMap<i64, HashMap<i64, [f64; 3]>> = HashMap::new();
        for &channel in &channels {
            let table = self.store.load_query(
                "SELECT signal.scan_instance, snq, ss, seq FROM signal \
                 LEFT JOIN scan ON signal.scan_instance = scan.scan_instance \
                 WHERE channel = ? AND antenna_instance = ?",
                &[Value::Integer(channel), Value::Integer(antenna.0)],
            )?;

            let scans = table.i64_column("scan_instance").unwrap_or_default();
            let mut by_scan = HashMap::with_capacity(scans.len());
            for (i, scan) in scans.into_iter().enumerate() {
                let mut values = [0.0; 3];
                for (j, &measurement) in SIGNAL_MEASUREMENTS.iter().enumerate() {
                    values[j] = table
                        .column(measurement)
                        .and_then(|col| col.get(i))
                        .and_then(Value::as_f64)
                        .unwrap_or(0.0);
                }
                by_scan.insert(scan, values);
            }
            per_channel.insert(channel, by_scan);
        }

        // Scan start times, converted to calendar timestamps on load
        let scan_table = self.store.load(
            &TableQuery::new("scan")
                .columns(["scan_instance", "start_time"])
                .filter(FilterTerm::equals("antenna_instance", antenna.0))
                .datetimes(["start_time"]),
        )?;
        let scan_ids = scan_table.i64_column("scan_instance").unwrap_or_default();
        let start_times = scan_table.column("start_time").unwrap_or_default();

        // Inner join: keep scans present for every channel
        let keep: Vec<usize> = (0..scan_ids.len())
            .filter(|&i| {
                per_channel
                    .values()
                    .all(|by_scan| by_scan.contains_key(&scan_ids[i]))
            })
            .collect();
        let x: Vec<AxisValue> = keep.iter().map(|&i| axis_value(&start_times[i])).collect();
        let mode = if x.len() == 1 { "markers" } else { "lines" };

        let mut data = Vec::with_capacity(SIGNAL_MEASUREMENTS.len() * channels.len());
        for (mi, _measurement) in SIGNAL_MEASUREMENTS.iter().enumerate() {
            let visible = mi == 0;
            for (ci, &channel) in channels.iter().enumerate() {
                let by_scan = &per_channel[&channel];
                let y: Vec<f64> = keep.iter().map(|&i| by_scan[&scan_ids[i]][mi]).collect();
                data.push(Trace::Scatter {
                    name: labels
                        .get(&channel)
                        .cloned()
                        .unwrap_or_else(|| channel.to_string()),
                    x: x.clone(),
                    y,
                    mode: mode.to_string(),
                    legendgroup: None,
                    showlegend: visible,
                    visible,
                    marker: Some(Marker::colored(COLORS[ci % COLORS.len()])),
                });
            }
        }
        Ok(Figure::new(data))
    }
}

fn axis_value(value: &Value) -> AxisValue {
    match value {
        Value::Integer(v) => AxisValue::Number(*v as f64),
        Value::Real(v) => AxisValue::Number(*v),
        Value::Text(s) => AxisValue::Text(s.clone()),
        Value::Timestamp(ts) => AxisValue::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        Value::Null => AxisValue::Text(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::seeded_store;

    #[test]
    fn test_three_traces_per_channel() {
        let (_dir, store) = seeded_store();
        let figure = TrackChannels::new(&store).figure(Some(1)).unwrap();

        // Antenna 1: channels 32 and 27, three measurements each
        assert_eq!(figure.data.len(), 6);

        // Only the first measurement's traces start visible
        let visibility: Vec<bool> = figure
            .data
            .iter()
            .map(|t| match t {
                Trace::Scatter { visible, .. } => *visible,
                other => panic!("expected scatter, got {other:?}"),
            })
            .collect();
        assert_eq!(visibility, [true, true, false, false, false, false]);
    }

    #[test]
    fn test_time_axis_is_calendar_text() {
        let (_dir, store) = seeded_store();
        let figure = TrackChannels::new(&store).figure(Some(1)).unwrap();
        match &figure.data[0] {
            Trace::Scatter { x, y, .. } => {
                assert_eq!(x.len(), 2); // both antenna-1 scans
                assert_eq!(y.len(), 2);
                assert!(matches!(x[0], AxisValue::Text(_)));
            }
            other => panic!("expected scatter, got {other:?}"),
        }
    }

    #[test]
    fn test_channel_values_follow_scan_order() {
        let (_dir, store) = seeded_store();
        let figure = TrackChannels::new(&store).figure(Some(1)).unwrap();
        // Channels are descending: trace 0 is channel 32's snq
        match &figure.data[0] {
            Trace::Scatter { y, .. } => assert_eq!(y, &vec![55.0, 50.0]),
            other => panic!("expected scatter, got {other:?}"),
        }
    }
}
