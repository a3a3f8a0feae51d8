///! Scan comparison: one measurement across two scans
use std::collections::HashMap;

use anyhow::{Result, bail};

use crate::chart::{Figure, Marker, MarkerColor, MarkerLine, Trace};
use crate::report::ids::ScanId;
use crate::report::labels::channel_labels;
use crate::store::{FilterTerm, Store, TableQuery, Value};

/// How the two scans are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMode {
    /// Grouped bars, one group per scan.
    Compare,
    /// A single bar per channel holding scan0 - scan1, green when the
    /// first scan is better, red otherwise.
    Diff,
}

pub struct ScanDiff<'a> {
    store: &'a Store,
}

impl<'a> ScanDiff<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Compares `measurement` between two scans. Channels are joined
    /// across the scans; a channel missing from one side contributes 0.
    /// Output rows are sorted by the second scan's measurement.
    pub fn figure(&self, measurement: &str, scans: [i64; 2], mode: DiffMode) -> Result<Figure> {
        for &scan in &scans {
            ScanId::validate(self.store, scan)?;
        }
        if !self.store.exists(measurement, "signal", None)? {
            bail!("unknown signal measurement {measurement:?}");
        }

        // Watchability filter: for snq, pin the exact channel set seen in
        // either scan; for other measurements snq != 0 is enough.
        let watchable = if measurement == "snq" {
            let channels = self
                .store
                .load_query(
                    "SELECT DISTINCT channel FROM signal \
                     WHERE (scan_instance = ? OR scan_instance = ?) AND NOT snq = 0",
                    &[Value::Integer(scans[0]), Value::Integer(scans[1])],
                )?
                .i64_column("channel")
                .unwrap_or_default();
            if channels.is_empty() {
                bail!("neither scan has a watchable channel");
            }
            FilterTerm::any_of(
                "channel",
                channels.into_iter().map(Value::Integer).collect(),
            )
        } else {
            FilterTerm::equals("snq", 0).negated()
        };

        let mut per_scan: Vec<HashMap<i64, f64>> = Vec::with_capacity(2);
        for &scan in &scans {
            let query = TableQuery::new("signal")
                .columns(["scan_instance", "channel", "snq", "ss", "seq"])
                .filter(watchable.clone())
                .filter(FilterTerm::equals("scan_instance", scan));
            let table = self.store.load(&query)?;

            let channels = table.i64_column("channel").unwrap_or_default();
            let values = table.f64_column(measurement).unwrap_or_default();
            per_scan.push(channels.into_iter().zip(values).collect());
        }

        // Outer join on channel, missing side filled with 0
        let mut channels: Vec<i64> = per_scan[0]
            .keys()
            .chain(per_scan[1].keys())
            .copied()
            .collect();
        channels.sort_unstable();
        channels.dedup();
        channels.sort_by(|a, b| {
            let va = per_scan[1].get(a).copied().unwrap_or(0.0);
            let vb = per_scan[1].get(b).copied().unwrap_or(0.0);
            va.total_cmp(&vb)
        });

        let labels = channel_labels(self.store, &channels)?;
        let ticks: Vec<String> = channels
            .iter()
            .map(|c| labels.get(c).cloned().unwrap_or_else(|| c.to_string()))
            .collect();
        let series: Vec<Vec<f64>> = (0..2)
            .map(|i| {
                channels
                    .iter()
                    .map(|c| per_scan[i].get(c).copied().unwrap_or(0.0))
                    .collect()
            })
            .collect();

        let data = match mode {
            DiffMode::Compare => scans
                .iter()
                .zip(series)
                .map(|(scan, y)| Trace::Bar {
                    name: format!("Scan {scan}"),
                    x: ticks.clone(),
                    y,
                    marker: Marker::outlined(),
                })
                .collect(),
            DiffMode::Diff => {
                let diff: Vec<f64> = series[0]
                    .iter()
                    .zip(&series[1])
                    .map(|(a, b)| a - b)
                    .collect();
                // When the diff is 0 the color is a placeholder
                let colors: Vec<String> = diff
                    .iter()
                    .map(|&d| if d > 0.0 { "green" } else { "red" }.to_string())
                    .collect();
                vec![Trace::Bar {
                    name: format!("Scan {} - Scan {}", scans[0], scans[1]),
                    x: ticks,
                    y: diff,
                    marker: Marker {
                        color: Some(MarkerColor::PerPoint(colors)),
                        line: Some(MarkerLine::outline()),
                    },
                }]
            }
        };
        Ok(Figure::new(data))
    }
}
