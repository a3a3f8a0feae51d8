///! Per-scan summary: grouped signal-measurement bars per channel
use anyhow::Result;

use crate::chart::{Figure, Marker, Trace};
use crate::fit::SIGNAL_MEASUREMENTS;
use crate::report::ids::{AntennaId, ScanId};
use crate::report::labels::channel_labels;
use crate::store::{Store, Value};

pub struct ScanSummary<'a> {
    store: &'a Store,
}

impl<'a> ScanSummary<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Grouped snq/ss/seq bars for the antenna's scan closest to
    /// `scan_time` (epoch seconds; the latest scan when unset). Channels
    /// with snq = 0 are not watchable and are skipped.
    pub fn figure(&self, antenna: Option<i64>, scan_time: Option<i64>) -> Result<Figure> {
        let antenna = AntennaId::resolve(self.store, antenna)?;
        let scan = ScanId::resolve_nearest(self.store, antenna, scan_time)?;

        let table = self.store.load_query(
            "SELECT * FROM signal WHERE scan_instance = ? AND snq > 0",
            &[Value::Integer(scan.0)],
        )?;

        let channels = table.i64_column("channel").unwrap_or_default();
        let labels = channel_labels(self.store, &channels)?;
        let ticks: Vec<String> = channels
            .iter()
            .map(|c| labels.get(c).cloned().unwrap_or_else(|| c.to_string()))
            .collect();

        let mut data = Vec::with_capacity(SIGNAL_MEASUREMENTS.len());
        for measurement in SIGNAL_MEASUREMENTS {
            data.push(Trace::Bar {
                name: measurement.to_string(),
                x: ticks.clone(),
                y: table.f64_column(measurement).unwrap_or_default(),
                marker: Marker::outlined(),
            });
        }
        Ok(Figure::new(data))
    }
}
