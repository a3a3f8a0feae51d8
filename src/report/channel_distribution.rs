///! Distribution of a channel's signal measurements, optionally narrowed
///! by observation-time and weather conditions
use anyhow::{Context, Result};

use crate::chart::Figure;
use crate::fit::{CurveFamily, DistributionFitter, HistNorm, MeasurementSeries};
use crate::report::ids::{self, AntennaId};
use crate::report::labels::channel_labels;
use crate::store::{Store, Value};

/// Optional predicates over the signal/scan/weather join. Every set field
/// contributes one ` AND ...` clause; unset fields contribute nothing.
#[derive(Debug, Clone, Default)]
pub struct WeatherFilters {
    /// Hour-of-day window, inclusive on both ends. Values are whole hours
    /// 0-23, taken from the scan start time shifted by the store's
    /// configured UTC offset.
    pub hour_of_day: Option<(i64, i64)>,
    /// Treat `hour_of_day` as a wrap-around window (night hours): keep
    /// rows at or after the start *or* at or before the end.
    pub inverse_time_of_day: bool,
    /// Scan start-time window, epoch seconds, inclusive on both ends.
    pub start_time: Option<(i64, i64)>,
    pub temperature: Option<(f64, f64)>,
    pub wind_direction: Option<(f64, f64)>,
    pub wind_speed: Option<(f64, f64)>,
    pub humidity: Option<(f64, f64)>,
    /// Exact weather status string ("Clear", "Rain", ...).
    pub status: Option<String>,
}

impl WeatherFilters {
    fn render(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut params = Vec::new();

        if let Some((start, end)) = self.hour_of_day {
            if self.inverse_time_of_day {
                sql.push_str(" AND (hour_of_day >= ? OR hour_of_day <= ?)");
            } else {
                sql.push_str(" AND hour_of_day >= ? AND hour_of_day <= ?");
            }
            params.push(Value::Integer(start));
            params.push(Value::Integer(end));
        }
        if let Some((start, end)) = self.start_time {
            // Qualified: the join carries a start_time on both sides
            sql.push_str(" AND scan.start_time >= ? AND scan.start_time <= ?");
            params.push(Value::Integer(start));
            params.push(Value::Integer(end));
        }
        for (column, range) in [
            ("temperature", self.temperature),
            ("wind_direction", self.wind_direction),
            ("wind_speed", self.wind_speed),
            ("humidity", self.humidity),
        ] {
            if let Some((low, high)) = range {
                sql.push_str(&format!(" AND {column} >= ? AND {column} <= ?"));
                params.push(Value::Real(low));
                params.push(Value::Real(high));
            }
        }
        if let Some(status) = &self.status {
            sql.push_str(" AND status = ?");
            params.push(Value::Text(status.clone()));
        }
        (sql, params)
    }
}

/// A fitted distribution figure plus the metadata the rendering layer
/// titles it with.
#[derive(Debug)]
pub struct DistributionReport {
    pub figure: Figure,
    pub channel: i64,
    pub channel_label: String,
    /// Sample-window size the fit actually used; smaller than the row
    /// count when the fitter had to shrink.
    pub effective_samples: usize,
}

pub struct ChannelDistribution<'a> {
    store: &'a Store,
}

impl<'a> ChannelDistribution<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Histogram-plus-curve figure for one channel's three measurements
    /// across every scan matching `filters`.
    pub fn report(
        &self,
        channel: Option<i64>,
        antenna: Option<i64>,
        family: CurveFamily,
        histnorm: HistNorm,
        filters: &WeatherFilters,
    ) -> Result<DistributionReport> {
        let antenna = AntennaId::resolve(self.store, antenna)?;
        let channel = ids::resolve_channel(self.store, antenna, channel)?;

        let (filter_sql, filter_params) = filters.render();
        // hour_of_day is a result alias; SQLite resolves aliases in WHERE,
        // which the appended filter clauses rely on.
        let sql = format!(
            "SELECT snq, ss, seq, \
                    CAST(strftime('%H', scan.start_time - ?, 'unixepoch') AS INTEGER) \
                        AS hour_of_day \
             FROM signal \
             LEFT JOIN scan ON signal.scan_instance = scan.scan_instance \
             LEFT JOIN weather ON scan.start_time = weather.start_time \
             WHERE channel = ? AND antenna_instance = ?{filter_sql}"
        );
        let mut params = vec![
            Value::Integer(self.store.utc_offset_secs()),
            Value::Integer(channel),
            Value::Integer(antenna.0),
        ];
        params.extend(filter_params);
        let table = self.store.load_query(&sql, &params)?;

        let series = MeasurementSeries::new(
            table.f64_column("snq").unwrap_or_default(),
            table.f64_column("ss").unwrap_or_default(),
            table.f64_column("seq").unwrap_or_default(),
        )?;

        let result = DistributionFitter::new(family, histnorm)
            .fit(&series)
            .with_context(|| format!("channel {channel} distribution fit"))?;

        let channel_label = channel_labels(self.store, &[channel])?
            .remove(&channel)
            .unwrap_or_else(|| channel.to_string());
        let effective_samples = result.effective_n;

        Ok(DistributionReport {
            figure: result.into_figure(),
            channel,
            channel_label,
            effective_samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Trace;
    use crate::testutil::seeded_store;

    #[test]
    fn test_six_traces_histograms_then_curves() {
        let (_dir, store) = seeded_store();
        let report = ChannelDistribution::new(&store)
            .report(
                Some(27),
                Some(1),
                CurveFamily::Kde,
                HistNorm::default(),
                &WeatherFilters::default(),
            )
            .unwrap();

        let names: Vec<&str> = report.figure.data.iter().map(Trace::name).collect();
        assert_eq!(names, ["snq", "ss", "seq", "snq", "ss", "seq"]);
        for trace in &report.figure.data[..3] {
            assert!(matches!(trace, Trace::Histogram { .. }));
        }
        for trace in &report.figure.data[3..] {
            assert!(matches!(trace, Trace::Scatter { .. }));
        }
        assert_eq!(report.channel, 27);
        assert_eq!(report.channel_label, "27: 7.1 KAAA, 7.2 KAAA-2");
    }

    #[test]
    fn test_unknown_channel_falls_back() {
        let (_dir, store) = seeded_store();
        let report = ChannelDistribution::new(&store)
            .report(
                Some(999),
                Some(1),
                CurveFamily::Normal,
                HistNorm::default(),
                &WeatherFilters::default(),
            )
            .unwrap();
        assert_eq!(report.channel, 27);
    }

    #[test]
    fn test_single_sample_degenerates_without_curve_fit() {
        let (_dir, store) = seeded_store();
        // Channel 27 on antenna 2 appears in a single scan
        let report = ChannelDistribution::new(&store)
            .report(
                Some(27),
                Some(2),
                CurveFamily::Kde,
                HistNorm::default(),
                &WeatherFilters::default(),
            )
            .unwrap();
        assert_eq!(report.effective_samples, 1);
        assert_eq!(report.figure.data.len(), 6);
    }

    #[test]
    fn test_weather_filters_render() {
        let filters = WeatherFilters {
            hour_of_day: Some((8, 17)),
            temperature: Some((20.0, 30.0)),
            status: Some("Clear".to_string()),
            ..Default::default()
        };
        let (sql, params) = filters.render();
        assert_eq!(
            sql,
            " AND hour_of_day >= ? AND hour_of_day <= ? \
             AND temperature >= ? AND temperature <= ? AND status = ?"
        );
        assert_eq!(params.len(), 5);
    }

    #[test]
    fn test_start_time_renders_as_range() {
        let filters = WeatherFilters {
            start_time: Some((1_700_000_000, 1_700_003_000)),
            ..Default::default()
        };
        let (sql, params) = filters.render();
        assert_eq!(sql, " AND scan.start_time >= ? AND scan.start_time <= ?");
        assert_eq!(
            params,
            vec![Value::Integer(1_700_000_000), Value::Integer(1_700_003_000)]
        );
    }

    #[test]
    fn test_start_time_range_narrows_the_sample_window() {
        let (_dir, store) = seeded_store();
        // Channel 27 on antenna 1 has two scans; the range keeps only the
        // first, leaving a single sample and a degenerate fit.
        let report = ChannelDistribution::new(&store)
            .report(
                Some(27),
                Some(1),
                CurveFamily::Kde,
                HistNorm::default(),
                &WeatherFilters {
                    start_time: Some((1_699_999_000, 1_700_000_100)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(report.effective_samples, 1);

        // Both ends inclusive: widening to cover both scans restores them
        let report = ChannelDistribution::new(&store)
            .report(
                Some(27),
                Some(1),
                CurveFamily::Kde,
                HistNorm::default(),
                &WeatherFilters {
                    start_time: Some((1_700_000_000, 1_700_003_600)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(report.effective_samples, 2);
    }

    #[test]
    fn test_inverse_hour_window_is_an_or_group() {
        let filters = WeatherFilters {
            hour_of_day: Some((22, 5)),
            inverse_time_of_day: true,
            ..Default::default()
        };
        let (sql, params) = filters.render();
        assert_eq!(sql, " AND (hour_of_day >= ? OR hour_of_day <= ?)");
        assert_eq!(params, vec![Value::Integer(22), Value::Integer(5)]);
    }

    #[test]
    fn test_empty_filters_render_nothing() {
        let (sql, params) = WeatherFilters::default().render();
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }
}
