///! Adaptive distribution fitting over the three signal measurements
///!
///! Short measurement windows saturate at a ceiling and repeat values, which
///! makes the curve fit's internal linear system singular. Rather than fail
///! the request, the fitter shrinks its sample window one element at a time
///! and keeps the largest window that fits, trading sample completeness for
///! a renderable result.

mod curve;

pub use curve::{CurveFamily, CurveFit, GaussianKde, NormalCurve};

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::chart::{AxisValue, Bins, Figure, Marker, Trace};

/// The three named signal-quality measurements, in trace order.
pub const SIGNAL_MEASUREMENTS: [&str; 3] = ["snq", "ss", "seq"];

const BIN_WIDTH: f64 = 1.0;
const CURVE_POINTS: usize = 500;
const MIN_WINDOW: usize = 2;

#[derive(Debug, Error)]
pub enum FitError {
    /// The fit's internal linear system is degenerate, typically from
    /// near-constant or too-few distinct values. Recovered by shrinking
    /// the sample window.
    #[error("singular matrix: sample window has no spread")]
    SingularMatrix,

    #[error("measurement series lengths differ")]
    LengthMismatch,

    /// Every window down to the minimum failed. Fatal for the request.
    #[error("curve fit failed for every sample window down to {minimum} elements")]
    ExhaustedRetry { minimum: usize },
}

/// Three equal-length measurement series for one context (antenna +
/// channel, or scan), index-aligned.
#[derive(Debug, Clone)]
pub struct MeasurementSeries {
    series: [Vec<f64>; 3],
}

impl MeasurementSeries {
    pub fn new(snq: Vec<f64>, ss: Vec<f64>, seq: Vec<f64>) -> Result<Self, FitError> {
        if snq.len() != ss.len() || ss.len() != seq.len() {
            return Err(FitError::LengthMismatch);
        }
        Ok(Self {
            series: [snq, ss, seq],
        })
    }

    pub fn len(&self) -> usize {
        self.series[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn window(&self, measurement: usize, size: usize) -> &[f64] {
        &self.series[measurement][..size]
    }
}

/// Histogram normalization mode, applied uniformly to all three
/// measurements. The fitted curve is scaled to match so both stay on one
/// axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistNorm {
    /// Raw bin counts (plotly `histnorm=""`).
    #[default]
    Count,
    Probability,
    ProbabilityDensity,
}

impl HistNorm {
    pub fn plotly_name(self) -> Option<&'static str> {
        match self {
            HistNorm::Count => None,
            HistNorm::Probability => Some("probability"),
            HistNorm::ProbabilityDensity => Some("probability density"),
        }
    }

    fn curve_scale(self, samples: usize) -> f64 {
        match self {
            HistNorm::Count => samples as f64 * BIN_WIDTH,
            HistNorm::Probability => BIN_WIDTH,
            HistNorm::ProbabilityDensity => 1.0,
        }
    }
}

/// Histogram bins plus one fitted curve per measurement.
///
/// Trace order is fixed: three histograms (snq, ss, seq) followed by three
/// curves in the same order. Consumers pick out the curves by position.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub traces: Vec<Trace>,
    /// Window size actually used by the successful attempt. Histograms are
    /// computed over the same window, never the full input.
    pub effective_n: usize,
    pub family: CurveFamily,
    pub histnorm: HistNorm,
}

impl FitResult {
    pub fn into_figure(self) -> Figure {
        Figure::new(self.traces)
    }

    /// Fixed-width bin counts over the effective window for one
    /// measurement.
    pub fn bin_counts(&self, measurement: &str) -> Option<BTreeMap<i64, usize>> {
        self.traces.iter().find_map(|trace| match trace {
            Trace::Histogram { name, x, .. } if name == measurement => {
                let mut bins = BTreeMap::new();
                for &value in x {
                    *bins.entry((value / BIN_WIDTH).floor() as i64).or_insert(0) += 1;
                }
                Some(bins)
            }
            _ => None,
        })
    }
}

/// Fits histogram + curve representations of the three measurements,
/// recovering from singular-matrix failures by shrinking the sample window.
pub struct DistributionFitter {
    curve: Box<dyn CurveFit>,
    family: CurveFamily,
    histnorm: HistNorm,
}

impl DistributionFitter {
    pub fn new(family: CurveFamily, histnorm: HistNorm) -> Self {
        Self {
            curve: family.fitter(),
            family,
            histnorm,
        }
    }

    /// Swaps in a different fit capability. The family is kept for
    /// annotation only.
    pub fn with_curve(curve: Box<dyn CurveFit>, family: CurveFamily, histnorm: HistNorm) -> Self {
        Self {
            curve,
            family,
            histnorm,
        }
    }

    /// Adaptive shrink-and-retry fit.
    ///
    /// Attempts the full window first, then `[0, n-1)`, `[0, n-2)`, ...
    /// down to `[0, 2)`, keeping the first window that fits. Only
    /// singular-matrix failures are retried; anything else propagates.
    /// Inputs of length <= 1 skip fitting and get one hidden point-trace
    /// per measurement instead of a curve.
    pub fn fit(&self, series: &MeasurementSeries) -> Result<FitResult, FitError> {
        let n = series.len();
        if n <= 1 {
            return Ok(self.degenerate(series));
        }

        for window in (MIN_WINDOW..=n).rev() {
            match self.fit_window(series, window) {
                Ok(curves) => {
                    if window < n {
                        debug!(
                            requested = n,
                            effective = window,
                            "curve fit succeeded after shrinking sample window"
                        );
                    }
                    return Ok(self.assemble(series, window, curves));
                }
                Err(FitError::SingularMatrix) => continue,
                Err(other) => return Err(other),
            }
        }
        Err(FitError::ExhaustedRetry {
            minimum: MIN_WINDOW,
        })
    }

    /// One attempt over `[0, window)`: a shared evaluation grid across the
    /// three windows, one fitted curve each.
    fn fit_window(
        &self,
        series: &MeasurementSeries,
        window: usize,
    ) -> Result<Vec<(Vec<f64>, Vec<f64>)>, FitError> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for measurement in 0..3 {
            for &value in series.window(measurement, window) {
                lo = lo.min(value);
                hi = hi.max(value);
            }
        }
        let grid = linspace(lo, hi, CURVE_POINTS);
        let scale = self.histnorm.curve_scale(window);

        let mut curves = Vec::with_capacity(3);
        for measurement in 0..3 {
            let density = self.curve.fit(series.window(measurement, window), &grid)?;
            let y = density.into_iter().map(|v| v * scale).collect();
            curves.push((grid.clone(), y));
        }
        Ok(curves)
    }

    fn assemble(
        &self,
        series: &MeasurementSeries,
        window: usize,
        curves: Vec<(Vec<f64>, Vec<f64>)>,
    ) -> FitResult {
        let mut traces = Vec::with_capacity(6);
        for (i, name) in SIGNAL_MEASUREMENTS.iter().enumerate() {
            traces.push(self.histogram_trace(name, series.window(i, window).to_vec()));
        }
        for (name, (x, y)) in SIGNAL_MEASUREMENTS.iter().zip(curves) {
            traces.push(Trace::Scatter {
                name: name.to_string(),
                x: x.into_iter().map(AxisValue::Number).collect(),
                y,
                mode: "lines".to_string(),
                legendgroup: Some(name.to_string()),
                showlegend: true,
                visible: true,
                marker: None,
            });
        }
        FitResult {
            traces,
            effective_n: window,
            family: self.family,
            histnorm: self.histnorm,
        }
    }

    /// Too few points to fit: emit the (empty or single-value) histograms
    /// plus one point-trace per measurement, hidden from the legend.
    fn degenerate(&self, series: &MeasurementSeries) -> FitResult {
        let n = series.len();
        let mut traces = Vec::with_capacity(6);
        for (i, name) in SIGNAL_MEASUREMENTS.iter().enumerate() {
            traces.push(self.histogram_trace(name, series.window(i, n).to_vec()));
        }
        for (i, name) in SIGNAL_MEASUREMENTS.iter().enumerate() {
            let y: Vec<f64> = series.series[i].first().copied().into_iter().collect();
            traces.push(Trace::Scatter {
                name: name.to_string(),
                x: vec![AxisValue::Number(n as f64)],
                y,
                mode: "markers".to_string(),
                legendgroup: Some(name.to_string()),
                showlegend: false,
                visible: true,
                marker: None,
            });
        }
        FitResult {
            traces,
            effective_n: n,
            family: self.family,
            histnorm: self.histnorm,
        }
    }

    fn histogram_trace(&self, name: &str, x: Vec<f64>) -> Trace {
        Trace::Histogram {
            name: name.to_string(),
            x,
            legendgroup: name.to_string(),
            opacity: 0.75,
            bingroup: 1,
            xbins: Bins { size: BIN_WIDTH },
            histnorm: self.histnorm.plotly_name().map(str::to_string),
            marker: Marker::outlined(),
        }
    }
}

fn linspace(lo: f64, hi: f64, points: usize) -> Vec<f64> {
    if points == 0 || !lo.is_finite() || !hi.is_finite() {
        return Vec::new();
    }
    if points == 1 || hi <= lo {
        return vec![lo];
    }
    let step = (hi - lo) / (points - 1) as f64;
    (0..points).map(|i| lo + step * i as f64).collect()
}
