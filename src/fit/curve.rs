///! Curve-fit capability: Gaussian kernel density and fitted normal pdf
use super::FitError;

/// Requested curve family for a distribution fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurveFamily {
    #[default]
    Kde,
    Normal,
}

impl CurveFamily {
    pub fn fitter(self) -> Box<dyn CurveFit> {
        match self {
            CurveFamily::Kde => Box::new(GaussianKde),
            CurveFamily::Normal => Box::new(NormalCurve),
        }
    }
}

/// The numerical fit the distribution fitter depends on.
///
/// Fits a density curve to `samples` and evaluates it at each grid point.
/// A sample window whose internal linear system is degenerate (no spread,
/// fewer than two points) fails with `FitError::SingularMatrix`.
pub trait CurveFit {
    fn fit(&self, samples: &[f64], grid: &[f64]) -> Result<Vec<f64>, FitError>;
}

/// Gaussian kernel density estimate with Scott's-rule bandwidth.
pub struct GaussianKde;

impl CurveFit for GaussianKde {
    fn fit(&self, samples: &[f64], grid: &[f64]) -> Result<Vec<f64>, FitError> {
        let (_, std_dev) = sample_moments(samples)?;
        let n = samples.len() as f64;
        let bandwidth = std_dev * n.powf(-0.2);
        let scale = 1.0 / (n * bandwidth);

        Ok(grid
            .iter()
            .map(|&x| {
                scale
                    * samples
                        .iter()
                        .map(|&xi| standard_normal_pdf((x - xi) / bandwidth))
                        .sum::<f64>()
            })
            .collect())
    }
}

/// Normal pdf with mean and standard deviation fitted from the window.
pub struct NormalCurve;

impl CurveFit for NormalCurve {
    fn fit(&self, samples: &[f64], grid: &[f64]) -> Result<Vec<f64>, FitError> {
        let (mean, std_dev) = sample_moments(samples)?;
        Ok(grid
            .iter()
            .map(|&x| standard_normal_pdf((x - mean) / std_dev) / std_dev)
            .collect())
    }
}

/// Mean and sample standard deviation, rejecting degenerate windows.
fn sample_moments(samples: &[f64]) -> Result<(f64, f64), FitError> {
    let n = samples.len();
    if n < 2 {
        return Err(FitError::SingularMatrix);
    }

    let mean = samples.iter().sum::<f64>() / n as f64;
    let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    if !variance.is_finite() || variance <= 0.0 {
        return Err(FitError::SingularMatrix);
    }
    Ok((mean, variance.sqrt()))
}

fn standard_normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * std::f64::consts::PI).sqrt()
}
