///! Plotly-shaped chart traces
///!
///! The serialized figure is the boundary to the rendering layer: reports
///! build an ordered trace list, serialize it, and never look inside again.

use serde::Serialize;

/// Trace outline styling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerLine {
    pub color: String,
    pub width: f64,
}

impl MarkerLine {
    /// The black outline every bar and histogram trace carries.
    pub fn outline() -> Self {
        Self {
            color: "black".to_string(),
            width: 1.5,
        }
    }
}

/// A single trace color or one color per data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MarkerColor {
    Single(String),
    PerPoint(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Marker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<MarkerColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<MarkerLine>,
}

impl Marker {
    pub fn outlined() -> Self {
        Self {
            color: None,
            line: Some(MarkerLine::outline()),
        }
    }

    pub fn colored(color: impl Into<String>) -> Self {
        Self {
            color: Some(MarkerColor::Single(color.into())),
            line: None,
        }
    }
}

/// Histogram bin settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bins {
    pub size: f64,
}

/// An x-axis value: numeric, or text for calendar timestamps and labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisValue {
    Number(f64),
    Text(String),
}

/// One renderable trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Histogram {
        name: String,
        x: Vec<f64>,
        legendgroup: String,
        opacity: f64,
        bingroup: u32,
        xbins: Bins,
        #[serde(skip_serializing_if = "Option::is_none")]
        histnorm: Option<String>,
        marker: Marker,
    },
    Scatter {
        name: String,
        x: Vec<AxisValue>,
        y: Vec<f64>,
        mode: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        legendgroup: Option<String>,
        showlegend: bool,
        visible: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        marker: Option<Marker>,
    },
    Bar {
        name: String,
        x: Vec<String>,
        y: Vec<f64>,
        marker: Marker,
    },
}

impl Trace {
    pub fn name(&self) -> &str {
        match self {
            Trace::Histogram { name, .. }
            | Trace::Scatter { name, .. }
            | Trace::Bar { name, .. } => name,
        }
    }
}

/// An ordered list of traces, serializable for the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Figure {
    pub data: Vec<Trace>,
}

impl Figure {
    pub fn new(data: Vec<Trace>) -> Self {
        Self { data }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
