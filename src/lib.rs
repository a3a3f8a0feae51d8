///! Signal-monitor dashboard core: SQL-backed measurement store, adaptive
///! distribution fitting, and the report builders the dashboard renders.
pub mod chart;
pub mod config;
pub mod fit;
pub mod logging;
pub mod report;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;
