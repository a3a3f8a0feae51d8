///! Report builders: each turns store rows into a renderable figure
pub mod channel_distribution;
pub mod ids;
pub mod labels;
pub mod scan_diff;
pub mod scan_summary;
pub mod track_channel;

pub use channel_distribution::{ChannelDistribution, DistributionReport, WeatherFilters};
pub use ids::{AntennaId, ScanId};
pub use scan_diff::{DiffMode, ScanDiff};
pub use scan_summary::ScanSummary;
pub use track_channel::TrackChannels;
