///! Validated request identifiers
///!
///! Parameters that pick *which data to view* (antenna, channel) degrade to
///! a documented default when unknown; parameters whose validity decides
///! whether the request is well-formed at all (scan instances) are
///! rejected.

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::store::{Store, TableQuery, Value};

/// A physical antenna/receiver configuration, known to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntennaId(pub i64);

impl AntennaId {
    /// The requested antenna if it exists, otherwise the configured default
    /// from the singleton monitor row.
    pub fn resolve(store: &Store, requested: Option<i64>) -> Result<Self> {
        if let Some(id) = requested {
            if store
                .exists("antenna_instance", "antenna", Some(&Value::Integer(id)))?
            {
                return Ok(Self(id));
            }
            warn!(
                antenna = id,
                "unknown antenna instance, falling back to configured default"
            );
        }

        let monitor = store.load(
            &TableQuery::new("monitor").columns(["configured_antenna_instance"]),
        )?;
        let id = monitor
            .column("configured_antenna_instance")
            .and_then(|col| col.first())
            .and_then(Value::as_i64)
            .context("monitor table has no configured antenna instance")?;
        Ok(Self(id))
    }
}

/// A single measurement sweep, known to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanId(pub i64);

impl ScanId {
    /// The antenna's scan closest to `time` (epoch seconds), or to the
    /// current time when unset.
    pub fn resolve_nearest(store: &Store, antenna: AntennaId, time: Option<i64>) -> Result<Self> {
        let time = time.unwrap_or_else(|| chrono::Utc::now().timestamp());
        let scans = store.load_query(
            "SELECT scan_instance FROM scan WHERE antenna_instance = ? \
             ORDER BY ABS(start_time - ?) LIMIT 1",
            &[Value::Integer(antenna.0), Value::Integer(time)],
        )?;
        let id = scans
            .column("scan_instance")
            .and_then(|col| col.first())
            .and_then(Value::as_i64)
            .with_context(|| format!("antenna instance {} has no scans", antenna.0))?;
        Ok(Self(id))
    }

    /// A caller-supplied scan instance. Unknown scans are rejected rather
    /// than defaulted.
    pub fn validate(store: &Store, scan: i64) -> Result<Self> {
        if store.exists("scan_instance", "scan", Some(&Value::Integer(scan)))? {
            Ok(Self(scan))
        } else {
            bail!("scan instance {scan} does not exist");
        }
    }
}

/// The requested channel if it is mapped, otherwise the antenna's first
/// watchable channel.
pub fn resolve_channel(store: &Store, antenna: AntennaId, requested: Option<i64>) -> Result<i64> {
    if let Some(channel) = requested {
        if store.exists("channel", "mapping", Some(&Value::Integer(channel)))? {
            return Ok(channel);
        }
        warn!(
            channel,
            "unknown channel, falling back to first watchable channel"
        );
    }
    default_channel(store, antenna)
}

/// First mapped channel that produced signal on the antenna.
pub fn default_channel(store: &Store, antenna: AntennaId) -> Result<i64> {
    let channels = store.load_query(
        "SELECT channel FROM mapping WHERE channel IN (\
            SELECT DISTINCT channel FROM signal \
            INNER JOIN scan ON signal.scan_instance = scan.scan_instance \
            WHERE antenna_instance = ? AND snq > 0) \
         ORDER BY channel ASC LIMIT 1",
        &[Value::Integer(antenna.0)],
    )?;
    channels
        .column("channel")
        .and_then(|col| col.first())
        .and_then(Value::as_i64)
        .with_context(|| format!("antenna instance {} has no watchable channels", antenna.0))
}

/// Channels that produced signal on the antenna, descending.
pub fn watchable_channels(store: &Store, antenna: AntennaId) -> Result<Vec<i64>> {
    let table = store.load_query(
        "SELECT DISTINCT channel FROM signal \
         INNER JOIN scan ON signal.scan_instance = scan.scan_instance \
         WHERE antenna_instance = ? AND snq > 0",
        &[Value::Integer(antenna.0)],
    )?;
    let mut channels = table.i64_column("channel").unwrap_or_default();
    channels.sort_unstable_by(|a, b| b.cmp(a));
    Ok(channels)
}

/// True iff every requested channel is mapped and every measurement name is
/// a signal column. Advisory, mirrors the probe contract: callers decide
/// fallback-or-reject.
pub fn validate_channels(store: &Store, channels: &[i64], measurements: &[&str]) -> Result<bool> {
    for &channel in channels {
        if !store.exists("channel", "mapping", Some(&Value::Integer(channel)))? {
            return Ok(false);
        }
    }
    for measurement in measurements {
        if !store.exists(measurement, "signal", None)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::seeded_store;

    #[test]
    fn test_known_antenna_resolves_to_itself() {
        let (_dir, store) = seeded_store();
        assert_eq!(AntennaId::resolve(&store, Some(2)).unwrap(), AntennaId(2));
    }

    #[test]
    fn test_unknown_antenna_falls_back_to_configured_default() {
        let (_dir, store) = seeded_store();
        assert_eq!(AntennaId::resolve(&store, Some(99)).unwrap(), AntennaId(1));
        assert_eq!(AntennaId::resolve(&store, None).unwrap(), AntennaId(1));
    }

    #[test]
    fn test_nearest_scan_by_time() {
        let (_dir, store) = seeded_store();
        let scan =
            ScanId::resolve_nearest(&store, AntennaId(1), Some(1_700_000_100)).unwrap();
        assert_eq!(scan, ScanId(80));
        let scan =
            ScanId::resolve_nearest(&store, AntennaId(1), Some(1_700_003_500)).unwrap();
        assert_eq!(scan, ScanId(83));
    }

    #[test]
    fn test_unknown_scan_is_rejected() {
        let (_dir, store) = seeded_store();
        assert!(ScanId::validate(&store, 80).is_ok());
        assert!(ScanId::validate(&store, 999).is_err());
    }

    #[test]
    fn test_channel_fallback() {
        let (_dir, store) = seeded_store();
        assert_eq!(resolve_channel(&store, AntennaId(1), Some(32)).unwrap(), 32);
        // Unknown channel degrades to the first watchable one
        assert_eq!(resolve_channel(&store, AntennaId(1), Some(99)).unwrap(), 27);
    }

    #[test]
    fn test_watchable_channels_exclude_zero_snq() {
        let (_dir, store) = seeded_store();
        assert_eq!(
            watchable_channels(&store, AntennaId(1)).unwrap(),
            vec![32, 27]
        );
    }

    #[test]
    fn test_validate_channels_probe() {
        let (_dir, store) = seeded_store();
        assert!(validate_channels(&store, &[27, 32], &["snq", "ss"]).unwrap());
        assert!(!validate_channels(&store, &[27, 99], &["snq"]).unwrap());
        assert!(!validate_channels(&store, &[27], &["bogus"]).unwrap());
    }
}
