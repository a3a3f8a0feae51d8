///! Shared test fixtures: a seeded on-disk monitor database
use rusqlite::Connection;
use tempfile::TempDir;

use crate::store::Store;

pub(crate) const TEST_UTC_OFFSET_SECS: i64 = 4 * 3600;

/// Creates a temporary monitor database with two antennas, three scans, and
/// a small set of signal, mapping, and weather rows. Channel 36 has snq = 0
/// (not watchable).
pub(crate) fn seeded_store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("monitor.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE monitor (configured_antenna_instance INTEGER);
        CREATE TABLE antenna (
            antenna_instance INTEGER PRIMARY KEY,
            name TEXT,
            location TEXT,
            direction INTEGER,
            comment TEXT
        );
        CREATE TABLE scan (
            scan_instance INTEGER PRIMARY KEY,
            antenna_instance INTEGER,
            start_time INTEGER
        );
        CREATE TABLE signal (
            scan_instance INTEGER,
            channel INTEGER,
            snq INTEGER,
            ss INTEGER,
            seq INTEGER
        );
        CREATE TABLE mapping (channel INTEGER, virtual TEXT);
        CREATE TABLE weather (
            start_time INTEGER,
            reference_time INTEGER,
            status TEXT,
            temperature REAL,
            wind_direction REAL,
            wind_speed REAL,
            humidity REAL,
            sunset INTEGER
        );

        INSERT INTO monitor VALUES (1);
        INSERT INTO antenna VALUES
            (1, 'roof yagi', 'attic', 180, 'primary'),
            (2, 'dipole', 'garage', 90, 'backup');
        INSERT INTO scan VALUES
            (80, 1, 1700000000),
            (83, 1, 1700003600),
            (90, 2, 1700007200);
        INSERT INTO signal VALUES
            (80, 27, 70, 80, 100),
            (80, 32, 55, 60, 90),
            (80, 36, 0, 10, 0),
            (83, 27, 72, 82, 98),
            (83, 32, 50, 58, 88),
            (90, 27, 40, 45, 70);
        INSERT INTO mapping VALUES
            (27, '7.1 KAAA'),
            (27, '7.2 KAAA-2'),
            (32, '10.1 KBBB'),
            (36, '12.1 KCCC');
        INSERT INTO weather VALUES
            (1700000000, 1700000000, 'Clear', 70.0, 180.0, 5.0, 40.0, 1700020000),
            (1700003600, 1700003600, 'Rain', 65.0, 170.0, 8.0, 80.0, 1700020000);
        "#,
    )
    .unwrap();

    (dir, Store::new(path, TEST_UTC_OFFSET_SECS))
}
