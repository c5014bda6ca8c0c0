//! SQL schema for the campus-rides SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`.
//! Future migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Minimal user/vehicle directory. Profile CRUD lives outside this
-- core; these rows back driver-assignment checks and the
-- completed-ride counter.
CREATE TABLE IF NOT EXISTS users (
    user_id         TEXT PRIMARY KEY,
    is_driver       INTEGER NOT NULL DEFAULT 0,
    is_active       INTEGER NOT NULL DEFAULT 1,
    completed_rides INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS vehicles (
    vehicle_id TEXT PRIMARY KEY,
    owner_id   TEXT NOT NULL REFERENCES users(user_id),
    is_active  INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS rides (
    ride_id             TEXT PRIMARY KEY,
    passenger_id        TEXT NOT NULL,
    driver_id           TEXT,            -- NULL until assigned
    vehicle_id          TEXT,
    pickup_lat          REAL NOT NULL,
    pickup_lng          REAL NOT NULL,
    dropoff_lat         REAL NOT NULL,
    dropoff_lng         REAL NOT NULL,
    ride_status         TEXT NOT NULL DEFAULT 'pending',
    actual_distance_km  REAL,
    actual_duration_min INTEGER,
    cancelled_by        TEXT,            -- 'passenger' | 'driver'
    cancellation_reason TEXT,
    created_at          TEXT NOT NULL,   -- ISO 8601 UTC
    started_at          TEXT,
    completed_at        TEXT
);

CREATE TABLE IF NOT EXISTS ride_tracking (
    tracking_id                TEXT PRIMARY KEY,
    ride_id                    TEXT NOT NULL REFERENCES rides(ride_id),
    driver_lat                 REAL NOT NULL,
    driver_lng                 REAL NOT NULL,
    driver_heading             REAL NOT NULL DEFAULT 0,
    driver_speed               REAL NOT NULL DEFAULT 0,
    pickup_lat                 REAL NOT NULL,
    pickup_lng                 REAL NOT NULL,
    dropoff_lat                REAL NOT NULL,
    dropoff_lng                REAL NOT NULL,
    distance_to_pickup_km      REAL NOT NULL,
    distance_to_destination_km REAL NOT NULL,
    eta_to_pickup_min          INTEGER,
    eta_to_dropoff_min         INTEGER,
    route_polyline             TEXT,
    route_distance_km          REAL,
    route_duration_min         INTEGER,
    tracking_status            TEXT NOT NULL DEFAULT 'idle',
    is_active                  INTEGER NOT NULL DEFAULT 1,
    created_at                 TEXT NOT NULL,
    last_updated               TEXT NOT NULL
);

-- At most one active session per ride.
CREATE UNIQUE INDEX IF NOT EXISTS ride_tracking_active_idx
    ON ride_tracking(ride_id) WHERE is_active = 1;

-- Location history is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS ride_location_history (
    sample_id       TEXT PRIMARY KEY,
    ride_id         TEXT NOT NULL REFERENCES rides(ride_id),
    lat             REAL NOT NULL,
    lng             REAL NOT NULL,
    speed           REAL NOT NULL DEFAULT 0,
    heading         REAL NOT NULL DEFAULT 0,
    accuracy        REAL,
    tracking_status TEXT NOT NULL,
    recorded_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS location_history_ride_idx
    ON ride_location_history(ride_id, recorded_at);

CREATE TABLE IF NOT EXISTS ride_notifications (
    notification_id   TEXT PRIMARY KEY,
    ride_id           TEXT NOT NULL REFERENCES rides(ride_id),
    user_id           TEXT NOT NULL,
    notification_type TEXT NOT NULL,
    title             TEXT NOT NULL,
    message           TEXT NOT NULL,
    metadata          TEXT NOT NULL DEFAULT '{}',
    is_read           INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL,
    read_at           TEXT
);

CREATE INDEX IF NOT EXISTS notifications_user_idx
    ON ride_notifications(user_id, is_read);
CREATE INDEX IF NOT EXISTS notifications_debounce_idx
    ON ride_notifications(ride_id, user_id, notification_type, created_at);

PRAGMA user_version = 1;
";
