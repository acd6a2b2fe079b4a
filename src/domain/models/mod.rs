pub mod config;
pub mod event;

pub use config::{
    CacheConfig, Config, DatabaseConfig, LogFormat, LoggingConfig, ReconcilerConfig,
    RotationPolicy, MAX_INTERVAL_SECS, MAX_LIVE_DURATION_SECS,
};
pub use event::{Event, EventId, EventStatus, HostId};
