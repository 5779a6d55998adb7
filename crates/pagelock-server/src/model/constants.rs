// Configuration keys, defaults and HTTP constants

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";
pub const ENV_PREFIX: &str = "PAGELOCK";

pub const SERVER_ADDRESS_PROPERTY: &str = "server.address";
pub const SERVER_PORT_PROPERTY: &str = "server.port";
pub const SERVER_SHUTDOWN_TIMEOUT_PROPERTY: &str = "server.shutdown_timeout_secs";
pub const STREAM_HEARTBEAT_INTERVAL_PROPERTY: &str = "stream.heartbeat_interval_ms";
pub const STREAM_CHANNEL_CAPACITY_PROPERTY: &str = "stream.channel_capacity";
pub const LOCK_ANONYMOUS_HOLDER_PROPERTY: &str = "lock.anonymous_holder";
pub const LOGS_PATH_PROPERTY: &str = "logs.path";
pub const LOGS_CONSOLE_PROPERTY: &str = "logs.console";
pub const LOGS_FILE_PROPERTY: &str = "logs.file";
pub const LOGS_LEVEL_PROPERTY: &str = "logs.level";
pub const LOGS_ROTATION_PROPERTY: &str = "logs.rotation";

pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 15_000;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
pub const DEFAULT_ANONYMOUS_HOLDER: &str = "Anonymous";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_ROTATION: &str = "daily";

/// Header carrying the identity of the user taking a lock
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Form field an unload beacon uses to request an unlock over POST
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
