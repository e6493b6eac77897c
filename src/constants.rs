// src/constants.rs

/// Name of the application directory inside the system config directory.
pub const APP_DIR: &str = "launchpad";

/// The default catalog file name (inside the application config directory).
pub const CATALOG_FILENAME: &str = "catalog.toml";

/// Environment variable that overrides the catalog location.
pub const CATALOG_ENV_VAR: &str = "LAUNCHPAD_CATALOG";

/// Parameter type whose only candidate is the parameter's own name.
pub const LITERAL_TYPE: &str = "literal";

/// Built-in parameter type for IP addresses.
pub const IP_ADDRESS_TYPE: &str = "ip-address";

/// Built-in parameter type for IP ports.
pub const IP_PORT_TYPE: &str = "ip-port";

/// Built-in parameter type for device nodes.
pub const DEVICE_FILE_TYPE: &str = "device-file";

/// Directory scanned for evdev input devices.
pub const INPUT_DEVICE_DIR: &str = "/dev/input/by-id";

/// Lowest port proposed for `ip-port` parameters.
pub const MIN_CANDIDATE_PORT: i64 = 1000;

/// Highest port proposed for `ip-port` parameters.
pub const MAX_CANDIDATE_PORT: i64 = 65535;

/// Separator between chained targets on the `launch` command line.
pub const CHAIN_SEPARATOR: &str = "+";
