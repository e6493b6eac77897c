//! # System Interaction Layer
//!
//! The boundary between the resolution logic and the operating system.
//!
//! ## Modules
//!
//! - **`discovery`**: Host probes behind the built-in candidate selectors (network
//!   interfaces, input devices).
//! - **`process`**: Spawning resolved launches and tracking them until they exit. Each
//!   process gets a dedicated reaper thread that is the only code allowed to wait on it.

pub mod discovery;
pub mod process;
