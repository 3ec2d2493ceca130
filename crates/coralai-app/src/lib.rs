//! Shared plumbing for the headless coralai driver.

pub mod config;
pub mod session;

pub use config::{AppConfig, Brush, ConfigError, ConfigOverride, RunConfig};
pub use session::{ChannelSlot, RunReport, Session};
