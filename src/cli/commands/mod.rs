//! CLI command implementations.

mod checkpoint;
mod config;
mod doctor;
mod fetch;
mod split;
mod upsert;

pub use checkpoint::run_checkpoint;
pub use config::run_config;
pub use doctor::run_doctor;
pub use fetch::run_fetch;
pub use split::run_split;
pub use upsert::run_upsert;
