pub mod app;
pub mod cli;
pub mod codec;
mod entrypoint;
pub mod fs;
pub mod logging;
pub mod paths;
pub mod reconcile;
pub mod store;

pub use app::{Deps, exit_code_for, run};
pub use entrypoint::cli_entrypoint;
pub(crate) use entrypoint::cli_entrypoint_from;
pub use reconcile::ExemptKeys;
pub use store::{ConfigError, ConfigStore, LoadOptions, LoadReport, LoadSource, StoreState, open};

#[cfg(test)]
mod test_support;
