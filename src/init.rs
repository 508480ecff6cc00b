use crate::config::{ConfigError, HandlerConfig};
use crate::layer::HandlerLayer;
use crate::pretty::PrettyHandler;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Error returned when the global subscriber could not be installed.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("invalid handler configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to set global subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize the global `tracing` subscriber with a [`PrettyHandler`]
/// built from `config`.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with a [`HandlerLayer`] as the global
/// default subscriber, so all `tracing` events in the process are formatted
/// by the handler.
///
/// **Returns**
/// - `Err(InitError::Config)` if the configuration is rejected.
/// - `Err(InitError::SetGlobal)` if a global subscriber was already set.
pub fn init_with_config<W>(config: HandlerConfig<W>) -> Result<(), InitError>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let handler = PrettyHandler::new(config)?;
    let subscriber = Registry::default().with(HandlerLayer::new(handler));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Initialize with the default configuration writing to stdout, overridden
/// by any `PRETTY_LOG_*` environment variables (see [`crate::env`]).
///
/// This is the recommended entrypoint for typical services.
pub fn init() -> Result<(), InitError> {
    init_with_config(HandlerConfig::default().apply_env()?)
}
