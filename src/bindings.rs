//! Selection of the transport implementation, done once when a transport is set up: either the
//!  delegate is used directly, or it is wrapped in a [LossyTransport]. The choice is fixed for the
//!  transport's lifetime - reconfiguring loss on a lossy transport goes through
//!  [LossyTransport::reinit].

use tracing::debug;
use crate::config::LossParams;
use crate::loss::LossyTransport;
use crate::transport::BatchTransport;

/// environment variable holding loss args, see [LossParams]'s `FromStr` implementation
pub const LOSS_ARGS_ENV_VAR: &str = "UDP_TRANSPORT_LOSS_ARGS";

pub fn with_loss<T: BatchTransport>(delegate: T, params: &LossParams) -> anyhow::Result<LossyTransport<T>> {
    LossyTransport::new(delegate, params.clone())
}

pub fn select<T: BatchTransport + 'static>(delegate: T, loss: Option<&LossParams>) -> anyhow::Result<Box<dyn BatchTransport>> {
    match loss {
        Some(params) => Ok(Box::new(with_loss(delegate, params)?)),
        None => {
            debug!("no loss injection configured, using transport directly");
            Ok(Box::new(delegate))
        }
    }
}

pub fn from_loss_args<T: BatchTransport + 'static>(delegate: T, loss_args: Option<&str>) -> anyhow::Result<Box<dyn BatchTransport>> {
    let params = loss_args
        .map(str::parse::<LossParams>)
        .transpose()?;
    select(delegate, params.as_ref())
}

/// like [from_loss_args], reading the loss args from [LOSS_ARGS_ENV_VAR]
pub fn from_env<T: BatchTransport + 'static>(delegate: T) -> anyhow::Result<Box<dyn BatchTransport>> {
    from_env_with(delegate, |key| std::env::var(key).ok())
}

/// like [from_env], with environment lookup through `env`
pub fn from_env_with<T, F>(delegate: T, env: F) -> anyhow::Result<Box<dyn BatchTransport>>
where
    T: BatchTransport + 'static,
    F: FnOnce(&str) -> Option<String>,
{
    let loss_args = env(LOSS_ARGS_ENV_VAR);
    from_loss_args(delegate, loss_args.as_deref())
}
