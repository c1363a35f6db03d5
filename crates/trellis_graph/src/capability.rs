//! Lifecycle capabilities attached to providers.
//!
//! A provider whose output type implements [`Starter`] or [`Stopper`] can opt
//! in to the matching hook when it is registered:
//!
//! ```
//! use trellis_graph::prelude::*;
//!
//! struct Server;
//!
//! #[async_trait]
//! impl Starter for Server {
//!     async fn start(&self) -> Result<(), DynError> {
//!         Ok(())
//!     }
//! }
//!
//! let module = module_fn("server", |m| {
//!     m.provide(|| Server)?.with_start();
//!     Ok(())
//! });
//! # let _ = module;
//! ```
//!
//! The hook is captured as a type-erased closure on the provider, so the
//! application runner never needs to know the concrete type.

use crate::error::{DynError, InvocationError};
use crate::provider::{Injectable, Instance};
use core::future::Future;
use core::pin::Pin;
use std::sync::Arc;

/// A boxed future that is `Send` and has a specific lifetime.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased lifecycle hook invoked with the provider's instance.
pub type Hook = Arc<dyn Fn(Instance) -> BoxFuture<'static, Result<(), DynError>> + Send + Sync>;

/// A service that needs to run asynchronous work once the graph is built.
#[async_trait::async_trait]
pub trait Starter: Injectable {
    /// Starts the service.
    ///
    /// # Errors
    ///
    /// Returns an error if the service could not be started. The application
    /// then rolls back every service started before it.
    async fn start(&self) -> Result<(), DynError>;
}

/// A service that needs to release resources on shutdown.
#[async_trait::async_trait]
pub trait Stopper: Injectable {
    /// Stops the service.
    ///
    /// # Errors
    ///
    /// Returns an error if the service did not shut down cleanly.
    async fn stop(&self) -> Result<(), DynError>;
}

/// The lifecycle hooks registered for one provider.
#[derive(Clone, Default)]
pub struct Capabilities {
    start: Option<Hook>,
    stop: Option<Hook>,
}

impl Capabilities {
    /// Returns the start hook, if one was registered.
    #[must_use]
    pub fn start(&self) -> Option<&Hook> {
        self.start.as_ref()
    }

    /// Returns the stop hook, if one was registered.
    #[must_use]
    pub fn stop(&self) -> Option<&Hook> {
        self.stop.as_ref()
    }

    /// Returns `true` if neither hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.stop.is_none()
    }

    pub(crate) fn set_start<T: Starter>(&mut self) {
        self.start = Some(Arc::new(
            |instance: Instance| -> BoxFuture<'static, Result<(), DynError>> {
                Box::pin(async move {
                    let service = downcast::<T>(instance)?;
                    service.start().await
                })
            },
        ));
    }

    pub(crate) fn set_stop<T: Stopper>(&mut self) {
        self.stop = Some(Arc::new(
            |instance: Instance| -> BoxFuture<'static, Result<(), DynError>> {
                Box::pin(async move {
                    let service = downcast::<T>(instance)?;
                    service.stop().await
                })
            },
        ));
    }
}

impl core::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Capabilities")
            .field("start", &self.start.is_some())
            .field("stop", &self.stop.is_some())
            .finish()
    }
}

fn downcast<T: Injectable>(instance: Instance) -> Result<Arc<T>, DynError> {
    instance.downcast::<T>().map_err(|_| {
        Box::new(InvocationError::Downcast {
            index: 0,
            expected: core::any::type_name::<T>(),
        }) as DynError
    })
}
