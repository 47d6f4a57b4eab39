//! Chat-facing side of the bot
//!
//! The poller pulls updates and hands each one to an [`UpdateHandler`];
//! the dispatcher is the production handler.

mod command;
mod dispatcher;
mod poller;

pub use command::command_menu;
#[allow(unused_imports)] // Public API re-exports
pub use dispatcher::{Dispatcher, DispatcherConfig, Outcome};
pub use poller::Poller;

use crate::telegram::Update;
use async_trait::async_trait;
use std::sync::Arc;

/// Consumes updates one at a time. Handling never fails; problems are logged.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    async fn handle_update(&self, update: &Update);
}

#[async_trait]
impl<T: UpdateHandler + ?Sized> UpdateHandler for Arc<T> {
    async fn handle_update(&self, update: &Update) {
        (**self).handle_update(update).await;
    }
}
