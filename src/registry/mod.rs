//! Message handlers and the modules that host them.
//!
//! A [`Module`] binds each [`MessageHandler`] to one exact subject and runs a
//! private [`WorkerPool`](crate::WorkerPool) for it. Inbound [`Message`]s are
//! routed by subject through [`Module::dispatch`] or a raw
//! [`Module::sender`] handle.

mod handler;
mod message;
mod module;

pub use handler::{HandlerFn, MessageHandler};
pub use message::Message;
pub use module::Module;
