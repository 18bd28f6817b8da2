pub(crate) mod queue_reactive;
mod reactive_core;
pub mod unlock_reactive;
