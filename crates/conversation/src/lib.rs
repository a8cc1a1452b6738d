//! Chat dialogue for creating invoices and checking their status.
//!
//! Transport-agnostic: callers feed in user ids, button presses and text, and
//! send back the returned [`Reply`].

mod controller;
mod replies;

pub mod input;

pub use controller::{Controller, ControllerSettings, MenuAction, PendingAction, UserId};
pub use replies::Reply;
