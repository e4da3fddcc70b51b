//! Virtual users
//!
//! A virtual user is a long-lived task that repeatedly picks a weighted
//! scenario, executes it, records the outcome and sleeps for a random think
//! time until it is cancelled.

mod state;
mod virtual_user;

pub use state::{UserState, UserStateCell, WaitTime};
pub use virtual_user::{UserContext, UserHandle, UserSettings, VirtualUser};
