//! Request handlers.

pub mod games;
pub mod health;
pub mod process;
pub mod schedule;

pub use games::*;
pub use health::*;
pub use process::*;
pub use schedule::*;
