//! Trigger evaluation and firing.
//!
//! [`condition`] decides whether a trigger matches an event or a clock tick,
//! [`ActionDispatcher`] runs the actions of a firing, and [`EngineRunner`]
//! feeds events and [`MinuteClock`] ticks into the engine.

mod clock;
pub mod condition;
mod dispatcher;
mod runner;
mod schedule;

pub use clock::{next_boundary, MinuteClock};
pub use dispatcher::{ActionDispatcher, FiringReport, Sinks};
pub use runner::EngineRunner;
pub use schedule::{truncate_to_minute, CronSchedule};
