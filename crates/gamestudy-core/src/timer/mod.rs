mod driver;
mod engine;
mod interval;

pub use driver::{Timer, DEFAULT_TICK_PERIOD};
pub use engine::{TickOutcome, TimerEngine, TimerPhase};
pub use interval::{IntervalType, TimerState, BREAK_MINUTES, WORK_MINUTES};
