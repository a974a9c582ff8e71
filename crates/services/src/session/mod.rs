mod clock;
mod controller;
mod flush;
mod results;
mod store;
mod ticker;

pub use clock::{ClockState, ClockTick, DEFAULT_WARNING_THRESHOLD_SECONDS, SessionClock};
pub use controller::{SessionController, SessionStatus};
pub use flush::{CoalescingFlush, DEFAULT_FLUSH_DELAY_MS};
pub use results::{
    AttemptOutcome, ResultsView, ReviewRow, SkillRow, SubmitTrigger, format_clock,
    format_time_spent, format_word_count,
};
pub use store::ResponseStore;
pub use ticker::Ticker;
