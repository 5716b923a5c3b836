pub mod calendars;
pub mod sync;
