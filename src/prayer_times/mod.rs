pub mod calendar;
pub mod loader;
pub mod next;
pub mod offline;

pub use loader::CalendarLoader;
pub use next::{next_prayer_at, today_index};
