pub mod content;
pub mod fetch;
pub mod prayer;
pub mod session;

pub use content::{FieldKind, Record, Resource};
pub use fetch::Fetch;
pub use prayer::{DaySource, HijriStamp, NextPrayer, PrayerDay, PrayerName, Timings};
pub use session::Session;
