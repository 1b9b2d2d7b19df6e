//! iCalendar transformation layer: raw body ⇆ domain records, the
//! parse-modify-serialize editor, and recurrence expansion.

pub mod build;
pub mod edit;
pub mod event;
pub mod recurrence;
pub mod trigger;

pub use build::{BuiltEvent, EventDraft, build_ical};
pub use edit::{
    EventPatch, add_alarm, add_exdate, remove_alarm, remove_all_alarms, update_ical,
    update_partstat,
};
pub use event::{Attendee, EventRecord, EventStatus, transform_calendar_object};
pub use recurrence::{Occurrence, expand_window};
pub use trigger::parse_trigger;
