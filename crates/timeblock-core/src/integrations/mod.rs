pub mod codec;
pub mod file_store;
pub mod memory;
pub mod traits;

pub use codec::{event_to_record, record_to_event, CalendarRecord};
pub use file_store::JsonFileStore;
pub use memory::{MemoryCalendar, MemoryTaskSource};
pub use traits::{CalendarStore, TaskSource};
