pub mod availability;
pub mod booking;
pub mod holiday;
pub mod slot;
pub mod weekoff;

pub use availability::{ClosureReason, ClosureStatus, DayAvailability, SlotAvailability};
pub use booking::{Booking, BookingStats, BookingStatus, GuestDetails};
pub use holiday::Holiday;
pub use slot::Slot;
pub use weekoff::WeekOffRule;
