pub mod booking;
pub mod visibility;

pub use booking::BookingService;
pub use visibility::{BookingQuerySpec, VisibilityScope};
