pub mod booking;
pub mod listing;
pub mod payment;
pub mod user;

pub use booking::{Booking, BookingStatus};
pub use listing::Listing;
pub use payment::{Payment, PaymentStatus};
pub use user::User;
