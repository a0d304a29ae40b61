pub mod booking;
pub mod event;
pub mod service;
pub mod user;
pub mod worker;

pub use booking::{Booking, BookingScope, BookingStatus};
pub use event::{EventKind, LifecycleEvent};
pub use service::{Service, ServiceType};
pub use user::{Actor, Role, User};
pub use worker::Worker;
