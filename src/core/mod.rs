pub mod calendar;
pub mod clock;
pub mod dose;
pub mod medicine;
pub mod notify;
pub mod poller;
pub mod schedule;
pub mod store;
