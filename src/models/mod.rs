pub mod config;
pub mod dose;
pub mod medicine;
pub mod target;

pub use dose::{DoseAction, DoseEvent, DoseStatus};
pub use medicine::{Frequency, Medicine};
pub use target::DeliveryTarget;
