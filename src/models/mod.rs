mod booking;
mod shop;
mod timeslot;

pub use booking::*;
pub use shop::*;
pub use timeslot::*;
