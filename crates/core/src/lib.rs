#![forbid(unsafe_code)]

pub mod cloze;
pub mod drill;
pub mod model;
pub mod text;
pub mod time;

pub use time::Clock;
