#![forbid(unsafe_code)]

pub mod distractor;
pub mod error;
pub mod generator;
pub mod model;
pub mod sampler;
pub mod time;
pub mod tracker;

pub use error::Error;
pub use time::Clock;
