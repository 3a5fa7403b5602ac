//! Domain models for the Ibali Farm Platform

mod forecast;
mod harvest;
mod weather;

pub use forecast::*;
pub use harvest::*;
pub use weather::*;
