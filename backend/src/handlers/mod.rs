//! HTTP request handlers for the Ibali Farm Platform

pub mod forecast;
pub mod health;
pub mod records;
pub mod reporting;
pub mod weather;

pub use forecast::*;
pub use health::*;
pub use records::*;
pub use reporting::*;
pub use weather::*;
