//! Load test for the order service.
//!
//! Two scenarios run side by side: `post` creates randomly generated orders through
//! `POST /orders`, `get` fetches random order ids through `GET /orders/{id}`. By default both
//! use the constant-vus executor for 30 seconds, with 2 and 10 virtual users respectively.
pub mod options;
pub mod payload;
pub mod scenarios;
pub mod summary;

pub use options::{Options, OptionsError};
pub use scenarios::{run, Target};
pub use summary::Summary;
