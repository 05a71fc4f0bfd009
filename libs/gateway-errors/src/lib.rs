//! Shared RFC 9457 Problem Details type and the dispatch engine's unified
//! error enum, plus the single conversion site from one to the other.

pub mod error;
pub mod problem;

pub use error::{GatewayError, GatewayResult};
pub use problem::{Problem, ProblemResponse};
