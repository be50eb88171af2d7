#[macro_use]
extern crate tracing;

pub mod error;
pub mod logging;
pub mod router;

pub use logging::{
    init_errors,
    init_logging,
};
