pub mod errors;

pub use errors::{LifetimeError, LifetimeErrorCategory};
