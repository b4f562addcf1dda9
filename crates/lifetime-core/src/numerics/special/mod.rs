pub mod integration;

pub use integration::{
    QuadratureError, QuadratureEstimate, SemiInfiniteQuadrature, integrate_semi_infinite,
};
