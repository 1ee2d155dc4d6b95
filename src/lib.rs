pub mod adapters;
pub mod application;
pub mod domain;
pub mod infra;
#[cfg(test)]
pub mod test_utils;

pub use application::*;
pub use domain::*;
