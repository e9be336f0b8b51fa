pub mod builder;
pub mod driver;
pub mod engine;
pub mod model;
pub mod network;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;
