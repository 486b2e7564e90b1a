// Library exports for testing
// The binary (main.rs) imports these as well

pub mod dispatcher;
pub mod error;
pub mod logger;
pub mod packager;
pub mod paths;
pub mod snapshot;

#[cfg(test)]
mod tests;
