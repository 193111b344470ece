pub mod controller;
pub mod discovery;
pub mod events;
pub mod input;
pub mod orchestrator;
pub mod schema;
pub mod tooling;

#[cfg(test)]
mod testing;
