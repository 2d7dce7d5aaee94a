//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod consensus;
pub mod lifecycle;
pub mod memory_store;
pub mod planning;
pub mod reasoning_loop;
pub mod reflection;

#[cfg(test)]
pub(crate) mod test_support;
