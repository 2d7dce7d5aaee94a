//! Prompt domain
//!
//! Templates for every provider request: the per-iteration reasoning prompts
//! ([`PromptTemplate`]) and the learning prompts around the loop
//! ([`AgentPromptTemplate`]). Validator prompts live with their roles in
//! [`crate::consensus::role`].

pub mod agent;
mod template;

pub use agent::AgentPromptTemplate;
pub use template::PromptTemplate;
