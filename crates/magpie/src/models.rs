//! These models represent the objects passed around by the agent
//!
//! There are several different related formats we need to interact with:
//! - vercel useChat messages/tools, sent from the interface to the agent
//! - vercel streaming protocol messages/tools, sent from the agent to the interface
//! - openai messages/tools, sent from the agent to the LLM
//! - toolkit requests, sent from the agent to the tools providing capabilities
//!
//! These all overlap to varying degrees. We immediately convert each external data model
//! into the internal structs using to/from helpers, so the internal models are not an
//! exact match for any single format.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
