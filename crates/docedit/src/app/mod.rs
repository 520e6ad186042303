//! Application layer orchestrating domain logic and infrastructure.

pub mod diff;
pub mod edit;
pub mod editor;
pub mod history;
pub mod resolve;
pub mod selection;
pub mod session;
pub mod whitespace;
