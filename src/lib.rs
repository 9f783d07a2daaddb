pub mod agent;
pub mod errors;
pub mod parser;
pub mod providers;
pub mod tool;

pub use agent::Agent;
pub use providers::configs::ClientConfig;
pub use providers::types::completion::Completion;
