pub mod completion;
pub mod message;
pub mod request;
pub mod tool;
