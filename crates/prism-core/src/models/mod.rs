pub mod artifact;
pub mod attachment;
pub mod message;
pub mod request;
pub mod session;
pub mod usage;
