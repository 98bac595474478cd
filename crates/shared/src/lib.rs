pub mod chain;
pub mod domain;
pub mod draft;
pub mod error;
pub mod protocol;
