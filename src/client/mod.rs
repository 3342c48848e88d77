//! ChatHub client implementation

pub mod connector;

pub use connector::{ChatClient, IncomingLines};
