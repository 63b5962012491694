//! Wire protocol: inbound event decoding and outbound message construction.

pub mod events;
pub mod outbound;

pub use events::ServerEvent;
