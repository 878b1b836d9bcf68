//! Data models: the stored message record and the client instance key.

mod instance_key;
mod message_record;

pub use instance_key::ClientInstanceKey;
pub use message_record::{MessageId, MessageRecord};
