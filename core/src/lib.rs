pub mod chat;
pub mod p2p;
pub mod shutdown;
pub mod types;
pub mod utils;
