pub mod error;
pub mod events;
pub mod layer;
pub mod matcher;
pub mod source;
