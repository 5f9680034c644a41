pub mod daily;
pub mod data_loader;
pub mod error;
pub mod lag;
pub mod schema;
