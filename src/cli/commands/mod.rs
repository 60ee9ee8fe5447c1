pub mod data;
pub mod token;
