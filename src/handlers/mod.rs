// handlers/mod.rs - Route handlers
//
// Public (no auth): home
// Protected (bearer token): books, bingo, filters

pub mod bingo;
pub mod books;
mod collection;
pub mod filters;
pub mod home;
