pub mod auth;
pub mod board;
pub mod broadcast;
pub mod mutation;
pub mod persistence;
pub mod room;
