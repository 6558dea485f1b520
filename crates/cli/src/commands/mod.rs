pub mod chat;
pub mod seed;
pub mod serve;
pub mod tools;
