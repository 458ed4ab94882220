pub mod levels;
pub mod movement;
pub mod service;
