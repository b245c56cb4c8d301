pub mod abstraction;
pub mod arena;
pub mod game;
pub mod solver;
