pub mod catalog;
pub mod entity;
pub mod grid;
pub mod integrator;
pub mod path;
pub mod platform;
pub mod resolver;
pub mod tile;
