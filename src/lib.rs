//! Tile collision and moving-platform physics core for a 2D platformer.
//!
//! `domain` holds the pure per-tick physics (tile grammar, grid, resolver,
//! platform automaton, integrator). `sim` runs a level instance on top of it.

pub mod config;
pub mod domain;
pub mod sim;
