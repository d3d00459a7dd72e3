//! Lattice-Boltzmann (D2Q5, BGK) simulation of 2-D advection-diffusion of a
//! scalar concentration, with periodic diagnostic output.

pub mod analysis;
pub mod boundary;
pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod json_io;
pub mod numerical;
pub mod simulation;
pub mod solver;
