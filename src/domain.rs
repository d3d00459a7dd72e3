pub mod grid2d;
pub mod lattice;
