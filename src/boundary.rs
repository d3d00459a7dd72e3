pub mod bc2d;
