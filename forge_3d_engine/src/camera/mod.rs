/// Camera module - fly camera driven by window input

pub mod camera;

pub use camera::*;
