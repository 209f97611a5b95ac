pub mod controller;
pub mod crd;
