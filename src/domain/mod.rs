// Domain layer: catalog models and collaborator ports. No I/O here.

pub mod model;
pub mod ports;
