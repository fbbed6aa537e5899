// Domain layer: core models, ports and the pure analysis services.

pub mod model;
pub mod ports;

pub mod services;
