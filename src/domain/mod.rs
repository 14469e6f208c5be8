// Domain layer: payment models and the ports the workflows depend on.

pub mod model;
pub mod ports;
