// Domain layer: resource/snapshot models and the fetch port.

pub mod model;
pub mod ports;
