// Domain layer: recipe keys, identifiers and the recipe object contract.

pub mod model;
pub mod ports;
