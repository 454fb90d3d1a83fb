pub mod layer;
mod module;
pub mod network;
pub mod optimizer;
mod parameter;
pub mod zoo;

pub use module::Module;
pub use network::{Discriminator, DiscriminatorOutput, FeatureExtractor, Generator, NetworkTrace};
pub use optimizer::{Adam, Optimizer};
pub use parameter::{Gradients, Parameter, StateDict};
pub use zoo::{ConvFeatureExtractor, PatchDiscriminator, StyleGenerator, WeightsError};

#[cfg(test)]
mod tests;
