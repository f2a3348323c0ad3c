//! Traits at the seams between the components of a meta-training run.
mod algo;
mod baseline;
mod env;
mod path;
mod policy;
mod sample_processor;
mod sampler;
pub use algo::MetaAlgo;
pub use baseline::Baseline;
pub use env::{MetaEnv, Step};
pub use path::{AgentInfo, Path, SamplesData};
pub use policy::MetaPolicy;
pub use sample_processor::SampleProcessor;
pub use sampler::MetaSampler;
