//! First-order MAML algorithms with DICE and likelihood-ratio objectives.
//!
//! | Algorithm          | Inner objective | Outer objective |
//! |--------------------|-----------------|-----------------|
//! | [`DiceMaml`]       | DICE            | DICE            |
//! | [`VpgDiceMaml`]    | VPG             | DICE            |
//! | [`VpgMaml`]        | VPG (`InnerType`) | VPG           |
//!
//! DICE objectives read `adjusted_rewards` of the samples, so they must be
//! paired with
//! [`DiceMamlSampleProcessor`](crate::sample_processor::DiceMamlSampleProcessor).
mod base;
mod dice_maml;
pub mod objective;
mod vpg_dice_maml;
mod vpg_maml;
use anyhow::Result;
pub use dice_maml::{DiceMaml, DiceMamlConfig};
use gradvar_core::{error::GradVarError, MetaAlgo, MetaPolicy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
pub use vpg_dice_maml::{VpgDiceMaml, VpgDiceMamlConfig};
pub use vpg_maml::{VpgMaml, VpgMamlConfig};

/// Surrogate objective of the inner step of [`VpgMaml`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum InnerType {
    /// `log π(a|s) A`.
    LogLikelihood,

    /// `π(a|s) / π_old(a|s) A`.
    LikelihoodRatio,

    /// `⊡(log π(a|s)) A`.
    Dice,
}

impl FromStr for InnerType {
    type Err = GradVarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log_likelihood" => Ok(Self::LogLikelihood),
            "likelihood_ratio" => Ok(Self::LikelihoodRatio),
            "dice" => Ok(Self::Dice),
            _ => Err(GradVarError::InvalidConfig(format!(
                "unknown inner_type: {}",
                s
            ))),
        }
    }
}

/// Configuration of a meta-learning algorithm.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum AlgoConfig {
    /// [`DiceMaml`].
    DiceMaml(DiceMamlConfig),

    /// [`VpgDiceMaml`].
    VpgDiceMaml(VpgDiceMamlConfig),

    /// [`VpgMaml`].
    VpgMaml(VpgMamlConfig),
}

impl AlgoConfig {
    /// Builds the algorithm.
    pub fn build<P: MetaPolicy + 'static>(&self) -> Box<dyn MetaAlgo<P>> {
        match self {
            Self::DiceMaml(c) => Box::new(DiceMaml::new(c.clone())),
            Self::VpgDiceMaml(c) => Box::new(VpgDiceMaml::new(c.clone())),
            Self::VpgMaml(c) => Box::new(VpgMaml::new(c.clone())),
        }
    }

    /// Number of inner adaptation steps.
    pub fn num_inner_grad_steps(&self) -> usize {
        match self {
            Self::DiceMaml(c) => c.num_inner_grad_steps,
            Self::VpgDiceMaml(c) => c.num_inner_grad_steps,
            Self::VpgMaml(c) => c.num_inner_grad_steps,
        }
    }

    /// Size of the meta-batch.
    pub fn meta_batch_size(&self) -> usize {
        match self {
            Self::DiceMaml(c) => c.meta_batch_size,
            Self::VpgDiceMaml(c) => c.meta_batch_size,
            Self::VpgMaml(c) => c.meta_batch_size,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        env::PointEnvRandDirec,
        policy::{MetaGaussianMlpPolicy, MetaGaussianMlpPolicyConfig},
        sample_processor::{
            DiceMamlSampleProcessorConfig, MamlSampleProcessorConfig, SampleProcessorConfig,
        },
        sampler::{MamlSampler, MamlSamplerConfig},
    };
    use gradvar_core::{MetaSampler, SamplesData};
    use rand::{rngs::SmallRng, SeedableRng};

    const META_BATCH_SIZE: usize = 2;

    fn policy() -> MetaGaussianMlpPolicy {
        let config = MetaGaussianMlpPolicyConfig::default()
            .dims(4, 2)
            .meta_batch_size(META_BATCH_SIZE)
            .hidden_sizes(vec![8]);
        MetaGaussianMlpPolicy::build(config, 1).unwrap()
    }

    fn samples(policy: &MetaGaussianMlpPolicy, processor: &SampleProcessorConfig) -> Vec<SamplesData> {
        let config = MamlSamplerConfig::default()
            .rollouts_per_meta_task(4)
            .meta_batch_size(META_BATCH_SIZE)
            .max_path_length(10);
        let mut sampler = MamlSampler::new(PointEnvRandDirec::new(), config).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        MetaSampler::<MetaGaussianMlpPolicy>::update_tasks(&mut sampler, &mut rng);
        let paths = sampler.obtain_samples(policy, 5).unwrap();
        processor.build().process_samples(&paths, "").unwrap().0
    }

    fn dice_processor() -> SampleProcessorConfig {
        SampleProcessorConfig::DiceMaml(DiceMamlSampleProcessorConfig::default().max_path_length(10))
    }

    fn check_algo(config: AlgoConfig, processor: SampleProcessorConfig) -> Result<()> {
        let mut policy = policy();
        let mut algo: Box<dyn MetaAlgo<MetaGaussianMlpPolicy>> = config.build();
        assert_eq!(algo.num_inner_grad_steps(), 1);
        let theta = policy.flat_params();

        let pre = samples(&policy, &processor);
        algo.adapt(&mut policy, &pre)?;
        for task in 0..META_BATCH_SIZE {
            assert_ne!(policy.adapted_params(task)?, theta);
        }
        assert_eq!(policy.flat_params(), theta);

        let post = samples(&policy, &processor);
        let g = algo.meta_gradient(&policy, &post)?;
        assert_eq!(g.len(), policy.num_params());
        assert!(g.iter().all(|v| v.is_finite()));

        policy.switch_to_pre_update();
        let record = algo.optimize_policy(&mut policy, &g)?;
        assert!(record.get_scalar("MetaGradNorm")? > 0.0);
        assert_ne!(policy.flat_params(), theta);
        Ok(())
    }

    #[test]
    fn test_dice_maml() -> Result<()> {
        let config = AlgoConfig::DiceMaml(DiceMamlConfig::default().meta_batch_size(META_BATCH_SIZE));
        check_algo(config, dice_processor())
    }

    #[test]
    fn test_vpg_dice_maml() -> Result<()> {
        let config =
            AlgoConfig::VpgDiceMaml(VpgDiceMamlConfig::default().meta_batch_size(META_BATCH_SIZE));
        check_algo(config, dice_processor())
    }

    #[test]
    fn test_vpg_maml() -> Result<()> {
        for inner_type in [
            InnerType::LogLikelihood,
            InnerType::LikelihoodRatio,
            InnerType::Dice,
        ] {
            let config = AlgoConfig::VpgMaml(
                VpgMamlConfig::default()
                    .meta_batch_size(META_BATCH_SIZE)
                    .inner_type(inner_type),
            );
            let processor = SampleProcessorConfig::Maml(MamlSampleProcessorConfig::default());
            check_algo(config, processor)?;
        }
        Ok(())
    }

    #[test]
    fn test_dice_needs_adjusted_rewards() {
        let mut policy = policy();
        let mut algo: Box<dyn MetaAlgo<MetaGaussianMlpPolicy>> =
            AlgoConfig::DiceMaml(DiceMamlConfig::default().meta_batch_size(META_BATCH_SIZE)).build();
        let processor = SampleProcessorConfig::Maml(MamlSampleProcessorConfig::default());
        let pre = samples(&policy, &processor);
        assert!(algo.adapt(&mut policy, &pre).is_err());
    }

    #[test]
    fn test_meta_batch_mismatch() {
        let mut policy = policy();
        let mut algo: Box<dyn MetaAlgo<MetaGaussianMlpPolicy>> =
            AlgoConfig::VpgMaml(VpgMamlConfig::default().meta_batch_size(3)).build();
        let processor = SampleProcessorConfig::Maml(MamlSampleProcessorConfig::default());
        let pre = samples(&policy, &processor);
        assert!(algo.adapt(&mut policy, &pre).is_err());
    }

    #[test]
    fn test_inner_type_from_str() {
        assert_eq!("likelihood_ratio".parse::<InnerType>().unwrap(), InnerType::LikelihoodRatio);
        assert!("foo".parse::<InnerType>().is_err());
    }
}
