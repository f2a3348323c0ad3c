//! Assembly of the component graph of a run.
use crate::hyperparams::{AlgoTag, HyperParams};
use anyhow::Result;
use gradvar_core::{util::derive_seed, MetaEnv, Trainer, TrainerConfig};
use gradvar_maml::{
    algo::{AlgoConfig, DiceMamlConfig, InnerType, VpgDiceMamlConfig, VpgMamlConfig},
    baseline::BaselineKind,
    env::{NormalizedEnv, NormalizedEnvConfig},
    policy::{MetaGaussianMlpPolicy, MetaGaussianMlpPolicyConfig},
    sample_processor::{
        DiceMamlSampleProcessorConfig, MamlSampleProcessorConfig, SampleProcessorConfig,
    },
    sampler::{MamlSampler, MamlSamplerConfig},
};
use log::info;

/// Stream of the seed used to initialize policy parameters.
const STREAM_POLICY_INIT: u64 = 0;

/// Sample processor and algorithm selected by the algorithm tag.
///
/// | tag        | sample processor                                      | algorithm                        |
/// |------------|-------------------------------------------------------|----------------------------------|
/// | `DICE`     | DICE, `LinearTime` baseline                           | [`DiceMaml`]                     |
/// | `VPG_DICE` | DICE, `LinearTime` baseline, `LinearFeature` returns  | [`VpgDiceMaml`]                  |
/// | `VPG`      | MAML, `LinearFeature` baseline                        | [`VpgMaml`], likelihood ratio    |
///
/// [`DiceMaml`]: gradvar_maml::algo::DiceMaml
/// [`VpgDiceMaml`]: gradvar_maml::algo::VpgDiceMaml
/// [`VpgMaml`]: gradvar_maml::algo::VpgMaml
#[derive(Debug, Clone, PartialEq)]
pub struct AlgoBundle {
    /// The tag the bundle was built from.
    pub tag: AlgoTag,

    /// Configuration of the sample processor.
    pub processor: SampleProcessorConfig,

    /// Configuration of the algorithm.
    pub algo: AlgoConfig,
}

impl AlgoBundle {
    /// Pairs a sample processor with an algorithm.
    pub fn from_hyperparams(hp: &HyperParams) -> Self {
        let (processor, algo) = match hp.algo {
            AlgoTag::Dice => (
                SampleProcessorConfig::DiceMaml(DiceMamlSampleProcessorConfig {
                    baseline: BaselineKind::LinearTime,
                    max_path_length: hp.max_path_length,
                    discount: hp.discount,
                    normalize_adv: hp.normalize_adv,
                    positive_adv: hp.positive_adv,
                    return_baseline: None,
                }),
                AlgoConfig::DiceMaml(DiceMamlConfig {
                    meta_batch_size: hp.meta_batch_size,
                    inner_lr: hp.inner_lr,
                    learning_rate: hp.learning_rate,
                    num_inner_grad_steps: hp.num_inner_grad_steps,
                    discount: hp.discount,
                }),
            ),
            AlgoTag::VpgDice => (
                SampleProcessorConfig::DiceMaml(DiceMamlSampleProcessorConfig {
                    baseline: BaselineKind::LinearTime,
                    max_path_length: hp.max_path_length,
                    discount: hp.discount,
                    normalize_adv: hp.normalize_adv,
                    positive_adv: hp.positive_adv,
                    return_baseline: Some(BaselineKind::LinearFeature),
                }),
                AlgoConfig::VpgDiceMaml(VpgDiceMamlConfig {
                    meta_batch_size: hp.meta_batch_size,
                    inner_lr: hp.inner_lr,
                    learning_rate: hp.learning_rate,
                    num_inner_grad_steps: hp.num_inner_grad_steps,
                    discount: hp.discount,
                }),
            ),
            AlgoTag::Vpg => (
                SampleProcessorConfig::Maml(MamlSampleProcessorConfig {
                    baseline: BaselineKind::LinearFeature,
                    discount: hp.discount,
                    gae_lambda: 1.0,
                    normalize_adv: hp.normalize_adv,
                    positive_adv: hp.positive_adv,
                }),
                AlgoConfig::VpgMaml(VpgMamlConfig {
                    meta_batch_size: hp.meta_batch_size,
                    inner_lr: hp.inner_lr,
                    learning_rate: hp.learning_rate,
                    num_inner_grad_steps: hp.num_inner_grad_steps,
                    inner_type: InnerType::LikelihoodRatio,
                }),
            ),
        };
        Self {
            tag: hp.algo,
            processor,
            algo,
        }
    }
}

/// The component graph of a run, before it is handed to the trainer.
pub struct Components<E: MetaEnv> {
    /// Normalized environment.
    pub env: NormalizedEnv<E>,

    /// Meta-policy sized from the environment.
    pub policy: MetaGaussianMlpPolicy,

    /// Sampler of the meta-batch.
    pub sampler: MamlSampler<NormalizedEnv<E>>,

    /// Sample processor and algorithm.
    pub bundle: AlgoBundle,

    /// Configuration of the trainer.
    pub trainer_config: TrainerConfig,
}

impl<E: MetaEnv + 'static> Components<E> {
    /// Builds the graph from validated hyperparameters.
    pub fn build(hp: &HyperParams, env: E) -> Result<Self> {
        let env = NormalizedEnv::new(env, NormalizedEnvConfig::default());

        let policy_config = MetaGaussianMlpPolicyConfig::default()
            .dims(env.obs_dim(), env.act_dim())
            .meta_batch_size(hp.meta_batch_size)
            .hidden_sizes(hp.hidden_sizes.clone())
            .learn_std(hp.learn_std)
            .nonlinearities(hp.hidden_nonlinearity, hp.output_nonlinearity);
        let policy =
            MetaGaussianMlpPolicy::build(policy_config, derive_seed(hp.seed, &[STREAM_POLICY_INIT]))?;

        let sampler_config = MamlSamplerConfig::default()
            .rollouts_per_meta_task(hp.rollouts_per_meta_task)
            .meta_batch_size(hp.meta_batch_size)
            .max_path_length(hp.max_path_length)
            .parallel(hp.parallel)
            .envs_per_task(hp.rollouts_per_meta_task);
        let sampler = MamlSampler::new(env.clone(), sampler_config)?;

        let bundle = AlgoBundle::from_hyperparams(hp);
        let trainer_config = TrainerConfig::default()
            .n_itr(hp.n_itr)
            .num_inner_grad_steps(hp.num_inner_grad_steps)
            .sampling_rounds(hp.sampling_rounds)
            .seed(hp.seed);

        info!(
            "Built components: algo = {}, obs_dim = {}, act_dim = {}, {} parameters",
            bundle.tag,
            env.obs_dim(),
            env.act_dim(),
            gradvar_core::MetaPolicy::num_params(&policy)
        );
        Ok(Self {
            env,
            policy,
            sampler,
            bundle,
            trainer_config,
        })
    }

    /// Binds the components to a trainer.
    #[allow(clippy::type_complexity)]
    pub fn into_trainer(
        self,
    ) -> Result<Trainer<NormalizedEnv<E>, MetaGaussianMlpPolicy, MamlSampler<NormalizedEnv<E>>>>
    {
        Trainer::build(
            self.trainer_config,
            self.bundle.algo.build(),
            self.policy,
            self.env,
            self.sampler,
            self.bundle.processor.build(),
        )
    }
}
