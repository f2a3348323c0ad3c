use anyhow::Result;
use gradvar_core::{record::BufferedRecorder, MetaPolicy, Trainer, TrainerConfig};
use gradvar_maml::{
    algo::{AlgoConfig, DiceMamlConfig, VpgMamlConfig},
    baseline::BaselineKind,
    env::{NormalizedEnv, NormalizedEnvConfig, PointEnvRandGoal},
    policy::{MetaGaussianMlpPolicy, MetaGaussianMlpPolicyConfig},
    sample_processor::{
        DiceMamlSampleProcessorConfig, MamlSampleProcessorConfig, SampleProcessorConfig,
    },
    sampler::{MamlSampler, MamlSamplerConfig},
};

const META_BATCH_SIZE: usize = 3;
const MAX_PATH_LENGTH: usize = 15;

fn train(
    algo: AlgoConfig,
    processor: SampleProcessorConfig,
    seed: u64,
) -> Result<(MetaGaussianMlpPolicy, BufferedRecorder)> {
    let env = NormalizedEnv::new(PointEnvRandGoal::new(), NormalizedEnvConfig::default());
    let policy_config = MetaGaussianMlpPolicyConfig::default()
        .dims(2, 2)
        .meta_batch_size(META_BATCH_SIZE)
        .hidden_sizes(vec![16, 16]);
    let policy = MetaGaussianMlpPolicy::build(policy_config, seed)?;
    let sampler_config = MamlSamplerConfig::default()
        .rollouts_per_meta_task(4)
        .meta_batch_size(META_BATCH_SIZE)
        .max_path_length(MAX_PATH_LENGTH)
        .parallel(true);
    let sampler = MamlSampler::new(env.clone(), sampler_config)?;
    let trainer_config = TrainerConfig::default()
        .n_itr(2)
        .sampling_rounds(3)
        .seed(seed);

    let mut trainer = Trainer::build(
        trainer_config,
        algo.build(),
        policy,
        env,
        sampler,
        processor.build(),
    )?;
    let mut recorder = BufferedRecorder::new();
    trainer.train(&mut recorder)?;
    Ok((trainer.into_policy(), recorder))
}

fn vpg() -> (AlgoConfig, SampleProcessorConfig) {
    (
        AlgoConfig::VpgMaml(VpgMamlConfig::default().meta_batch_size(META_BATCH_SIZE)),
        SampleProcessorConfig::Maml(MamlSampleProcessorConfig::default().normalize_adv(true)),
    )
}

#[test]
fn test_vpg_maml_training_records_gradient_stats() -> Result<()> {
    let (algo, processor) = vpg();
    let (_, recorder) = train(algo, processor, 42)?;

    assert_eq!(recorder.len(), 2);
    assert_eq!(recorder.snapshots().len(), 2);
    for (i, record) in recorder.iter().enumerate() {
        assert_eq!(record.get_scalar("Itr")?, i as f64);
        assert!(record.get_scalar("Meta-GradientMeanNorm")? > 0.0);
        assert!(record.get_scalar("Meta-GradientStd")? >= 0.0);
        assert!(record.get_scalar("Inner-GradientStd")? >= 0.0);
        assert_eq!(
            record.get_scalar("Step_0-NumTrajs")?,
            (4 * META_BATCH_SIZE) as f64
        );
        assert!(record.get_scalar("Step_1-AverageReturn")?.is_finite());
    }
    Ok(())
}

#[test]
fn test_dice_maml_training() -> Result<()> {
    let algo = AlgoConfig::DiceMaml(DiceMamlConfig::default().meta_batch_size(META_BATCH_SIZE));
    let processor = SampleProcessorConfig::DiceMaml(
        DiceMamlSampleProcessorConfig::default()
            .baseline(BaselineKind::LinearTime)
            .max_path_length(MAX_PATH_LENGTH),
    );
    let (policy, recorder) = train(algo, processor, 3)?;
    assert!(policy.flat_params().iter().all(|p| p.is_finite()));
    assert_eq!(recorder.len(), 2);
    Ok(())
}

#[test]
fn test_training_is_reproducible() -> Result<()> {
    let (algo, processor) = vpg();
    let (p1, _) = train(algo.clone(), processor.clone(), 7)?;
    let (p2, _) = train(algo.clone(), processor.clone(), 7)?;
    let (p3, _) = train(algo, processor, 8)?;
    assert_eq!(p1.flat_params(), p2.flat_params());
    assert_ne!(p1.flat_params(), p3.flat_params());
    Ok(())
}
