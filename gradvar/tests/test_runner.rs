use anyhow::Result;
use gradvar::{
    params::{read_params_record, PARAMS_JSON},
    run_experiment, AlgoBundle, AlgoTag, Components, ConfigError, HyperParams, ParamSet,
    ParamValue, RunOptions, SweepConfig,
};
use gradvar_core::{
    logger::{OutputFormat, LAST_SNAPSHOT, PROGRESS_CSV},
    MetaPolicy,
};
use gradvar_maml::{
    algo::{AlgoConfig, InnerType},
    baseline::BaselineKind,
    env::PointEnvRandDirec,
    sample_processor::SampleProcessorConfig,
};
use tempdir::TempDir;

fn params(algo: &str) -> ParamSet {
    let mut p = SweepConfig::default().expand().remove(0);
    p.insert("algo".into(), algo.into());
    p
}

fn small_params(algo: &str) -> ParamSet {
    let mut p = params(algo);
    p.insert("n_itr".into(), ParamValue::Int(2));
    p.insert("meta_batch_size".into(), ParamValue::Int(2));
    p.insert("rollouts_per_meta_task".into(), ParamValue::Int(3));
    p.insert("max_path_length".into(), ParamValue::Int(10));
    p.insert("sampling_rounds".into(), ParamValue::Int(2));
    p.insert("parallel".into(), ParamValue::Bool(false));
    p.insert(
        "hidden_sizes".into(),
        ParamValue::Tuple(vec![ParamValue::Int(8)]),
    );
    p
}

#[test]
fn test_algo_bundles() -> Result<()> {
    let hp = HyperParams::from_param_set(&params("DICE"))?;
    let bundle = AlgoBundle::from_hyperparams(&hp);
    assert_eq!(bundle.tag, AlgoTag::Dice);
    match (&bundle.processor, &bundle.algo) {
        (SampleProcessorConfig::DiceMaml(p), AlgoConfig::DiceMaml(a)) => {
            assert_eq!(p.baseline, BaselineKind::LinearTime);
            assert_eq!(p.return_baseline, None);
            assert_eq!(p.max_path_length, 100);
            assert_eq!(a.inner_lr, 0.1);
            assert_eq!(a.meta_batch_size, 20);
        }
        _ => panic!("unexpected bundle for DICE: {:?}", bundle),
    }

    let hp = HyperParams::from_param_set(&params("VPG_DICE"))?;
    let bundle = AlgoBundle::from_hyperparams(&hp);
    match (&bundle.processor, &bundle.algo) {
        (SampleProcessorConfig::DiceMaml(p), AlgoConfig::VpgDiceMaml(a)) => {
            assert_eq!(p.baseline, BaselineKind::LinearTime);
            assert_eq!(p.return_baseline, Some(BaselineKind::LinearFeature));
            assert!(p.normalize_adv);
            assert!(!p.positive_adv);
            assert_eq!(a.learning_rate, 1e-3);
        }
        _ => panic!("unexpected bundle for VPG_DICE: {:?}", bundle),
    }

    let hp = HyperParams::from_param_set(&params("VPG"))?;
    let bundle = AlgoBundle::from_hyperparams(&hp);
    match (&bundle.processor, &bundle.algo) {
        (SampleProcessorConfig::Maml(p), AlgoConfig::VpgMaml(a)) => {
            assert_eq!(p.baseline, BaselineKind::LinearFeature);
            assert_eq!(p.discount, 0.99);
            assert_eq!(a.inner_type, InnerType::LikelihoodRatio);
            assert_eq!(a.num_inner_grad_steps, 1);
        }
        _ => panic!("unexpected bundle for VPG: {:?}", bundle),
    }
    Ok(())
}

#[test]
fn test_vpg_components() -> Result<()> {
    let hp = HyperParams::from_param_set(&params("VPG"))?;
    let components = Components::build(&hp, PointEnvRandDirec::new())?;

    let sampler = components.sampler.config();
    assert_eq!(sampler.meta_batch_size, 20);
    assert_eq!(sampler.rollouts_per_meta_task, 40);
    assert_eq!(sampler.max_path_length, 100);
    assert!(sampler.parallel);
    assert_eq!(components.sampler.envs_per_task(), 40);

    let policy = components.policy.config();
    assert_eq!((policy.obs_dim, policy.action_dim), (4, 2));
    assert_eq!(policy.hidden_sizes, vec![64, 64]);
    assert_eq!(policy.meta_batch_size, 20);

    assert_eq!(components.trainer_config.sampling_rounds, 10);
    assert_eq!(components.trainer_config.n_itr, 301);
    assert_eq!(components.trainer_config.seed, 35);
    Ok(())
}

#[test]
fn test_same_seed_same_initial_policy() -> Result<()> {
    let hp = HyperParams::from_param_set(&params("VPG"))?;
    let p1 = Components::build(&hp, PointEnvRandDirec::new())?.policy;
    let p2 = Components::build(&hp, PointEnvRandDirec::new())?.policy;
    assert_eq!(p1.flat_params(), p2.flat_params());

    let mut params = params("VPG");
    params.insert("seed".into(), ParamValue::Int(76));
    let hp = HyperParams::from_param_set(&params)?;
    let p3 = Components::build(&hp, PointEnvRandDirec::new())?.policy;
    assert_ne!(p1.flat_params(), p3.flat_params());
    Ok(())
}

#[test]
fn test_unknown_algo_fails_before_training() -> Result<()> {
    let dir = TempDir::new("runner")?;
    let options = RunOptions::default().base_dir(dir.path()).run_name("bad");
    let err = run_experiment(&params("MAML"), &options).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::UnknownAlgo("MAML".to_string()))
    );
    assert!(!options.experiment_dir().exists());
    Ok(())
}

#[test]
fn test_run_experiment() -> Result<()> {
    let dir = TempDir::new("runner")?;
    let options = RunOptions::default()
        .base_dir(dir.path())
        .formats(vec![OutputFormat::Log, OutputFormat::Csv]);

    for algo in ["VPG_DICE", "VPG", "DICE"] {
        let options = options.clone().run_name(algo);
        let params = small_params(algo);
        let exp_dir = run_experiment(&params, &options)?;
        assert_eq!(
            exp_dir,
            dir.path().join("data").join("gradient_variance_v2").join(algo)
        );

        assert_eq!(read_params_record(exp_dir.join(PARAMS_JSON))?, params);
        assert!(exp_dir.join(LAST_SNAPSHOT).exists());
        assert!(exp_dir.join("itr_0.json").exists());
        assert!(!exp_dir.join("itr_1.json").exists());

        let mut rdr = csv::Reader::from_path(exp_dir.join(PROGRESS_CSV))?;
        let header: Vec<String> = rdr.headers()?.iter().map(|s| s.to_string()).collect();
        assert!(header.contains(&"Meta-GradientStd".to_string()));
        assert!(header.contains(&"Step_1-AverageReturn".to_string()));
        assert_eq!(rdr.records().count(), 2);
    }
    Ok(())
}

#[test]
fn test_linear_hidden_layers_train() -> Result<()> {
    let dir = TempDir::new("runner")?;
    let options = RunOptions::default()
        .base_dir(dir.path())
        .run_name("linear")
        .formats(vec![OutputFormat::Csv]);
    let mut params = small_params("VPG");
    params.insert("hidden_nonlinearity".into(), ParamValue::None);

    let hp = HyperParams::from_param_set(&params)?;
    let components = Components::build(&hp, PointEnvRandDirec::new())?;
    assert_eq!(components.policy.config().hidden_nonlinearity, None);

    let exp_dir = run_experiment(&params, &options)?;
    assert_eq!(read_params_record(exp_dir.join(PARAMS_JSON))?, params);
    assert!(exp_dir.join(LAST_SNAPSHOT).exists());
    Ok(())
}
