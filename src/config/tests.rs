use super::{ConfigError, TrainingConfig};
use crate::loss::{DiscTermWeights, GanVariant};
use std::path::PathBuf;

#[test]
fn test_default_config_is_valid() {
    let config = TrainingConfig::default();
    config.validate().unwrap();
    assert_eq!(config.epoch, 101);
    assert_eq!(config.init_epoch, 10);
    assert_eq!(config.gan_type, GanVariant::LsGan);
    assert_eq!(config.training_rate, 1);
}

#[test]
fn test_model_identity() {
    let config = TrainingConfig::default();
    // 权重取整（截断）
    assert_eq!(config.model_identity(), "AnimeGANv2_Hayao_lsgan_300_300_1_2_10_1");

    let config = TrainingConfig {
        dataset: "Paprika".to_string(),
        gan_type: GanVariant::WganGp,
        ..TrainingConfig::default()
    };
    assert_eq!(config.model_identity(), "AnimeGANv2_Paprika_wgan-gp_300_300_1_2_10_1");
    assert_eq!(
        config.checkpoint_dir(),
        PathBuf::from("checkpoint/AnimeGANv2_Paprika_wgan-gp_300_300_1_2_10_1")
    );
}

#[test]
fn test_dataset_paths() {
    let config = TrainingConfig {
        dataset_root: PathBuf::from("/data"),
        dataset: "Shinkai".to_string(),
        ..TrainingConfig::default()
    };
    assert_eq!(config.photo_dir(), PathBuf::from("/data/train_photo"));
    assert_eq!(config.style_dir(), PathBuf::from("/data/Shinkai/style"));
    assert_eq!(config.smooth_dir(), PathBuf::from("/data/Shinkai/smooth"));
    assert_eq!(config.val_dir(), PathBuf::from("/data/val"));
}

#[test]
fn test_disc_term_weights_follow_dataset_unless_overridden() {
    let mut config = TrainingConfig::default();
    assert_eq!(config.disc_term_weights(), DiscTermWeights::for_dataset("Hayao"));
    let custom = DiscTermWeights {
        real: 1.0,
        gray: 2.0,
        fake: 3.0,
        smooth: 4.0,
    };
    config.disc_weights = Some(custom);
    assert_eq!(config.disc_term_weights(), custom);
}

#[test]
fn test_validate_rejects_invalid_values() {
    let cases: Vec<(&str, TrainingConfig)> = vec![
        (
            "init_epoch",
            TrainingConfig {
                epoch: 2,
                init_epoch: 3,
                ..TrainingConfig::default()
            },
        ),
        (
            "batch_size",
            TrainingConfig {
                batch_size: 0,
                ..TrainingConfig::default()
            },
        ),
        (
            "training_rate",
            TrainingConfig {
                training_rate: 0,
                ..TrainingConfig::default()
            },
        ),
        (
            "save_freq",
            TrainingConfig {
                save_freq: 0,
                ..TrainingConfig::default()
            },
        ),
        (
            "g_lr",
            TrainingConfig {
                g_lr: 0.0,
                ..TrainingConfig::default()
            },
        ),
        (
            "sty_weight",
            TrainingConfig {
                sty_weight: -1.0,
                ..TrainingConfig::default()
            },
        ),
        (
            "ld",
            TrainingConfig {
                ld: f32::NAN,
                ..TrainingConfig::default()
            },
        ),
        (
            "img_size",
            TrainingConfig {
                img_size: [0, 256],
                ..TrainingConfig::default()
            },
        ),
    ];
    for (expected_field, config) in cases {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("`{expected_field}`应校验失败，实际为{other:?}"),
        }
    }

    // init_epoch 等于 epoch 是允许的（只做初始化阶段）
    let only_init = TrainingConfig {
        epoch: 3,
        init_epoch: 3,
        ..TrainingConfig::default()
    };
    only_init.validate().unwrap();
}

#[test]
fn test_json_roundtrip_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/config.json");
    let config = TrainingConfig {
        epoch: 5,
        init_epoch: 2,
        gan_type: GanVariant::DraganLp,
        ..TrainingConfig::default()
    };
    config.save_json(&path).unwrap();
    assert_eq!(TrainingConfig::load_json(&path).unwrap(), config);

    // 缺省字段取默认值
    let partial = dir.path().join("partial.json");
    std::fs::write(&partial, r#"{"epoch": 4, "init_epoch": 1, "gan_type": "hinge"}"#).unwrap();
    let loaded = TrainingConfig::load_json(&partial).unwrap();
    assert_eq!(loaded.epoch, 4);
    assert_eq!(loaded.gan_type, GanVariant::Hinge);
    assert_eq!(loaded.batch_size, 12);

    // 未知GAN类型、非法值、缺失文件
    std::fs::write(&partial, r#"{"gan_type": "wgan_gp"}"#).unwrap();
    assert!(matches!(TrainingConfig::load_json(&partial), Err(ConfigError::Json(_))));
    std::fs::write(&partial, r#"{"batch_size": 0}"#).unwrap();
    assert!(matches!(TrainingConfig::load_json(&partial), Err(ConfigError::Invalid { .. })));
    assert!(matches!(
        TrainingConfig::load_json(&dir.path().join("missing.json")),
        Err(ConfigError::Io(_))
    ));
}
