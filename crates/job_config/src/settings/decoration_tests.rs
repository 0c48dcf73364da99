//! Tests for DecorationConfig

use super::*;

fn complete_images() -> UtilityImages {
    UtilityImages {
        clonerefs: Some("clonerefs:v1".to_string()),
        initupload: Some("initupload:v1".to_string()),
        entrypoint: Some("entrypoint:v1".to_string()),
        sidecar: Some("sidecar:v1".to_string()),
    }
}

#[test]
fn test_default_creates_empty_config() {
    let config = DecorationConfig::default();
    assert!(config.timeout_secs.is_none());
    assert!(config.utility_images.is_none());
    assert!(config.gcs_configuration.is_none());
}

#[test]
fn test_overlay_replaces_only_set_fields() {
    let mut base = DecorationConfig {
        timeout_secs: Some(3600),
        gcs_credentials_secret: Some("base-secret".to_string()),
        ..Default::default()
    };
    let other = DecorationConfig {
        gcs_credentials_secret: Some("other-secret".to_string()),
        censor_secrets: Some(true),
        ..Default::default()
    };

    base.overlay(&other);

    assert_eq!(base.timeout_secs, Some(3600));
    assert_eq!(base.gcs_credentials_secret.as_deref(), Some("other-secret"));
    assert_eq!(base.censor_secrets, Some(true));
}

#[test]
fn test_overlay_merges_nested_utility_images() {
    let mut base = DecorationConfig {
        utility_images: Some(complete_images()),
        ..Default::default()
    };
    let other = DecorationConfig {
        utility_images: Some(UtilityImages {
            sidecar: Some("sidecar:v2".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };

    base.overlay(&other);

    let images = base.utility_images.unwrap();
    assert_eq!(images.clonerefs.as_deref(), Some("clonerefs:v1"));
    assert_eq!(images.sidecar.as_deref(), Some("sidecar:v2"));
}

#[test]
fn test_overlay_fills_missing_nested_gcs_configuration() {
    let mut base = DecorationConfig::default();
    let other = DecorationConfig {
        gcs_configuration: Some(GcsConfiguration {
            bucket: Some("artifacts".to_string()),
            path_strategy: Some(PathStrategy::Explicit),
            ..Default::default()
        }),
        ..Default::default()
    };

    base.overlay(&other);

    let gcs = base.gcs_configuration.unwrap();
    assert_eq!(gcs.bucket.as_deref(), Some("artifacts"));
    assert_eq!(gcs.path_strategy, Some(PathStrategy::Explicit));
}

#[test]
fn test_overlay_does_not_modify_other() {
    let mut base = DecorationConfig {
        skip_cloning: Some(false),
        ..Default::default()
    };
    let other = DecorationConfig {
        skip_cloning: Some(true),
        ..Default::default()
    };
    let snapshot = other.clone();

    base.overlay(&other);

    assert_eq!(other, snapshot);
}

#[test]
fn test_validate_accepts_complete_config() {
    let config = DecorationConfig {
        timeout_secs: Some(7200),
        utility_images: Some(complete_images()),
        ..Default::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_requires_utility_images() {
    let result = DecorationConfig::default().validate();
    match result {
        Err(ConfigurationError::InvalidConfiguration { field, .. }) => {
            assert_eq!(field, "decoration_config.utility_images");
        }
        other => panic!("expected InvalidConfiguration, got {:?}", other),
    }
}

#[test]
fn test_validate_names_missing_image() {
    let config = DecorationConfig {
        utility_images: Some(UtilityImages {
            initupload: None,
            ..complete_images()
        }),
        ..Default::default()
    };
    match config.validate() {
        Err(ConfigurationError::InvalidConfiguration { field, .. }) => {
            assert_eq!(field, "decoration_config.utility_images.initupload");
        }
        other => panic!("expected InvalidConfiguration, got {:?}", other),
    }
}

#[test]
fn test_validate_rejects_zero_timeout() {
    let config = DecorationConfig {
        timeout_secs: Some(0),
        utility_images: Some(complete_images()),
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_deserialize_from_toml() {
    let toml = r#"
        timeout_secs = 600
        ssh_key_secrets = ["ssh-secret"]

        [utility_images]
        clonerefs = "clonerefs:v1"

        [gcs_configuration]
        bucket = "artifacts"
        path_strategy = "single"
    "#;

    let config: DecorationConfig = toml::from_str(toml).expect("Failed to deserialize");
    assert_eq!(config.timeout_secs, Some(600));
    assert_eq!(config.ssh_key_secrets, Some(vec!["ssh-secret".to_string()]));
    assert_eq!(
        config.gcs_configuration.unwrap().path_strategy,
        Some(PathStrategy::Single)
    );
}
