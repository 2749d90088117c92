use std::time::Duration;

use retro_glitch::config::Configuration;
use retro_glitch::settings::{EffectSettings, Preset};

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
effects:
  scanlines: 40
  color-bleed: 25
  pixel-sort: 10
  anaglyph-offset: 12
  crt-bezel: true
pipeline:
  max-dimension: 2048
  rows-per-chunk: 256
  seed: 99
debounce:
  quiet-period: 300ms
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    let settings = cfg.effect_settings();
    assert_eq!(settings.scanlines, 40);
    assert_eq!(settings.color_bleed, 25);
    assert_eq!(settings.pixel_sort, 10);
    assert_eq!(settings.anaglyph_offset, 12);
    assert!(settings.crt_bezel);
    assert_eq!(settings.noise, 0);
    assert_eq!(cfg.pipeline.max_dimension, 2048);
    assert_eq!(cfg.pipeline.rows_per_chunk, 256);
    assert_eq!(cfg.pipeline.seed, Some(99));
    assert_eq!(cfg.debounce.quiet_period, Duration::from_millis(300));
}

#[test]
fn unknown_fields_are_rejected() {
    let yaml = r#"
effects:
  sparkle: 10
"#;
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn every_preset_name_parses() {
    for name in Preset::NAMES {
        let yaml = format!("preset: {name}\n");
        let cfg: Configuration = serde_yaml::from_str(&yaml).unwrap();
        let preset = cfg.preset.unwrap();
        assert_eq!(preset.as_str(), *name);
        assert_eq!(cfg.effect_settings(), preset.settings());
        preset.settings().validate().unwrap();
    }
}

#[test]
fn unknown_preset_name_is_rejected() {
    let err = serde_yaml::from_str::<Configuration>("preset: sparkly\n").unwrap_err();
    assert!(err.to_string().contains("sparkly"), "{err}");
}

#[test]
fn zero_rows_per_chunk_is_invalid() {
    let cfg: Configuration = serde_yaml::from_str("pipeline:\n  rows-per-chunk: 0\n").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn working_dimension_is_capped() {
    let cfg: Configuration = serde_yaml::from_str("pipeline:\n  max-dimension: 5000\n").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn long_quiet_period_is_invalid() {
    let cfg: Configuration = serde_yaml::from_str("debounce:\n  quiet-period: 1m\n").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn config_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("glitch.yaml");
    std::fs::write(&path, "preset: pixel\neffects:\n  pixelation: 90\n").unwrap();

    let cfg = Configuration::from_yaml_file(&path)
        .unwrap()
        .validated()
        .unwrap();
    let expected = EffectSettings {
        pixelation: 90,
        ..Preset::Pixel.settings()
    };
    assert_eq!(cfg.effect_settings(), expected);
}
