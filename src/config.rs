use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::processing::limits::WORKING_DIMENSION;
use crate::scheduler::DEFAULT_ROWS_PER_CHUNK;
use crate::settings::{EffectSettings, Preset};

/// Per-parameter overrides layered on top of the selected preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EffectOverrides {
    pub scanlines: Option<u8>,
    pub chromatic: Option<u8>,
    pub color_bleed: Option<u8>,
    pub noise: Option<u8>,
    pub pixelation: Option<u8>,
    pub datamosh: Option<u8>,
    pub pixel_sort: Option<u8>,
    pub displacement: Option<u8>,
    pub color_shift: Option<u8>,
    pub anaglyph: Option<u8>,
    pub anaglyph_offset: Option<u8>,
    pub crt_bezel: Option<bool>,
}

impl EffectOverrides {
    #[must_use]
    pub fn apply_to(&self, base: EffectSettings) -> EffectSettings {
        EffectSettings {
            scanlines: self.scanlines.unwrap_or(base.scanlines),
            chromatic: self.chromatic.unwrap_or(base.chromatic),
            color_bleed: self.color_bleed.unwrap_or(base.color_bleed),
            noise: self.noise.unwrap_or(base.noise),
            pixelation: self.pixelation.unwrap_or(base.pixelation),
            datamosh: self.datamosh.unwrap_or(base.datamosh),
            pixel_sort: self.pixel_sort.unwrap_or(base.pixel_sort),
            displacement: self.displacement.unwrap_or(base.displacement),
            color_shift: self.color_shift.unwrap_or(base.color_shift),
            anaglyph: self.anaglyph.unwrap_or(base.anaglyph),
            anaglyph_offset: self.anaglyph_offset.unwrap_or(base.anaglyph_offset),
            crt_bezel: self.crt_bezel.unwrap_or(base.crt_bezel),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PipelineOptions {
    /// Long-edge cap for the working copy; larger sources are downsampled.
    pub max_dimension: u32,
    /// Rows processed between cooperative yields.
    pub rows_per_chunk: u32,
    /// Optional deterministic seed for the random stages.
    pub seed: Option<u64>,
}

impl PipelineOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            (1..=WORKING_DIMENSION).contains(&self.max_dimension),
            "pipeline.max-dimension must be between 1 and {WORKING_DIMENSION}"
        );
        ensure!(
            self.rows_per_chunk > 0,
            "pipeline.rows-per-chunk must be greater than zero"
        );
        Ok(())
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_dimension: WORKING_DIMENSION,
            rows_per_chunk: DEFAULT_ROWS_PER_CHUNK,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DebounceOptions {
    /// Quiet time required after the last settings change before rendering.
    #[serde(with = "humantime_serde")]
    pub quiet_period: Duration,
}

impl DebounceOptions {
    const fn default_quiet_period() -> Duration {
        Duration::from_millis(150)
    }

    const fn max_quiet_period() -> Duration {
        Duration::from_secs(10)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.quiet_period <= Self::max_quiet_period(),
            "debounce.quiet-period must be at most {}s",
            Self::max_quiet_period().as_secs()
        );
        Ok(())
    }
}

impl Default for DebounceOptions {
    fn default() -> Self {
        Self {
            quiet_period: Self::default_quiet_period(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Built-in starting point; individual effects override it.
    pub preset: Option<Preset>,
    /// Effect parameters; unset values come from the preset (or zero).
    pub effects: EffectOverrides,
    /// Working resolution, chunking and seeding.
    pub pipeline: PipelineOptions,
    /// Coalescing of rapid settings changes.
    pub debounce: DebounceOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        self.effect_settings()
            .validate()
            .context("invalid effects configuration")?;
        self.pipeline
            .validate()
            .context("invalid pipeline configuration")?;
        self.debounce
            .validate()
            .context("invalid debounce configuration")?;
        Ok(self)
    }

    /// Preset (if any) with the configured overrides applied.
    #[must_use]
    pub fn effect_settings(&self) -> EffectSettings {
        let base = self
            .preset
            .map(|preset| preset.settings())
            .unwrap_or_default();
        self.effects.apply_to(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, Configuration::default());
        assert!(cfg.effect_settings().is_identity());
        assert_eq!(cfg.debounce.quiet_period, Duration::from_millis(150));
    }

    #[test]
    fn overrides_layer_on_preset() {
        let yaml = r#"
preset: heavy
effects:
  noise: 0
  crt-bezel: false
"#;
        let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
        let settings = cfg.effect_settings();
        assert_eq!(settings.noise, 0);
        assert!(!settings.crt_bezel);
        assert_eq!(settings.scanlines, Preset::Heavy.settings().scanlines);
    }

    #[test]
    fn validated_rejects_out_of_range_effects() {
        let cfg: Configuration = serde_yaml::from_str("effects:\n  chromatic: 140\n").unwrap();
        let err = cfg.validated().unwrap_err();
        assert!(format!("{err:#}").contains("chromatic"), "{err:#}");
    }
}
