use std::fmt;
use std::str::FromStr;

use anyhow::{ensure, Result};
use serde::de::{self, Deserializer};
use serde::Deserialize;

/// Upper bound for every intensity parameter.
pub const MAX_INTENSITY: u8 = 100;
/// Upper bound for the anaglyph eye separation, in pixels.
pub const MAX_ANAGLYPH_OFFSET: u8 = 20;

/// Complete, immutable parameter record for one pipeline run.
///
/// Intensities are percentages in `0..=100`; zero disables the matching stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectSettings {
    pub scanlines: u8,
    pub chromatic: u8,
    pub color_bleed: u8,
    pub noise: u8,
    pub pixelation: u8,
    pub datamosh: u8,
    pub pixel_sort: u8,
    pub displacement: u8,
    pub color_shift: u8,
    pub anaglyph: u8,
    pub anaglyph_offset: u8,
    pub crt_bezel: bool,
}

impl EffectSettings {
    const fn default_anaglyph_offset() -> u8 {
        5
    }

    /// Settings that leave every pixel untouched.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            scanlines: 0,
            chromatic: 0,
            color_bleed: 0,
            noise: 0,
            pixelation: 0,
            datamosh: 0,
            pixel_sort: 0,
            displacement: 0,
            color_shift: 0,
            anaglyph: 0,
            anaglyph_offset: Self::default_anaglyph_offset(),
            crt_bezel: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.intensities() {
            ensure!(
                value <= MAX_INTENSITY,
                "{name} must be between 0 and {MAX_INTENSITY}, got {value}"
            );
        }
        ensure!(
            self.anaglyph_offset <= MAX_ANAGLYPH_OFFSET,
            "anaglyph-offset must be between 0 and {MAX_ANAGLYPH_OFFSET}, got {}",
            self.anaglyph_offset
        );
        Ok(())
    }

    /// Named intensity parameters in configuration order.
    #[must_use]
    pub fn intensities(&self) -> [(&'static str, u8); 10] {
        [
            ("scanlines", self.scanlines),
            ("chromatic", self.chromatic),
            ("color-bleed", self.color_bleed),
            ("noise", self.noise),
            ("pixelation", self.pixelation),
            ("datamosh", self.datamosh),
            ("pixel-sort", self.pixel_sort),
            ("displacement", self.displacement),
            ("color-shift", self.color_shift),
            ("anaglyph", self.anaglyph),
        ]
    }

    /// True when no stage would touch the buffer.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        !self.crt_bezel && self.intensities().iter().all(|(_, v)| *v == 0)
    }
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self::identity()
    }
}

/// Intensity as a unit fraction, clamped to `0.0..=1.0`.
#[must_use]
pub fn unit(intensity: u8) -> f32 {
    f32::from(intensity.min(MAX_INTENSITY)) / 100.0
}

/// Built-in starting points exposed by the settings surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Mild,
    Heavy,
    Pixel,
    Corrupted,
    Anaglyph3d,
}

impl Preset {
    pub const ALL: &'static [Self] = &[
        Self::Mild,
        Self::Heavy,
        Self::Pixel,
        Self::Corrupted,
        Self::Anaglyph3d,
    ];
    pub const NAMES: &'static [&'static str] =
        &["mild", "heavy", "pixel", "corrupted", "anaglyph3d"];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Heavy => "heavy",
            Self::Pixel => "pixel",
            Self::Corrupted => "corrupted",
            Self::Anaglyph3d => "anaglyph3d",
        }
    }

    #[must_use]
    pub const fn settings(&self) -> EffectSettings {
        let base = EffectSettings::identity();
        match self {
            Self::Mild => EffectSettings {
                scanlines: 30,
                chromatic: 15,
                color_bleed: 20,
                noise: 10,
                crt_bezel: true,
                ..base
            },
            Self::Heavy => EffectSettings {
                scanlines: 70,
                chromatic: 50,
                color_bleed: 50,
                noise: 40,
                datamosh: 30,
                pixel_sort: 20,
                displacement: 30,
                color_shift: 30,
                crt_bezel: true,
                ..base
            },
            Self::Pixel => EffectSettings {
                scanlines: 20,
                color_bleed: 10,
                noise: 5,
                pixelation: 60,
                ..base
            },
            Self::Corrupted => EffectSettings {
                chromatic: 40,
                noise: 30,
                datamosh: 70,
                pixel_sort: 60,
                displacement: 50,
                color_shift: 40,
                ..base
            },
            Self::Anaglyph3d => EffectSettings {
                scanlines: 10,
                anaglyph: 80,
                anaglyph_offset: 8,
                ..base
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|preset| preset.as_str() == raw)
            .ok_or_else(|| {
                format!(
                    "unknown preset `{raw}`, expected one of: {}",
                    Self::NAMES.join(", ")
                )
            })
    }
}

impl<'de> Deserialize<'de> for Preset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        for preset in Self::ALL {
            if raw == preset.as_str() {
                return Ok(*preset);
            }
        }
        Err(de::Error::unknown_variant(&raw, Self::NAMES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid_settings() {
        for preset in Preset::ALL {
            preset.settings().validate().unwrap();
            assert!(!preset.settings().is_identity(), "{preset} should do something");
        }
    }

    #[test]
    fn preset_names_round_trip_through_from_str() {
        for preset in Preset::ALL {
            assert_eq!(preset.as_str().parse::<Preset>().unwrap(), *preset);
        }
        assert!("vaporwave".parse::<Preset>().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let too_strong = EffectSettings {
            noise: 101,
            ..EffectSettings::identity()
        };
        assert!(too_strong.validate().is_err());

        let too_wide = EffectSettings {
            anaglyph_offset: 21,
            ..EffectSettings::identity()
        };
        assert!(too_wide.validate().is_err());
    }

    #[test]
    fn unit_clamps_to_full_strength() {
        assert_eq!(unit(0), 0.0);
        assert_eq!(unit(50), 0.5);
        assert_eq!(unit(250), 1.0);
    }
}
