use crate::pipeline::ProcessingResult;
use crate::settings::EffectSettings;

/// A complete settings record from the editing surface.
#[derive(Debug, Clone, Copy)]
pub struct SettingsChanged(pub EffectSettings);

/// Outcome of the most recent pipeline run, tagged with its generation.
#[derive(Debug)]
pub struct Rendered {
    pub generation: u64,
    pub settings: EffectSettings,
    pub result: ProcessingResult,
}
