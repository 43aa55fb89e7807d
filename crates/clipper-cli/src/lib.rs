pub mod commands;
pub mod view;

use clap::ValueEnum;
use clipper_models::Quality;

#[derive(ValueEnum, Clone, Debug, Copy, Default)]
pub enum CliQuality {
    #[value(name = "480", alias = "480p")]
    P480,
    #[default]
    #[value(name = "720", alias = "720p")]
    P720,
    #[value(name = "1080", alias = "1080p")]
    P1080,
    #[value(name = "1440", alias = "1440p")]
    P1440,
}

impl From<CliQuality> for Quality {
    fn from(q: CliQuality) -> Self {
        match q {
            CliQuality::P480 => Quality::P480,
            CliQuality::P720 => Quality::P720,
            CliQuality::P1080 => Quality::P1080,
            CliQuality::P1440 => Quality::P1440,
        }
    }
}
