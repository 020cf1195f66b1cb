mod parsing;
mod settings;
mod types;

pub(crate) use types::{
    AssociatorSettings, ConfigError, DetectorSettings, NormalizerSettings, Settings,
};
