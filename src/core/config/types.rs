use thiserror::Error;

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(super) runtime: RuntimeSettings,
    pub(super) database: DatabaseSettings,
    pub(super) storage: StorageSettings,
    pub(super) normalizer: NormalizerSettings,
    pub(super) detector: DetectorSettings,
    pub(super) associator: AssociatorSettings,
    pub(super) ocr: OcrSettings,
    pub(super) worker: WorkerSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) environment: Environment,
    pub(crate) strict_config: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct DatabaseSettings {
    pub(crate) postgres_server: String,
    pub(crate) postgres_port: u16,
    pub(crate) postgres_user: String,
    pub(crate) postgres_password: String,
    pub(crate) postgres_db: String,
    pub(crate) database_url: Option<String>,
}

/// Filesystem roots for raw uploads and derived images.
#[derive(Debug, Clone)]
pub(crate) struct StorageSettings {
    pub(crate) upload_dir: String,
    pub(crate) processed_dir: String,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct NormalizerSettings {
    pub(crate) blur_sigma: f32,
    pub(crate) block_radius: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DetectorSettings {
    pub(crate) min_area: f64,
    pub(crate) max_area: f64,
    pub(crate) min_circularity: f64,
    pub(crate) fill_ratio_threshold: f64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AssociatorSettings {
    /// Marks closer than this (vertically) belong to one question.
    pub(crate) vertical_gap: f64,
    /// Height of the text band read above each question group.
    pub(crate) band_height: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct OcrSettings {
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct WorkerSettings {
    pub(crate) concurrency: u32,
    pub(crate) poll_interval_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) prometheus_enabled: bool,
    pub(crate) prometheus_addr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Test => "test",
        }
    }

    pub(super) fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self { blur_sigma: 1.0, block_radius: 5 }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self { min_area: 100.0, max_area: 1000.0, min_circularity: 0.7, fill_ratio_threshold: 0.3 }
    }
}

impl Default for AssociatorSettings {
    fn default() -> Self {
        Self { vertical_gap: 30.0, band_height: 50 }
    }
}

impl DatabaseSettings {
    pub(crate) fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_server,
            self.postgres_port,
            self.postgres_db
        )
    }
}
