use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_environment, parse_f32, parse_f64, parse_u16,
    parse_u32, parse_u64,
};
use super::types::{
    AssociatorSettings, ConfigError, DatabaseSettings, DetectorSettings, NormalizerSettings,
    OcrSettings, RuntimeSettings, Settings, StorageSettings, TelemetrySettings, WorkerSettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let environment =
            parse_environment(env_optional("SURVEY_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("SURVEY_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "survey");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "survey_db");
        let database_url = env_optional("DATABASE_URL");

        let upload_dir = env_or_default("UPLOAD_DIR", "uploads");
        let processed_dir = env_or_default("PROCESSED_DIR", "processed");

        let blur_sigma =
            parse_f32("NORMALIZE_BLUR_SIGMA", env_or_default("NORMALIZE_BLUR_SIGMA", "1.0"))?;
        let block_radius =
            parse_u32("NORMALIZE_BLOCK_RADIUS", env_or_default("NORMALIZE_BLOCK_RADIUS", "5"))?;

        let min_area = parse_f64("DETECT_MIN_AREA", env_or_default("DETECT_MIN_AREA", "100"))?;
        let max_area = parse_f64("DETECT_MAX_AREA", env_or_default("DETECT_MAX_AREA", "1000"))?;
        let min_circularity =
            parse_f64("DETECT_MIN_CIRCULARITY", env_or_default("DETECT_MIN_CIRCULARITY", "0.7"))?;
        let fill_ratio_threshold =
            parse_f64("DETECT_FILL_RATIO", env_or_default("DETECT_FILL_RATIO", "0.3"))?;

        let vertical_gap =
            parse_f64("ASSOCIATE_VERTICAL_GAP", env_or_default("ASSOCIATE_VERTICAL_GAP", "30"))?;
        let band_height =
            parse_u32("ASSOCIATE_BAND_HEIGHT", env_or_default("ASSOCIATE_BAND_HEIGHT", "50"))?;

        let ocr_base_url = env_or_default("OCR_BASE_URL", "");
        let ocr_api_key = env_or_default("OCR_API_KEY", "");
        let ocr_timeout_seconds =
            parse_u64("OCR_TIMEOUT_SECONDS", env_or_default("OCR_TIMEOUT_SECONDS", "60"))?;

        let concurrency =
            parse_u32("WORKER_CONCURRENCY", env_or_default("WORKER_CONCURRENCY", "2"))?;
        let poll_interval_seconds = parse_u64(
            "WORKER_POLL_INTERVAL_SECONDS",
            env_or_default("WORKER_POLL_INTERVAL_SECONDS", "2"),
        )?;

        let log_level = env_or_default("SURVEY_LOG_LEVEL", "info");
        let json = env_optional("SURVEY_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_addr = env_or_default("PROMETHEUS_ADDR", "0.0.0.0:9090");

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            storage: StorageSettings { upload_dir, processed_dir },
            normalizer: NormalizerSettings { blur_sigma, block_radius },
            detector: DetectorSettings {
                min_area,
                max_area,
                min_circularity,
                fill_ratio_threshold,
            },
            associator: AssociatorSettings { vertical_gap, band_height },
            ocr: OcrSettings {
                base_url: ocr_base_url,
                api_key: ocr_api_key,
                timeout_seconds: ocr_timeout_seconds,
            },
            worker: WorkerSettings { concurrency, poll_interval_seconds },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled, prometheus_addr },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn normalizer(&self) -> &NormalizerSettings {
        &self.normalizer
    }

    pub(crate) fn detector(&self) -> &DetectorSettings {
        &self.detector
    }

    pub(crate) fn associator(&self) -> &AssociatorSettings {
        &self.associator
    }

    pub(crate) fn ocr(&self) -> &OcrSettings {
        &self.ocr
    }

    pub(crate) fn worker(&self) -> &WorkerSettings {
        &self.worker
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.upload_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "UPLOAD_DIR",
                value: String::from("<empty>"),
            });
        }

        if self.storage.processed_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "PROCESSED_DIR",
                value: String::from("<empty>"),
            });
        }

        if self.normalizer.blur_sigma <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "NORMALIZE_BLUR_SIGMA",
                value: self.normalizer.blur_sigma.to_string(),
            });
        }

        if self.normalizer.block_radius == 0 {
            return Err(ConfigError::InvalidValue {
                field: "NORMALIZE_BLOCK_RADIUS",
                value: "0".to_string(),
            });
        }

        if self.detector.min_area <= 0.0 || self.detector.min_area >= self.detector.max_area {
            return Err(ConfigError::InvalidValue {
                field: "DETECT_MIN_AREA",
                value: self.detector.min_area.to_string(),
            });
        }

        if self.detector.min_circularity <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "DETECT_MIN_CIRCULARITY",
                value: self.detector.min_circularity.to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.detector.fill_ratio_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "DETECT_FILL_RATIO",
                value: self.detector.fill_ratio_threshold.to_string(),
            });
        }

        if self.associator.vertical_gap <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "ASSOCIATE_VERTICAL_GAP",
                value: self.associator.vertical_gap.to_string(),
            });
        }

        if self.associator.band_height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ASSOCIATE_BAND_HEIGHT",
                value: "0".to_string(),
            });
        }

        if self.worker.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "WORKER_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        if self.worker.poll_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "WORKER_POLL_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        if self.ocr.base_url.is_empty() {
            return Err(ConfigError::MissingSecret("OCR_BASE_URL"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::types::Environment;

    fn base_settings() -> Settings {
        Settings {
            runtime: RuntimeSettings {
                environment: Environment::Test,
                strict_config: false,
            },
            database: DatabaseSettings {
                postgres_server: "localhost".to_string(),
                postgres_port: 5432,
                postgres_user: "survey".to_string(),
                postgres_password: String::new(),
                postgres_db: "survey_db".to_string(),
                database_url: None,
            },
            storage: StorageSettings {
                upload_dir: "uploads".to_string(),
                processed_dir: "processed".to_string(),
            },
            normalizer: NormalizerSettings::default(),
            detector: DetectorSettings::default(),
            associator: AssociatorSettings::default(),
            ocr: OcrSettings {
                base_url: String::new(),
                api_key: String::new(),
                timeout_seconds: 60,
            },
            worker: WorkerSettings { concurrency: 2, poll_interval_seconds: 2 },
            telemetry: TelemetrySettings {
                log_level: "info".to_string(),
                json: false,
                prometheus_enabled: false,
                prometheus_addr: "0.0.0.0:9090".to_string(),
            },
        }
    }

    #[test]
    fn defaults_pass_validation() {
        base_settings().validate().expect("valid settings");
    }

    #[test]
    fn detector_defaults_match_documented_thresholds() {
        let detector = DetectorSettings::default();
        assert_eq!(detector.min_area, 100.0);
        assert_eq!(detector.max_area, 1000.0);
        assert_eq!(detector.min_circularity, 0.7);
        assert_eq!(detector.fill_ratio_threshold, 0.3);
    }

    #[test]
    fn rejects_inverted_area_band() {
        let mut settings = base_settings();
        settings.detector.min_area = 2000.0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { field: "DETECT_MIN_AREA", .. })
        ));
    }

    #[test]
    fn rejects_fill_ratio_outside_unit_interval() {
        let mut settings = base_settings();
        settings.detector.fill_ratio_threshold = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { field: "DETECT_FILL_RATIO", .. })
        ));
    }

    #[test]
    fn strict_config_requires_database_secret() {
        let mut settings = base_settings();
        settings.runtime.strict_config = true;
        settings.ocr.base_url = "http://localhost:9900".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"))));

        settings.database.postgres_password = "secret".to_string();
        settings.validate().expect("valid strict settings");
    }

    #[test]
    fn strict_config_requires_ocr_endpoint() {
        let mut settings = base_settings();
        settings.runtime.strict_config = true;
        settings.database.postgres_password = "secret".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::MissingSecret("OCR_BASE_URL"))));
    }

    #[test]
    fn database_url_overrides_component_parts() {
        let mut settings = base_settings();
        settings.database.database_url = Some("postgresql://u:p@db:5432/x".to_string());
        assert_eq!(settings.database().database_url(), "postgresql://u:p@db:5432/x");

        settings.database.database_url = None;
        assert_eq!(
            settings.database().database_url(),
            "postgresql://survey:@localhost:5432/survey_db"
        );
    }
}
