use super::parsing::{
    env_flag, env_optional, env_or_default, env_parse, env_positive, parse_cors_origins,
    parse_environment,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    ApiSettings, ConfigError, CorsSettings, DatabaseSettings, HybridSettings, RedisSettings,
    RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings, Settings,
    TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("QRSUB_HOST", "0.0.0.0");
        let port = env_or_default("QRSUB_PORT", "8000");

        let environment =
            parse_environment(env_optional("QRSUB_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config = env_flag("QRSUB_STRICT_CONFIG") || environment.is_production();

        let api = ApiSettings {
            project_name: env_or_default("PROJECT_NAME", "QR Submission API"),
            version: env_or_default("VERSION", env!("CARGO_PKG_VERSION")),
            api_v1_str: env_or_default("API_V1_STR", "/api/v1"),
        };

        let security = SecuritySettings {
            secret_key: env_optional("SECRET_KEY").unwrap_or_else(load_or_create_secret_key),
            algorithm: env_or_default("ALGORITHM", "HS256"),
        };

        let cors =
            CorsSettings { origins: parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))? };

        let database = DatabaseSettings {
            postgres_server: env_or_default("POSTGRES_SERVER", "localhost"),
            postgres_port: env_parse("POSTGRES_PORT", 5432)?,
            postgres_user: env_or_default("POSTGRES_USER", "qrsub"),
            postgres_password: env_or_default("POSTGRES_PASSWORD", ""),
            postgres_db: env_or_default("POSTGRES_DB", "qrsub_db"),
            database_url: env_optional("DATABASE_URL"),
        };

        let redis = RedisSettings {
            host: env_or_default("REDIS_HOST", "localhost"),
            port: env_parse("REDIS_PORT", 6379)?,
            db: env_parse("REDIS_DB", 0)?,
            password: env_or_default("REDIS_PASSWORD", ""),
        };

        let hybrid = HybridSettings {
            unproctored_refresh_ms: env_positive("UNPROCTORED_REFRESH_MS", 1000)?,
            default_exam_refresh_seconds: env_positive("DEFAULT_EXAM_REFRESH_SECONDS", 5)?,
            upload_time_limit_seconds: env_parse("UPLOAD_TIME_LIMIT_SECONDS", 3600)?,
            public_base_url: env_or_default("PUBLIC_BASE_URL", ""),
            status_rate_limit: env_positive("STATUS_RATE_LIMIT", 240)?,
        };

        let telemetry = TelemetrySettings {
            log_level: env_or_default("QRSUB_LOG_LEVEL", "info"),
            json: env_flag("QRSUB_LOG_JSON"),
            prometheus_enabled: env_flag("PROMETHEUS_ENABLED"),
        };

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api,
            security,
            cors,
            database,
            redis,
            hybrid,
            telemetry,
        };

        settings.validate()?;
        Ok(settings)
    }
    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn hybrid(&self) -> &HybridSettings {
        &self.hybrid
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    /// Production and strict mode refuse to start without real credentials.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.hybrid.public_base_url.is_empty() {
            return Err(ConfigError::MissingSecret("PUBLIC_BASE_URL"));
        }

        Ok(())
    }
}
