use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Secret '{name}' not found in {backend}")]
    SecretNotFoundError { backend: String, name: String },

    #[error("Failed to fetch secret '{name}' from {backend}: {message}")]
    SecretError {
        backend: String,
        name: String,
        message: String,
    },

    #[error("Telemetry initialization failed: {message}")]
    TelemetryError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Secret,
    Network,
    Telemetry,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BootstrapError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::SecretNotFoundError { .. } | Self::SecretError { .. } => ErrorCategory::Secret,
            Self::HttpError(_) => ErrorCategory::Network,
            Self::TelemetryError { .. } => ErrorCategory::Telemetry,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::SecretNotFoundError { .. } => ErrorSeverity::High,
            Self::SecretError { .. } | Self::HttpError(_) => ErrorSeverity::Medium,
            Self::TelemetryError { .. } => ErrorSeverity::Low,
            Self::IoError(_) | Self::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::ConfigError { .. } => {
                "Check ENV_STATE and the environment variables for the active state".to_string()
            }
            Self::MissingConfigError { field } => {
                format!("Set the {} variable (or its prefixed variant) and restart", field)
            }
            Self::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of {} and restart", field)
            }
            Self::SecretNotFoundError { backend, name } => format!(
                "Verify that secret '{}' exists in {} and that the runtime identity can read it",
                name, backend
            ),
            Self::SecretError { backend, .. } => format!(
                "Check {} credentials and network reachability, then retry",
                backend
            ),
            Self::HttpError(_) => "Check network connectivity and endpoint URLs".to_string(),
            Self::TelemetryError { .. } => {
                "Check the OTLP endpoint configuration; the service can run without export"
                    .to_string()
            }
            Self::IoError(_) => "Check file paths and permissions".to_string(),
            Self::SerializationError(_) => {
                "The remote service returned an unexpected payload; check service versions"
                    .to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Secret => format!("Secret resolution problem: {}", self),
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Telemetry => format!("Telemetry problem: {}", self),
            ErrorCategory::System => format!("System problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
