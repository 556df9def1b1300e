use super::Config;
use anyhow::Result;
use tracing::warn;

/// Validation errors for configuration.
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a configuration object.
pub fn validate_config(config: &Config) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    for (path, quality) in [
        ("fitting.reencodeQuality", config.fitting.reencode_quality),
        ("fitting.verifyQuality", config.fitting.verify_quality),
    ] {
        if !(1..=100).contains(&quality) {
            errors.push(ConfigValidationError {
                path: path.to_string(),
                message: format!("Quality must be between 1 and 100, got {quality}"),
            });
        }
    }

    if config.fitting.max_canvas_pixels == 0 {
        errors.push(ConfigValidationError {
            path: "fitting.maxCanvasPixels".to_string(),
            message: "Canvas limit must be greater than 0".to_string(),
        });
    }

    if config.telegram.max_input_bytes == 0 {
        errors.push(ConfigValidationError {
            path: "telegram.maxInputBytes".to_string(),
            message: "Input limit must be greater than 0".to_string(),
        });
    }

    if config.telegram.processing_timeout_secs == Some(0) {
        errors.push(ConfigValidationError {
            path: "telegram.processingTimeoutSecs".to_string(),
            message: "Timeout must be greater than 0 when set".to_string(),
        });
    }

    if let Some(token) = &config.telegram.bot_token {
        if !token.contains(':') {
            warn!("Telegram bot token does not look like '<id>:<secret>'");
        }
    }

    errors
}

/// Validate configuration and return Result.
pub fn validate_config_object(config: &Config) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Configuration validation failed:\n{}", messages.join("\n"));
    }
}

/// Checks that everything needed to run the bot is present.
pub fn require_bot_token(config: &Config) -> Result<&str> {
    config
        .telegram
        .bot_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Telegram bot token not configured (set TELEGRAM_BOT_TOKEN or telegram.botToken)"
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_empty());
    }

    #[test]
    fn test_out_of_range_quality_reported() {
        let mut config = Config::default();
        config.fitting.reencode_quality = 0;
        config.fitting.verify_quality = 101;
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, "fitting.reencodeQuality");
        assert!(validate_config_object(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_reported() {
        let mut config = Config::default();
        config.telegram.processing_timeout_secs = Some(0);
        assert_eq!(validate_config(&config)[0].path, "telegram.processingTimeoutSecs");
    }

    #[test]
    fn test_require_bot_token() {
        let mut config = Config::default();
        assert!(require_bot_token(&config).is_err());
        config.telegram.bot_token = Some("  ".to_string());
        assert!(require_bot_token(&config).is_err());
        config.telegram.apply_token("42:secret");
        assert_eq!(require_bot_token(&config).unwrap(), "42:secret");
    }
}
