use super::{types::Config, ConfigError};

/// Reject a configuration the engine cannot run with. Missing account
/// credentials are fatal up front, before any network traffic.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.auth.username.is_empty() {
        return Err(ConfigError::MissingCredentials("username"));
    }
    if config.auth.password.is_empty() {
        return Err(ConfigError::MissingCredentials("password"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    #[test]
    fn test_valid_config_passes() {
        let config = load_config_from_str(
            r#"
[auth]
username = "alice"
password = "secret"
"#,
        )
        .unwrap();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_username_rejected() {
        let config = load_config_from_str(
            r#"
[auth]
username = ""
password = "secret"
"#,
        )
        .unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials("username")));
    }

    #[test]
    fn test_empty_password_rejected() {
        let config = load_config_from_str(
            r#"
[auth]
username = "alice"
password = ""
"#,
        )
        .unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials("password")));
    }
}
