//! Configuration and input loading.

use crate::cli::GlobalOpts;
use anyhow::{Context, Result};
use netconv_core::config::EngineConfig;
use netconv_engine::InputDocument;
use secrecy::SecretString;
use std::path::Path;
use validator::Validate;

/// Parse a TOML configuration.
pub fn parse_config(text: &str) -> Result<EngineConfig> {
    toml::from_str(text).context("invalid configuration file")
}

/// Load the configuration file, if any, and apply flag and environment
/// overrides on top of it.
pub fn load_config(global: &GlobalOpts) -> Result<EngineConfig> {
    let config = match &global.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            parse_config(&text).with_context(|| format!("in {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    let config = apply_overrides(config, global);
    config
        .validate()
        .map_err(|err| netconv_core::Error::Config(err.to_string()))
        .context("invalid configuration")?;
    Ok(config)
}

fn apply_overrides(mut config: EngineConfig, global: &GlobalOpts) -> EngineConfig {
    if let Some(url) = &global.controller {
        config.controller_url.clone_from(url);
    }
    if let Some(username) = &global.username {
        config.username.clone_from(username);
    }
    if let Some(password) = &global.password {
        config.password = Some(SecretString::from(password.clone()));
    }
    if let Some(token) = &global.token {
        config.token = Some(SecretString::from(token.clone()));
    }
    if global.insecure {
        config.tls_verify = false;
    }
    config
}

/// Parse an input document; `.json` files are read as JSON, anything else
/// as YAML.
pub fn parse_document(path: &Path, text: &str) -> Result<InputDocument> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let doc = if is_json {
        InputDocument::from_json(text)
    } else {
        InputDocument::from_yaml(text)
    };
    doc.with_context(|| format!("parsing {}", path.display()))
}

/// Read and parse an input document.
pub fn load_document(path: &Path) -> Result<InputDocument> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_document(path, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netconv_engine::State;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn no_flags() -> GlobalOpts {
        GlobalOpts {
            config: None,
            controller: None,
            username: None,
            password: None,
            token: None,
            insecure: false,
            verbose: 0,
        }
    }

    #[test]
    fn toml_with_nested_policies() {
        let config = parse_config(
            r#"
controller_url = "https://dnac.example.com"
username = "admin"
password = "hunter2"
batch_size = 10

[retry]
retries = 5

[pagination]
page_size = 50
"#,
        )
        .unwrap();
        assert_eq!(config.controller_url, "https://dnac.example.com");
        assert_eq!(config.password.unwrap().expose_secret(), "hunter2");
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.retry.retries, 5);
        assert_eq!(config.retry.interval_secs, 10);
        assert_eq!(config.pagination.page_size, 50);
    }

    #[test]
    fn flags_override_the_file() {
        let file = parse_config("controller_url = \"https://old.example.com\"\n").unwrap();
        let flags = GlobalOpts {
            controller: Some("https://new.example.com".into()),
            token: Some("t0k3n".into()),
            insecure: true,
            ..no_flags()
        };

        let config = apply_overrides(file, &flags);

        assert_eq!(config.controller_url, "https://new.example.com");
        assert_eq!(config.token.unwrap().expose_secret(), "t0k3n");
        assert!(!config.tls_verify);
    }

    #[test]
    fn absent_flags_keep_the_file() {
        let file = parse_config("controller_url = \"https://dnac.example.com\"\n").unwrap();
        let config = apply_overrides(file, &no_flags());
        assert_eq!(config.controller_url, "https://dnac.example.com");
        assert!(config.tls_verify);
    }

    #[test]
    fn document_format_follows_the_extension() {
        let json = parse_document(
            Path::new("input.JSON"),
            r#"{"state": "deleted", "config": {"role_details": [{"role_name": "ops"}]}}"#,
        )
        .unwrap();
        assert_eq!(json.state, State::Deleted);

        let yaml = parse_document(
            Path::new("input.yml"),
            "config:\n  role_details:\n    - role_name: ops\n",
        )
        .unwrap();
        assert_eq!(yaml.state, State::Merged);
        assert_eq!(yaml.config.role_details.len(), 1);
    }

    #[test]
    fn unparseable_document_names_the_file() {
        let error = parse_document(Path::new("broken.yml"), "state: [").unwrap_err();
        assert!(format!("{error:#}").contains("broken.yml"));
    }
}
