use std::fs;
use std::time::Duration;

use lumen_core::config::PROFILE_ENV;
use lumen_core::{ConfigError, HttpConfig, LumenConfig, RenderConfig, RenderMode};
use serial_test::serial;
use tempfile::TempDir;

/// Removes the listed environment variables when dropped.
struct EnvGuard {
    keys: Vec<&'static str>,
}

impl EnvGuard {
    fn set(vars: &[(&'static str, &str)]) -> Self {
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        EnvGuard {
            keys: vars.iter().map(|(k, _)| *k).collect(),
        }
    }

    fn clearing(keys: &[&'static str]) -> Self {
        for key in keys {
            std::env::remove_var(key);
        }
        EnvGuard { keys: keys.to_vec() }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            std::env::remove_var(key);
        }
    }
}

const BASE: &str = "\
lumen:
  render:
    mode: streaming
    timeout: 2000
  document:
    title: Catalog
    head:
      - <link rel=\"icon\" href=\"/favicon.ico\" />
      - <meta name=\"theme-color\" content=\"#333\" />
";

const DEV: &str = "\
lumen:
  render:
    mode: buffered
  http:
    bodylimit: 4096
";

fn config_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("application.yaml"), BASE).unwrap();
    fs::write(tmp.path().join("application-dev.yaml"), DEV).unwrap();
    tmp
}

#[test]
#[serial]
fn profile_file_overrides_base_file() {
    let _env = EnvGuard::clearing(&[PROFILE_ENV, "LUMEN_RENDER_TIMEOUT"]);
    let tmp = config_dir();

    let config = LumenConfig::load_from(tmp.path(), "dev").unwrap();
    assert_eq!(config.profile(), "dev");

    let render = RenderConfig::from_config(&config).unwrap();
    assert_eq!(render.mode, RenderMode::Buffered);
    assert_eq!(render.shell_timeout, Duration::from_millis(2000));
    assert_eq!(render.document.default_title, "Catalog");
    assert_eq!(render.document.head.len(), 2);
    assert_eq!(HttpConfig::from_config(&config).unwrap().body_limit, 4096);
}

#[test]
#[serial]
fn profile_env_var_selects_the_profile() {
    let _env = EnvGuard::set(&[(PROFILE_ENV, "prod")]);
    let tmp = config_dir();
    fs::write(
        tmp.path().join("application-prod.yaml"),
        "lumen:\n  document:\n    lang: fr\n",
    )
    .unwrap();

    let config = LumenConfig::load_from(tmp.path(), "dev").unwrap();
    assert_eq!(config.profile(), "prod");
    let render = RenderConfig::from_config(&config).unwrap();
    assert_eq!(render.document.lang, "fr");
    assert_eq!(render.mode, RenderMode::Streaming);
}

#[test]
#[serial]
fn environment_variables_override_files() {
    let _clear = EnvGuard::clearing(&[PROFILE_ENV]);
    let _env = EnvGuard::set(&[("LUMEN_RENDER_TIMEOUT", "150")]);
    let tmp = config_dir();

    let config = LumenConfig::load_from(tmp.path(), "dev").unwrap();
    let render = RenderConfig::from_config(&config).unwrap();
    assert_eq!(render.shell_timeout, Duration::from_millis(150));
}

#[test]
#[serial]
fn dotenv_files_feed_the_environment_layer() {
    let _env = EnvGuard::clearing(&[PROFILE_ENV, "LUMEN_HTTP_BODYLIMIT"]);
    let tmp = config_dir();
    fs::write(tmp.path().join(".env.dev"), "LUMEN_HTTP_BODYLIMIT=512\n").unwrap();

    let config = LumenConfig::load_from(tmp.path(), "dev").unwrap();
    assert_eq!(HttpConfig::from_config(&config).unwrap().body_limit, 512);
}

#[test]
#[serial]
fn missing_files_yield_defaults() {
    let _env = EnvGuard::clearing(&[PROFILE_ENV, "LUMEN_RENDER_TIMEOUT", "LUMEN_HTTP_BODYLIMIT"]);
    let tmp = TempDir::new().unwrap();

    let config = LumenConfig::load_from(tmp.path(), "dev").unwrap();
    assert_eq!(RenderConfig::from_config(&config).unwrap(), RenderConfig::default());
    assert_eq!(HttpConfig::from_config(&config).unwrap(), HttpConfig::default());
}

#[test]
#[serial]
fn malformed_yaml_is_a_load_error() {
    let _env = EnvGuard::clearing(&[PROFILE_ENV]);
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("application.yaml"), "lumen: [unclosed").unwrap();

    let err = LumenConfig::load_from(tmp.path(), "dev").unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn unknown_render_mode_is_rejected() {
    let config = LumenConfig::from_yaml_str("lumen:\n  render:\n    mode: eager\n", "test").unwrap();
    let err = RenderConfig::from_config(&config).unwrap_err();
    assert!(err.to_string().contains("lumen.render.mode"));
}
