use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime::{
  DEFAULT_DISPLAY_FORMAT,
  check_display_format
};

pub const DEFAULT_API_URL: &str =
  "http://localhost:3000";
pub const CONFIG_ENV_VAR: &str =
  "TICKLIST_CONFIG";
pub const API_URL_ENV_VAR: &str =
  "TICKLIST_API_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub api_url:      String,
  pub date_format:  String,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api_url:      DEFAULT_API_URL
        .to_string(),
      date_format:
        DEFAULT_DISPLAY_FORMAT
          .to_string(),
      loaded_files: vec![]
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
  #[serde(default)]
  api:     ApiSection,
  #[serde(default)]
  display: DisplaySection
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApiSection {
  url: Option<String>
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DisplaySection {
  date_format: Option<String>
}

impl Config {
  /// Defaults, then the config file,
  /// then `TICKLIST_API_URL`.
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    match resolve_config_path(
      config_override
    ) {
      | Some(path) if path.exists() => {
        info!(config = %path.display(), "loading config file");
        cfg.load_file(&path)?;
      }
      | Some(path)
        if config_override.is_some() =>
      {
        return Err(anyhow!(
          "config file {} does not \
           exist",
          path.display()
        ));
      }
      | Some(path) => {
        debug!(config = %path.display(), "no config file; using defaults");
      }
      | None => {
        warn!(
          "cannot determine config \
           directory; using defaults"
        );
      }
    }

    if let Ok(url) =
      std::env::var(API_URL_ENV_VAR)
      && !url.trim().is_empty()
    {
      debug!(api_url = %url, "api url taken from environment");
      cfg.api_url =
        url.trim().to_string();
    }

    cfg.validate()?;
    Ok(cfg)
  }

  /// Applies `key=value` overrides
  /// such as `api.url=...`.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      match key.as_str() {
        | "api.url" => {
          self.api_url = v
        }
        | "display.date_format" => {
          self.date_format = v
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: \
             {other}"
          ));
        }
      }
    }
    self.validate()
  }

  pub fn validate(
    &self
  ) -> anyhow::Result<()> {
    let url = self.api_url.trim();
    if !(url.starts_with("http://")
      || url.starts_with("https://"))
    {
      return Err(anyhow!(
        "api.url must start with \
         http:// or https://, got: \
         {url}"
      ));
    }
    check_display_format(
      &self.date_format
    )
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let text =
      fs::read_to_string(path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    let parsed: ConfigFile =
      toml::from_str(&text)
        .with_context(|| {
          format!(
            "failed to parse {}",
            path.display()
          )
        })?;

    if let Some(url) = parsed.api.url {
      self.api_url = url;
    }
    if let Some(format) =
      parsed.display.date_format
    {
      self.date_format = format;
    }
    self
      .loaded_files
      .push(path.to_path_buf());
    Ok(())
  }
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  dirs::config_dir().map(|dir| {
    dir
      .join("ticklist")
      .join("config.toml")
  })
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::Config;

  #[test]
  fn file_values_override_defaults() {
    let temp =
      tempdir().expect("tempdir");
    let path =
      temp.path().join("config.toml");
    fs::write(
      &path,
      "[api]\nurl = \
       \"https://todos.example.com/\
       api\"\n\n[display]\n\
       date_format = \"%Y-%m-%d\"\n"
    )
    .expect("write config");

    let cfg = Config::load(Some(&path))
      .expect("load config");
    assert_eq!(
      cfg.date_format,
      "%Y-%m-%d"
    );
    assert_eq!(cfg.loaded_files, vec![
      path
    ]);
  }

  #[test]
  fn missing_explicit_file_is_an_error()
  {
    let temp =
      tempdir().expect("tempdir");
    let path =
      temp.path().join("absent.toml");
    assert!(
      Config::load(Some(&path)).is_err()
    );
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let temp =
      tempdir().expect("tempdir");
    let path =
      temp.path().join("config.toml");
    fs::write(
      &path,
      "[api]\nbase = \"x\"\n"
    )
    .expect("write config");
    assert!(
      Config::load(Some(&path)).is_err()
    );
  }

  #[test]
  fn overrides_apply_and_validate() {
    let mut cfg = Config::default();
    cfg
      .apply_overrides([(
        "rc.api.url".to_string(),
        "https://api.example.com"
          .to_string()
      )])
      .expect("valid override");
    assert_eq!(
      cfg.api_url,
      "https://api.example.com"
    );

    assert!(
      cfg
        .apply_overrides([(
          "api.url".to_string(),
          "ftp://nope".to_string()
        )])
        .is_err()
    );
    assert!(
      Config::default()
        .apply_overrides([(
          "color".to_string(),
          "on".to_string()
        )])
        .is_err()
    );
  }

  #[test]
  fn unknown_date_specifiers_are_rejected()
  {
    assert!(
      Config::default()
        .apply_overrides([(
          "display.date_format"
            .to_string(),
          "%Q".to_string()
        )])
        .is_err()
    );

    let temp =
      tempdir().expect("tempdir");
    let path =
      temp.path().join("config.toml");
    fs::write(
      &path,
      "[display]\ndate_format = \
       \"%d %Q\"\n"
    )
    .expect("write config");
    assert!(
      Config::load(Some(&path)).is_err()
    );
  }
}
