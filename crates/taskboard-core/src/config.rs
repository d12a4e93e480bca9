use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow,
  bail
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::sync::SyncIntervals;

pub const DEFAULT_SERVER_URL: &str =
  "http://localhost:5000";

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  pub fn defaults() -> Self {
    let mut cfg = Config {
      map:          HashMap::new(),
      loaded_files: vec![]
    };

    for (key, value) in [
      ("server.url", DEFAULT_SERVER_URL),
      ("poll.board_ms", "10000"),
      ("poll.state_ms", "2000"),
      ("http.timeout_ms", "5000"),
      ("color", "on")
    ] {
      cfg
        .map
        .insert(key.to_string(), value.to_string());
    }
    cfg
  }

  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::defaults();

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading taskboardrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no taskboardrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
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
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn get_millis(
    &self,
    key: &str
  ) -> anyhow::Result<Duration> {
    let raw = self.map.get(key).ok_or_else(
      || anyhow!("missing config key {key}")
    )?;
    let ms: u64 =
      raw.trim().parse().with_context(
        || {
          format!(
            "invalid {key}: expected \
             milliseconds, got {raw}"
          )
        }
      )?;
    Ok(Duration::from_millis(ms))
  }

  /// Base URL without a trailing slash.
  pub fn server_url(
    &self
  ) -> anyhow::Result<String> {
    let raw = self
      .get("server.url")
      .unwrap_or_else(|| {
        DEFAULT_SERVER_URL.to_string()
      });
    let trimmed =
      raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://")
      || trimmed.starts_with("https://"))
    {
      return Err(anyhow!(
        "invalid server.url: {raw} \
         (expected http:// or https://)"
      ));
    }
    Ok(trimmed.to_string())
  }

  pub fn intervals(
    &self
  ) -> anyhow::Result<SyncIntervals> {
    SyncIntervals::new(
      self.get_millis("poll.board_ms")?,
      self.get_millis("poll.state_ms")?
    )
    .context(
      "invalid poll.board_ms / \
       poll.state_ms"
    )
  }

  pub fn http_timeout(
    &self
  ) -> anyhow::Result<Duration> {
    self.get_millis("http.timeout_ms")
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    self.load_file_nested(
      path,
      &mut Vec::new()
    )
  }

  /// `loading` holds the include chain
  /// leading to `path`.
  fn load_file_nested(
    &mut self,
    path: &Path,
    loading: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let canonical =
      fs::canonicalize(&path)
        .unwrap_or_else(|_| path.clone());
    if loading.contains(&canonical) {
      bail!(
        "include cycle: {} is already \
         being loaded",
        path.display()
      );
    }

    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          loading.push(canonical.clone());
          let loaded = self.load_file_nested(
            &include_path,
            loading
          );
          loading.pop();
          loaded?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("TASKBOARDRC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping \
       ~/.taskboardrc"
    );
    return Ok(None);
  };
  let candidate =
    home.join(".taskboardrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

#[cfg(test)]
mod tests {
  use std::fs;
  use std::time::Duration;

  use tempfile::tempdir;

  use super::Config;

  #[test]
  fn defaults_cover_every_key() {
    let cfg = Config::defaults();
    assert_eq!(
      cfg.server_url().unwrap(),
      "http://localhost:5000"
    );
    let intervals =
      cfg.intervals().unwrap();
    assert_eq!(
      intervals.board(),
      Duration::from_secs(10)
    );
    assert_eq!(
      intervals.state(),
      Duration::from_secs(2)
    );
    assert_eq!(
      cfg.http_timeout().unwrap(),
      Duration::from_secs(5)
    );
    assert_eq!(
      cfg.get_bool("color"),
      Some(true)
    );
  }

  #[test]
  fn self_include_is_an_error() {
    let dir = tempdir().unwrap();
    let rc = dir.path().join("rc");
    fs::write(
      &rc,
      "include rc\n"
    )
    .unwrap();

    let err = Config::load(Some(&rc))
      .unwrap_err();
    assert!(
      format!("{err:#}")
        .contains("include cycle")
    );
  }

  #[test]
  fn include_chain_cycle_is_an_error() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("a.rc");
    let second =
      dir.path().join("b.rc");
    fs::write(
      &first,
      "color = off\ninclude b.rc\n"
    )
    .unwrap();
    fs::write(
      &second,
      "include a.rc\n"
    )
    .unwrap();

    let err = Config::load(Some(&first))
      .unwrap_err();
    assert!(
      format!("{err:#}")
        .contains("include cycle")
    );
  }

  #[test]
  fn same_file_included_twice_is_fine() {
    let dir = tempdir().unwrap();
    fs::write(
      dir.path().join("poll.rc"),
      "poll.state_ms = 750\n"
    )
    .unwrap();
    let rc = dir.path().join("rc");
    fs::write(
      &rc,
      "include poll.rc\ninclude poll.rc\n"
    )
    .unwrap();

    let cfg =
      Config::load(Some(&rc)).unwrap();
    assert_eq!(cfg.loaded_files.len(), 3);
  }

  #[test]
  fn rc_file_with_comments_and_include()
   {
    let dir = tempdir().unwrap();
    let extra = dir.path().join("poll.rc");
    fs::write(
      &extra,
      "poll.state_ms = 500\n"
    )
    .unwrap();

    let rc = dir.path().join("taskboardrc");
    fs::write(
      &rc,
      "# ward board\n\
       server.url = http://board.local:5000/ # trailing\n\
       \n\
       include poll.rc\n\
       include missing.rc\n\
       color = off\n"
    )
    .unwrap();

    let cfg =
      Config::load(Some(&rc)).unwrap();
    assert_eq!(cfg.loaded_files.len(), 2);
    assert_eq!(
      cfg.server_url().unwrap(),
      "http://board.local:5000"
    );
    assert_eq!(
      cfg.intervals().unwrap().state(),
      Duration::from_millis(500)
    );
    assert_eq!(
      cfg.get_bool("color"),
      Some(false)
    );
  }

  #[test]
  fn malformed_line_is_an_error() {
    let dir = tempdir().unwrap();
    let rc = dir.path().join("taskboardrc");
    fs::write(&rc, "server.url\n").unwrap();

    let err =
      Config::load(Some(&rc)).unwrap_err();
    assert!(
      err
        .to_string()
        .contains("invalid config line")
    );
  }

  #[test]
  fn overrides_win_and_are_validated() {
    let mut cfg = Config::defaults();
    cfg.apply_overrides([
      (
        "rc.poll.state_ms".to_string(),
        "20000".to_string()
      ),
      (
        "server.url".to_string(),
        "ftp://nope".to_string()
      )
    ]);
    assert!(cfg.intervals().is_err());
    assert!(cfg.server_url().is_err());

    cfg.apply_overrides([(
      "http.timeout_ms".to_string(),
      "soon".to_string()
    )]);
    assert!(cfg.http_timeout().is_err());
  }
}
