use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default crew data directory: ~/.crew
pub fn get_crew_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".crew"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.crew/config.toml (highest)
    let crew_dir = get_crew_data_dir()?;
    let crew_config = crew_dir.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg = if crew_config.exists() {
        load_from_path(&crew_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    if cfg
        .logging
        .directory
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
    {
        cfg.logging.directory = Some(crew_dir.join("logs").to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read {} failed: {e}", path.display()))?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("parse {} failed: {e}", path.display()))?;
    Ok(cfg)
}

/// Environment variable overrides (Priority 0: highest).
///
/// `lookup` is injected so tests do not touch the process environment.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("OPENAI_API_KEY") {
        if cfg.generation.api_key.trim().is_empty() {
            cfg.generation.api_key = v.clone();
        }
        if cfg.critique.api_key.trim().is_empty() {
            cfg.critique.api_key = v;
        }
    }
    if let Some(v) = get("OPENAI_BASE_URL") {
        cfg.generation.base_url = v.clone();
        cfg.critique.base_url = v;
    }
    if let Some(v) = get("OPENAI_MODEL_NAME") {
        cfg.generation.model = v;
    }
    if let Some(v) = get("CREW_MANAGER_MODEL") {
        cfg.critique.model = v;
    }
    if let Some(v) = get("CREW_MAX_REVISIONS") {
        match v.trim().parse::<u32>() {
            Ok(n) => cfg.revision.max_revisions = n,
            Err(_) => tracing::warn!(value = %v, "ignoring invalid CREW_MAX_REVISIONS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_fill_missing_keys_only() {
        let mut cfg = AppConfig::default();
        cfg.critique.api_key = "sk-manager".to_string();
        apply_env_overrides(
            &mut cfg,
            env(&[
                ("OPENAI_API_KEY", "sk-env"),
                ("OPENAI_MODEL_NAME", "gpt-4.1"),
                ("CREW_MAX_REVISIONS", "5"),
            ]),
        );
        assert_eq!(cfg.generation.api_key, "sk-env");
        assert_eq!(cfg.critique.api_key, "sk-manager");
        assert_eq!(cfg.generation.model, "gpt-4.1");
        assert_eq!(cfg.revision.max_revisions, 5);
    }

    #[test]
    fn test_invalid_max_revisions_is_ignored() {
        let mut cfg = AppConfig::default();
        apply_env_overrides(&mut cfg, env(&[("CREW_MAX_REVISIONS", "lots")]));
        assert_eq!(cfg.revision.max_revisions, 2);
    }

    #[test]
    fn test_load_from_path_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[output]\nformat = \"jsonl\"\n\n[concurrency]\nmax_parallel = 2"
        )
        .unwrap();
        let cfg = load_from_path(file.path()).unwrap();
        assert_eq!(cfg.output.format, "jsonl");
        assert_eq!(cfg.concurrency.max_parallel, Some(2));
    }

    #[test]
    fn test_load_from_path_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[revision\nmax_revisions = ").unwrap();
        let err = load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }
}
