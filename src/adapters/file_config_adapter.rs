//! INI file configuration adapter.

use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| EngineError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, EngineError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| EngineError::ConfigParse {
                file: "<inline>".into(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn sections(&self) -> Vec<String> {
        self.config.sections()
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_reads_values() {
        let content = r#"
[engine]
symbol = WOOUSDT
entry_timing = next_bar

[exit]
sl_pct = 0.6
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.get_string("engine", "symbol"), Some("WOOUSDT".into()));
        assert_eq!(adapter.get_string("exit", "sl_pct"), Some("0.6".into()));
    }

    #[test]
    fn missing_and_blank_values_are_absent() {
        let adapter = FileConfigAdapter::from_string("[exit]\nsl_pct =\n").unwrap();
        assert_eq!(adapter.get_string("exit", "sl_pct"), None);
        assert_eq!(adapter.get_string("exit", "tp_pct"), None);
        assert_eq!(adapter.get_string("missing", "key"), None);
        assert!(!adapter.has_key("exit", "tp_pct"));
    }

    #[test]
    fn keys_lists_section_entries_sorted() {
        let adapter =
            FileConfigAdapter::from_string("[gates]\ncooldown_bars = 3\ncooldown_enable = true\n")
                .unwrap();
        assert_eq!(
            adapter.keys("gates"),
            vec!["cooldown_bars".to_string(), "cooldown_enable".to_string()]
        );
        assert!(adapter.keys("exit").is_empty());
    }

    #[test]
    fn sections_are_listed() {
        let adapter = FileConfigAdapter::from_string("[engine]\na = 1\n[exit]\nb = 2\n").unwrap();
        let mut sections = adapter.sections();
        sections.sort();
        assert_eq!(sections, vec!["engine".to_string(), "exit".to_string()]);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[log]\nlog_candidates = true\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("log", "log_candidates"), Some("true".into()));
    }

    #[test]
    fn from_file_reports_missing_file_as_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/engine.ini");
        assert!(matches!(result, Err(EngineError::ConfigParse { .. })));
    }
}
