//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(|e| std::io::Error::other(e))?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config_validation::read_number;
    use crate::domain::error::SeerError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[data]
prices = data/prices.csv

[universe]
assets = XBI, IBB
benchmark = ^GSPC
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "prices"),
            Some("data/prices.csv".to_string())
        );
        assert_eq!(
            adapter.get_string("universe", "assets"),
            Some("XBI, IBB".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[model]\ntrain_window = 252\n").unwrap();
        assert_eq!(adapter.get_string("model", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn numbers_parse_strictly_from_raw_text() {
        let adapter = FileConfigAdapter::from_string(
            "[model]\ntrain_window = 252\nseed = abc\n[backtest]\ntransaction_cost_bps = 5.5\n",
        )
        .unwrap();
        assert_eq!(read_number::<usize>(&adapter, "model", "train_window").unwrap(), Some(252));
        assert_eq!(read_number::<usize>(&adapter, "model", "missing").unwrap(), None);
        assert_eq!(
            read_number::<f64>(&adapter, "backtest", "transaction_cost_bps").unwrap(),
            Some(5.5)
        );
        let err = read_number::<u64>(&adapter, "model", "seed").unwrap_err();
        assert!(matches!(err, SeerError::ConfigInvalid { .. }));
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[model]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\ng = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("model", "a", false));
        assert!(adapter.get_bool("model", "b", false));
        assert!(adapter.get_bool("model", "c", false));
        assert!(!adapter.get_bool("model", "d", true));
        assert!(!adapter.get_bool("model", "e", true));
        assert!(!adapter.get_bool("model", "f", true));
        assert!(adapter.get_bool("model", "g", true));
        assert!(!adapter.get_bool("model", "missing", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[robustness]\nsimulations = 200\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("robustness", "simulations").as_deref(), Some("200"));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }
}
