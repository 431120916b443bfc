use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use ims_tracker_core::config::{resolve_config_path, AppConfig, LoadOptions};

/// Where an effective setting came from, highest precedence first.
#[derive(Debug, PartialEq, Eq)]
enum Origin {
    Env(&'static str),
    File(Option<PathBuf>),
    Default,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(key) => write!(f, "env ({key})"),
            Self::File(Some(path)) => write!(f, "file ({})", path.display()),
            Self::File(None) => f.write_str("file (config file)"),
            Self::Default => f.write_str("default"),
        }
    }
}

/// The parsed config file, if one was found, used only for attribution.
struct FileLayer {
    path: Option<PathBuf>,
    doc: Option<toml::Table>,
}

impl FileLayer {
    fn discover() -> Self {
        let path = resolve_config_path(None);
        let doc = path
            .as_deref()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|raw| raw.parse::<toml::Table>().ok());
        Self { path, doc }
    }

    fn defines(&self, key_path: &str) -> bool {
        let Some(doc) = &self.doc else {
            return false;
        };
        let mut segments = key_path.split('.');
        let Some(first) = segments.next() else {
            return false;
        };
        segments
            .try_fold(doc.get(first), |node, segment| node.map(|value| value.get(segment)))
            .flatten()
            .is_some()
    }

    fn origin(&self, key_path: &str, env_keys: &[&'static str]) -> Origin {
        if let Some(key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            Origin::Env(key)
        } else if self.defines(key_path) {
            Origin::File(self.path.clone())
        } else {
            Origin::Default
        }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };
    let file = FileLayer::discover();

    let auth_token = if config.api.bearer_token().is_some() { "<redacted>" } else { "<unset>" };
    let rows: [(&str, &[&'static str], String); 6] = [
        ("api.base_url", &["IMS_TRACKER_API_BASE_URL"], config.api.base_url.clone()),
        ("api.timeout_secs", &["IMS_TRACKER_API_TIMEOUT_SECS"], config.api.timeout_secs.to_string()),
        ("api.max_retries", &["IMS_TRACKER_API_MAX_RETRIES"], config.api.max_retries.to_string()),
        ("api.auth_token", &["IMS_TRACKER_API_AUTH_TOKEN"], auth_token.to_string()),
        (
            "logging.level",
            &["IMS_TRACKER_LOGGING_LEVEL", "IMS_TRACKER_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        (
            "logging.format",
            &["IMS_TRACKER_LOGGING_FORMAT", "IMS_TRACKER_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ];

    let mut output = String::from("effective config (precedence: env > file > default):");
    for (key_path, env_keys, value) in rows {
        let origin = file.origin(key_path, env_keys);
        output.push_str(&format!("\n- {key_path} = {value} (source: {origin})"));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{FileLayer, Origin};

    #[test]
    fn file_origin_requires_the_full_key_path() {
        let file = FileLayer {
            path: None,
            doc: Some("[api]\ntimeout_secs = 20\n".parse().expect("valid toml")),
        };

        assert!(file.defines("api.timeout_secs"));
        assert!(!file.defines("api.base_url"));
        assert_eq!(file.origin("api.timeout_secs", &["IMS_TRACKER_TEST_UNSET_KEY"]), Origin::File(None));
        assert_eq!(file.origin("logging.level", &[]).to_string(), "default");
        assert_eq!(Origin::File(None).to_string(), "file (config file)");
    }
}
