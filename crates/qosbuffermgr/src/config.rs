//! Manager configuration and task files.
//!
//! Two YAML documents feed the manager:
//!
//! ```yaml
//! # engine configuration (every key optional)
//! batching: container     # container | entry
//! check_mode: false
//! refresh_after_apply: true
//! ```
//!
//! ```yaml
//! # task: what the caller wants
//! state: merged           # merged | replaced | overridden | deleted
//! config:
//!   buffer_pools:
//!     - name: ingress_lossless_pool
//!       xoff: 2500000
//!   buffer_profiles:
//!     - name: profile1
//!       pool: ingress_lossless_pool
//!       size: 40
//!       static_threshold: 20
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compile::Batching;
use crate::error::{QosBufferError, QosBufferResult};
use crate::types::{DesiredConfig, Mode};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QosBufferConfig {
    /// How upserts are grouped into PATCH requests.
    pub batching: Batching,
    /// Plan only, never execute.
    pub check_mode: bool,
    /// Re-read the device after a successful apply to report `after`.
    pub refresh_after_apply: bool,
}

impl Default for QosBufferConfig {
    fn default() -> Self {
        Self {
            batching: Batching::Container,
            check_mode: false,
            refresh_after_apply: true,
        }
    }
}

impl QosBufferConfig {
    pub fn with_batching(mut self, batching: Batching) -> Self {
        self.batching = batching;
        self
    }

    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    pub fn from_yaml_str(yaml: &str) -> QosBufferResult<Self> {
        // an empty document means all defaults
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> QosBufferResult<Self> {
        Self::from_yaml_str(&read_file(path.as_ref())?)
    }
}

/// A reconciliation request: mode plus desired configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferTask {
    #[serde(default)]
    pub state: Mode,
    #[serde(default)]
    pub config: DesiredConfig,
}

impl BufferTask {
    pub fn from_yaml_str(yaml: &str) -> QosBufferResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> QosBufferResult<Self> {
        Self::from_yaml_str(&read_file(path.as_ref())?)
    }
}

pub(crate) fn read_file(path: &Path) -> QosBufferResult<String> {
    fs::read_to_string(path).map_err(|e| QosBufferError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferPool, BufferProfileSpec};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_defaults() {
        let config = QosBufferConfig::from_yaml_str("").unwrap();
        assert_eq!(config, QosBufferConfig::default());
        assert_eq!(config.batching, Batching::Container);
        assert!(!config.check_mode);
        assert!(config.refresh_after_apply);
    }

    #[test]
    fn test_config_partial_override() {
        let config = QosBufferConfig::from_yaml_str("batching: entry\n").unwrap();
        assert_eq!(config.batching, Batching::Entry);
        assert!(config.refresh_after_apply);
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        assert!(QosBufferConfig::from_yaml_str("batch: entry\n").is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "check_mode: true").unwrap();
        file.flush().unwrap();

        let config = QosBufferConfig::from_yaml_file(file.path()).unwrap();
        assert!(config.check_mode);
    }

    #[test]
    fn test_config_file_not_found() {
        let err = QosBufferConfig::from_yaml_file("/nonexistent/qos.yaml").unwrap_err();
        assert!(matches!(err, QosBufferError::Io { .. }));
    }

    #[test]
    fn test_task_parse() {
        let yaml = r#"
state: deleted
config:
  buffer_pools:
    - name: egress_lossy_pool
  buffer_profiles:
    - name: profile1
      static_threshold: 20
"#;
        let task = BufferTask::from_yaml_str(yaml).unwrap();

        assert_eq!(task.state, Mode::Deleted);
        assert_eq!(
            task.config,
            DesiredConfig::new()
                .with_pool(BufferPool::new("egress_lossy_pool"))
                .with_profile(BufferProfileSpec::new("profile1").with_static_threshold(20))
        );
    }

    #[test]
    fn test_task_state_defaults_to_merged() {
        let task = BufferTask::from_yaml_str("config: {}\n").unwrap();
        assert_eq!(task.state, Mode::Merged);
        assert!(task.config.is_empty());
    }
}
