#![allow(deprecated)]

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_template(&self, name: &str, template: &serde_json::Value) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, serde_json::to_string_pretty(template).unwrap()).unwrap();
        path
    }

    #[allow(dead_code)]
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// `rad` running inside the project, isolated from the user's config
    pub fn rad(&self) -> Command {
        let mut cmd = Command::cargo_bin("rad").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join(".config"))
            .env_remove("RAD_CONFIG_PATH")
            .env_remove("RAD_SUBSCRIPTION")
            .env_remove("RAD_RESOURCE_GROUP")
            .env_remove("RAD_STATE_DIR")
            .env_remove("RUST_LOG");
        cmd
    }
}
