//! Integration tests for dx

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// dx isolated from the user's config and cache
    fn dx(home: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("dx");
        cmd.env("DX_HOME", home.join("home"))
            .env("DX_CONFIG", home.join("config.toml"))
            .env("DX_SKIP_UPDATE_CHECK", "1")
            .env_remove("DX_TARGET_PATH")
            .env_remove("DX_REGISTRY");
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        dx(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("run versioned registry packages"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        dx(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn config_path_honors_override() {
        let temp = TempDir::new().unwrap();
        dx(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        dx(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[commands.init]"));
    }

    #[test]
    fn config_init_creates_file() {
        let temp = TempDir::new().unwrap();
        dx(temp.path()).args(["config", "init"]).assert().success();
        assert!(temp.path().join("config.toml").is_file());
    }

    #[test]
    fn invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[registry\n").unwrap();
        dx(temp.path())
            .args(["config", "show"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn cache_list_empty() {
        let temp = TempDir::new().unwrap();
        dx(temp.path())
            .args(["cache", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::diff("[]\n"));
    }

    #[test]
    fn cache_list_shows_installed_entries() {
        let temp = TempDir::new().unwrap();
        let store = temp.path().join("home").join("dependencies").join("node_modules");
        std::fs::create_dir_all(store.join("_@dx-cli-dev_init@1.0.1@@dx-cli-dev").join("init")).unwrap();
        std::fs::create_dir_all(store.join("_axios@1.6.0@axios")).unwrap();

        dx(temp.path())
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff("@dx-cli-dev/init@1.0.1\naxios@1.6.0\n"));
    }

    #[test]
    fn cache_path_under_home() {
        let temp = TempDir::new().unwrap();
        dx(temp.path())
            .args(["cache", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("dependencies"));
    }

    #[test]
    fn unknown_command_fails() {
        let temp = TempDir::new().unwrap();
        dx(temp.path())
            .arg("deploy")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Unknown command: deploy"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn missing_target_path_fails() {
        let temp = TempDir::new().unwrap();
        dx(temp.path())
            .args(["--target-path"])
            .arg(temp.path().join("nowhere"))
            .arg("init")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Target path does not exist"));
    }

    #[test]
    fn target_without_entry_point_is_dispatch_failure() {
        let temp = TempDir::new().unwrap();
        let pkg = temp.path().join("pkg");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("package.json"), r#"{ "name": "local-init" }"#).unwrap();

        dx(temp.path())
            .env("DX_TARGET_PATH", &pkg)
            .arg("init")
            .assert()
            .code(70)
            .stderr(predicate::str::contains("no main field"));
    }
}
