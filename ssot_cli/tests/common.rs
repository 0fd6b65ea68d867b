#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;

pub const REGISTRY: &str = r#"files:
  - version.go
  - db/limit.sql
constants:
  version: "2.0.0"
  limit: 100
"#;

pub const STALE_GO: &str = "const Version = \"1.2.3\" // ssot[version]: \"(\\d+\\.\\d+\\.\\d+)\"\n";
pub const CURRENT_GO: &str = "const Version = \"2.0.0\" // ssot[version]: \"(\\d+\\.\\d+\\.\\d+)\"\n";
pub const STALE_SQL: &str = "SELECT * FROM jobs LIMIT 10; -- ssot[limit]: LIMIT (\\d+)\n";
pub const CURRENT_SQL: &str = "SELECT * FROM jobs LIMIT 100; -- ssot[limit]: LIMIT (\\d+)\n";

pub fn ssot_cmd() -> Command {
	let mut cmd = Command::cargo_bin("ssot").unwrap_or_else(|e| panic!("ssot binary: {e}"));
	cmd.env("NO_COLOR", "1").env_remove("SSOT_LOG");
	cmd
}

/// Write the registry plus one Go and one SQL file into `root`.
pub fn write_project(root: &Path, go: &str, sql: &str) -> std::io::Result<()> {
	std::fs::create_dir_all(root.join("db"))?;
	std::fs::write(root.join("ssot.yaml"), REGISTRY)?;
	std::fs::write(root.join("version.go"), go)?;
	std::fs::write(root.join("db/limit.sql"), sql)?;
	Ok(())
}
