use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use derive_more::Deref;
use serde::Deserialize;

use crate::SsotError;
use crate::SsotResult;

/// Supported registry file locations in discovery order (highest precedence
/// first).
pub const REGISTRY_FILE_CANDIDATES: [&str; 4] = ["ssot.yaml", "ssot.yml", "ssot.toml", "ssot.json"];

/// Built-in comment markers keyed by file extension (without the leading dot).
const DEFAULT_MARKERS: &[(&str, &str)] = &[
	("c", "//"),
	("go", "//"),
	("h", "//"),
	("java", "//"),
	("js", "//"),
	("kt", "//"),
	("lua", "--"),
	("py", "#"),
	("rb", "#"),
	("rs", "//"),
	("sh", "#"),
	("sql", "--"),
	("swift", "//"),
	("toml", "#"),
	("ts", "//"),
	("yaml", "#"),
	("yml", "#"),
];

/// The authoritative constant values, keyed by name.
#[derive(Debug, Clone, Default, Deref, PartialEq, Eq)]
pub struct Constants(BTreeMap<String, String>);

impl Constants {
	/// Look up the rendered value of a constant.
	pub fn value(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str)
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Constants {
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		Self(
			iter.into_iter()
				.map(|(name, value)| (name.into(), value.into()))
				.collect(),
		)
	}
}

/// Maps a file extension to the literal token that starts a trailing comment
/// in that kind of file.
#[derive(Debug, Clone, Deref, PartialEq, Eq)]
pub struct CommentMarkers(BTreeMap<String, String>);

impl Default for CommentMarkers {
	fn default() -> Self {
		Self(
			DEFAULT_MARKERS
				.iter()
				.map(|(ext, marker)| ((*ext).to_string(), (*marker).to_string()))
				.collect(),
		)
	}
}

impl CommentMarkers {
	/// An empty table. Mostly useful for tests and embedders that want full
	/// control over the supported file types.
	pub fn empty() -> Self {
		Self(BTreeMap::new())
	}

	/// Add or replace the marker for `extension`. A leading `.` is ignored so
	/// both `go` and `.go` are accepted.
	pub fn insert(&mut self, extension: &str, marker: impl Into<String>) {
		self.0.insert(normalize_extension(extension), marker.into());
	}

	/// Return the comment marker for `extension`, if it is supported.
	pub fn lookup(&self, extension: &str) -> Option<&str> {
		self.0
			.get(&normalize_extension(extension))
			.map(String::as_str)
	}
}

/// Strip a leading `.` from an extension so `.go` and `go` are equivalent.
pub fn normalize_extension(extension: &str) -> String {
	extension.trim().trim_start_matches('.').to_string()
}

/// Raw registry document as deserialized from disk.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryDocument {
	#[serde(default)]
	files: Vec<PathBuf>,
	/// Values are kept exactly as written. YAML scalars such as `1.10` or
	/// `0x10` stay text; TOML and JSON values must be strings.
	#[serde(default)]
	constants: BTreeMap<String, String>,
	#[serde(default)]
	markers: BTreeMap<String, String>,
}

/// The single source of truth: which files to scan and the authoritative
/// value of every constant.
///
/// ```yaml
/// files:
///   - go.mod
///   - web/src/version.js
///   - db/migrations/0001_init.sql
///
/// constants:
///   version: "1.4.0"
///   docs_url: https://example.com/docs
///
/// markers:
///   tf: "#"
/// ```
#[derive(Debug, Clone)]
pub struct Registry {
	/// Files to scan, in the order they were listed. Relative paths are
	/// resolved against the registry's directory.
	pub files: Vec<PathBuf>,
	/// Authoritative constant values.
	pub constants: Constants,
	/// Comment markers: the built-in table extended by the registry's
	/// `markers` section.
	pub markers: CommentMarkers,
	/// The registry file this was loaded from, when loaded from disk.
	pub path: Option<PathBuf>,
}

impl Registry {
	/// Build an in-memory registry with the default comment markers.
	pub fn new(files: Vec<PathBuf>, constants: Constants) -> Self {
		Self {
			files,
			constants,
			markers: CommentMarkers::default(),
			path: None,
		}
	}

	/// Resolve the registry path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		REGISTRY_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Discover and load the registry in `root`.
	pub fn discover(root: &Path) -> SsotResult<Self> {
		let Some(path) = Self::resolve_path(root) else {
			return Err(SsotError::RegistryNotFound {
				root: root.display().to_string(),
			});
		};

		Self::load(&path)
	}

	/// Load a registry from an explicit path. The format is chosen by the
	/// file extension.
	pub fn load(path: &Path) -> SsotResult<Self> {
		let content = std::fs::read_to_string(path).map_err(|source| {
			SsotError::RegistryRead {
				path: path.display().to_string(),
				source,
			}
		})?;
		let format = path
			.extension()
			.and_then(|e| e.to_str())
			.unwrap_or("")
			.to_ascii_lowercase();

		let mut registry = Self::parse(&content, &format, &path.display().to_string())?;
		let base = path.parent().unwrap_or_else(|| Path::new(""));
		registry.files = registry
			.files
			.into_iter()
			.map(|file| {
				if file.is_absolute() {
					file
				} else {
					base.join(file)
				}
			})
			.collect();
		registry.path = Some(path.to_path_buf());

		tracing::debug!(
			registry = %path.display(),
			files = registry.files.len(),
			constants = registry.constants.len(),
			"loaded registry"
		);

		Ok(registry)
	}

	/// Parse registry content in the given format (`yaml`, `yml`, `toml` or
	/// `json`). File paths are returned exactly as written.
	pub fn parse(content: &str, format: &str, path_display: &str) -> SsotResult<Self> {
		let document: RegistryDocument = match format {
			"yaml" | "yml" => {
				serde_yaml_ng::from_str(content).map_err(|e| {
					SsotError::RegistryParse {
						path: path_display.to_string(),
						reason: e.to_string(),
					}
				})?
			}
			"toml" => {
				toml::from_str(content).map_err(|e| {
					SsotError::RegistryParse {
						path: path_display.to_string(),
						reason: e.to_string(),
					}
				})?
			}
			"json" => {
				serde_json::from_str(content).map_err(|e| {
					SsotError::RegistryParse {
						path: path_display.to_string(),
						reason: e.to_string(),
					}
				})?
			}
			other => return Err(SsotError::UnsupportedFormat(other.to_string())),
		};

		let mut markers = CommentMarkers::default();
		for (extension, marker) in document.markers {
			if marker.trim().is_empty() {
				return Err(SsotError::RegistryParse {
					path: path_display.to_string(),
					reason: format!("empty comment marker for extension `{extension}`"),
				});
			}
			markers.insert(&extension, marker);
		}

		Ok(Self {
			files: document.files,
			constants: document.constants.into_iter().collect(),
			markers,
			path: None,
		})
	}

	/// The directory relative file paths are resolved against.
	pub fn root(&self) -> Option<&Path> {
		self.path.as_deref().and_then(Path::parent)
	}
}

/// Contents written by `ssot init`.
pub const SAMPLE_REGISTRY: &str = r##"# ssot registry
#
# Every file listed under `files` must contain at least one directive:
#
#   <code> <comment marker> ssot[<constant>]: <regex>
#
# The first capture group of <regex> is replaced with the constant's value:
#
#   const Version = "1.0.0" // ssot[version]: "(\d+\.\d+\.\d+)"

files: []

constants:
  version: "1.0.0"

# Extra comment markers keyed by file extension.
# markers:
#   tf: "#"
"##;
