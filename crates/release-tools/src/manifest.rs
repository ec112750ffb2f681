//! Version-declaration files.
//!
//! Reads and rewrites the `version` field of the manifest that declares the
//! package version. `package.json` documents are handled with `serde_json`
//! (key order preserved), `Cargo.toml` documents with `toml_edit` so comments
//! and formatting survive the bump.
use log::*;
use semver::Version;
use serde_json::{Value, json};
use std::{fs, path::Path};
use toml_edit::DocumentMut;

use crate::error::{ReleaseToolsError, Result};

/// Supported manifest formats, picked from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    PackageJson,
    CargoToml,
}

impl ManifestKind {
    pub fn detect(file: &str) -> Result<Self> {
        let name = Path::new(file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        match name {
            "package.json" => Ok(Self::PackageJson),
            "Cargo.toml" => Ok(Self::CargoToml),
            _ => Err(ReleaseToolsError::UnsupportedVersionFile(file.into())),
        }
    }
}

/// Read the version declared in `file`, relative to `cwd`.
pub fn read_version(cwd: &Path, file: &str) -> Result<Option<Version>> {
    let kind = ManifestKind::detect(file)?;
    let path = cwd.join(file);

    if !path.exists() {
        debug!("no version file found at {}", path.display());
        return Ok(None);
    }

    let content = fs::read_to_string(&path)?;

    let raw = match kind {
        ManifestKind::PackageJson => {
            let doc: Value = serde_json::from_str(&content)?;
            doc.get("version")
                .and_then(|v| v.as_str())
                .map(|v| v.to_string())
        }
        ManifestKind::CargoToml => {
            let doc = content.parse::<DocumentMut>()?;
            cargo_version_item(&doc)
        }
    };

    raw.map(|v| Version::parse(&v))
        .transpose()
        .map_err(ReleaseToolsError::from)
}

/// Write `version` into the version field of `file`, relative to `cwd`.
pub fn update_versions(cwd: &Path, file: &str, version: &Version) -> Result<()> {
    let kind = ManifestKind::detect(file)?;
    let path = cwd.join(file);
    let content = fs::read_to_string(&path)?;

    info!("setting version {version} in {file}");

    let updated = match kind {
        ManifestKind::PackageJson => update_package_json(&content, file, version)?,
        ManifestKind::CargoToml => update_cargo_toml(&content, file, version)?,
    };

    fs::write(&path, updated)?;

    Ok(())
}

fn update_package_json(
    content: &str,
    file: &str,
    version: &Version,
) -> Result<String> {
    let mut doc: Value = serde_json::from_str(content)?;

    let Some(field) = doc
        .as_object_mut()
        .and_then(|map| map.get_mut("version"))
    else {
        return Err(ReleaseToolsError::VersionNotFound(file.into()));
    };

    *field = json!(version.to_string());
    let formatted = serde_json::to_string_pretty(&doc)?;
    Ok(format!("{formatted}\n"))
}

fn update_cargo_toml(
    content: &str,
    file: &str,
    version: &Version,
) -> Result<String> {
    let mut doc = content.parse::<DocumentMut>()?;
    let value = toml_edit::value(version.to_string());

    if doc.get("package").and_then(|p| p.get("version")).is_some() {
        doc["package"]["version"] = value;
    } else if doc
        .get("workspace")
        .and_then(|w| w.get("package"))
        .and_then(|p| p.get("version"))
        .is_some()
    {
        doc["workspace"]["package"]["version"] = value;
    } else {
        return Err(ReleaseToolsError::VersionNotFound(file.into()));
    }

    Ok(doc.to_string())
}

fn cargo_version_item(doc: &DocumentMut) -> Option<String> {
    doc.get("package")
        .and_then(|p| p.get("version"))
        .or_else(|| {
            doc.get("workspace")
                .and_then(|w| w.get("package"))
                .and_then(|p| p.get("version"))
        })
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn detects_manifest_kind() {
        assert_eq!(
            ManifestKind::detect("package.json").unwrap(),
            ManifestKind::PackageJson
        );
        assert_eq!(
            ManifestKind::detect("crates/foo/Cargo.toml").unwrap(),
            ManifestKind::CargoToml
        );
        assert!(matches!(
            ManifestKind::detect("setup.py"),
            Err(ReleaseToolsError::UnsupportedVersionFile(_))
        ));
    }

    #[test]
    fn updates_package_json_keeping_key_order() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("package.json"),
            r#"{"name":"widgets","version":"3.3.0","private":true}"#,
        )
        .unwrap();

        update_versions(tmp.path(), "package.json", &Version::new(3, 4, 0))
            .unwrap();

        let content =
            fs::read_to_string(tmp.path().join("package.json")).unwrap();
        assert_eq!(
            content,
            "{\n  \"name\": \"widgets\",\n  \"version\": \"3.4.0\",\n  \"private\": true\n}\n"
        );
        assert_eq!(
            read_version(tmp.path(), "package.json").unwrap(),
            Some(Version::new(3, 4, 0))
        );
    }

    #[test]
    fn updates_cargo_toml_preserving_comments() {
        let tmp = TempDir::new().unwrap();
        let original = r#"[package]
# the crate
name = "widgets"
version = "0.1.0"
"#;
        fs::write(tmp.path().join("Cargo.toml"), original).unwrap();

        update_versions(tmp.path(), "Cargo.toml", &Version::new(0, 2, 0))
            .unwrap();

        let content = fs::read_to_string(tmp.path().join("Cargo.toml")).unwrap();
        assert!(content.contains("# the crate"));
        assert!(content.contains(r#"version = "0.2.0""#));
    }

    #[test]
    fn updates_workspace_package_version() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("Cargo.toml"),
            "[workspace.package]\nversion = \"1.0.0\"\n",
        )
        .unwrap();

        update_versions(tmp.path(), "Cargo.toml", &Version::new(1, 1, 0))
            .unwrap();

        assert_eq!(
            read_version(tmp.path(), "Cargo.toml").unwrap(),
            Some(Version::new(1, 1, 0))
        );
    }

    #[test]
    fn errors_when_cargo_toml_declares_no_version() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("Cargo.toml"), "[workspace]\n").unwrap();

        let result =
            update_versions(tmp.path(), "Cargo.toml", &Version::new(1, 0, 0));

        assert!(matches!(result, Err(ReleaseToolsError::VersionNotFound(_))));
    }

    #[test]
    fn errors_when_package_json_declares_no_version() {
        let tmp = TempDir::new().unwrap();

        for content in [r#"{"name":"widgets"}"#, "[]", "\"1.0.0\""] {
            fs::write(tmp.path().join("package.json"), content).unwrap();

            let result =
                update_versions(tmp.path(), "package.json", &Version::new(1, 0, 0));

            assert!(
                matches!(result, Err(ReleaseToolsError::VersionNotFound(_))),
                "{content}"
            );
            assert_eq!(
                fs::read_to_string(tmp.path().join("package.json")).unwrap(),
                content
            );
        }
    }

    #[test]
    fn missing_manifest_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(read_version(tmp.path(), "package.json").unwrap(), None);
    }
}
