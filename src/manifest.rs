use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};

use crate::schema::Manifest;

pub fn load_and_validate_manifest(path: &Path) -> Result<Manifest> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let mut manifest: Manifest = serde_yaml::from_str(&contents).map_err(|error| {
        let location = error
            .location()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        anyhow!(
            "failed to parse yaml in {} at {}: {}",
            path.display(),
            location,
            error
        )
    })?;

    validate_manifest(&mut manifest, path)?;
    Ok(manifest)
}

fn validate_manifest(manifest: &mut Manifest, manifest_path: &Path) -> Result<()> {
    manifest.validate()?;

    let manifest_dir = manifest_path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    if let Some(dir) = manifest.assets.dir.take() {
        manifest.assets.dir = Some(resolve_asset_dir(&manifest_dir, &dir)?);
    }

    Ok(())
}

fn resolve_asset_dir(manifest_dir: &Path, dir: &Path) -> Result<PathBuf> {
    let resolved = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        manifest_dir.join(dir)
    };

    if !resolved.exists() {
        bail!("assets.dir does not exist: {}", resolved.display());
    }
    if !resolved.is_dir() {
        bail!("assets.dir is not a directory: {}", resolved.display());
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_asset_dir_resolves_against_manifest() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("art")).expect("art dir");
        let path = temp.path().join("intro.yaml");
        fs::write(&path, "assets: { dir: art }\n").expect("manifest");

        let manifest = load_and_validate_manifest(&path).expect("manifest loads");
        assert_eq!(manifest.assets.dir, Some(temp.path().join("art")));
    }

    #[test]
    fn missing_asset_dir_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("intro.yaml");
        fs::write(&path, "assets: { dir: nowhere }\n").expect("manifest");

        let error = load_and_validate_manifest(&path).expect_err("missing dir");
        assert!(error.to_string().contains("does not exist"));
    }

    #[test]
    fn parse_errors_carry_a_location() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("intro.yaml");
        fs::write(&path, "seed: [1, 2\n").expect("manifest");

        let error = load_and_validate_manifest(&path).expect_err("bad yaml");
        assert!(error.to_string().contains("line"));
    }
}
