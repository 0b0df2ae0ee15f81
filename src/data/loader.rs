use std::path::Path;

use anyhow::{bail, Context, Result};

use super::format::Format;
use crate::engine::FilterEngine;

// ---------------------------------------------------------------------------
// Format resolution
// ---------------------------------------------------------------------------

/// Decide which format a path is read or written as.
///
/// * A declared format must agree with a recognised extension.
/// * Without a declared format the extension decides.
/// * A path with an unrecognised extension needs a declared format.
pub fn resolve_format(path: &Path, declared: Option<Format>) -> Result<Format> {
    let implied = Format::from_path(path);
    match (declared, implied) {
        (Some(d), Some(i)) if d != i => bail!(
            "{} has a {i} extension but {d} was selected",
            path.display()
        ),
        (Some(d), _) => Ok(d),
        (None, Some(i)) => Ok(i),
        (None, None) => bail!(
            "cannot tell the format of {}; use a .csv, .json or .parquet extension",
            path.display()
        ),
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read `path` and load it into `engine`.
pub fn load_file(engine: &mut FilterEngine, path: &Path, declared: Option<Format>) -> Result<Format> {
    let format = resolve_format(path, declared)?;
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    engine
        .load(&bytes, format)
        .with_context(|| format!("loading {} as {format}", path.display()))?;
    Ok(format)
}

/// Encode the engine's filtered result and write it to `path`.
///
/// Nothing is written unless encoding succeeds.
pub fn save_file(engine: &FilterEngine, path: &Path, declared: Option<Format>) -> Result<Format> {
    let format = resolve_format(path, declared)?;
    let bytes = engine.save(format)?;
    std::fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_decides_when_undeclared() {
        assert_eq!(resolve_format(Path::new("x.parquet"), None).unwrap(), Format::Columnar);
    }

    #[test]
    fn test_mismatch_rejected() {
        let err = resolve_format(Path::new("x.json"), Some(Format::Csv)).unwrap_err();
        assert!(err.to_string().contains("JSON extension"));
    }

    #[test]
    fn test_declared_format_for_unknown_extension() {
        assert_eq!(
            resolve_format(Path::new("export.dat"), Some(Format::Csv)).unwrap(),
            Format::Csv
        );
        assert!(resolve_format(Path::new("export.dat"), None).is_err());
    }
}
