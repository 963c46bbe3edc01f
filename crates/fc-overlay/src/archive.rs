//! Locating the shapefile members inside a result archive.

use std::io::{Cursor, Read};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::{OverlayError, OverlayResult};

/// Raw member bytes for one shapefile. `shx` is optional since records can
/// be walked sequentially without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapefileBundle {
    pub stem: String,
    pub shp: Vec<u8>,
    pub shx: Option<Vec<u8>>,
    pub dbf: Vec<u8>,
}

struct Member {
    index: usize,
    stem: String,
    suffix: String,
}

/// Pull the first `.shp` and its companion `.shx`/`.dbf` out of a zip.
/// Suffixes match case-insensitively; companions sharing the `.shp` stem
/// win over other members with the same suffix.
pub fn extract_bundle(bytes: &[u8]) -> OverlayResult<ShapefileBundle> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let mut members = Vec::new();
    for index in 0..zip.len() {
        let entry = zip.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().replace('\\', "/");
        if name.starts_with("__MACOSX/") || name.contains("/__MACOSX/") {
            continue;
        }
        let Some((stem, suffix)) = name.rsplit_once('.') else {
            continue;
        };
        members.push(Member {
            index,
            stem: stem.to_string(),
            suffix: suffix.to_ascii_lowercase(),
        });
    }
    debug!(members = members.len(), "scanned result archive");

    let shp = members
        .iter()
        .find(|m| m.suffix == "shp")
        .ok_or(OverlayError::MissingMember { suffix: ".shp" })?;
    let stem = shp.stem.clone();
    let pick = |suffix: &str| {
        members
            .iter()
            .find(|m| m.suffix == suffix && m.stem.eq_ignore_ascii_case(&stem))
            .or_else(|| members.iter().find(|m| m.suffix == suffix))
            .map(|m| m.index)
    };
    let dbf_index = pick("dbf").ok_or(OverlayError::MissingMember { suffix: ".dbf" })?;
    let shx_index = pick("shx");
    if shx_index.is_none() {
        warn!(stem = %stem, "archive has no .shx index; reading records sequentially");
    }
    let shp_index = shp.index;

    let shp = read_member(&mut zip, shp_index)?;
    let dbf = read_member(&mut zip, dbf_index)?;
    let shx = shx_index
        .map(|i| read_member(&mut zip, i))
        .transpose()?;
    let stem = stem.rsplit('/').next().unwrap_or(&stem).to_string();
    Ok(ShapefileBundle {
        stem,
        shp,
        shx,
        dbf,
    })
}

fn read_member(zip: &mut ZipArchive<Cursor<&[u8]>>, index: usize) -> OverlayResult<Vec<u8>> {
    let mut entry = zip.by_index(index)?;
    let mut out = Vec::new();
    entry.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{ShapefileFixture, zip_members};

    #[test]
    fn finds_members_by_suffix() {
        let fixture = ShapefileFixture::sample_districts();
        let zip = fixture.to_zip("districts");
        let bundle = extract_bundle(&zip).unwrap();
        assert_eq!(bundle.stem, "districts");
        assert_eq!(bundle.shp, fixture.shp_bytes());
        assert_eq!(bundle.dbf, fixture.dbf_bytes());
        assert_eq!(bundle.shx, Some(fixture.shx_bytes()));
    }

    #[test]
    fn suffix_match_ignores_case_and_prefers_same_stem() {
        let fixture = ShapefileFixture::sample_districts();
        let zip = zip_members(&[
            ("other.dbf", b"not this one".to_vec()),
            ("out/RESULT.SHP", fixture.shp_bytes()),
            ("out/result.Dbf", fixture.dbf_bytes()),
        ]);
        let bundle = extract_bundle(&zip).unwrap();
        assert_eq!(bundle.stem, "RESULT");
        assert_eq!(bundle.dbf, fixture.dbf_bytes());
        assert_eq!(bundle.shx, None);
    }

    #[test]
    fn skips_macos_metadata() {
        let fixture = ShapefileFixture::sample_districts();
        let zip = zip_members(&[
            ("__MACOSX/._a.shp", b"junk".to_vec()),
            ("a.shp", fixture.shp_bytes()),
            ("a.dbf", fixture.dbf_bytes()),
        ]);
        assert_eq!(extract_bundle(&zip).unwrap().shp, fixture.shp_bytes());
    }

    #[test]
    fn missing_members_are_reported() {
        let zip = zip_members(&[("readme.txt", b"hi".to_vec())]);
        assert!(matches!(
            extract_bundle(&zip),
            Err(OverlayError::MissingMember { suffix: ".shp" })
        ));
        let fixture = ShapefileFixture::sample_districts();
        let zip = zip_members(&[("a.shp", fixture.shp_bytes())]);
        assert!(matches!(
            extract_bundle(&zip),
            Err(OverlayError::MissingMember { suffix: ".dbf" })
        ));
    }

    #[test]
    fn garbage_is_an_archive_error() {
        assert!(matches!(
            extract_bundle(b"definitely not a zip"),
            Err(OverlayError::Archive(_))
        ));
    }
}
