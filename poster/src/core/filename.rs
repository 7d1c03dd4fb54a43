//! Filename parsing: image identifier -> taxon key
//!
//! Library files are named `<genus code>_<species>.<ext>`, e.g. `An_gambiae.jpg`.
//! Parsing is pure and deterministic.

use shared::{ImageId, TaxonKey};

use crate::error::{PosterError, PosterResult};

/// Length of the genus code prefix, in characters
pub const GENUS_CODE_LEN: usize = 2;

/// Strip any directory components and the file extension
pub fn base_name(identifier: &str) -> &str {
    let file_name = identifier
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(identifier);

    // A leading dot is part of the name, not an extension separator
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    }
}

/// Derive the taxon key from an image identifier
pub fn parse(identifier: &ImageId) -> PosterResult<TaxonKey> {
    let base = base_name(identifier.as_str());

    let genus_end = base
        .char_indices()
        .nth(GENUS_CODE_LEN)
        .map(|(idx, _)| idx)
        .unwrap_or(base.len());
    if base[..genus_end].chars().count() < GENUS_CODE_LEN {
        return Err(PosterError::malformed(
            identifier.as_str(),
            format!("base name '{base}' is shorter than {GENUS_CODE_LEN} characters"),
        ));
    }
    let genus_code = &base[..genus_end];

    let underscore = base.find('_').ok_or_else(|| {
        PosterError::malformed(
            identifier.as_str(),
            format!("base name '{base}' has no underscore before the species"),
        )
    })?;
    let species_slug = &base[underscore + 1..];
    if species_slug.is_empty() {
        return Err(PosterError::malformed(
            identifier.as_str(),
            format!("base name '{base}' has an empty species"),
        ));
    }

    Ok(TaxonKey::new(genus_code, species_slug))
}
