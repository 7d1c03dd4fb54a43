//! Bilingual caption composition

use shared::Language;

use crate::types::TaxonRecord;

/// Status length limit of the target network
pub const MAX_STATUS_CHARS: usize = 500;

/// Text and alt text for one language variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub text: String,
    pub alt_text: String,
}

struct Template {
    blurb: &'static str,
    hashtags: &'static str,
    alt_prefix: &'static str,
}

fn template(language: Language) -> Template {
    match language {
        Language::English => Template {
            blurb: "A plate from our collection of mosquito illustrations.",
            hashtags: "#Entomology #Mosquitoes #SciArt",
            alt_prefix: "Scientific illustration of the mosquito",
        },
        Language::French => Template {
            blurb: "Une planche de notre collection d'illustrations de moustiques.",
            hashtags: "#Entomologie #Moustiques #SciArt",
            alt_prefix: "Illustration scientifique du moustique",
        },
    }
}

fn join_sections(sections: &[&str]) -> String {
    sections
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Compose the status text and alt text for a taxon
///
/// The canonical name and reference URL are never shortened: the hashtag line is
/// dropped first, then the blurb, if the text would exceed [`MAX_STATUS_CHARS`].
pub fn compose(record: &TaxonRecord, language: Language) -> Caption {
    let tpl = template(language);
    let name = record.canonical_name.trim();
    let url = record.url.trim();

    let candidates = [
        join_sections(&[name, tpl.blurb, url, tpl.hashtags]),
        join_sections(&[name, tpl.blurb, url]),
        join_sections(&[name, url]),
    ];
    let last = candidates.len() - 1;
    let text = candidates
        .iter()
        .position(|c| c.chars().count() <= MAX_STATUS_CHARS)
        .map(|i| candidates[i].clone())
        .unwrap_or_else(|| candidates[last].clone());

    Caption {
        text,
        alt_text: format!("{} {}.", tpl.alt_prefix, name),
    }
}
