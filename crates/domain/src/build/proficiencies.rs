//! Fixed proficiency and language grants, and the consolidated view.

use std::collections::BTreeMap;

use super::context::{BuildSource, SourceRole};
use crate::compendium::{CompendiumRepository, ProficiencySubject};
use crate::entities::{CharacterLanguage, CharacterProficiency, Provenance};
use crate::rules::ProficiencyLevel;

/// Whether a non-choice grant applies through this source.
///
/// A class the character did not start in only grants rows flagged for
/// multiclassing, and never saving throws.
fn applies(source: &BuildSource, subject: &ProficiencySubject, multiclass: bool) -> bool {
    match source.role {
        SourceRole::Class { primary: false } => {
            multiclass && !matches!(subject, ProficiencySubject::SavingThrow(_))
        }
        SourceRole::Subclass { primary: false } => {
            !matches!(subject, ProficiencySubject::SavingThrow(_))
        }
        _ => true,
    }
}

/// Every fixed proficiency reachable from the sources.
pub fn fixed_proficiencies(
    repo: &dyn CompendiumRepository,
    sources: &[BuildSource],
) -> Vec<CharacterProficiency> {
    let mut rows: Vec<CharacterProficiency> = Vec::new();
    for source in sources {
        let source_ref = source.entity_ref();
        for grant in repo.proficiency_grants(source.entity.target()) {
            if !grant.grants || grant.is_choice || !grant.active_at(source.level) {
                continue;
            }
            let Some(subject) = grant.subject else {
                continue;
            };
            if !applies(source, &subject, grant.multiclass) {
                continue;
            }
            let duplicate = rows
                .iter()
                .any(|r| r.subject.matches(&subject) && r.provenance.source.refers_to(&source_ref));
            if !duplicate {
                rows.push(CharacterProficiency {
                    subject,
                    expertise: false,
                    provenance: Provenance::fixed(source_ref.clone()),
                });
            }
        }
    }
    rows
}

/// Fixed languages, one row per language (first source wins).
pub fn fixed_languages(
    repo: &dyn CompendiumRepository,
    sources: &[BuildSource],
) -> Vec<CharacterLanguage> {
    let mut rows: Vec<CharacterLanguage> = Vec::new();
    for source in sources {
        for grant in repo.language_grants(source.entity.target()) {
            if rows.iter().any(|r| r.language.loosely_matches(&grant.language)) {
                continue;
            }
            rows.push(CharacterLanguage {
                language: grant.language,
                provenance: Provenance::fixed(source.entity_ref()),
            });
        }
    }
    rows
}

/// One entry per subject at the highest level any row grants.
pub fn consolidate(rows: &[CharacterProficiency]) -> BTreeMap<ProficiencySubject, ProficiencyLevel> {
    let mut levels: BTreeMap<ProficiencySubject, ProficiencyLevel> = BTreeMap::new();
    for row in rows {
        let level = if row.expertise {
            ProficiencyLevel::Expert
        } else {
            ProficiencyLevel::Proficient
        };
        let key = levels
            .keys()
            .find(|k| k.matches(&row.subject))
            .cloned()
            .unwrap_or_else(|| row.subject.clone());
        let entry = levels.entry(key).or_insert(level);
        *entry = (*entry).max(level);
    }
    levels
}
