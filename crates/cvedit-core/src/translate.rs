//! Heading translation between French and English
//!
//! Only fixed labels are translated: section and sidebar titles, contact
//! labels and skill labels. Free text is never touched.

use std::fmt;
use std::str::FromStr;

use crate::document::ContentTree;

/// Roles whose text is a translatable label
const TRANSLATABLE_ROLES: [&str; 4] = ["section-title", "sidebar-title", "contact-label", "skill-label"];

/// (French, English) pairs
const DICTIONARY: [(&str, &str); 14] = [
    ("À propos", "About"),
    ("Expérience Professionnelle", "Professional Experience"),
    ("Formation", "Education"),
    ("Contact", "Contact"),
    ("Expertise", "Expertise"),
    ("Technologies", "Technologies"),
    ("Langues", "Languages"),
    ("Localisation", "Location"),
    ("Téléphone", "Phone"),
    ("Email", "Email"),
    ("Frontend", "Frontend"),
    ("Backend", "Backend"),
    ("Mobile", "Mobile"),
    ("Nouveau", "New"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    French,
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::French => "fr",
            Language::English => "en",
        }
    }

    /// Translate one label into this language
    ///
    /// Identical pairs ("Contact") never count as a translation.
    pub fn translate(&self, text: &str) -> Option<&'static str> {
        DICTIONARY.iter().find_map(|(fr, en)| {
            let (from, to) = match self {
                Language::English => (fr, en),
                Language::French => (en, fr),
            };
            (*from == text && from != to).then_some(*to)
        })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fr" | "french" | "français" => Ok(Language::French),
            "en" | "english" | "anglais" => Ok(Language::English),
            other => Err(format!("unsupported language '{other}' (expected fr or en)")),
        }
    }
}

/// Number of labels [`apply`] would change
pub fn count(tree: &ContentTree, target: Language) -> usize {
    tree.iter()
        .filter(|block| TRANSLATABLE_ROLES.contains(&block.role.as_str()))
        .filter(|block| target.translate(block.text.trim()).is_some())
        .count()
}

/// Translate every label in place, returning how many changed
pub fn apply(tree: &mut ContentTree, target: Language) -> usize {
    let ids: Vec<_> = tree
        .iter()
        .filter(|block| TRANSLATABLE_ROLES.contains(&block.role.as_str()))
        .map(|block| block.id.clone())
        .collect();

    let mut changed = 0;
    for id in ids {
        if let Some(block) = tree.find_mut(&id) {
            if let Some(translated) = target.translate(block.text.trim()) {
                block.text = translated.to_string();
                changed += 1;
            }
        }
    }
    changed
}
