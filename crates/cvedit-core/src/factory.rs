//! Templates for new blocks
//!
//! A [`BlockFactory`] builds a fresh subtree for a template; the editor
//! only decides where it goes and inserts it. The built-in
//! [`ResumeBlockFactory`] produces the French placeholder blocks of the
//! default résumé with collision-free ids.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::document::{Block, BlockId, BlockKind, ContentTree};

/// Kinds of block a user can add
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Experience,
    Achievement,
    Project,
    Education,
    Contact,
    Expertise,
    Technology,
    Language,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 8] = [
        TemplateKind::Experience,
        TemplateKind::Achievement,
        TemplateKind::Project,
        TemplateKind::Education,
        TemplateKind::Contact,
        TemplateKind::Expertise,
        TemplateKind::Technology,
        TemplateKind::Language,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TemplateKind::Experience => "experience",
            TemplateKind::Achievement => "achievement",
            TemplateKind::Project => "project",
            TemplateKind::Education => "education",
            TemplateKind::Contact => "contact",
            TemplateKind::Expertise => "expertise",
            TemplateKind::Technology => "technology",
            TemplateKind::Language => "language",
        }
    }

    /// Human-readable label for notifications
    pub fn label(&self) -> &'static str {
        match self {
            TemplateKind::Experience => "Experience",
            TemplateKind::Achievement => "Achievement",
            TemplateKind::Project => "Project",
            TemplateKind::Education => "Education",
            TemplateKind::Contact => "Contact",
            TemplateKind::Expertise => "Skill",
            TemplateKind::Technology => "Technology",
            TemplateKind::Language => "Language",
        }
    }

    /// Role of the section that receives blocks of this kind
    fn container_role(&self) -> &'static str {
        match self {
            TemplateKind::Experience => "experience",
            TemplateKind::Achievement => "achievements",
            TemplateKind::Project => "projects",
            TemplateKind::Education => "education",
            TemplateKind::Contact => "contact",
            TemplateKind::Expertise => "expertise-list",
            TemplateKind::Technology => "technologies",
            TemplateKind::Language => "languages",
        }
    }

    /// Whether the container lives inside an experience entry
    fn nested_in_experience(&self) -> bool {
        matches!(self, TemplateKind::Achievement | TemplateKind::Project)
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let s = match s.as_str() {
            "tech" => "technology",
            "skill" => "expertise",
            other => other,
        };
        TemplateKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown block type '{s}'"))
    }
}

/// Where a new block is going
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentContext {
    pub parent: BlockId,
    /// Number of children the parent already has
    pub existing_children: usize,
}

impl ParentContext {
    pub fn new(tree: &ContentTree, parent: &BlockId) -> Option<Self> {
        let block = tree.find(parent)?;
        Some(Self {
            parent: parent.clone(),
            existing_children: block.children.len(),
        })
    }
}

/// Builds new block subtrees on demand
pub trait BlockFactory {
    fn create_block(&self, kind: TemplateKind, parent: &ParentContext) -> Block;
}

/// The built-in résumé templates
#[derive(Debug, Clone, Copy, Default)]
pub struct ResumeBlockFactory;

impl ResumeBlockFactory {
    fn fresh_id(prefix: &str) -> String {
        let uuid = Uuid::new_v4().simple().to_string();
        format!("{prefix}-{}", &uuid[..8])
    }
}

impl BlockFactory for ResumeBlockFactory {
    fn create_block(&self, kind: TemplateKind, _parent: &ParentContext) -> Block {
        let id = Self::fresh_id(kind.name());
        match kind {
            TemplateKind::Experience => Block::entry(
                id.as_str(),
                "experience",
                vec![
                    Block::field(format!("{id}-period"), "experience-period", "Période"),
                    Block::field(format!("{id}-title"), "job-title", "Titre du poste"),
                    Block::field(format!("{id}-company"), "company", "Entreprise, Ville"),
                    Block::section(
                        format!("{id}-achievements"),
                        "achievements",
                        vec![Block::field(
                            format!("{id}-achievement-1"),
                            "achievement",
                            "Réalisation 1",
                        )],
                    ),
                    Block::section(
                        format!("{id}-projects"),
                        "projects",
                        vec![Block::field(
                            format!("{id}-project-1"),
                            "project",
                            "Nom du projet: Description du projet",
                        )],
                    ),
                ],
            ),
            TemplateKind::Achievement => Block::field(id, "achievement", "Nouvelle réalisation"),
            TemplateKind::Project => Block::field(id, "project", "Nom du projet: Description"),
            TemplateKind::Education => Block::entry(
                id.as_str(),
                "education",
                vec![
                    Block::field(format!("{id}-year"), "education-year", "Année"),
                    Block::field(format!("{id}-degree"), "degree", "Diplôme"),
                    Block::field(format!("{id}-school"), "school", "Établissement"),
                ],
            ),
            TemplateKind::Contact => Block::entry(
                id.as_str(),
                "contact-item",
                vec![
                    Block::field(format!("{id}-label"), "contact-label", "Nouveau"),
                    Block::field(format!("{id}-value"), "contact-value", "Valeur"),
                ],
            ),
            TemplateKind::Expertise => Block::field(id, "expertise-item", "Nouvelle compétence"),
            TemplateKind::Technology => Block::entry(
                id.as_str(),
                "skills-category",
                vec![
                    Block::field(format!("{id}-label"), "skill-label", "Catégorie"),
                    Block::field(format!("{id}-value"), "skill-value", "Technologies"),
                ],
            ),
            TemplateKind::Language => {
                let dots = (1..=5)
                    .map(|n| Block::marker(format!("{id}-dot-{n}"), "dot", false))
                    .collect();
                Block::entry(
                    id.as_str(),
                    "language",
                    vec![
                        Block::field(format!("{id}-name"), "language-name", "Langue"),
                        Block::section(format!("{id}-dots"), "lang-dots", dots),
                    ],
                )
            }
        }
    }
}

/// Find the section a new block of `kind` belongs in
///
/// Achievements and projects go into the experience entry enclosing
/// `anchor`, or the first experience when there is no anchor.
pub fn default_parent(
    tree: &ContentTree,
    kind: TemplateKind,
    anchor: Option<&BlockId>,
) -> Option<BlockId> {
    let role = kind.container_role();
    if !kind.nested_in_experience() {
        return section_with_role(tree.iter(), role);
    }

    let experience = match anchor {
        Some(anchor) => tree.enclosing(anchor, is_experience_entry)?,
        None => tree.iter().find(|block| is_experience_entry(block))?,
    };
    let mut candidates = Vec::new();
    experience.walk(&mut |block, _| candidates.push(block));
    section_with_role(candidates.into_iter(), role)
}

fn is_experience_entry(block: &Block) -> bool {
    block.kind == BlockKind::Entry && block.role == "experience"
}

fn section_with_role<'a>(
    mut blocks: impl Iterator<Item = &'a Block>,
    role: &str,
) -> Option<BlockId> {
    blocks
        .find(|block| block.kind == BlockKind::Section && block.role == role)
        .map(|block| block.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> BlockId {
        BlockId::new(s)
    }

    fn context(tree: &ContentTree, parent: &str) -> ParentContext {
        ParentContext::new(tree, &id(parent)).unwrap()
    }

    #[test]
    fn test_template_kind_from_str() {
        assert_eq!("experience".parse::<TemplateKind>(), Ok(TemplateKind::Experience));
        assert_eq!("Tech".parse::<TemplateKind>(), Ok(TemplateKind::Technology));
        assert_eq!("skill".parse::<TemplateKind>(), Ok(TemplateKind::Expertise));
        assert!("hobby".parse::<TemplateKind>().is_err());
    }

    #[test]
    fn test_experience_template() {
        let tree = ContentTree::default_resume();
        let block = ResumeBlockFactory.create_block(TemplateKind::Experience, &context(&tree, "experience"));

        assert!(block.is_draggable());
        assert!(block.id.as_str().starts_with("experience-"));
        let title = block
            .children
            .iter()
            .find(|child| child.role == "job-title")
            .unwrap();
        assert_eq!(title.text, "Titre du poste");
        assert!(tree.check_insertable(&block).is_ok());
    }

    #[test]
    fn test_language_template_has_five_empty_dots() {
        let tree = ContentTree::default_resume();
        let block = ResumeBlockFactory.create_block(TemplateKind::Language, &context(&tree, "languages"));

        let dots: Vec<&Block> = tree_of(&block)
            .into_iter()
            .filter(|b| b.role == "dot")
            .collect();
        assert_eq!(dots.len(), 5);
        assert!(dots.iter().all(|dot| !dot.filled));
    }

    fn tree_of(block: &Block) -> Vec<&Block> {
        let mut out = Vec::new();
        block.walk(&mut |b, _| out.push(b));
        out
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let tree = ContentTree::default_resume();
        let ctx = context(&tree, "expertise-list");
        let a = ResumeBlockFactory.create_block(TemplateKind::Expertise, &ctx);
        let b = ResumeBlockFactory.create_block(TemplateKind::Expertise, &ctx);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_default_parent_top_level_sections() {
        let tree = ContentTree::default_resume();
        assert_eq!(default_parent(&tree, TemplateKind::Experience, None), Some(id("experience")));
        assert_eq!(default_parent(&tree, TemplateKind::Education, None), Some(id("education")));
        assert_eq!(default_parent(&tree, TemplateKind::Contact, None), Some(id("contact")));
        assert_eq!(default_parent(&tree, TemplateKind::Expertise, None), Some(id("expertise-list")));
        assert_eq!(default_parent(&tree, TemplateKind::Technology, None), Some(id("technologies")));
        assert_eq!(default_parent(&tree, TemplateKind::Language, None), Some(id("languages")));
    }

    #[test]
    fn test_default_parent_uses_enclosing_experience() {
        let tree = ContentTree::default_resume();

        let anchor = id("experience-2-company");
        assert_eq!(
            default_parent(&tree, TemplateKind::Achievement, Some(&anchor)),
            Some(id("experience-2-achievements"))
        );
        assert_eq!(
            default_parent(&tree, TemplateKind::Project, Some(&anchor)),
            Some(id("experience-2-projects"))
        );
        assert_eq!(
            default_parent(&tree, TemplateKind::Project, None),
            Some(id("experience-1-projects"))
        );
        assert_eq!(
            default_parent(&tree, TemplateKind::Achievement, Some(&id("name"))),
            None
        );
    }
}
