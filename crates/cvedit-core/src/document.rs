//! Structured résumé document
//!
//! The document is an ordered forest of [`Block`]s: sections contain entries
//! and fields, entries contain fields and nested sections, and decorative
//! markers (the language level dots) sit at the leaves next to fields.
//!
//! Block ids are stable and must be unique across the whole tree. Every
//! structural operation checks that invariant instead of assuming it.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EditError;

/// Stable identifier of a block
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// What a block is structurally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// A container: column, section, list
    Section,
    /// A repeatable item inside a section (an experience, a contact line)
    Entry,
    /// An editable leaf holding text
    Field,
    /// A non-textual leaf, such as a language level dot
    Marker,
}

/// A node of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Semantic role used by templates and lookups ("job-title", "experience", ...)
    pub role: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Free-text field: multi-line input, empty value allowed
    #[serde(default, skip_serializing_if = "is_false")]
    pub multiline: bool,
    /// Marker state (filled language dot)
    #[serde(default, skip_serializing_if = "is_false")]
    pub filled: bool,
    /// Set while an inline editor is open on this block
    #[serde(default, skip_serializing_if = "is_false")]
    pub editing: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Block {
    fn with_kind(kind: BlockKind, id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: BlockId::new(id),
            kind,
            role: role.into(),
            text: String::new(),
            multiline: false,
            filled: false,
            editing: false,
            children: Vec::new(),
        }
    }

    /// Create a section holding the given children
    pub fn section(id: impl Into<String>, role: impl Into<String>, children: Vec<Block>) -> Self {
        Self {
            children,
            ..Self::with_kind(BlockKind::Section, id, role)
        }
    }

    /// Create an entry holding the given children
    pub fn entry(id: impl Into<String>, role: impl Into<String>, children: Vec<Block>) -> Self {
        Self {
            children,
            ..Self::with_kind(BlockKind::Entry, id, role)
        }
    }

    /// Create a single-line required field
    pub fn field(id: impl Into<String>, role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::with_kind(BlockKind::Field, id, role)
        }
    }

    /// Create a multi-line free-text field
    pub fn free_text(
        id: impl Into<String>,
        role: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            multiline: true,
            ..Self::field(id, role, text)
        }
    }

    /// Create a decorative marker
    pub fn marker(id: impl Into<String>, role: impl Into<String>, filled: bool) -> Self {
        Self {
            filled,
            ..Self::with_kind(BlockKind::Marker, id, role)
        }
    }

    pub fn is_editable(&self) -> bool {
        self.kind == BlockKind::Field
    }

    pub fn is_draggable(&self) -> bool {
        self.kind == BlockKind::Entry
    }

    /// Whether `id` is this block or one of its descendants
    pub fn contains(&self, id: &BlockId) -> bool {
        self.id == *id || self.children.iter().any(|child| child.contains(id))
    }

    /// Depth-first, pre-order walk over this block and its descendants
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Block, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a Block, usize)) {
        visit(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, visit);
        }
    }

    fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Block)) {
        visit(self);
        for child in &mut self.children {
            child.walk_mut(visit);
        }
    }
}

/// Position of a block inside its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// `None` for top-level blocks
    pub parent: Option<BlockId>,
    pub index: usize,
}

/// Which side of the target a moved block lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropSide {
    Before,
    After,
}

impl DropSide {
    /// Upper half of the target box inserts before, lower half after
    pub fn from_offset(offset_y: f32, height: f32) -> Self {
        if offset_y < height / 2.0 {
            DropSide::Before
        } else {
            DropSide::After
        }
    }
}

/// The in-memory document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentTree {
    blocks: Vec<Block>,
}

impl ContentTree {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Top-level blocks
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn find(&self, id: &BlockId) -> Option<&Block> {
        find_in(&self.blocks, id)
    }

    pub fn find_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        find_in_mut(&mut self.blocks, id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.find(id).is_some()
    }

    /// Locate a block by its parent and index
    pub fn locate(&self, id: &BlockId) -> Option<Location> {
        locate_in(&self.blocks, None, id)
    }

    /// Blocks from the root down to `id`, inclusive
    pub fn path_to(&self, id: &BlockId) -> Option<Vec<&Block>> {
        let mut path = Vec::new();
        if path_in(&self.blocks, id, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    /// Closest block on the path to `id` (inclusive) that matches `predicate`
    pub fn enclosing(&self, id: &BlockId, predicate: impl Fn(&Block) -> bool) -> Option<&Block> {
        self.path_to(id)?
            .into_iter()
            .rev()
            .find(|block| predicate(block))
    }

    /// Drop zone that receives a drop aimed at `id`
    ///
    /// Zones are the sections placed directly in a column and the entries
    /// that do not sit inside another entry. Anything else hands the drop to
    /// the nearest zone around it; `None` if there is none.
    pub fn drop_zone_for(&self, id: &BlockId) -> Option<&Block> {
        let path = self.path_to(id)?;
        let accepts = |depth: usize, block: &Block| match block.kind {
            BlockKind::Section => depth == 1,
            BlockKind::Entry => !path[..depth].iter().any(|outer| outer.kind == BlockKind::Entry),
            BlockKind::Field | BlockKind::Marker => false,
        };
        (0..path.len())
            .rev()
            .find(|&depth| accepts(depth, path[depth]))
            .map(|depth| path[depth])
    }

    /// All blocks in document order
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.outline().into_iter().map(|(block, _)| block)
    }

    /// All blocks in document order, paired with their depth
    pub fn outline(&self) -> Vec<(&Block, usize)> {
        let mut out = Vec::new();
        for block in &self.blocks {
            block.walk(&mut |b, depth| out.push((b, depth)));
        }
        out
    }

    pub fn ids(&self) -> HashSet<BlockId> {
        self.iter().map(|block| block.id.clone()).collect()
    }

    /// First duplicated id, if the uniqueness invariant is broken
    pub fn duplicate_id(&self) -> Option<BlockId> {
        let mut seen = HashSet::new();
        for block in self.iter() {
            if !seen.insert(&block.id) {
                return Some(block.id.clone());
            }
        }
        None
    }

    /// Ids of blocks currently flagged as editing
    pub fn editing_ids(&self) -> Vec<BlockId> {
        self.iter()
            .filter(|block| block.editing)
            .map(|block| block.id.clone())
            .collect()
    }

    /// Drop every editing flag
    pub fn clear_editing(&mut self) {
        for block in &mut self.blocks {
            block.walk_mut(&mut |b| b.editing = false);
        }
    }

    /// Children of `parent`, or the top level for `None`
    fn children_mut(&mut self, parent: Option<&BlockId>) -> Option<&mut Vec<Block>> {
        match parent {
            None => Some(&mut self.blocks),
            Some(id) => self.find_mut(id).map(|block| &mut block.children),
        }
    }

    /// Insert a subtree at `index` under `parent` (clamped to the end)
    ///
    /// Fails without touching the tree if the parent is missing or any id of
    /// the subtree already exists.
    pub fn insert(
        &mut self,
        parent: Option<&BlockId>,
        index: usize,
        block: Block,
    ) -> Result<(), EditError> {
        self.check_insertable(&block)?;
        let children = match self.children_mut(parent) {
            Some(children) => children,
            None => {
                let missing = parent.cloned().unwrap_or_else(|| block.id.clone());
                return Err(EditError::BlockNotFound(missing));
            }
        };
        let index = index.min(children.len());
        children.insert(index, block);
        Ok(())
    }

    /// Append a subtree as the last child of `parent`
    pub fn append_child(&mut self, parent: &BlockId, block: Block) -> Result<(), EditError> {
        self.insert(Some(parent), usize::MAX, block)
    }

    /// Verify that a subtree can be inserted without breaking id uniqueness
    pub fn check_insertable(&self, block: &Block) -> Result<(), EditError> {
        let existing = self.ids();
        let mut incoming = HashSet::new();
        let mut duplicate = None;
        block.walk(&mut |b, _| {
            if duplicate.is_none() && (existing.contains(&b.id) || !incoming.insert(b.id.clone()))
            {
                duplicate = Some(b.id.clone());
            }
        });
        match duplicate {
            Some(id) => Err(EditError::DuplicateId(id)),
            None => Ok(()),
        }
    }

    /// Remove a block and its subtree
    pub fn remove(&mut self, id: &BlockId) -> Option<Block> {
        remove_in(&mut self.blocks, id)
    }

    /// Move `id` next to `target`, in the target's parent
    ///
    /// The moved subtree keeps its identity; nothing is cloned.
    pub fn move_relative(
        &mut self,
        id: &BlockId,
        target: &BlockId,
        side: DropSide,
    ) -> Result<(), EditError> {
        let moving = self
            .find(id)
            .ok_or_else(|| EditError::BlockNotFound(id.clone()))?;
        if !self.contains(target) {
            return Err(EditError::BlockNotFound(target.clone()));
        }
        if moving.contains(target) {
            return Err(EditError::InvalidMove {
                block: id.clone(),
                target: target.clone(),
            });
        }

        let block = self
            .remove(id)
            .ok_or_else(|| EditError::BlockNotFound(id.clone()))?;
        // The target is outside the removed subtree, so it is still present.
        let location = self
            .locate(target)
            .ok_or_else(|| EditError::BlockNotFound(target.clone()))?;
        let index = match side {
            DropSide::Before => location.index,
            DropSide::After => location.index + 1,
        };
        let children = self
            .children_mut(location.parent.as_ref())
            .ok_or_else(|| EditError::BlockNotFound(target.clone()))?;
        children.insert(index, block);
        Ok(())
    }

    /// The built-in document shown when nothing has been saved
    pub fn default_resume() -> Self {
        default_resume()
    }
}

fn find_in<'a>(blocks: &'a [Block], id: &BlockId) -> Option<&'a Block> {
    blocks.iter().find_map(|block| {
        if block.id == *id {
            Some(block)
        } else {
            find_in(&block.children, id)
        }
    })
}

fn find_in_mut<'a>(blocks: &'a mut [Block], id: &BlockId) -> Option<&'a mut Block> {
    blocks.iter_mut().find_map(|block| {
        if block.id == *id {
            Some(block)
        } else {
            find_in_mut(&mut block.children, id)
        }
    })
}

fn locate_in(blocks: &[Block], parent: Option<&BlockId>, id: &BlockId) -> Option<Location> {
    for (index, block) in blocks.iter().enumerate() {
        if block.id == *id {
            return Some(Location {
                parent: parent.cloned(),
                index,
            });
        }
        if let Some(location) = locate_in(&block.children, Some(&block.id), id) {
            return Some(location);
        }
    }
    None
}

fn path_in<'a>(blocks: &'a [Block], id: &BlockId, path: &mut Vec<&'a Block>) -> bool {
    for block in blocks {
        path.push(block);
        if block.id == *id || path_in(&block.children, id, path) {
            return true;
        }
        path.pop();
    }
    false
}

fn remove_in(blocks: &mut Vec<Block>, id: &BlockId) -> Option<Block> {
    if let Some(pos) = blocks.iter().position(|block| block.id == *id) {
        return Some(blocks.remove(pos));
    }
    blocks
        .iter_mut()
        .find_map(|block| remove_in(&mut block.children, id))
}

fn language(id: &str, name: &str, level: usize) -> Block {
    let dots = (1..=5)
        .map(|n| Block::marker(format!("{id}-dot-{n}"), "dot", n <= level))
        .collect();
    Block::entry(
        id,
        "language",
        vec![
            Block::field(format!("{id}-name"), "language-name", name),
            Block::section(format!("{id}-dots"), "lang-dots", dots),
        ],
    )
}

/// A two-field entry such as a contact line or a skills category
fn labelled(id: &str, role: &str, (label_role, label): (&str, &str), (value_role, value): (&str, &str)) -> Block {
    Block::entry(
        id,
        role,
        vec![
            Block::field(format!("{id}-label"), label_role, label),
            Block::field(format!("{id}-value"), value_role, value),
        ],
    )
}

fn contact(id: &str, label: &str, value: &str) -> Block {
    labelled(id, "contact-item", ("contact-label", label), ("contact-value", value))
}

fn skills(id: &str, label: &str, value: &str) -> Block {
    labelled(id, "skills-category", ("skill-label", label), ("skill-value", value))
}

fn default_resume() -> ContentTree {
    let header = Block::section(
        "header",
        "header",
        vec![
            Block::field("name", "name", "Camille Laurent"),
            Block::field("headline", "headline", "Ingénieure logiciel"),
        ],
    );

    let left = Block::section(
        "left-column",
        "column",
        vec![
            Block::section(
                "contact",
                "contact",
                vec![
                    Block::field("contact-title", "sidebar-title", "Contact"),
                    contact("contact-location", "Localisation", "Lyon, France"),
                    contact("contact-phone", "Téléphone", "+33 6 12 34 56 78"),
                    contact("contact-email", "Email", "camille.laurent@example.com"),
                ],
            ),
            Block::section(
                "expertise",
                "expertise",
                vec![
                    Block::field("expertise-title", "sidebar-title", "Expertise"),
                    Block::section(
                        "expertise-list",
                        "expertise-list",
                        vec![
                            Block::field("expertise-1", "expertise-item", "Architecture logicielle"),
                            Block::field("expertise-2", "expertise-item", "Systèmes distribués"),
                        ],
                    ),
                ],
            ),
            Block::section(
                "technologies",
                "technologies",
                vec![
                    Block::field("technologies-title", "sidebar-title", "Technologies"),
                    skills("tech-frontend", "Frontend", "TypeScript, React"),
                    skills("tech-backend", "Backend", "Rust, PostgreSQL"),
                ],
            ),
            Block::section(
                "languages",
                "languages",
                vec![
                    Block::field("languages-title", "sidebar-title", "Langues"),
                    language("language-1", "Français", 5),
                    language("language-2", "Anglais", 4),
                ],
            ),
        ],
    );

    let right = Block::section(
        "right-column",
        "column",
        vec![
            Block::section(
                "about",
                "about",
                vec![
                    Block::field("about-title", "section-title", "À propos"),
                    Block::free_text(
                        "intro",
                        "intro-text",
                        "Ingénieure passionnée par les outils fiables et les équipes heureuses.",
                    ),
                ],
            ),
            Block::section(
                "experience",
                "experience",
                vec![
                    Block::field("experience-title", "section-title", "Expérience Professionnelle"),
                    Block::entry(
                        "experience-1",
                        "experience",
                        vec![
                            Block::field("experience-1-period", "experience-period", "2021 - Présent"),
                            Block::field("experience-1-title", "job-title", "Développeuse principale"),
                            Block::field("experience-1-company", "company", "Nimbus, Lyon"),
                            Block::section(
                                "experience-1-achievements",
                                "achievements",
                                vec![Block::field(
                                    "experience-1-achievement-1",
                                    "achievement",
                                    "Migration du moteur de facturation",
                                )],
                            ),
                            Block::section(
                                "experience-1-projects",
                                "projects",
                                vec![Block::field(
                                    "experience-1-project-1",
                                    "project",
                                    "Portail client: refonte complète",
                                )],
                            ),
                        ],
                    ),
                    Block::entry(
                        "experience-2",
                        "experience",
                        vec![
                            Block::field("experience-2-period", "experience-period", "2017 - 2021"),
                            Block::field("experience-2-title", "job-title", "Développeuse"),
                            Block::field("experience-2-company", "company", "Atelier Numérique, Paris"),
                            Block::section(
                                "experience-2-achievements",
                                "achievements",
                                vec![Block::field(
                                    "experience-2-achievement-1",
                                    "achievement",
                                    "Mise en place de l'intégration continue",
                                )],
                            ),
                            Block::section("experience-2-projects", "projects", Vec::new()),
                        ],
                    ),
                ],
            ),
            Block::section(
                "education",
                "education",
                vec![
                    Block::field("education-title", "section-title", "Formation"),
                    Block::entry(
                        "education-1",
                        "education",
                        vec![
                            Block::field("education-1-year", "education-year", "2017"),
                            Block::field("education-1-degree", "degree", "Master Informatique"),
                            Block::field("education-1-school", "school", "Université de Lyon"),
                        ],
                    ),
                ],
            ),
        ],
    );

    ContentTree::new(vec![header, left, right])
}
