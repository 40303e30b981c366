//! The application root
//!
//! [`Editor`] owns the document and every state machine around it and is
//! driven by discrete [`Intent`]s. Each intent is handled synchronously:
//! history snapshots are pushed before the mutation they protect, then the
//! mutation is applied, then persistence is notified and a notification is
//! emitted. Timers (autosave debounce, notification expiry) advance only
//! through [`Editor::tick`], so the whole core runs without a clock of its
//! own.
//!
//! Nothing here fails outward. Validation problems become error
//! notifications; structural problems and storage failures are logged and
//! treated as no-ops.

use std::time::Instant;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::document::{BlockId, BlockKind, ContentTree};
use crate::error::EditError;
use crate::factory::{default_parent, BlockFactory, ParentContext, ResumeBlockFactory, TemplateKind};
use crate::history::{HistoryManager, DEFAULT_HISTORY_DEPTH};
use crate::keymap::{self, Key, KeyAction, KeyChord};
use crate::notify::{Notification, Notifier};
use crate::persistence::{
    FileStorage, PersistenceScheduler, Storage, StorageError, DEFAULT_AUTOSAVE_DELAY,
    DEFAULT_STORAGE_KEY,
};
use crate::reorder::{DropOutcome, ReorderController};
use crate::session::{EditSession, Focus};
use crate::theme::{ColorSlot, ProfileImage, ThemeColors};
use crate::translate::{self, Language};

/// A discrete user intent
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Open the inline editor on a field, closing any other first
    StartEdit(BlockId),
    /// Replace the input buffer of the open editor
    SetBuffer(String),
    /// Commit the input buffer
    Commit,
    /// Commit an explicit value
    CommitValue(String),
    /// Revert the open editor
    Cancel,
    /// Pointer pressed on a block, or on empty space for `None`
    PointerDown { target: Option<BlockId> },
    /// Key press, resolved against the current focus
    Key(KeyChord),
    Undo,
    Redo,
    DragStart(BlockId),
    DragEnter(BlockId),
    DragOver(BlockId),
    DragLeave(BlockId),
    /// Drop on a zone; `offset_y` is measured from the top of a box of `height`
    Drop {
        zone: BlockId,
        offset_y: f32,
        height: f32,
    },
    DragEnd,
    /// Add a block from a template; `anchor` picks the enclosing experience
    /// for achievements and projects
    Add {
        template: TemplateKind,
        anchor: Option<BlockId>,
    },
    Delete(BlockId),
    /// Click on a language level dot
    SetLanguageLevel(BlockId),
    ApplyPreset(String),
    SetColor { slot: ColorSlot, value: String },
    SetProfileImage(ProfileImage),
    RemoveProfileImage,
    /// Translate headings to a language code ("fr", "en")
    Translate(String),
    SaveNow,
    Export,
    ToggleSearch,
    ToggleShortcuts,
    /// Close the topmost overlay, else leave search, else cancel the edit
    Escape,
    /// Forget the saved record and start over from the default document
    Reset,
}

/// Result of dispatching one intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The intent had a visible effect
    Applied,
    /// No-op: nothing to do, or rejected
    Unchanged,
    /// The front end should export the document
    ExportRequested,
}

/// Tunables for an [`Editor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSettings {
    pub history_depth: usize,
    pub autosave_delay: std::time::Duration,
    pub storage_key: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl From<&Config> for EditorSettings {
    fn from(config: &Config) -> Self {
        Self {
            history_depth: config.history_depth,
            autosave_delay: config.autosave_delay(),
            storage_key: config.storage_key.clone(),
        }
    }
}

pub struct Editor {
    tree: ContentTree,
    history: HistoryManager,
    session: EditSession,
    reorder: ReorderController,
    persistence: PersistenceScheduler,
    factory: Box<dyn BlockFactory>,
    notifier: Notifier,
    theme: ThemeColors,
    profile_image: ProfileImage,
    shortcuts_open: bool,
    search_active: bool,
    /// Bumped whenever the document needs a full redraw
    render_epoch: u64,
}

impl Editor {
    /// Editor over the built-in document, persisting to `storage`
    pub fn new(storage: Box<dyn Storage>, settings: EditorSettings) -> Self {
        Self {
            tree: ContentTree::default_resume(),
            history: HistoryManager::with_depth(settings.history_depth),
            session: EditSession::default(),
            reorder: ReorderController::new(),
            persistence: PersistenceScheduler::new(
                storage,
                settings.storage_key,
                settings.autosave_delay,
            ),
            factory: Box::new(ResumeBlockFactory),
            notifier: Notifier::new(),
            theme: ThemeColors::default(),
            profile_image: ProfileImage::empty(),
            shortcuts_open: false,
            search_active: false,
            render_epoch: 0,
        }
    }

    /// Editor persisting under the configured data directory
    pub fn open(config: &Config) -> Self {
        let storage = FileStorage::new(&config.data_dir);
        Self::new(Box::new(storage), EditorSettings::from(config))
    }

    /// Replace the block factory
    pub fn with_factory(mut self, factory: Box<dyn BlockFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn tree(&self) -> &ContentTree {
        &self.tree
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn reorder(&self) -> &ReorderController {
        &self.reorder
    }

    pub fn persistence(&self) -> &PersistenceScheduler {
        &self.persistence
    }

    pub fn theme(&self) -> &ThemeColors {
        &self.theme
    }

    pub fn profile_image(&self) -> &ProfileImage {
        &self.profile_image
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Notification on screen at `now`
    pub fn notification(&self, now: Instant) -> Option<&Notification> {
        self.notifier.visible(now)
    }

    pub fn focus(&self) -> Focus {
        self.session.focus()
    }

    pub fn is_search_active(&self) -> bool {
        self.search_active
    }

    pub fn is_shortcuts_open(&self) -> bool {
        self.shortcuts_open
    }

    pub fn render_epoch(&self) -> u64 {
        self.render_epoch
    }

    /// Dot to click for `level` (1-based) on a language entry
    pub fn level_dot(&self, language: &BlockId, level: usize) -> Option<BlockId> {
        let entry = self.tree.find(language)?;
        let mut dots = Vec::new();
        entry.walk(&mut |block, _| {
            if block.kind == BlockKind::Marker && block.role == "dot" {
                dots.push(block.id.clone());
            }
        });
        dots.into_iter().nth(level.checked_sub(1)?)
    }

    /// Replace the live state with the saved record, if there is one
    ///
    /// A missing or unreadable record leaves the built-in document in place.
    pub fn load_on_startup(&mut self, now: Instant) -> bool {
        match self.persistence.load() {
            Ok(Some(record)) => {
                self.session.abandon(&mut self.tree);
                self.reorder.drag_end();
                self.tree = record.html;
                if let Some(colors) = record.colors {
                    self.theme = colors;
                }
                self.profile_image = record.profile_image;
                self.touch();
                info!(saved_at = %record.timestamp, "record restored");
                let local = record.timestamp.with_timezone(&Local);
                self.notify(
                    Notification::info(
                        format!("📂 Résumé restored ({})", local.format("%Y-%m-%d %H:%M")),
                        3000,
                    ),
                    now,
                );
                true
            }
            Ok(None) => {
                debug!("no saved record, using the default document");
                false
            }
            Err(e) => {
                log_storage_error("load", &e);
                false
            }
        }
    }

    /// Advance timers: expire notifications and run a due autosave
    ///
    /// Returns `true` if anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = self.notifier.expire(now);
        if self.persistence.poll_due(now) {
            match self
                .persistence
                .write(&self.tree, &self.theme, &self.profile_image)
            {
                Ok(_) => {
                    self.notify(Notification::info("✓ Saved automatically", 2000), now);
                    changed = true;
                }
                Err(e) => log_storage_error("autosave", &e),
            }
        }
        changed
    }

    /// Route one intent
    pub fn dispatch(&mut self, intent: Intent, now: Instant) -> Dispatch {
        debug!(?intent, "dispatch");
        match intent {
            Intent::StartEdit(id) => self.start_edit(id, now),
            Intent::SetBuffer(value) => applied_if(self.session.set_buffer(value).is_ok()),
            Intent::Commit => self.commit(None, now),
            Intent::CommitValue(value) => self.commit(Some(value), now),
            Intent::Cancel => self.cancel(),
            Intent::PointerDown { target } => self.pointer_down(target, now),
            Intent::Key(chord) => self.key(chord, now),
            Intent::Undo => self.undo(now),
            Intent::Redo => self.redo(now),
            Intent::DragStart(id) => {
                match self.reorder.drag_start(&self.tree, &mut self.history, &id) {
                    Ok(()) => Dispatch::Applied,
                    Err(e) => self.reject(e, now),
                }
            }
            Intent::DragEnter(zone) => applied_if(self.reorder.drag_enter(&self.tree, &zone)),
            Intent::DragOver(zone) => applied_if(self.reorder.drag_over(&self.tree, &zone)),
            Intent::DragLeave(zone) => {
                self.reorder.drag_leave(&self.tree, &zone);
                Dispatch::Applied
            }
            Intent::Drop {
                zone,
                offset_y,
                height,
            } => self.drop(zone, offset_y, height, now),
            Intent::DragEnd => {
                self.reorder.drag_end();
                Dispatch::Applied
            }
            Intent::Add { template, anchor } => self.add(template, anchor, now),
            Intent::Delete(id) => self.delete(id, now),
            Intent::SetLanguageLevel(dot) => self.set_language_level(dot, now),
            Intent::ApplyPreset(name) => self.apply_preset(&name, now),
            Intent::SetColor { slot, value } => match self.theme.set(slot, &value) {
                Ok(()) => {
                    self.persistence.notify_changed(now);
                    Dispatch::Applied
                }
                Err(e) => self.reject(e, now),
            },
            Intent::SetProfileImage(image) => self.set_profile_image(image, now),
            Intent::RemoveProfileImage => self.remove_profile_image(now),
            Intent::Translate(code) => self.translate(&code, now),
            Intent::SaveNow => self.save_now(now),
            Intent::Export => {
                self.notify(Notification::info("📥 Exporting…", 2000), now);
                Dispatch::ExportRequested
            }
            Intent::ToggleSearch => {
                self.search_active = !self.search_active;
                Dispatch::Applied
            }
            Intent::ToggleShortcuts => {
                self.shortcuts_open = !self.shortcuts_open;
                Dispatch::Applied
            }
            Intent::Escape => self.escape(),
            Intent::Reset => self.reset(now),
        }
    }

    fn start_edit(&mut self, id: BlockId, now: Instant) -> Dispatch {
        if self.session.is_editing(&id) {
            return Dispatch::Unchanged;
        }
        match self.tree.find(&id) {
            Some(block) if block.is_editable() => {}
            Some(_) => return self.reject(EditError::NotEditable(id), now),
            None => return self.reject(EditError::BlockNotFound(id), now),
        }

        // Force-close the other editor with its current buffer
        if !self.session.is_idle() {
            self.commit(None, now);
            if !self.session.is_idle() {
                debug!(block = %id, "edit not started, previous field is invalid");
                return Dispatch::Unchanged;
            }
        }

        self.history.push_snapshot(&self.tree);
        if let Err(e) = self.session.begin(&mut self.tree, &id, now) {
            return self.reject(e, now);
        }
        self.touch();
        Dispatch::Applied
    }

    fn commit(&mut self, value: Option<String>, now: Instant) -> Dispatch {
        match self.session.commit(&mut self.tree, value) {
            Ok(committed) => {
                debug!(block = %committed.block, changed = committed.changed, "field committed");
                self.persistence.notify_changed(now);
                self.notify(Notification::info("✓ Updated", 1500), now);
                self.touch();
                Dispatch::Applied
            }
            Err(e) => self.reject(e, now),
        }
    }

    fn cancel(&mut self) -> Dispatch {
        match self.session.cancel(&mut self.tree) {
            Ok(_) => {
                self.touch();
                Dispatch::Applied
            }
            Err(_) => Dispatch::Unchanged,
        }
    }

    fn pointer_down(&mut self, target: Option<BlockId>, now: Instant) -> Dispatch {
        let (is_field, is_dot) = target
            .as_ref()
            .and_then(|id| self.tree.find(id))
            .map(|block| {
                let is_dot = block.kind == BlockKind::Marker && block.role == "dot";
                (block.is_editable(), is_dot)
            })
            .unwrap_or((false, false));

        if let Some(id) = target.as_ref().filter(|_| is_field) {
            return self.start_edit(id.clone(), now);
        }

        let mut outcome = Dispatch::Unchanged;
        if self.session.dismisses(&self.tree, target.as_ref(), now) {
            outcome = self.commit(None, now);
        }
        match target {
            Some(dot) if is_dot => self.set_language_level(dot, now),
            _ => outcome,
        }
    }

    fn key(&mut self, chord: KeyChord, now: Instant) -> Dispatch {
        let focus = self.session.focus();
        if let Some(action) = keymap::resolve(chord, focus) {
            return match action {
                KeyAction::Undo => self.undo(now),
                KeyAction::Redo => self.redo(now),
                KeyAction::Save => self.save_now(now),
                KeyAction::Export => self.dispatch(Intent::Export, now),
                KeyAction::ToggleSearch => self.dispatch(Intent::ToggleSearch, now),
                KeyAction::ToggleShortcuts => self.dispatch(Intent::ToggleShortcuts, now),
                KeyAction::Escape => self.escape(),
                KeyAction::CommitEdit => self.commit(None, now),
            };
        }

        if focus == Focus::None || chord.modifiers.command() || chord.modifiers.alt {
            return Dispatch::Unchanged;
        }
        let typed = match chord.key {
            Key::Char(c) => self.session.push_char(c),
            Key::Enter if focus == Focus::MultiLine => self.session.push_char('\n'),
            Key::Enter => return Dispatch::Unchanged,
            Key::Backspace => self.session.backspace(),
            Key::Escape | Key::Other => return Dispatch::Unchanged,
        };
        applied_if(typed.is_ok())
    }

    fn undo(&mut self, now: Instant) -> Dispatch {
        let abandoned = self.session.abandon(&mut self.tree).is_some();
        if self.history.undo(&mut self.tree) {
            self.after_history_jump(Notification::info("↶ Undone", 1500), now);
            Dispatch::Applied
        } else {
            applied_if(abandoned)
        }
    }

    fn redo(&mut self, now: Instant) -> Dispatch {
        let abandoned = self.session.abandon(&mut self.tree).is_some();
        if self.history.redo(&mut self.tree) {
            self.after_history_jump(Notification::info("↷ Redone", 1500), now);
            Dispatch::Applied
        } else {
            applied_if(abandoned)
        }
    }

    fn after_history_jump(&mut self, notification: Notification, now: Instant) {
        self.reorder.drag_end();
        self.persistence.notify_changed(now);
        self.notify(notification, now);
        self.touch();
    }

    fn drop(&mut self, zone: BlockId, offset_y: f32, height: f32, now: Instant) -> Dispatch {
        match self.reorder.drop(&mut self.tree, &zone, offset_y, height) {
            Ok(DropOutcome::Moved { .. }) => {
                self.persistence.notify_changed(now);
                self.notify(Notification::info("↕ Moved", 1500), now);
                self.touch();
                Dispatch::Applied
            }
            Ok(DropOutcome::Unchanged) => Dispatch::Unchanged,
            Err(e) => self.reject(e, now),
        }
    }

    fn add(&mut self, template: TemplateKind, anchor: Option<BlockId>, now: Instant) -> Dispatch {
        let anchor = anchor.or_else(|| self.session.active().map(|active| active.block().clone()));
        let Some(parent) = default_parent(&self.tree, template, anchor.as_ref()) else {
            debug!(%template, "no section to add into");
            return Dispatch::Unchanged;
        };
        let Some(context) = ParentContext::new(&self.tree, &parent) else {
            return self.reject(EditError::BlockNotFound(parent), now);
        };

        let block = self.factory.create_block(template, &context);
        if let Err(e) = self.tree.check_insertable(&block) {
            return self.reject(e, now);
        }

        self.history.push_snapshot(&self.tree);
        let id = block.id.clone();
        if let Err(e) = self.tree.append_child(&parent, block) {
            return self.reject(e, now);
        }
        info!(block = %id, parent = %parent, "block added");
        self.persistence.notify_changed(now);
        self.notify(
            Notification::info(format!("✓ {} added", template.label()), 2000),
            now,
        );
        self.touch();
        Dispatch::Applied
    }

    fn delete(&mut self, id: BlockId, now: Instant) -> Dispatch {
        let Some(block) = self.tree.find(&id) else {
            return self.reject(EditError::BlockNotFound(id), now);
        };
        let holds_session = self
            .session
            .active()
            .is_some_and(|active| block.contains(active.block()));
        let holds_drag = self.reorder.source().is_some_and(|source| block.contains(source));

        if holds_session {
            self.session.abandon(&mut self.tree);
        }
        if holds_drag {
            self.reorder.drag_end();
        }

        self.history.push_snapshot(&self.tree);
        self.tree.remove(&id);
        info!(block = %id, "block deleted");
        self.persistence.notify_changed(now);
        self.notify(Notification::info("🗑 Deleted", 1500), now);
        self.touch();
        Dispatch::Applied
    }

    fn set_language_level(&mut self, dot: BlockId, now: Instant) -> Dispatch {
        let Some(location) = self.tree.locate(&dot) else {
            return self.reject(EditError::BlockNotFound(dot), now);
        };
        let Some(container) = location.parent else {
            return Dispatch::Unchanged;
        };
        let is_dot = self
            .tree
            .find(&dot)
            .is_some_and(|block| block.kind == BlockKind::Marker && block.role == "dot");
        if !is_dot {
            return Dispatch::Unchanged;
        }

        self.history.push_snapshot(&self.tree);
        if let Some(dots) = self.tree.find_mut(&container) {
            for (index, marker) in dots.children.iter_mut().enumerate() {
                if marker.kind == BlockKind::Marker {
                    marker.filled = index <= location.index;
                }
            }
        }
        self.persistence.notify_changed(now);
        self.notify(Notification::info("✓ Level updated", 1500), now);
        self.touch();
        Dispatch::Applied
    }

    fn apply_preset(&mut self, name: &str, now: Instant) -> Dispatch {
        match ThemeColors::preset(name) {
            Some(colors) => {
                self.theme = colors;
                self.persistence.notify_changed(now);
                self.notify(
                    Notification::info(format!("🎨 Theme {name} applied"), 2000),
                    now,
                );
                Dispatch::Applied
            }
            None => {
                self.notify(
                    Notification::error(format!("❌ Unknown theme '{name}'"), 2000),
                    now,
                );
                Dispatch::Unchanged
            }
        }
    }

    fn set_profile_image(&mut self, image: ProfileImage, now: Instant) -> Dispatch {
        if !image.is_present() {
            self.notify(Notification::error("❌ Not an image", 2000), now);
            return Dispatch::Unchanged;
        }
        self.profile_image = image;
        self.force_save();
        self.notify(Notification::info("📸 Profile photo added", 2000), now);
        Dispatch::Applied
    }

    fn remove_profile_image(&mut self, now: Instant) -> Dispatch {
        if !self.profile_image.is_present() {
            return Dispatch::Unchanged;
        }
        self.profile_image = ProfileImage::empty();
        self.force_save();
        self.notify(Notification::info("🗑 Photo removed", 2000), now);
        Dispatch::Applied
    }

    fn translate(&mut self, code: &str, now: Instant) -> Dispatch {
        let language: Language = match code.parse() {
            Ok(language) => language,
            Err(_) => {
                self.notify(Notification::error("❌ Unsupported language", 2000), now);
                return Dispatch::Unchanged;
            }
        };
        if translate::count(&self.tree, language) == 0 {
            self.notify(Notification::info("ℹ No headings to translate", 2000), now);
            return Dispatch::Unchanged;
        }

        self.history.push_snapshot(&self.tree);
        let changed = translate::apply(&mut self.tree, language);
        self.persistence.notify_changed(now);
        self.notify(
            Notification::info(
                format!(
                    "✓ {changed} heading(s) translated to {}",
                    language.code().to_uppercase()
                ),
                3000,
            ),
            now,
        );
        self.touch();
        Dispatch::Applied
    }

    fn save_now(&mut self, now: Instant) -> Dispatch {
        if self.force_save() {
            self.notify(Notification::info("💾 Saved", 2000), now);
            Dispatch::Applied
        } else {
            self.notify(Notification::error("⚠ Could not save", 2000), now);
            Dispatch::Unchanged
        }
    }

    fn force_save(&mut self) -> bool {
        match self
            .persistence
            .save_now(&self.tree, &self.theme, &self.profile_image)
        {
            Ok(_) => true,
            Err(e) => {
                log_storage_error("save", &e);
                false
            }
        }
    }

    fn escape(&mut self) -> Dispatch {
        if self.shortcuts_open {
            self.shortcuts_open = false;
            Dispatch::Applied
        } else if self.search_active {
            self.search_active = false;
            Dispatch::Applied
        } else {
            self.cancel()
        }
    }

    fn reset(&mut self, now: Instant) -> Dispatch {
        self.session.abandon(&mut self.tree);
        self.reorder.drag_end();
        if let Err(e) = self.persistence.clear() {
            log_storage_error("reset", &e);
        }
        self.tree = ContentTree::default_resume();
        self.history.clear();
        self.theme = ThemeColors::default();
        self.profile_image = ProfileImage::empty();
        self.notify(Notification::info("↺ Default résumé restored", 2000), now);
        self.touch();
        Dispatch::Applied
    }

    /// Surface a rejected operation
    fn reject(&mut self, error: EditError, now: Instant) -> Dispatch {
        if error.is_user_facing() {
            let text = match &error {
                EditError::EmptyRequiredField(_) => "⚠ Field cannot be empty".to_string(),
                other => format!("❌ {other}"),
            };
            self.notify(Notification::error(text, 2000), now);
        } else {
            debug!(%error, "operation ignored");
        }
        Dispatch::Unchanged
    }

    fn notify(&mut self, notification: Notification, now: Instant) {
        self.notifier.emit(notification, now);
    }

    fn touch(&mut self) {
        self.render_epoch += 1;
    }
}

fn applied_if(effect: bool) -> Dispatch {
    if effect {
        Dispatch::Applied
    } else {
        Dispatch::Unchanged
    }
}

fn log_storage_error(operation: &str, error: &StorageError) {
    match error.recovery_suggestion() {
        Some(suggestion) => warn!(operation, %error, suggestion, "storage operation skipped"),
        None => warn!(operation, %error, "storage operation skipped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Block;
    use crate::keymap::Modifiers;
    use crate::persistence::MemoryStorage;
    use std::time::Duration;

    fn id(s: &str) -> BlockId {
        BlockId::new(s)
    }

    fn editor() -> (Editor, MemoryStorage) {
        let storage = MemoryStorage::new();
        let editor = Editor::new(Box::new(storage.clone()), EditorSettings::default());
        (editor, storage)
    }

    fn text(editor: &Editor, block: &str) -> String {
        editor.tree().find(&id(block)).unwrap().text.clone()
    }

    fn ctrl(c: char) -> Intent {
        Intent::Key(KeyChord::new(Key::Char(c), Modifiers::ctrl()))
    }

    #[test]
    fn test_start_edit_pushes_one_snapshot() {
        let (mut editor, _) = editor();
        let now = Instant::now();

        assert_eq!(
            editor.dispatch(Intent::StartEdit(id("name")), now),
            Dispatch::Applied
        );
        assert_eq!(editor.history().undo_depth(), 1);

        // Starting the same edit again is a no-op
        assert_eq!(
            editor.dispatch(Intent::StartEdit(id("name")), now),
            Dispatch::Unchanged
        );
        assert_eq!(editor.history().undo_depth(), 1);
        assert_eq!(editor.tree().editing_ids(), vec![id("name")]);
    }

    #[test]
    fn test_non_fields_cannot_be_edited() {
        let (mut editor, _) = editor();
        let now = Instant::now();

        assert_eq!(
            editor.dispatch(Intent::StartEdit(id("experience-1")), now),
            Dispatch::Unchanged
        );
        assert_eq!(
            editor.dispatch(Intent::StartEdit(id("missing")), now),
            Dispatch::Unchanged
        );
        assert!(editor.session().is_idle());
        assert_eq!(editor.history().undo_depth(), 0);
    }

    #[test]
    fn test_commit_notifies_and_schedules_save() {
        let (mut editor, storage) = editor();
        let now = Instant::now();

        editor.dispatch(Intent::StartEdit(id("headline")), now);
        editor.dispatch(Intent::SetBuffer("Staff Engineer".into()), now);
        assert_eq!(editor.dispatch(Intent::Commit, now), Dispatch::Applied);

        assert_eq!(text(&editor, "headline"), "Staff Engineer");
        assert_eq!(editor.notification(now).unwrap().text, "✓ Updated");
        assert!(editor.persistence().is_pending());
        assert_eq!(storage.write_count(), 0);

        assert!(editor.tick(now + Duration::from_millis(2000)));
        assert_eq!(storage.write_count(), 1);
        assert_eq!(
            editor.notifier().last().unwrap().text,
            "✓ Saved automatically"
        );
    }

    #[test]
    fn test_typing_through_keys() {
        let (mut editor, _) = editor();
        let now = Instant::now();

        editor.dispatch(Intent::StartEdit(id("name")), now);
        editor.dispatch(Intent::SetBuffer(String::new()), now);
        for c in "Alex".chars() {
            editor.dispatch(Intent::Key(KeyChord::plain(Key::Char(c))), now);
        }
        editor.dispatch(Intent::Key(KeyChord::plain(Key::Backspace)), now);
        editor.dispatch(Intent::Key(KeyChord::plain(Key::Enter)), now);

        assert_eq!(text(&editor, "name"), "Ale");
        assert!(editor.session().is_idle());
    }

    #[test]
    fn test_enter_in_free_text_inserts_newline() {
        let (mut editor, _) = editor();
        let now = Instant::now();

        editor.dispatch(Intent::StartEdit(id("intro")), now);
        editor.dispatch(Intent::SetBuffer("a".into()), now);
        editor.dispatch(Intent::Key(KeyChord::plain(Key::Enter)), now);
        editor.dispatch(Intent::Key(KeyChord::plain(Key::Char('b'))), now);

        assert_eq!(editor.session().active().unwrap().buffer(), "a\nb");
    }

    #[test]
    fn test_shift_enter_in_single_line_field_adds_no_newline() {
        let (mut editor, _) = editor();
        let now = Instant::now();
        let shift = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };

        editor.dispatch(Intent::StartEdit(id("name")), now);
        editor.dispatch(Intent::SetBuffer("Camille".into()), now);
        let outcome = editor.dispatch(Intent::Key(KeyChord::new(Key::Enter, shift)), now);

        assert_eq!(outcome, Dispatch::Unchanged);
        assert_eq!(editor.session().active().unwrap().buffer(), "Camille");

        editor.dispatch(Intent::Commit, now);
        assert_eq!(text(&editor, "name"), "Camille");
    }

    #[test]
    fn test_escape_priority() {
        let (mut editor, _) = editor();
        let now = Instant::now();

        editor.dispatch(Intent::StartEdit(id("name")), now);
        editor.dispatch(Intent::SetBuffer("typed".into()), now);
        editor.dispatch(Intent::ToggleSearch, now);
        editor.dispatch(Intent::ToggleShortcuts, now);

        editor.dispatch(Intent::Escape, now);
        assert!(!editor.is_shortcuts_open());
        assert!(editor.is_search_active());
        assert!(!editor.session().is_idle());

        editor.dispatch(Intent::Escape, now);
        assert!(!editor.is_search_active());
        assert!(!editor.session().is_idle());

        editor.dispatch(Intent::Escape, now);
        assert!(editor.session().is_idle());
        assert_eq!(text(&editor, "name"), "Camille Laurent");

        assert_eq!(editor.dispatch(Intent::Escape, now), Dispatch::Unchanged);
    }

    #[test]
    fn test_pointer_outside_commits_after_arm_delay() {
        let (mut editor, _) = editor();
        let now = Instant::now();

        editor.dispatch(Intent::StartEdit(id("name")), now);
        editor.dispatch(Intent::SetBuffer("Alex Martin".into()), now);

        editor.dispatch(Intent::PointerDown { target: None }, now);
        assert!(!editor.session().is_idle());

        let later = now + Duration::from_millis(150);
        editor.dispatch(Intent::PointerDown { target: Some(id("name")) }, later);
        assert!(!editor.session().is_idle());

        editor.dispatch(Intent::PointerDown { target: Some(id("header")) }, later);
        assert!(editor.session().is_idle());
        assert_eq!(text(&editor, "name"), "Alex Martin");
    }

    #[test]
    fn test_undo_while_editing_abandons_session() {
        let (mut editor, _) = editor();
        let now = Instant::now();

        editor.dispatch(Intent::StartEdit(id("name")), now);
        editor.dispatch(Intent::CommitValue("Alex".into()), now);
        editor.dispatch(Intent::StartEdit(id("headline")), now);

        assert_eq!(editor.dispatch(ctrl('z'), now), Dispatch::Applied);
        assert!(editor.session().is_idle());
        assert!(editor.tree().editing_ids().is_empty());
        assert_eq!(text(&editor, "name"), "Alex");

        editor.dispatch(Intent::Undo, now);
        assert_eq!(text(&editor, "name"), "Camille Laurent");
        editor.dispatch(ctrl('y'), now);
        assert_eq!(text(&editor, "name"), "Alex");
    }

    #[test]
    fn test_delete_removes_subtree_and_ends_session() {
        let (mut editor, _) = editor();
        let now = Instant::now();

        editor.dispatch(Intent::StartEdit(id("experience-1-company")), now);
        assert_eq!(
            editor.dispatch(Intent::Delete(id("experience-1")), now),
            Dispatch::Applied
        );

        assert!(editor.session().is_idle());
        assert!(!editor.tree().contains(&id("experience-1")));
        assert!(editor.tree().editing_ids().is_empty());

        editor.dispatch(Intent::Undo, now);
        assert!(editor.tree().contains(&id("experience-1")));
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let (mut editor, _) = editor();
        let now = Instant::now();
        assert_eq!(
            editor.dispatch(Intent::Delete(id("ghost")), now),
            Dispatch::Unchanged
        );
        assert_eq!(editor.history().undo_depth(), 0);
        assert!(!editor.persistence().is_pending());
    }

    #[test]
    fn test_add_inserts_template() {
        let (mut editor, _) = editor();
        let now = Instant::now();
        let before = editor.tree().find(&id("education")).unwrap().children.len();

        let outcome = editor.dispatch(
            Intent::Add {
                template: TemplateKind::Education,
                anchor: None,
            },
            now,
        );

        assert_eq!(outcome, Dispatch::Applied);
        let education = editor.tree().find(&id("education")).unwrap();
        assert_eq!(education.children.len(), before + 1);
        let added = education.children.last().unwrap();
        assert!(added.is_draggable());
        assert_eq!(editor.history().undo_depth(), 1);
        assert_eq!(editor.notification(now).unwrap().text, "✓ Education added");
        assert!(editor.tree().duplicate_id().is_none());
    }

    struct FixedFactory;

    impl BlockFactory for FixedFactory {
        fn create_block(&self, _kind: TemplateKind, _parent: &ParentContext) -> Block {
            Block::entry(
                "education-1",
                "education",
                vec![Block::field("education-1-school", "school", "Copie")],
            )
        }
    }

    #[test]
    fn test_add_rejects_colliding_ids() {
        let (editor, _) = editor();
        let mut editor = editor.with_factory(Box::new(FixedFactory));
        let now = Instant::now();
        let before = editor.tree().clone();

        let outcome = editor.dispatch(
            Intent::Add {
                template: TemplateKind::Education,
                anchor: None,
            },
            now,
        );

        assert_eq!(outcome, Dispatch::Unchanged);
        assert_eq!(editor.tree(), &before);
        assert_eq!(editor.history().undo_depth(), 0);
        assert!(!editor.persistence().is_pending());
    }

    #[test]
    fn test_add_achievement_follows_anchor() {
        let (mut editor, _) = editor();
        let now = Instant::now();

        editor.dispatch(
            Intent::Add {
                template: TemplateKind::Achievement,
                anchor: Some(id("experience-2-title")),
            },
            now,
        );

        let achievements = editor
            .tree()
            .find(&id("experience-2-achievements"))
            .unwrap();
        assert_eq!(achievements.children.len(), 2);
        assert_eq!(
            achievements.children[1].text,
            "Nouvelle réalisation"
        );
    }

    #[test]
    fn test_language_level() {
        let (mut editor, _) = editor();
        let now = Instant::now();
        let dot = editor.level_dot(&id("language-2"), 2).unwrap();

        editor.dispatch(Intent::PointerDown { target: Some(dot) }, now);

        let filled: Vec<bool> = editor
            .tree()
            .find(&id("language-2-dots"))
            .unwrap()
            .children
            .iter()
            .map(|d| d.filled)
            .collect();
        assert_eq!(filled, vec![true, true, false, false, false]);
        assert_eq!(editor.history().undo_depth(), 1);
        assert!(editor.level_dot(&id("language-2"), 0).is_none());
        assert!(editor.level_dot(&id("language-2"), 6).is_none());
    }

    #[test]
    fn test_theme_is_not_undone() {
        let (mut editor, _) = editor();
        let now = Instant::now();

        editor.dispatch(Intent::ApplyPreset("dark".into()), now);
        assert_eq!(editor.theme(), &ThemeColors::preset("dark").unwrap());
        assert_eq!(editor.history().undo_depth(), 0);
        assert!(editor.persistence().is_pending());

        editor.dispatch(Intent::Undo, now);
        assert_eq!(editor.theme().background, "#2c3e50");

        assert_eq!(
            editor.dispatch(Intent::ApplyPreset("neon".into()), now),
            Dispatch::Unchanged
        );
        assert!(editor.notification(now).unwrap().is_error);
    }

    #[test]
    fn test_invalid_color_is_reported() {
        let (mut editor, _) = editor();
        let now = Instant::now();

        let outcome = editor.dispatch(
            Intent::SetColor {
                slot: ColorSlot::Primary,
                value: "blue".into(),
            },
            now,
        );
        assert_eq!(outcome, Dispatch::Unchanged);
        assert!(editor.notification(now).unwrap().is_error);
        assert_eq!(editor.theme().primary, "#3498db");
    }

    #[test]
    fn test_profile_image_saves_immediately() {
        let (mut editor, storage) = editor();
        let now = Instant::now();

        let image = ProfileImage::from_bytes("image/png", b"png");
        editor.dispatch(Intent::SetProfileImage(image.clone()), now);
        assert_eq!(storage.write_count(), 1);
        assert_eq!(editor.profile_image(), &image);

        editor.dispatch(Intent::RemoveProfileImage, now);
        assert_eq!(storage.write_count(), 2);
        assert!(!editor.profile_image().is_present());
        assert_eq!(
            editor.dispatch(Intent::RemoveProfileImage, now),
            Dispatch::Unchanged
        );
    }

    #[test]
    fn test_translate() {
        let (mut editor, _) = editor();
        let now = Instant::now();

        assert_eq!(
            editor.dispatch(Intent::Translate("en".into()), now),
            Dispatch::Applied
        );
        assert_eq!(text(&editor, "about-title"), "About");
        assert_eq!(editor.history().undo_depth(), 1);

        // Already English: nothing to do, no snapshot
        assert_eq!(
            editor.dispatch(Intent::Translate("en".into()), now),
            Dispatch::Unchanged
        );
        assert_eq!(editor.history().undo_depth(), 1);

        assert_eq!(
            editor.dispatch(Intent::Translate("de".into()), now),
            Dispatch::Unchanged
        );
        assert!(editor.notification(now).unwrap().is_error);
    }

    #[test]
    fn test_save_shortcut_and_failure() {
        let (mut editor, storage) = editor();
        let now = Instant::now();

        assert_eq!(editor.dispatch(ctrl('s'), now), Dispatch::Applied);
        assert_eq!(storage.write_count(), 1);

        storage.set_failing(true);
        assert_eq!(editor.dispatch(Intent::SaveNow, now), Dispatch::Unchanged);
        assert!(editor.notification(now).unwrap().is_error);
    }

    #[test]
    fn test_export_shortcut() {
        let (mut editor, _) = editor();
        assert_eq!(
            editor.dispatch(ctrl('p'), Instant::now()),
            Dispatch::ExportRequested
        );
    }

    #[test]
    fn test_reset_restores_default() {
        let (mut editor, storage) = editor();
        let now = Instant::now();

        editor.dispatch(Intent::Delete(id("education")), now);
        editor.dispatch(Intent::SaveNow, now);
        assert!(storage.get(DEFAULT_STORAGE_KEY).is_some());

        editor.dispatch(Intent::Reset, now);
        assert_eq!(editor.tree(), &ContentTree::default_resume());
        assert!(!editor.history().can_undo());
        assert!(storage.get(DEFAULT_STORAGE_KEY).is_none());
        assert!(!editor.persistence().is_pending());
    }

    #[test]
    fn test_load_on_startup_restores_record() {
        let storage = MemoryStorage::new();
        let now = Instant::now();
        {
            let mut first = Editor::new(Box::new(storage.clone()), EditorSettings::default());
            first.dispatch(Intent::StartEdit(id("name")), now);
            first.dispatch(Intent::CommitValue("Alex".into()), now);
            first.dispatch(Intent::ApplyPreset("green".into()), now);
            first.dispatch(Intent::SaveNow, now);
        }

        let mut editor = Editor::new(Box::new(storage), EditorSettings::default());
        assert!(editor.load_on_startup(now));
        assert_eq!(text(&editor, "name"), "Alex");
        assert_eq!(editor.theme(), &ThemeColors::preset("green").unwrap());
        assert!(editor
            .notification(now)
            .unwrap()
            .text
            .starts_with("📂 Résumé restored"));
    }

    #[test]
    fn test_load_on_startup_ignores_corrupt_record() {
        let storage = MemoryStorage::new();
        storage.seed(DEFAULT_STORAGE_KEY, "{broken");
        let mut editor = Editor::new(Box::new(storage), EditorSettings::default());

        assert!(!editor.load_on_startup(Instant::now()));
        assert_eq!(editor.tree(), &ContentTree::default_resume());
    }
}
