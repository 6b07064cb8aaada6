//! The character store.
//!
//! Owns the active character, the roster of previews, the active tab and a
//! queue of notices. Every change goes through [`CharacterStore::update`]:
//! the reducer produces the next character, the store normalizes it, keeps it
//! in memory, then writes it through. Storage failures never roll back the
//! in-memory state; they are logged and queued as notices.

use crate::character::{Character, CharacterId, CharacterPreview, Coin, LimbId};
use crate::edits::{self, Edit};
use crate::migrate;
use crate::persist::{self, upsert_preview, ImportError, PersistError, Persistence};
use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Sheet tabs a front end can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Overview,
    Combat,
    Inventory,
    Spellbook,
    Abilities,
    Notes,
}

impl Tab {
    pub fn all() -> [Tab; 6] {
        [
            Tab::Overview,
            Tab::Combat,
            Tab::Inventory,
            Tab::Spellbook,
            Tab::Abilities,
            Tab::Notes,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Combat => "combat",
            Tab::Inventory => "inventory",
            Tab::Spellbook => "spellbook",
            Tab::Abilities => "abilities",
            Tab::Notes => "notes",
        }
    }

    pub fn from_name(name: &str) -> Option<Tab> {
        let name = name.trim();
        Tab::all()
            .into_iter()
            .find(|tab| tab.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// A transient message for the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            NoticeLevel::Info => write!(f, "{}", self.message),
            NoticeLevel::Warning => write!(f, "warning: {}", self.message),
        }
    }
}

/// How [`CharacterStore::update`] produces the next character.
pub enum Update {
    /// Replace the active character wholesale.
    Replace(Character),
    /// Derive the next character from the previous one.
    With(Box<dyn FnOnce(Character) -> Character + Send>),
}

impl Update {
    pub fn with(f: impl FnOnce(Character) -> Character + Send + 'static) -> Self {
        Update::With(Box::new(f))
    }
}

/// Seconds since the unix epoch, or 0 when the clock is before it.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub struct CharacterStore {
    persistence: Persistence,
    active: Option<Character>,
    roster: Vec<CharacterPreview>,
    tab: Tab,
    notices: Vec<Notice>,
}

impl CharacterStore {
    /// Open the store: move any legacy record into place, then read the
    /// roster.
    pub async fn open(persistence: Persistence) -> Self {
        let mut store = Self {
            persistence,
            active: None,
            roster: Vec::new(),
            tab: Tab::default(),
            notices: Vec::new(),
        };

        match store.persistence.migrate_legacy().await {
            Ok(Some(id)) => store.notify(Notice::info(format!("Migrated saved character {id}"))),
            Ok(None) => {}
            Err(e) => store.storage_failed("migrate legacy character", e),
        }
        store.refresh_roster().await;
        info!(
            backend = store.persistence.backend_name(),
            characters = store.roster.len(),
            "character store opened"
        );
        store
    }

    /// Add a new character and make it active.
    pub async fn create(&mut self, character: Character) -> CharacterId {
        let mut character = migrate::normalize(character);
        if character.id.is_empty() {
            character.id = CharacterId::new();
        }
        let id = character.id.clone();
        info!(id = %id, name = %character.name, "character created");

        upsert_preview(&mut self.roster, character.preview());
        if let Err(e) = self.persistence.save(&character).await {
            self.storage_failed("save new character", e);
        }
        self.active = Some(character);
        id
    }

    /// Make the stored character with `id` active.
    ///
    /// Returns `None` and leaves the active character alone when there is no
    /// such character.
    pub async fn load(&mut self, id: &CharacterId) -> Option<&Character> {
        match self.persistence.load(id).await {
            Ok(Some(character)) => {
                debug!(id = %id, "character loaded");
                self.active = Some(character);
                self.active.as_ref()
            }
            Ok(None) => {
                debug!(id = %id, "character not found");
                None
            }
            Err(e) => {
                self.storage_failed("load character", e);
                None
            }
        }
    }

    /// Produce, normalize and write through the next active character.
    pub async fn update(&mut self, update: Update) {
        let Some(previous) = self.active.take() else {
            debug!("update without an active character");
            return;
        };
        let next = match update {
            Update::Replace(character) => character,
            Update::With(f) => f(previous),
        };
        let next = migrate::normalize(next);

        upsert_preview(&mut self.roster, next.preview());
        if let Err(e) = self.persistence.save(&next).await {
            self.storage_failed("save character", e);
        }
        self.active = Some(next);
    }

    /// Apply one edit to the active character.
    pub async fn apply(&mut self, edit: Edit) {
        let at = unix_now();
        self.update(Update::with(move |c| edits::apply(c, &edit, at)))
            .await;
    }

    /// Remove a character and its roster entry.
    pub async fn delete(&mut self, id: &CharacterId) {
        if let Err(e) = self.persistence.delete(id).await {
            self.storage_failed("delete character", e);
        }
        self.roster.retain(|p| p.id != *id);
        if self.active.as_ref().is_some_and(|c| c.id == *id) {
            self.active = None;
        }
    }

    /// Import a character from JSON text as a new character.
    pub async fn import_json(&mut self, text: &str) -> Result<CharacterId, ImportError> {
        let character = persist::parse_import(text, &self.roster)?;
        Ok(self.create(character).await)
    }

    pub async fn import_file(&mut self, path: impl AsRef<Path>) -> Result<CharacterId, PersistError> {
        let character = persist::import_from_path(path, &self.roster).await?;
        Ok(self.create(character).await)
    }

    /// The active character as exported JSON.
    pub fn export_json(&self) -> Result<String, PersistError> {
        let character = self.active.as_ref().ok_or(PersistError::NoActiveCharacter)?;
        persist::export_json(character)
    }

    pub async fn export_file(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let character = self.active.as_ref().ok_or(PersistError::NoActiveCharacter)?;
        persist::export_to_path(character, path).await
    }

    /// Re-read the roster from storage.
    pub async fn refresh_roster(&mut self) {
        match self.persistence.roster().await {
            Ok(roster) => self.roster = roster,
            Err(e) => self.storage_failed("read roster", e),
        }
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn roster(&self) -> &[CharacterPreview] {
        &self.roster
    }

    pub fn active(&self) -> Option<&Character> {
        self.active.as_ref()
    }

    /// Take every queued notice.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    fn storage_failed(&mut self, action: &str, error: PersistError) {
        warn!(action, error = %error, "storage operation failed");
        self.notify(Notice::warning(format!("Could not {action}: {error}")));
    }

    // Named edits

    pub async fn equip(&mut self, item_id: impl Into<String>) {
        self.apply(Edit::EquipItem {
            item_id: item_id.into(),
        })
        .await;
    }

    pub async fn unequip(&mut self, item_id: impl Into<String>) {
        self.apply(Edit::UnequipItem {
            item_id: item_id.into(),
        })
        .await;
    }

    pub async fn damage(&mut self, amount: i32) {
        self.apply(Edit::AdjustHp {
            delta: amount.max(0).saturating_neg(),
        })
        .await;
    }

    pub async fn heal(&mut self, amount: i32) {
        self.apply(Edit::AdjustHp {
            delta: amount.max(0),
        })
        .await;
    }

    pub async fn damage_limb(&mut self, limb: LimbId, amount: i32) {
        self.apply(Edit::DamageLimb { limb, amount }).await;
    }

    pub async fn adjust_sanity(&mut self, delta: i32) {
        self.apply(Edit::AdjustSanity { delta }).await;
    }

    pub async fn spend_resource(&mut self, resource_id: impl Into<String>, amount: i32) {
        self.apply(Edit::AdjustResource {
            resource_id: resource_id.into(),
            delta: amount.max(0).saturating_neg(),
        })
        .await;
    }

    pub async fn restore_resource(&mut self, resource_id: impl Into<String>, amount: i32) {
        self.apply(Edit::AdjustResource {
            resource_id: resource_id.into(),
            delta: amount.max(0),
        })
        .await;
    }

    pub async fn add_experience(&mut self, amount: i64) {
        self.apply(Edit::AddExperience { amount }).await;
    }

    /// Level up when the experience threshold allows it. Returns whether the
    /// level changed.
    pub async fn level_up(&mut self) -> bool {
        let before = self.active.as_ref().map(|c| c.level);
        self.apply(Edit::LevelUp).await;
        let after = self.active.as_ref().map(|c| c.level);
        before != after
    }

    pub async fn adjust_currency(&mut self, coin: Coin, delta: i64) {
        self.apply(Edit::AdjustCurrency { coin, delta }).await;
    }

    pub async fn short_rest(&mut self) {
        self.apply(Edit::ShortRest).await;
    }

    pub async fn long_rest(&mut self) {
        self.apply(Edit::LongRest).await;
    }
}
