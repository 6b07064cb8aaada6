//! Testing utilities for the character sheet.
//!
//! This module provides tools for integration testing:
//! - `TestHarness` for scripted sheet scenarios over in-memory storage
//! - Assertion helpers for verifying sheet state

use crate::character::{create_sample_fighter, Character, HistoryCategory};
use crate::edits::Edit;
use crate::persist::Persistence;
use crate::storage::{KeyValueBackend, MemoryKeyValue};
use crate::store::CharacterStore;
use std::sync::Arc;

/// Test harness for running sheet scenarios.
pub struct TestHarness {
    /// The store under test.
    pub store: CharacterStore,
    backend: Arc<KeyValueBackend<MemoryKeyValue>>,
}

impl TestHarness {
    /// Create a new test harness with a sample fighter as the active character.
    pub async fn new() -> Self {
        Self::with_character(create_sample_fighter("Test Hero")).await
    }

    /// Create a test harness with a custom character.
    pub async fn with_character(character: Character) -> Self {
        let backend = Arc::new(KeyValueBackend::new(MemoryKeyValue::new()));
        let mut store = CharacterStore::open(Persistence::new(backend.clone())).await;
        store.create(character).await;
        Self { store, backend }
    }

    /// Apply an edit to the active character.
    pub async fn edit(&mut self, edit: Edit) -> &mut Self {
        self.store.apply(edit).await;
        self
    }

    /// Open a second store over the same storage, as a restart would.
    pub async fn reopen(&self) -> CharacterStore {
        CharacterStore::open(Persistence::new(self.backend.clone())).await
    }

    pub fn backend(&self) -> &KeyValueBackend<MemoryKeyValue> {
        &self.backend
    }

    /// The active character.
    ///
    /// Panics when the scenario has deleted it.
    pub fn character(&self) -> &Character {
        self.store
            .active()
            .unwrap_or_else(|| panic!("Expected an active character"))
    }

    /// Get current HP as (current, max).
    pub fn hp(&self) -> (i32, i32) {
        let c = self.character();
        (c.current_hp, c.max_hp)
    }

    /// Get sanity as (current, max).
    pub fn sanity(&self) -> (i32, i32) {
        let c = self.character();
        (c.sanity, c.max_sanity)
    }

    /// Id of the first inventory item with this name.
    pub fn item_id(&self, name: &str) -> String {
        self.character()
            .inventory
            .iter()
            .find(|i| i.name == name)
            .map(|i| i.id.clone())
            .unwrap_or_else(|| panic!("Expected item '{name}' in inventory"))
    }

    /// Id of the first resource with this name.
    pub fn resource_id(&self, name: &str) -> String {
        self.character()
            .resources
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.id.clone())
            .unwrap_or_else(|| panic!("Expected resource '{name}'"))
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert HP is at expected values.
#[track_caller]
pub fn assert_hp(harness: &TestHarness, current: i32, max: i32) {
    let (actual_current, actual_max) = harness.hp();
    assert_eq!(
        (actual_current, actual_max),
        (current, max),
        "Expected HP {current}/{max}, got {actual_current}/{actual_max}"
    );
}

#[track_caller]
pub fn assert_sanity(harness: &TestHarness, current: i32) {
    let (actual, max) = harness.sanity();
    assert_eq!(actual, current, "Expected sanity {current}, got {actual}/{max}");
}

#[track_caller]
pub fn assert_ac(harness: &TestHarness, ac: i32) {
    let actual = harness.character().armor_class;
    assert_eq!(actual, ac, "Expected AC {ac}, got {actual}");
}

/// Assert an item is equipped and, for weapons, that its attack exists.
#[track_caller]
pub fn assert_equipped(harness: &TestHarness, name: &str) {
    let character = harness.character();
    let item = character
        .inventory
        .iter()
        .find(|i| i.name == name)
        .unwrap_or_else(|| panic!("Expected item '{name}' in inventory"));
    assert!(item.equipped, "Expected '{name}' to be equipped");
    if item.is_weapon() {
        let attacks = character
            .attacks
            .iter()
            .filter(|a| a.weapon_item_id() == Some(item.id.as_str()))
            .count();
        assert_eq!(attacks, 1, "Expected one attack for '{name}', found {attacks}");
    }
}

/// Assert an item is not equipped and has no generated attack.
#[track_caller]
pub fn assert_unequipped(harness: &TestHarness, name: &str) {
    let character = harness.character();
    let item = character
        .inventory
        .iter()
        .find(|i| i.name == name)
        .unwrap_or_else(|| panic!("Expected item '{name}' in inventory"));
    assert!(!item.equipped, "Expected '{name}' to NOT be equipped");
    assert!(
        !character
            .attacks
            .iter()
            .any(|a| a.weapon_item_id() == Some(item.id.as_str())),
        "Expected no attack for '{name}'"
    );
}

/// Assert the newest history entry has this category.
#[track_caller]
pub fn assert_logged(harness: &TestHarness, category: HistoryCategory) {
    let latest = harness.character().history.latest().map(|e| e.category);
    assert_eq!(
        latest,
        Some(category),
        "Expected latest history entry to be {category:?}, got {latest:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_harness_starts_with_fighter() {
        let harness = TestHarness::new().await;
        assert_hp(&harness, 28, 28);
        assert_eq!(harness.store.roster().len(), 1);
    }

    #[tokio::test]
    async fn test_damage_is_logged() {
        let mut harness = TestHarness::new().await;
        harness.edit(Edit::AdjustHp { delta: -5 }).await;

        assert_hp(&harness, 23, 28);
        assert_logged(&harness, HistoryCategory::Health);
    }

    #[tokio::test]
    async fn test_equip_weapon_adds_attack() {
        let mut harness = TestHarness::new().await;
        let sword = harness.item_id("Longsword");
        harness.edit(Edit::EquipItem { item_id: sword.clone() }).await;
        assert_equipped(&harness, "Longsword");

        harness.edit(Edit::UnequipItem { item_id: sword }).await;
        assert_unequipped(&harness, "Longsword");
    }

    #[tokio::test]
    async fn test_reopen_sees_saved_state() {
        let mut harness = TestHarness::new().await;
        harness.edit(Edit::AdjustSanity { delta: -7 }).await;
        let id = harness.character().id.clone();
        let expected = harness.sanity().0;

        let mut reopened = harness.reopen().await;
        let loaded = reopened.load(&id).await.expect("character should load");
        assert_eq!(loaded.sanity, expected);
    }
}
