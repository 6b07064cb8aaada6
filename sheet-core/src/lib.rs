//! Character sheet state model for tabletop role-playing games.
//!
//! This crate provides:
//! - The character schema with lenient, self-repairing deserialization
//! - Derivation rules (modifiers, proficiency, sanity, limbs, armor class)
//! - Pure edits and a store that writes every change through
//! - Versioned migrations and pluggable storage backends
//!
//! # Quick Start
//!
//! ```ignore
//! use sheet_core::{CharacterBuilder, CharacterClass, CharacterStore, Persistence, SheetConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = SheetConfig::from_env()?.open_backend().await?;
//!     let mut store = CharacterStore::open(Persistence::new(backend)).await;
//!
//!     let character = CharacterBuilder::new()
//!         .name("Thorin")
//!         .race("Dwarf")
//!         .class(CharacterClass::Fighter)
//!         .rolled(sheet_core::Attributes::new(15, 13, 14, 10, 12, 8))
//!         .skills(vec![sheet_core::Skill::Athletics, sheet_core::Skill::Perception])
//!         .build()?;
//!
//!     store.create(character).await;
//!     store.damage(4).await;
//!     Ok(())
//! }
//! ```

pub mod character;
pub mod character_builder;
pub mod class_data;
pub mod coerce;
pub mod config;
pub mod edits;
pub mod migrate;
pub mod persist;
pub mod rules;
pub mod storage;
pub mod store;
pub mod testing;

// Primary public API
pub use character::{
    create_sample_fighter, Attribute, Attributes, Character, CharacterId, CharacterPreview, Coin,
    Item, LimbId, Skill,
};
pub use character_builder::{AbilityMethod, BuilderError, CharacterBuilder, PointBuy};
pub use class_data::CharacterClass;
pub use config::{ConfigError, SheetConfig, StorageKind};
pub use edits::Edit;
pub use persist::{ImportError, PersistError, Persistence};
pub use storage::StorageBackend;
pub use store::{CharacterStore, Notice, NoticeLevel, Tab, Update};
pub use testing::TestHarness;
