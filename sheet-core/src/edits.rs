//! Sheet edits as pure state transitions.
//!
//! Every change a user can make to a character is an [`Edit`]. [`apply`]
//! takes the previous character by value and returns the next one; it never
//! performs I/O. Edits naming an unknown id leave the character unchanged.

use crate::character::{
    Ability, Attack, Attribute, Character, Coin, HistoryCategory, Item, LimbId, NarrativeField,
    Recharge, Resistance, Resource, Skill, Spell, Trait,
};
use crate::migrate::{reconcile_weapon_attacks, refresh_defense};
use crate::rules;
use serde::{Deserialize, Serialize};

/// A single change to the active character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Edit {
    // Attributes and skills
    SetAttribute {
        attribute: Attribute,
        score: i32,
    },
    SetAttributeBonus {
        attribute: Attribute,
        bonus: i32,
    },
    SetSkill {
        skill: Skill,
        proficient: bool,
        expertise: bool,
    },

    // Vitals
    /// Negative values are damage, positive values healing.
    AdjustHp {
        delta: i32,
    },
    SetMaxHp {
        max_hp: i32,
    },
    SetMaxHpBonus {
        bonus: i32,
    },
    SetTempHp {
        temp_hp: i32,
    },
    AdjustSanity {
        delta: i32,
    },
    DamageLimb {
        limb: LimbId,
        amount: i32,
    },
    HealLimb {
        limb: LimbId,
        amount: i32,
    },

    // Progression
    SetLevel {
        level: u8,
    },
    AddExperience {
        amount: i64,
    },
    LevelUp,

    // Inventory
    AddItem {
        item: Item,
    },
    RemoveItem {
        item_id: String,
    },
    AdjustItemQuantity {
        item_id: String,
        delta: i64,
    },
    EquipItem {
        item_id: String,
    },
    UnequipItem {
        item_id: String,
    },

    // Combat
    AddAttack {
        attack: Attack,
    },
    RemoveAttack {
        attack_id: String,
    },
    AddAbility {
        ability: Ability,
    },
    RemoveAbility {
        ability_id: String,
    },
    UseAbility {
        ability_id: String,
    },

    // Spellbook
    AddSpell {
        spell: Spell,
    },
    RemoveSpell {
        spell_id: String,
    },
    CastSpell {
        spell_id: String,
    },
    SetSpellPrepared {
        spell_id: String,
        prepared: bool,
    },
    SetKnownSchools {
        schools: Vec<String>,
    },
    SetPreparationCap {
        level: u8,
        cap: Option<u32>,
    },

    // Resources
    AddResource {
        resource: Resource,
    },
    RemoveResource {
        resource_id: String,
    },
    AdjustResource {
        resource_id: String,
        delta: i32,
    },
    SetResource {
        resource_id: String,
        current: i32,
    },
    ShortRest,
    LongRest,

    // Currency
    AdjustCurrency {
        coin: Coin,
        delta: i64,
    },
    ConvertCurrency {
        from: Coin,
        to: Coin,
        amount: u32,
    },

    // Defenses and notes
    SetResistance {
        resistance: Resistance,
    },
    RemoveResistance {
        damage_type: String,
    },
    AddTrait {
        entry: Trait,
    },
    RemoveTrait {
        trait_id: String,
    },
    SetNarrative {
        field: NarrativeField,
        text: String,
    },
}

/// Apply a sequence of edits in order.
pub fn apply_all(character: Character, edits: &[Edit], at: u64) -> Character {
    edits
        .iter()
        .fold(character, |character, edit| apply(character, edit, at))
}

/// Apply one edit, returning the next character.
///
/// `at` is the unix time stamped on any history entry the edit writes.
pub fn apply(mut c: Character, edit: &Edit, at: u64) -> Character {
    match edit {
        Edit::SetAttribute { attribute, score } => {
            let before = c.attributes.get(*attribute);
            if before != *score {
                c.attributes.set(*attribute, *score);
                c.history.push(
                    at,
                    HistoryCategory::Attribute,
                    format!("{} {before} → {score}", attribute.name()),
                );
                attribute_changed(&mut c, *attribute);
            }
        }
        Edit::SetAttributeBonus { attribute, bonus } => {
            if c.attribute_bonuses.get(*attribute) != *bonus {
                c.attribute_bonuses.set(*attribute, *bonus);
                attribute_changed(&mut c, *attribute);
            }
        }
        Edit::SetSkill {
            skill,
            proficient,
            expertise,
        } => {
            if let Some(entry) = c.skills.iter_mut().find(|s| s.id == *skill) {
                entry.expertise = *expertise;
                entry.proficient = *proficient || *expertise;
            }
        }

        Edit::AdjustHp { delta } => adjust_hp(&mut c, *delta, at),
        Edit::SetMaxHp { max_hp } => {
            let max_hp = (*max_hp).max(0);
            if max_hp != c.max_hp {
                c.history.push(
                    at,
                    HistoryCategory::Health,
                    format!("Max HP {} → {max_hp}", c.max_hp),
                );
                c.max_hp = max_hp;
                resize_limbs(&mut c);
            }
        }
        Edit::SetMaxHpBonus { bonus } => c.max_hp_bonus = *bonus,
        Edit::SetTempHp { temp_hp } => c.temp_hp = (*temp_hp).max(0),
        Edit::AdjustSanity { delta } => {
            let before = c.sanity;
            c.sanity = before.saturating_add(*delta).clamp(0, c.max_sanity);
            if c.sanity != before {
                let verb = if c.sanity < before { "Lost" } else { "Recovered" };
                c.history.push(
                    at,
                    HistoryCategory::Sanity,
                    format!(
                        "{verb} {} sanity ({before} → {})",
                        c.sanity.abs_diff(before),
                        c.sanity
                    ),
                );
            }
        }
        Edit::DamageLimb { limb, amount } => {
            if let Some(target) = c.limbs.iter_mut().find(|l| l.id == *limb) {
                let before = target.current_hp;
                target.current_hp = before.saturating_sub((*amount).max(0)).max(-10);
                let injury = target.injury();
                if target.current_hp != before {
                    c.history.push(
                        at,
                        HistoryCategory::Health,
                        format!("{} took {} damage ({injury})", limb.name(), before - target.current_hp),
                    );
                }
            }
        }
        Edit::HealLimb { limb, amount } => {
            if let Some(target) = c.limbs.iter_mut().find(|l| l.id == *limb) {
                let healed = target.current_hp.saturating_add((*amount).max(0));
                target.current_hp = healed.min(target.max_hp).max(target.current_hp);
            }
        }

        Edit::SetLevel { level } => set_level(&mut c, *level, at),
        Edit::AddExperience { amount } => {
            let next = (c.experience as i64)
                .saturating_add(*amount)
                .clamp(0, u32::MAX as i64) as u32;
            if next != c.experience {
                c.history.push(
                    at,
                    HistoryCategory::Level,
                    format!("Experience {} → {next}", c.experience),
                );
                c.experience = next;
            }
        }
        Edit::LevelUp => {
            if c.can_level_up() {
                let next = c.level + 1;
                set_level(&mut c, next, at);
            }
        }

        Edit::AddItem { item } => {
            c.history.push(
                at,
                HistoryCategory::Inventory,
                format!("Added {} ×{}", item.name, item.quantity),
            );
            let mut item = item.clone();
            // Equipping goes through EquipItem so attacks and AC stay in sync.
            item.equipped = false;
            c.inventory.push(item);
        }
        Edit::RemoveItem { item_id } => {
            if let Some(pos) = c.inventory.iter().position(|i| i.id == *item_id) {
                let removed = c.inventory.remove(pos);
                c.history.push(
                    at,
                    HistoryCategory::Inventory,
                    format!("Removed {}", removed.name),
                );
                if removed.equipped {
                    reconcile_weapon_attacks(&mut c);
                    refresh_defense(&mut c);
                }
            }
        }
        Edit::AdjustItemQuantity { item_id, delta } => {
            if let Some(item) = c.inventory.iter_mut().find(|i| i.id == *item_id) {
                let next = (item.quantity as i64)
                    .saturating_add(*delta)
                    .clamp(0, u32::MAX as i64) as u32;
                if next != item.quantity {
                    let message = format!("{} {} → {next}", item.name, item.quantity);
                    item.quantity = next;
                    c.history.push(at, HistoryCategory::Inventory, message);
                }
            }
        }
        Edit::EquipItem { item_id } => equip(&mut c, item_id, at),
        Edit::UnequipItem { item_id } => unequip(&mut c, item_id, at),

        Edit::AddAttack { attack } => {
            // Generated ids are reserved for equipped weapons.
            if !attack.is_generated() {
                c.attacks.push(attack.clone());
            }
        }
        Edit::RemoveAttack { attack_id } => {
            c.attacks.retain(|a| a.is_generated() || a.id != *attack_id);
        }
        Edit::AddAbility { ability } => c.abilities.push(ability.clone()),
        Edit::RemoveAbility { ability_id } => c.abilities.retain(|a| a.id != *ability_id),
        Edit::UseAbility { ability_id } => use_ability(&mut c, ability_id, at),

        Edit::AddSpell { spell } => {
            let mut spell = spell.clone();
            spell.prepared = false;
            c.spells.push(spell);
        }
        Edit::RemoveSpell { spell_id } => c.spells.retain(|s| s.id != *spell_id),
        Edit::CastSpell { spell_id } => cast_spell(&mut c, spell_id, at),
        Edit::SetSpellPrepared { spell_id, prepared } => {
            set_prepared(&mut c, spell_id, *prepared)
        }
        Edit::SetKnownSchools { schools } => {
            c.known_schools = schools
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        Edit::SetPreparationCap { level, cap } => match cap {
            Some(cap) => {
                c.max_prepared_spells.insert(*level, *cap);
            }
            None => {
                c.max_prepared_spells.remove(level);
            }
        },

        Edit::AddResource { resource } => {
            let mut resource = resource.clone();
            resource.max = resource.max.max(0);
            resource.current = resource.current.clamp(0, resource.max);
            c.resources.push(resource);
        }
        Edit::RemoveResource { resource_id } => c.resources.retain(|r| r.id != *resource_id),
        Edit::AdjustResource { resource_id, delta } => {
            if let Some(current) = c.resource(resource_id).map(|r| r.current) {
                set_resource(&mut c, resource_id, current.saturating_add(*delta), at);
            }
        }
        Edit::SetResource {
            resource_id,
            current,
        } => set_resource(&mut c, resource_id, *current, at),
        Edit::ShortRest => {
            recharge(&mut c, &[Recharge::ShortRest]);
            c.history.push(at, HistoryCategory::Rest, "Took a short rest");
        }
        Edit::LongRest => {
            recharge(&mut c, &[Recharge::ShortRest, Recharge::LongRest]);
            c.current_hp = c.current_hp.max(c.effective_max_hp());
            c.temp_hp = 0;
            for limb in &mut c.limbs {
                limb.current_hp = limb.max_hp;
            }
            c.history.push(at, HistoryCategory::Rest, "Took a long rest");
        }

        Edit::AdjustCurrency { coin, delta } => {
            let before = c.currency.get(*coin);
            c.currency.adjust(*coin, *delta);
            let after = c.currency.get(*coin);
            if after != before {
                c.history.push(
                    at,
                    HistoryCategory::Currency,
                    format!("{} {before} → {after}", coin.name()),
                );
            }
        }
        Edit::ConvertCurrency { from, to, amount } => {
            let before = c.currency;
            c.currency.convert(*from, *to, *amount);
            if c.currency != before {
                c.history.push(
                    at,
                    HistoryCategory::Currency,
                    format!(
                        "Exchanged {} {} for {} {}",
                        before.get(*from) - c.currency.get(*from),
                        from.name(),
                        c.currency.get(*to) - before.get(*to),
                        to.name()
                    ),
                );
            }
        }

        Edit::SetResistance { resistance } => {
            match c
                .resistances
                .iter_mut()
                .find(|r| r.damage_type.eq_ignore_ascii_case(&resistance.damage_type))
            {
                Some(existing) => existing.level = resistance.level,
                None => c.resistances.push(resistance.clone()),
            }
        }
        Edit::RemoveResistance { damage_type } => c
            .resistances
            .retain(|r| !r.damage_type.eq_ignore_ascii_case(damage_type)),
        Edit::AddTrait { entry } => c.traits.push(entry.clone()),
        Edit::RemoveTrait { trait_id } => c.traits.retain(|t| t.id != *trait_id),
        Edit::SetNarrative { field, text } => c.set_narrative(*field, text.clone()),
    }
    c
}

fn attribute_changed(c: &mut Character, attribute: Attribute) {
    match attribute {
        Attribute::Dexterity => refresh_defense(c),
        Attribute::Constitution => resize_limbs(c),
        Attribute::Wisdom => {
            c.max_sanity = rules::max_sanity(&c.class, c.attributes.wisdom, c.level);
            c.sanity = c.sanity.min(c.max_sanity);
        }
        _ => {}
    }
}

/// Recompute limb max HP after max HP or constitution changed.
fn resize_limbs(c: &mut Character) {
    let hp = rules::limb_max_hp(c.max_hp, c.attributes.constitution);
    for limb in &mut c.limbs {
        limb.max_hp = hp;
        limb.current_hp = limb.current_hp.min(hp);
    }
}

fn adjust_hp(c: &mut Character, delta: i32, at: u64) {
    let before = c.current_hp;
    if delta < 0 {
        let damage = delta.saturating_neg();
        let absorbed = damage.min(c.temp_hp.max(0));
        c.temp_hp -= absorbed;
        c.current_hp = before.saturating_sub(damage - absorbed).max(0);
        let mut message = format!("Took {damage} damage ({before} → {})", c.current_hp);
        if absorbed > 0 {
            message.push_str(&format!(", {absorbed} absorbed by temp HP"));
        }
        c.history.push(at, HistoryCategory::Health, message);
    } else if delta > 0 {
        let cap = c.effective_max_hp();
        c.current_hp = before.saturating_add(delta).min(cap).max(before);
        if c.current_hp != before {
            c.history.push(
                at,
                HistoryCategory::Health,
                format!("Healed {} ({before} → {})", c.current_hp - before, c.current_hp),
            );
        }
    }
}

fn set_level(c: &mut Character, level: u8, at: u64) {
    let level = level.clamp(1, crate::character::MAX_LEVEL);
    let before = c.level;
    c.level = level;
    c.proficiency_bonus = rules::proficiency_bonus(level);
    c.max_sanity = rules::max_sanity(&c.class, c.attributes.wisdom, level);
    c.sanity = c.sanity.min(c.max_sanity);
    if level > before {
        c.history.push(
            at,
            HistoryCategory::Level,
            format!("Reached level {level}"),
        );
    } else if level < before {
        c.history.push(
            at,
            HistoryCategory::Level,
            format!("Level set to {level}"),
        );
    }
}

fn equip(c: &mut Character, item_id: &str, at: u64) {
    let Some(target) = c.item(item_id).cloned() else {
        return;
    };
    if target.equipped {
        return;
    }
    if target.is_armor() {
        for item in c.inventory.iter_mut().filter(|i| i.is_armor()) {
            item.equipped = item.id == item_id;
        }
    } else if let Some(item) = c.inventory.iter_mut().find(|i| i.id == item_id) {
        item.equipped = true;
    }

    if target.is_weapon() {
        reconcile_weapon_attacks(c);
    }
    if target.is_armor() || target.is_shield() {
        refresh_defense(c);
    }
    c.history.push(
        at,
        HistoryCategory::Equipment,
        format!("Equipped {}", target.name),
    );
}

fn unequip(c: &mut Character, item_id: &str, at: u64) {
    let Some(item) = c.inventory.iter_mut().find(|i| i.id == item_id) else {
        return;
    };
    if !item.equipped {
        return;
    }
    item.equipped = false;
    let target = item.clone();

    if target.is_weapon() {
        let attack_id = crate::character::weapon_attack_id(&target.id);
        c.attacks.retain(|a| a.id != attack_id);
    }
    if target.is_armor() || target.is_shield() {
        refresh_defense(c);
    }
    c.history.push(
        at,
        HistoryCategory::Equipment,
        format!("Unequipped {}", target.name),
    );
}

fn set_resource(c: &mut Character, resource_id: &str, value: i32, at: u64) {
    let Some(resource) = c.resources.iter_mut().find(|r| r.id == resource_id) else {
        return;
    };
    let before = resource.current;
    resource.current = value.clamp(0, resource.max.max(0));
    if resource.current != before {
        let message = format!("{}: {before} → {}", resource.name, resource.current);
        c.history.push(at, HistoryCategory::Resource, message);
    }
}

fn recharge(c: &mut Character, kinds: &[Recharge]) {
    for resource in c.resources.iter_mut().filter(|r| kinds.contains(&r.recharge)) {
        resource.current = resource.max.max(0);
    }
}

fn use_ability(c: &mut Character, ability_id: &str, at: u64) {
    let Some(ability) = c.abilities.iter().find(|a| a.id == ability_id).cloned() else {
        return;
    };
    match &ability.resource {
        None => c.history.push(
            at,
            HistoryCategory::General,
            format!("Used {}", ability.name),
        ),
        Some(resource_id) => {
            let cost = ability.cost.max(0);
            let Some(resource) = c.resources.iter_mut().find(|r| r.id == *resource_id) else {
                return;
            };
            if resource.current < cost {
                return;
            }
            resource.current -= cost;
            let message = format!(
                "Used {} ({}: {} left)",
                ability.name, resource.name, resource.current
            );
            c.history.push(at, HistoryCategory::Resource, message);
        }
    }
}

fn cast_spell(c: &mut Character, spell_id: &str, at: u64) {
    let Some(spell) = c.spells.iter().find(|s| s.id == spell_id).cloned() else {
        return;
    };
    if let Some(resource_id) = &spell.resource {
        let Some(resource) = c.resources.iter_mut().find(|r| r.id == *resource_id) else {
            return;
        };
        if resource.current < 1 {
            return;
        }
        resource.current -= 1;
    }
    c.history.push(at, HistoryCategory::Spell, format!("Cast {}", spell.name));
}

fn set_prepared(c: &mut Character, spell_id: &str, prepared: bool) {
    let Some(spell) = c.spells.iter().find(|s| s.id == spell_id) else {
        return;
    };
    if spell.prepared == prepared {
        return;
    }
    if prepared {
        if !spell.school.trim().is_empty() && !rules::knows_school(c, &spell.school) {
            return;
        }
        if let Some(cap) = rules::preparation_cap(c, spell.level) {
            if rules::prepared_count(c, spell.level) >= cap {
                return;
            }
        }
    }
    if let Some(spell) = c.spells.iter_mut().find(|s| s.id == spell_id) {
        spell.prepared = prepared;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{create_sample_fighter, ItemKind, ResistanceLevel};

    fn fighter() -> Character {
        create_sample_fighter("Test")
    }

    fn item_id(c: &Character, name: &str) -> String {
        c.inventory
            .iter()
            .find(|i| i.name == name)
            .map(|i| i.id.clone())
            .unwrap()
    }

    #[test]
    fn test_huge_deltas_saturate() {
        let c = fighter();
        let arrows = item_id(&c, "Arrows");

        let c = apply(c, &Edit::AddExperience { amount: i64::MAX }, 0);
        assert_eq!(c.experience, u32::MAX);
        let c = apply(c, &Edit::AddExperience { amount: i64::MIN }, 0);
        assert_eq!(c.experience, 0);

        let c = apply(
            c,
            &Edit::AdjustItemQuantity {
                item_id: arrows.clone(),
                delta: i64::MAX,
            },
            0,
        );
        assert_eq!(c.item(&arrows).map(|i| i.quantity), Some(u32::MAX));

        let c = apply(
            c,
            &Edit::AdjustCurrency {
                coin: Coin::Gold,
                delta: i64::MIN,
            },
            0,
        );
        assert_eq!(c.currency.gold, 0);
    }

    #[test]
    fn test_equip_armor_caps_dex_and_sets_limb_ac() {
        let mut c = fighter();
        c.attributes.dexterity = 18;
        c.inventory.push(Item::armor("Breastplate", 14).with_max_dex(2).covering(LimbId::Torso, 3));
        let id = item_id(&c, "Breastplate");

        let c = apply(c, &Edit::EquipItem { item_id: id }, 0);
        assert_eq!(c.armor_class, 16);
        assert_eq!(c.limb(LimbId::Torso).map(|l| l.ac), Some(3));
        assert_eq!(c.limb(LimbId::Head).map(|l| l.ac), Some(0));
    }

    #[test]
    fn test_equipping_armor_unequips_other_armor() {
        let mut c = fighter();
        let scale = item_id(&c, "Scale Mail");
        c.inventory.push(Item::armor("Leather", 11));
        let leather = item_id(&c, "Leather");

        let c = apply(c, &Edit::EquipItem { item_id: scale.clone() }, 0);
        let c = apply(c, &Edit::EquipItem { item_id: leather }, 0);
        assert!(!c.item(&scale).map(|i| i.equipped).unwrap_or(true));
        assert_eq!(c.inventory.iter().filter(|i| i.is_armor() && i.equipped).count(), 1);
        assert_eq!(c.armor_class, 13);
    }

    #[test]
    fn test_unequip_armor_resets_ac_and_limbs() {
        let mut c = fighter();
        c.attributes.dexterity = 18;
        let scale = item_id(&c, "Scale Mail");
        let c = apply(c, &Edit::EquipItem { item_id: scale.clone() }, 0);
        assert_eq!(c.armor_class, 16);

        let c = apply(c, &Edit::UnequipItem { item_id: scale }, 0);
        assert_eq!(c.armor_class, 14);
        assert!(c.limbs.iter().all(|l| l.ac == 0));
    }

    #[test]
    fn test_shield_adds_bonus_over_armor() {
        let mut c = fighter();
        c.inventory.push(Item::shield("Shield", 2));
        let scale = item_id(&c, "Scale Mail");
        let shield = item_id(&c, "Shield");
        let c = apply(c, &Edit::EquipItem { item_id: scale }, 0);
        let c = apply(c, &Edit::EquipItem { item_id: shield.clone() }, 0);
        assert_eq!(c.armor_class, 14 + 2 + 2);

        let c = apply(c, &Edit::UnequipItem { item_id: shield }, 0);
        assert_eq!(c.armor_class, 16);
    }

    #[test]
    fn test_weapon_attack_follows_equip_state() {
        let c = fighter();
        let bow = item_id(&c, "Longbow");
        let c = apply(c, &Edit::AddAttack { attack: Attack::new("Punch", "1", Attribute::Strength) }, 0);

        let c = apply(c, &Edit::EquipItem { item_id: bow.clone() }, 0);
        let generated: Vec<_> = c.attacks.iter().filter(|a| a.is_generated()).collect();
        assert_eq!(generated.len(), 1);
        assert!(generated[0].uses_ammunition);
        assert_eq!(generated[0].attribute, Attribute::Dexterity);

        let c = apply(c, &Edit::UnequipItem { item_id: bow }, 0);
        assert_eq!(c.attacks.len(), 1);
        assert_eq!(c.attacks[0].name, "Punch");
    }

    #[test]
    fn test_generated_attacks_are_not_removable_directly() {
        let c = fighter();
        let sword = item_id(&c, "Longsword");
        let c = apply(c, &Edit::EquipItem { item_id: sword.clone() }, 0);
        let attack_id = crate::character::weapon_attack_id(&sword);
        let c = apply(c, &Edit::RemoveAttack { attack_id: attack_id.clone() }, 0);
        assert!(c.attacks.iter().any(|a| a.id == attack_id));
    }

    #[test]
    fn test_removing_equipped_weapon_drops_its_attack() {
        let c = fighter();
        let sword = item_id(&c, "Longsword");
        let c = apply(c, &Edit::EquipItem { item_id: sword.clone() }, 0);
        let c = apply(c, &Edit::RemoveItem { item_id: sword }, 0);
        assert!(c.attacks.is_empty());
    }

    #[test]
    fn test_damage_consumes_temp_hp_first() {
        let mut c = fighter();
        c.temp_hp = 5;
        let c = apply(c, &Edit::AdjustHp { delta: -8 }, 0);
        assert_eq!(c.temp_hp, 0);
        assert_eq!(c.current_hp, 25);

        let c = apply(c, &Edit::AdjustHp { delta: -100 }, 0);
        assert_eq!(c.current_hp, 0);

        let c = apply(c, &Edit::AdjustHp { delta: 1000 }, 0);
        assert_eq!(c.current_hp, 28);
        assert_eq!(c.history.latest().map(|h| h.category), Some(HistoryCategory::Health));
    }

    #[test]
    fn test_sanity_is_clamped() {
        let c = fighter();
        let max = c.max_sanity;
        let c = apply(c, &Edit::AdjustSanity { delta: -1000 }, 0);
        assert_eq!(c.sanity, 0);
        let c = apply(c, &Edit::AdjustSanity { delta: 1000 }, 0);
        assert_eq!(c.sanity, max);
    }

    #[test]
    fn test_resource_spend_clamps_at_zero() {
        let mut c = fighter();
        let mut rage = Resource::new("Rage", 3);
        rage.current = 3;
        let id = rage.id.clone();
        c.resources.push(rage);

        let c = apply(c, &Edit::AdjustResource { resource_id: id.clone(), delta: -999 }, 0);
        assert_eq!(c.resource(&id).map(|r| r.current), Some(0));
        let c = apply(c, &Edit::AdjustResource { resource_id: id.clone(), delta: 999 }, 0);
        assert_eq!(c.resource(&id).map(|r| r.current), Some(3));
    }

    #[test]
    fn test_unchanged_resource_is_not_logged() {
        let c = fighter();
        let id = c.resources[0].id.clone();
        let before = c.history.len();
        let c = apply(c, &Edit::AdjustResource { resource_id: id, delta: 5 }, 0);
        assert_eq!(c.history.len(), before);
    }

    #[test]
    fn test_unknown_ids_are_no_ops() {
        let c = fighter();
        let edits = [
            Edit::EquipItem { item_id: "missing".into() },
            Edit::RemoveItem { item_id: "missing".into() },
            Edit::AdjustResource { resource_id: "missing".into(), delta: -1 },
            Edit::UseAbility { ability_id: "missing".into() },
            Edit::CastSpell { spell_id: "missing".into() },
            Edit::RemoveAttack { attack_id: "missing".into() },
        ];
        let after = apply_all(c.clone(), &edits, 0);
        assert_eq!(after, c);
    }

    #[test]
    fn test_ability_with_insufficient_resource_is_no_op() {
        let mut c = fighter();
        let resource_id = c.resources[0].id.clone();
        let surge = Ability::new("Action Surge").costing(resource_id.clone(), 2);
        let surge_id = surge.id.clone();
        c.abilities.push(surge);

        let after = apply(c.clone(), &Edit::UseAbility { ability_id: surge_id }, 0);
        assert_eq!(after, c);

        let wind = Ability::new("Second Wind").costing(resource_id.clone(), 1);
        let wind_id = wind.id.clone();
        let c = apply(c, &Edit::AddAbility { ability: wind }, 0);
        let c = apply(c, &Edit::UseAbility { ability_id: wind_id }, 0);
        assert_eq!(c.resource(&resource_id).map(|r| r.current), Some(0));
    }

    #[test]
    fn test_cast_spell_consumes_slot() {
        let mut c = fighter();
        let slots = Resource::spell_slots(1, 2);
        let slot_id = slots.id.clone();
        c.resources.push(slots);
        let spell = Spell::new("Shield", 1, "abjuration").using_slot(slot_id.clone());
        let spell_id = spell.id.clone();
        c.spells.push(spell);

        let c = apply_all(
            c,
            &[
                Edit::CastSpell { spell_id: spell_id.clone() },
                Edit::CastSpell { spell_id: spell_id.clone() },
                Edit::CastSpell { spell_id },
            ],
            0,
        );
        assert_eq!(c.resource(&slot_id).map(|r| r.current), Some(0));
    }

    #[test]
    fn test_spell_preparation_is_gated() {
        let mut c = fighter();
        c.resources.push(Resource::spell_slots(1, 1));
        c.known_schools = vec!["evocation".to_string()];
        let missile = Spell::new("Magic Missile", 1, "evocation");
        let sleep = Spell::new("Sleep", 1, "enchantment");
        let burning = Spell::new("Burning Hands", 1, "evocation");
        let ids = [missile.id.clone(), sleep.id.clone(), burning.id.clone()];
        c.spells.extend([missile, sleep, burning]);

        let prepare = |id: &str| Edit::SetSpellPrepared { spell_id: id.to_string(), prepared: true };
        let c = apply_all(c, &[prepare(&ids[0]), prepare(&ids[1]), prepare(&ids[2])], 0);
        let prepared: Vec<bool> = c.spells.iter().map(|s| s.prepared).collect();
        assert_eq!(prepared, vec![true, false, false]);

        let c = apply(c, &Edit::SetPreparationCap { level: 1, cap: Some(2) }, 0);
        let c = apply(c, &prepare(&ids[2]), 0);
        assert!(c.spells[2].prepared);
    }

    #[test]
    fn test_cantrips_ignore_cap() {
        let mut c = fighter();
        let light = Spell::new("Light", 0, "evocation");
        let id = light.id.clone();
        c.spells.push(light);
        let c = apply(c, &Edit::SetSpellPrepared { spell_id: id, prepared: true }, 0);
        assert!(c.spells[0].prepared);
    }

    #[test]
    fn test_level_change_recomputes_proficiency() {
        let c = fighter();
        let c = apply(c, &Edit::SetLevel { level: 5 }, 7);
        assert_eq!(c.proficiency_bonus, 3);
        let latest = c.history.latest().unwrap();
        assert_eq!(latest.category, HistoryCategory::Level);
        assert_eq!(latest.at, 7);
    }

    #[test]
    fn test_level_up_requires_experience() {
        let c = fighter();
        let c = apply(c, &Edit::LevelUp, 0);
        assert_eq!(c.level, 3);
        let c = apply(c, &Edit::AddExperience { amount: 1800 }, 0);
        let c = apply(c, &Edit::LevelUp, 0);
        assert_eq!(c.level, 4);
    }

    #[test]
    fn test_constitution_resizes_limbs() {
        let c = fighter();
        let c = apply(c, &Edit::SetAttribute { attribute: Attribute::Constitution, score: 10 }, 0);
        assert!(c.limbs.iter().all(|l| l.max_hp == 14 && l.current_hp <= 14));
    }

    #[test]
    fn test_dexterity_refreshes_ac() {
        let c = fighter();
        let c = apply(c, &Edit::SetAttribute { attribute: Attribute::Dexterity, score: 18 }, 0);
        assert_eq!(c.armor_class, 14);
        let c = apply(c, &Edit::SetAttributeBonus { attribute: Attribute::Dexterity, bonus: 1 }, 0);
        assert_eq!(c.armor_class, 15);
    }

    #[test]
    fn test_limb_damage_floors_at_destroyed() {
        let c = fighter();
        let c = apply(c, &Edit::DamageLimb { limb: LimbId::LeftArm, amount: 100 }, 0);
        let arm = c.limb(LimbId::LeftArm).unwrap();
        assert_eq!(arm.current_hp, -10);
        assert_eq!(arm.injury(), rules::LimbInjury::Destroyed);

        let c = apply(c, &Edit::HealLimb { limb: LimbId::LeftArm, amount: 500 }, 0);
        let arm = c.limb(LimbId::LeftArm).unwrap();
        assert_eq!(arm.current_hp, arm.max_hp);
    }

    #[test]
    fn test_rests_recharge_by_kind() {
        let mut c = fighter();
        let mut rage = Resource::new("Rage", 2);
        rage.current = 0;
        c.resources.push(rage);
        c.resources[0].current = 0;

        let c = apply(c, &Edit::ShortRest, 0);
        assert_eq!(c.resources[0].current, 1);
        assert_eq!(c.resources[1].current, 0);

        let mut c = apply(c, &Edit::AdjustHp { delta: -10 }, 0);
        c.temp_hp = 4;
        let c = apply(c, &Edit::LongRest, 0);
        assert_eq!(c.resources[1].current, 2);
        assert_eq!(c.current_hp, 28);
        assert_eq!(c.temp_hp, 0);
    }

    #[test]
    fn test_currency_edits() {
        let c = fighter();
        let c = apply(c, &Edit::AdjustCurrency { coin: Coin::Gold, delta: -50 }, 0);
        assert_eq!(c.currency.gold, 0);
        let c = apply(c, &Edit::ConvertCurrency { from: Coin::Silver, to: Coin::Copper, amount: 5 }, 0);
        assert_eq!(c.currency.copper, 50);
        assert_eq!(c.currency.silver, 0);
        assert_eq!(c.history.latest().map(|h| h.category), Some(HistoryCategory::Currency));
    }

    #[test]
    fn test_quantity_never_negative() {
        let c = fighter();
        let arrows = item_id(&c, "Arrows");
        let c = apply(c, &Edit::AdjustItemQuantity { item_id: arrows.clone(), delta: -50 }, 0);
        assert_eq!(c.item(&arrows).map(|i| i.quantity), Some(0));
    }

    #[test]
    fn test_resistance_upsert() {
        let c = fighter();
        let fire = |level| Edit::SetResistance {
            resistance: Resistance { damage_type: "fire".into(), level },
        };
        let c = apply(c, &fire(ResistanceLevel::Resistance), 0);
        let c = apply(c, &fire(ResistanceLevel::Immunity), 0);
        assert_eq!(c.resistances.len(), 1);
        assert_eq!(c.resistances[0].level, ResistanceLevel::Immunity);
        let c = apply(c, &Edit::RemoveResistance { damage_type: "FIRE".into() }, 0);
        assert!(c.resistances.is_empty());
    }

    #[test]
    fn test_added_items_start_unequipped() {
        let c = fighter();
        let mut torch = Item::new("Torch", ItemKind::Item);
        torch.equipped = true;
        let c = apply(c, &Edit::AddItem { item: torch }, 0);
        assert!(!c.inventory.last().unwrap().equipped);
    }

    #[test]
    fn test_edits_serialize_with_type_tag() {
        let edit = Edit::AdjustHp { delta: -3 };
        let json = serde_json::to_value(&edit).unwrap();
        assert_eq!(json["type"], "adjust_hp");
        let back: Edit = serde_json::from_value(json).unwrap();
        assert_eq!(back, edit);
    }
}
