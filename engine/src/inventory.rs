//! Inventory, equipment slots and gold.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::character::{Character, InventoryEntry};
use crate::content::Catalog;
use crate::dice::{DamageRoll, Dice};
use crate::error::RulesError;
use crate::items::ItemKind;
use crate::life::{self, HealReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Weapon,
    Armor,
    Shield,
}

/// Add to a stack without any catalog check.
pub(crate) fn stash(ch: &mut Character, item: &str, quantity: u32) {
    if quantity == 0 {
        return;
    }
    match ch.inventory.iter_mut().find(|e| e.item == item) {
        Some(entry) => entry.quantity += quantity,
        None => ch.inventory.push(InventoryEntry {
            item: item.to_string(),
            quantity,
        }),
    }
}

pub fn add_item(
    catalog: &Catalog,
    ch: &mut Character,
    item: &str,
    quantity: u32,
) -> Result<(), RulesError> {
    if catalog.item(item).is_none() {
        return Err(RulesError::UnknownItem { id: item.into() });
    }
    stash(ch, item, quantity);
    debug!(character = %ch.name, item, quantity, "item added");
    Ok(())
}

/// Remove `quantity` of an item. Removing the last one also unequips it.
pub fn remove_item(
    catalog: &Catalog,
    ch: &mut Character,
    item: &str,
    quantity: u32,
) -> Result<(), RulesError> {
    let Some(idx) = ch
        .inventory
        .iter()
        .position(|e| e.item == item && e.quantity >= quantity)
    else {
        return Err(RulesError::ItemNotInInventory {
            name: ch.name.clone(),
            item: item.into(),
            quantity,
        });
    };
    ch.inventory[idx].quantity -= quantity;
    if ch.inventory[idx].quantity == 0 {
        ch.inventory.remove(idx);
        for slot in [
            &mut ch.equipped.weapon,
            &mut ch.equipped.armor,
            &mut ch.equipped.shield,
        ] {
            if slot.as_deref() == Some(item) {
                *slot = None;
            }
        }
        ch.recompute_armor_class(catalog);
    }
    debug!(character = %ch.name, item, quantity, "item removed");
    Ok(())
}

/// Equip a carried item into the slot its kind dictates. Returns the slot.
pub fn equip(catalog: &Catalog, ch: &mut Character, item: &str) -> Result<EquipSlot, RulesError> {
    let def = catalog
        .item(item)
        .ok_or_else(|| RulesError::UnknownItem { id: item.into() })?;
    if ch.quantity_of(item) == 0 {
        return Err(RulesError::ItemNotInInventory {
            name: ch.name.clone(),
            item: item.into(),
            quantity: 1,
        });
    }
    let slot = match def.kind {
        ItemKind::Weapon(_) => EquipSlot::Weapon,
        ItemKind::Armor(_) => EquipSlot::Armor,
        ItemKind::Shield(_) => EquipSlot::Shield,
        ItemKind::Potion(_) | ItemKind::Gear => {
            return Err(RulesError::NotEquippable { item: item.into() });
        }
    };
    *slot_mut(ch, slot) = Some(item.to_string());
    ch.recompute_armor_class(catalog);
    debug!(character = %ch.name, item, ?slot, ac = ch.armor_class, "equipped");
    Ok(slot)
}

/// Empty a slot, returning what was in it.
pub fn unequip(catalog: &Catalog, ch: &mut Character, slot: EquipSlot) -> Option<String> {
    let previous = slot_mut(ch, slot).take();
    ch.recompute_armor_class(catalog);
    previous
}

fn slot_mut(ch: &mut Character, slot: EquipSlot) -> &mut Option<String> {
    match slot {
        EquipSlot::Weapon => &mut ch.equipped.weapon,
        EquipSlot::Armor => &mut ch.equipped.armor,
        EquipSlot::Shield => &mut ch.equipped.shield,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotionReport {
    pub item: String,
    pub roll: DamageRoll,
    pub heal: HealReport,
}

/// Drink one potion from the pack.
pub fn use_potion(
    dice: &mut Dice,
    catalog: &Catalog,
    ch: &mut Character,
    item: &str,
) -> Result<PotionReport, RulesError> {
    let def = catalog
        .item(item)
        .ok_or_else(|| RulesError::UnknownItem { id: item.into() })?;
    let potion = def
        .as_potion()
        .ok_or_else(|| RulesError::NotAPotion { item: item.into() })?;
    if ch.is_dead() {
        return Err(RulesError::TargetIsDead {
            name: ch.name.clone(),
        });
    }
    if ch.quantity_of(item) == 0 {
        return Err(RulesError::ItemNotInInventory {
            name: ch.name.clone(),
            item: item.into(),
            quantity: 1,
        });
    }
    let roll = dice.roll_damage(&potion.healing, false);
    let heal = life::heal(ch, roll.total)?;
    remove_item(catalog, ch, item, 1)?;
    Ok(PotionReport {
        item: item.to_string(),
        roll,
        heal,
    })
}

pub fn spend_gold(ch: &mut Character, amount: u32) -> Result<(), RulesError> {
    if ch.gold < amount {
        return Err(RulesError::InsufficientGold {
            name: ch.name.clone(),
            needed: amount,
            available: ch.gold,
        });
    }
    ch.gold -= amount;
    Ok(())
}

pub fn gain_gold(ch: &mut Character, amount: u32) {
    ch.gold = ch.gold.saturating_add(amount);
}
