//! Reference data: items, spells and the bestiary. The built-in catalog is
//! compiled into the binary; other catalogs can be loaded from a directory
//! holding the same three YAML files.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use tracing::debug;

use crate::classes::CharacterClass;
use crate::dice::DiceExpr;
use crate::enemy::EnemyTemplate;
use crate::items::{Armor, Item, ItemKind, Weapon};
use crate::spells::Spell;

const ITEMS_YAML: &str = include_str!("../content/items.yaml");
const SPELLS_YAML: &str = include_str!("../content/spells.yaml");
const MONSTERS_YAML: &str = include_str!("../content/monsters.yaml");

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub items: IndexMap<String, Item>,
    pub spells: IndexMap<String, Spell>,
    pub monsters: IndexMap<String, EnemyTemplate>,
}

static BUILTIN: OnceLock<Catalog> = OnceLock::new();

impl Catalog {
    /// The embedded catalog, parsed on first use.
    pub fn builtin() -> &'static Catalog {
        BUILTIN.get_or_init(|| {
            Catalog::from_yaml(ITEMS_YAML, SPELLS_YAML, MONSTERS_YAML)
                .expect("embedded catalog content is valid")
        })
    }

    pub fn from_yaml(items: &str, spells: &str, monsters: &str) -> Result<Self> {
        let items: Vec<Item> = serde_yaml::from_str(items).context("failed to parse items")?;
        let spells: Vec<Spell> = serde_yaml::from_str(spells).context("failed to parse spells")?;
        let monsters: Vec<EnemyTemplate> =
            serde_yaml::from_str(monsters).context("failed to parse monsters")?;

        let catalog = Self {
            items: index_by_id("item", items, |i| &i.id)?,
            spells: index_by_id("spell", spells, |s| &s.id)?,
            monsters: index_by_id("monster", monsters, |m| &m.id)?,
        };
        catalog.validate()?;
        debug!(
            items = catalog.items.len(),
            spells = catalog.spells.len(),
            monsters = catalog.monsters.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Load `items.yaml`, `spells.yaml` and `monsters.yaml` from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))
        };
        Self::from_yaml(&read("items.yaml")?, &read("spells.yaml")?, &read("monsters.yaml")?)
            .with_context(|| format!("invalid catalog in {}", dir.display()))
    }

    fn validate(&self) -> Result<()> {
        for item in self.items.values() {
            let notations: Vec<&str> = match &item.kind {
                ItemKind::Weapon(w) => std::iter::once(w.damage.as_str())
                    .chain(w.versatile.as_deref())
                    .collect(),
                ItemKind::Potion(p) => vec![p.healing.as_str()],
                _ => Vec::new(),
            };
            for n in notations {
                DiceExpr::parse(n).with_context(|| format!("item '{}'", item.id))?;
            }
        }
        for spell in self.spells.values() {
            if spell.level > 9 {
                bail!("spell '{}' has level {}", spell.id, spell.level);
            }
            if let Some(d) = &spell.damage {
                DiceExpr::parse(&d.dice).with_context(|| format!("spell '{}'", spell.id))?;
            }
            if let Some(h) = &spell.healing {
                DiceExpr::parse(h).with_context(|| format!("spell '{}'", spell.id))?;
            }
        }
        for monster in self.monsters.values() {
            for attack in &monster.attacks {
                DiceExpr::parse(&attack.damage)
                    .with_context(|| format!("monster '{}' attack '{}'", monster.id, attack.name))?;
            }
        }
        Ok(())
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn weapon(&self, id: &str) -> Option<&Weapon> {
        self.item(id).and_then(Item::as_weapon)
    }

    pub fn armor(&self, id: &str) -> Option<&Armor> {
        self.item(id).and_then(Item::as_armor)
    }

    pub fn spell(&self, id: &str) -> Option<&Spell> {
        self.spells.get(id)
    }

    pub fn monster(&self, id: &str) -> Option<&EnemyTemplate> {
        self.monsters.get(id)
    }

    pub fn spells_for_class(&self, class: CharacterClass) -> impl Iterator<Item = &Spell> {
        self.spells
            .values()
            .filter(move |s| s.classes.iter().any(|c| c == class.name()))
    }
}

fn index_by_id<T>(
    what: &str,
    records: Vec<T>,
    id: impl Fn(&T) -> &String,
) -> Result<IndexMap<String, T>> {
    let mut map = IndexMap::with_capacity(records.len());
    for record in records {
        let key = id(&record).clone();
        if map.contains_key(&key) {
            bail!("duplicate {what} id '{key}'");
        }
        map.insert(key, record);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin();
        assert!(catalog.weapon("longsword").is_some());
        assert!(catalog.spell("magic_missile").is_some());
        assert!(catalog.monster("goblin").is_some());
        assert!(catalog.spells_for_class(CharacterClass::Wizard).count() > 3);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let items = "- {id: rope, name: Rope, kind: gear}\n- {id: rope, name: Rope, kind: gear}\n";
        let err = Catalog::from_yaml(items, "[]", "[]").unwrap_err();
        assert!(err.to_string().contains("duplicate item id 'rope'"));
    }

    #[test]
    fn bad_notation_is_rejected() {
        let items = "- {id: stick, name: Stick, kind: weapon, damage: 1dx, damage_type: bludgeoning, category: simple}\n";
        assert!(Catalog::from_yaml(items, "[]", "[]").is_err());
    }
}
