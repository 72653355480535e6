//! Category Aggregate
//!
//! Categories form a forest through `parent_id`. `sku_code` is the one
//! place a category's SKU prefix is configured.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    pub sku_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("a category cannot be its own ancestor")]
    Cycle,
    #[error("parent category not found")]
    UnknownParent,
    #[error("category still has {0} child categories")]
    HasChildren(usize),
    #[error("category still has {0} products")]
    HasProducts(i64),
    #[error("category name must not be empty")]
    BlankName,
    #[error("slug \"{0}\" must be lowercase letters, digits and hyphens")]
    InvalidSlug(String),
    #[error("SKU code \"{0}\" must be 2 to 4 uppercase letters or digits")]
    InvalidSkuCode(String),
}

impl Category {
    pub fn new(name: &str, slug: Option<&str>, parent_id: Option<Uuid>, sku_code: Option<&str>) -> Result<Self, CategoryError> {
        let name = name.trim();
        if name.is_empty() { return Err(CategoryError::BlankName); }
        let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => validate_slug(s)?,
            None => slugify(name),
        };
        let sku_code = sku_code.map(validate_sku_code).transpose()?;
        Ok(Self { id: Uuid::now_v7(), name: name.to_string(), slug, parent_id, sku_code })
    }
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        let c = match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'á' | 'â' | 'ä' => 'a',
            c => c,
        };
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn validate_slug(slug: &str) -> Result<String, CategoryError> {
    let ok = slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');
    if ok { Ok(slug.to_string()) } else { Err(CategoryError::InvalidSlug(slug.to_string())) }
}

pub fn validate_sku_code(code: &str) -> Result<String, CategoryError> {
    let code = code.trim().to_uppercase();
    let ok = (2..=4).contains(&code.len()) && code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if ok { Ok(code) } else { Err(CategoryError::InvalidSkuCode(code)) }
}

/// In-memory view of the whole category forest.
#[derive(Clone, Debug, Default)]
pub struct CategoryTree {
    nodes: HashMap<Uuid, Category>,
    children: HashMap<Uuid, Vec<Uuid>>,
}

impl CategoryTree {
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        let mut tree = Self::default();
        for category in categories {
            if let Some(parent) = category.parent_id {
                tree.children.entry(parent).or_default().push(category.id);
            }
            tree.nodes.insert(category.id, category);
        }
        tree
    }

    pub fn get(&self, id: Uuid) -> Option<&Category> { self.nodes.get(&id) }

    pub fn children(&self, id: Uuid) -> &[Uuid] { self.children.get(&id).map(Vec::as_slice).unwrap_or(&[]) }

    /// `id` and everything below it.
    pub fn descendants(&self, id: Uuid) -> HashSet<Uuid> {
        let mut out = HashSet::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if out.insert(next) {
                stack.extend(self.children(next).iter().copied());
            }
        }
        out
    }

    /// Rejects moving `id` under `new_parent` when that would close a loop.
    pub fn check_parent(&self, id: Uuid, new_parent: Option<Uuid>) -> Result<(), CategoryError> {
        let Some(parent) = new_parent else { return Ok(()) };
        if !self.nodes.contains_key(&parent) { return Err(CategoryError::UnknownParent); }
        let mut cursor = Some(parent);
        let mut steps = 0;
        while let Some(current) = cursor {
            if current == id || steps > self.nodes.len() { return Err(CategoryError::Cycle); }
            cursor = self.nodes.get(&current).and_then(|c| c.parent_id);
            steps += 1;
        }
        Ok(())
    }

    pub fn check_deletable(&self, id: Uuid, product_count: i64) -> Result<(), CategoryError> {
        let children = self.children(id).len();
        if children > 0 { return Err(CategoryError::HasChildren(children)); }
        if product_count > 0 { return Err(CategoryError::HasProducts(product_count)); }
        Ok(())
    }
}

/// The default fencing category forest: `(group, [(name, slug, code)])`.
pub const DEFAULT_CATEGORIES: &[(&str, &[(&str, &str, &str)])] = &[
    ("Weapons", &[
        ("Foils", "foils", "FOI"),
        ("Épées", "epees", "EPE"),
        ("Sabres", "sabres", "SBR"),
        ("Practice Weapons", "practice-weapons", "PRC"),
        ("Weapon Parts", "weapon-parts", "WPT"),
    ]),
    ("Protective Gear", &[
        ("Masks & Accessories", "masks", "MSK"),
        ("Gloves", "gloves", "GLV"),
        ("Chest Protectors", "chest-protectors", "CHG"),
        ("Plastrons", "plastrons", "PLS"),
    ]),
    ("Clothing", &[
        ("Jackets", "jackets", "JKT"),
        ("Breeches", "breeches", "BRH"),
        ("Lames", "lames", "LAM"),
        ("Socks", "socks", "SOC"),
        ("Shoes", "shoes", "SHO"),
    ]),
    ("Electrics", &[
        ("Body Cords", "body-cords", "BDC"),
        ("Electric Blades", "electric-blades", "ELB"),
        ("Electric Weapons", "electric-weapons", "ELW"),
        ("Scoring Equipment", "scoring-equipment", "SCR"),
    ]),
    ("Bags", &[
        ("Weapon Bags", "weapon-bags", "WBG"),
        ("Roll Bags", "roll-bags", "RBG"),
        ("Backpacks", "backpacks", "BKP"),
    ]),
    ("Accessories", &[
        ("Tools & Maintenance", "tools", "TLS"),
        ("Tape", "tape", "TAP"),
        ("Testers", "testers", "TST"),
        ("Miscellaneous", "misc", "MSC"),
    ]),
];

/// Builds the default forest with fresh ids, parents first.
pub fn default_categories() -> Vec<Category> {
    let mut out = Vec::new();
    for (group, children) in DEFAULT_CATEGORIES {
        let parent = Category { id: Uuid::now_v7(), name: group.to_string(), slug: slugify(group), parent_id: None, sku_code: None };
        let parent_id = parent.id;
        out.push(parent);
        out.extend(children.iter().map(|(name, slug, code)| Category {
            id: Uuid::now_v7(),
            name: name.to_string(),
            slug: slug.to_string(),
            parent_id: Some(parent_id),
            sku_code: Some(code.to_string()),
        }));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, parent: Option<&Category>) -> Category {
        Category::new(name, None, parent.map(|p| p.id), None).unwrap()
    }

    #[test]
    fn slugify_names() {
        assert_eq!(slugify("Masks & Accessories"), "masks-accessories");
        assert_eq!(slugify("Épées"), "epees");
        assert_eq!(slugify("  Roll Bags "), "roll-bags");
    }

    #[test]
    fn new_category_validates_fields() {
        assert_eq!(Category::new(" ", None, None, None), Err(CategoryError::BlankName));
        assert!(matches!(Category::new("Tape", Some("Tape!"), None, None), Err(CategoryError::InvalidSlug(_))));
        assert_eq!(Category::new("Tape", None, None, Some("tap")).unwrap().sku_code.as_deref(), Some("TAP"));
        assert!(Category::new("Tape", None, None, Some("TAPES")).is_err());
    }

    #[test]
    fn descendants_include_whole_subtree() {
        let weapons = node("Weapons", None);
        let foils = node("Foils", Some(&weapons));
        let blades = node("Foil Blades", Some(&foils));
        let bags = node("Bags", None);
        let tree = CategoryTree::new([weapons.clone(), foils.clone(), blades.clone(), bags.clone()]);
        let set = tree.descendants(weapons.id);
        assert_eq!(set, HashSet::from([weapons.id, foils.id, blades.id]));
        assert_eq!(tree.descendants(bags.id), HashSet::from([bags.id]));
    }

    #[test]
    fn reparenting_under_a_descendant_is_a_cycle() {
        let weapons = node("Weapons", None);
        let foils = node("Foils", Some(&weapons));
        let blades = node("Foil Blades", Some(&foils));
        let tree = CategoryTree::new([weapons.clone(), foils.clone(), blades.clone()]);
        assert_eq!(tree.check_parent(weapons.id, Some(blades.id)), Err(CategoryError::Cycle));
        assert_eq!(tree.check_parent(weapons.id, Some(weapons.id)), Err(CategoryError::Cycle));
        assert_eq!(tree.check_parent(blades.id, Some(weapons.id)), Ok(()));
        assert_eq!(tree.check_parent(blades.id, Some(Uuid::now_v7())), Err(CategoryError::UnknownParent));
    }

    #[test]
    fn deletion_is_blocked_by_children_or_products() {
        let weapons = node("Weapons", None);
        let foils = node("Foils", Some(&weapons));
        let tree = CategoryTree::new([weapons.clone(), foils.clone()]);
        assert_eq!(tree.check_deletable(weapons.id, 0), Err(CategoryError::HasChildren(1)));
        assert_eq!(tree.check_deletable(foils.id, 2), Err(CategoryError::HasProducts(2)));
        assert_eq!(tree.check_deletable(foils.id, 0), Ok(()));
    }

    #[test]
    fn default_forest_has_codes_on_leaves() {
        let categories = default_categories();
        assert_eq!(categories.len(), 6 + 25);
        let gloves = categories.iter().find(|c| c.name == "Gloves").unwrap();
        assert_eq!(gloves.sku_code.as_deref(), Some("GLV"));
        assert!(gloves.parent_id.is_some());
    }
}
