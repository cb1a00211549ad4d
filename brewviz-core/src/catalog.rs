//! Menu catalog: drink keys mapped to display metadata and ingredient layers.
//!
//! The catalog is a JSON object keyed by drink id. Entry order in the
//! document is the order of the menu grid.

use std::collections::HashSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::color::Rgb;
use crate::error::CatalogError;

const EMBEDDED_CATALOG: &str = include_str!("catalog.json");

/// Menu section a drink is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Specialty,
    Classic,
    Cold,
    Tea,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Self::Specialty => "Specialty",
            Self::Classic => "Classic",
            Self::Cold => "Cold",
            Self::Tea => "Tea",
        }
    }
}

/// Menu grid filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuFilter {
    #[default]
    All,
    Only(Category),
}

impl MenuFilter {
    pub fn matches(self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == category,
        }
    }
}

/// One ingredient's slice of the drink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientLayer {
    pub name: String,
    pub volume: f32,
    pub color: Rgb,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrinkEntry {
    name: String,
    description: String,
    cup_color: Rgb,
    #[serde(default)]
    steam_color: Option<Rgb>,
    category: Category,
    ingredients: Vec<IngredientLayer>,
}

/// Immutable menu entry
#[derive(Debug, Clone, PartialEq)]
pub struct DrinkRecord {
    pub key: String,
    pub name: String,
    pub description: String,
    pub cup_color: Rgb,
    pub steam_color: Option<Rgb>,
    pub category: Category,
    pub ingredients: Vec<IngredientLayer>,
}

impl DrinkRecord {
    pub fn total_volume(&self) -> f64 {
        self.ingredients.iter().map(|i| f64::from(i.volume)).sum()
    }

    pub fn has_vapor(&self) -> bool {
        self.steam_color.is_some()
    }
}

/// Top-level entries in document order. Unlike `serde_json::Map`, repeated
/// keys are kept so they can be rejected.
struct DocumentEntries(Vec<(String, serde_json::Value)>);

impl<'de> Deserialize<'de> for DocumentEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = DocumentEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of drink keys")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(DocumentEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Ordered, validated set of drinks
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<DrinkRecord>,
}

impl Catalog {
    /// The menu compiled into the binary
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Parse and validate a catalog document
    pub fn from_json(input: &str) -> Result<Self, CatalogError> {
        let DocumentEntries(document) = serde_json::from_str(input)?;
        let mut records = Vec::with_capacity(document.len());
        let mut seen = HashSet::with_capacity(document.len());

        for (key, value) in document {
            if !seen.insert(key.clone()) {
                return Err(CatalogError::DuplicateKey(key));
            }
            let entry: DrinkEntry = serde_json::from_value(value).map_err(|source| CatalogError::Entry {
                key: key.clone(),
                source,
            })?;
            validate_ingredients(&key, &entry.ingredients)?;
            records.push(DrinkRecord {
                key,
                name: entry.name,
                description: entry.description,
                cup_color: entry.cup_color,
                steam_color: entry.steam_color,
                category: entry.category,
                ingredients: entry.ingredients,
            });
        }

        log::debug!("loaded catalog with {} drinks", records.len());
        Ok(Self { records })
    }

    pub fn get(&self, key: &str) -> Option<&DrinkRecord> {
        self.records.iter().find(|r| r.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Look up the drink shown when nothing else is selected
    pub fn featured(&self, key: &str) -> Result<&DrinkRecord, CatalogError> {
        self.get(key)
            .ok_or_else(|| CatalogError::UnknownFeatured(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrinkRecord> {
        self.records.iter()
    }

    /// Keys visible under `filter`, in menu order
    pub fn keys_in(&self, filter: MenuFilter) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| filter.matches(r.category))
            .map(|r| r.key.as_str())
            .collect()
    }

    /// Position of `key` in menu order
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.records.iter().position(|r| r.key == key)
    }

    pub fn at(&self, index: usize) -> Option<&DrinkRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn validate_ingredients(key: &str, ingredients: &[IngredientLayer]) -> Result<(), CatalogError> {
    if ingredients.is_empty() {
        return Err(CatalogError::EmptyIngredients(key.to_string()));
    }
    if let Some(bad) = ingredients
        .iter()
        .find(|i| !(i.volume.is_finite() && i.volume > 0.0))
    {
        return Err(CatalogError::InvalidVolume {
            key: key.to_string(),
            ingredient: bad.name.clone(),
            volume: bad.volume,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_loads_in_order() {
        let catalog = Catalog::embedded().unwrap();
        assert_eq!(catalog.at(0).unwrap().key, "call-the-cops");
        assert!(catalog.len() >= 5);

        let cops = catalog.get("call-the-cops").unwrap();
        assert_eq!(cops.ingredients.len(), 6);
        assert_eq!(cops.ingredients[0].name, "Espresso");
        assert!((cops.total_volume() - 386.0).abs() < 1e-3);
        assert_eq!(cops.steam_color, Some(Rgb::from_u32(0xE8A317)));
    }

    #[test]
    fn test_cold_brew_has_no_steam() {
        let catalog = Catalog::embedded().unwrap();
        assert!(!catalog.get("cold-brew").unwrap().has_vapor());
        assert!(catalog.get("espresso").unwrap().has_vapor());
    }

    #[test]
    fn test_filter_by_category() {
        let catalog = Catalog::embedded().unwrap();
        let cold = catalog.keys_in(MenuFilter::Only(Category::Cold));
        assert_eq!(cold, vec!["cold-brew"]);
        assert_eq!(catalog.keys_in(MenuFilter::All).len(), catalog.len());
    }

    #[test]
    fn test_unknown_key() {
        let catalog = Catalog::embedded().unwrap();
        assert!(catalog.get("decaf-sadness").is_none());
    }

    #[test]
    fn test_featured_must_exist() {
        let catalog = Catalog::embedded().unwrap();
        assert_eq!(catalog.featured("call-the-cops").unwrap().name, catalog.at(0).unwrap().name);
        assert!(matches!(
            catalog.featured("decaf"),
            Err(CatalogError::UnknownFeatured(key)) if key == "decaf"
        ));
    }

    #[test]
    fn test_empty_ingredients_rejected() {
        let doc = r##"{ "nothing": { "name": "Air", "description": "", "cupColor": "#000000",
            "steamColor": null, "category": "classic", "ingredients": [] } }"##;
        assert!(matches!(
            Catalog::from_json(doc),
            Err(CatalogError::EmptyIngredients(key)) if key == "nothing"
        ));
    }

    #[test]
    fn test_huge_volumes_accepted_and_summed() {
        let doc = r##"{ "big": { "name": "Big", "description": "", "cupColor": "#000000",
            "category": "classic",
            "ingredients": [
                { "name": "Espresso", "volume": 3e38, "color": "#3b2314" },
                { "name": "Milk", "volume": 3e38, "color": "#ffffff" }
            ] } }"##;
        let catalog = Catalog::from_json(doc).unwrap();
        let big = catalog.get("big").unwrap();
        assert!(big.total_volume().is_finite());

        let stack = crate::cup::layer_stack(&big.ingredients, &crate::cup::CupConfig::default()).unwrap();
        let span: f32 = stack.iter().map(|s| s.height).sum();
        assert!(span > 0.0);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let entry = r##"{ "name": "Shot", "description": "", "cupColor": "#000000",
            "category": "classic",
            "ingredients": [{ "name": "Espresso", "volume": 30, "color": "#3b2314" }] }"##;
        let doc = format!(r#"{{ "shot": {entry}, "shot": {entry} }}"#);
        assert!(matches!(
            Catalog::from_json(&doc),
            Err(CatalogError::DuplicateKey(key)) if key == "shot"
        ));
    }

    #[test]
    fn test_zero_volume_rejected() {
        let doc = r##"{ "thin": { "name": "Thin", "description": "", "cupColor": "#000000",
            "category": "classic",
            "ingredients": [{ "name": "Water", "volume": 0, "color": "#ffffff" }] } }"##;
        assert!(matches!(
            Catalog::from_json(doc),
            Err(CatalogError::InvalidVolume { ingredient, .. }) if ingredient == "Water"
        ));
    }

    #[test]
    fn test_bad_color_reports_key() {
        let doc = r##"{ "oops": { "name": "Oops", "description": "", "cupColor": "red",
            "category": "classic",
            "ingredients": [{ "name": "Water", "volume": 1, "color": "#ffffff" }] } }"##;
        let err = Catalog::from_json(doc).unwrap_err();
        assert!(err.to_string().contains("oops"));
        assert!(err.to_string().contains("red"));
    }
}
