//! Option and value edits on an existing variant parent.
//!
//! Options are matched by name and values by string within their option, so
//! anything that survives an edit keeps its id and therefore its variants.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::combinations::VariantError;
use crate::domain::aggregates::product::{VariantOption, VariantValue};

pub const OPTION_NAME_MAX_LEN: usize = 50;
pub const VALUE_MAX_LEN: usize = 50;

/// Values as typed by the admin: a list, or one comma separated string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValuesInput {
    List(Vec<String>),
    Joined(String),
}

impl ValuesInput {
    /// Trimmed values with empties dropped.
    pub fn normalize(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            ValuesInput::List(items) => items.iter().map(String::as_str).collect(),
            ValuesInput::Joined(joined) => joined.split(',').collect(),
        };
        raw.into_iter().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string).collect()
    }
}

impl Default for ValuesInput {
    fn default() -> Self { ValuesInput::List(Vec::new()) }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionInput {
    pub name: String,
    #[serde(default)]
    pub values: ValuesInput,
}

/// What option names are compared by: trimmed and lowercased, Unicode-aware.
pub fn option_key(name: &str) -> String { name.trim().to_lowercase() }

/// Checks and normalizes option names. Names compare by [`option_key`].
pub fn normalize_option_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<String>, VariantError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref().trim();
        if name.is_empty() { return Err(VariantError::BlankOption); }
        if name.chars().count() > OPTION_NAME_MAX_LEN {
            return Err(VariantError::TooLong { field: "option name", max: OPTION_NAME_MAX_LEN, value: name.to_string() });
        }
        if !seen.insert(option_key(name)) { return Err(VariantError::DuplicateOption(name.to_string())); }
        out.push(name.to_string());
    }
    Ok(out)
}

/// Checks one option's values: at least one, unique, and short enough.
pub fn normalize_values(option: &str, values: &ValuesInput) -> Result<Vec<String>, VariantError> {
    let values = values.normalize();
    if values.is_empty() { return Err(VariantError::EmptyOption { option: option.to_string() }); }
    let mut seen = HashSet::new();
    for value in &values {
        if value.chars().count() > VALUE_MAX_LEN {
            return Err(VariantError::TooLong { field: "value", max: VALUE_MAX_LEN, value: value.clone() });
        }
        if !seen.insert(value.as_str()) {
            return Err(VariantError::DuplicateValue { option: option.to_string(), value: value.clone() });
        }
    }
    Ok(values)
}

#[derive(Clone, Debug, Default)]
pub struct StructureChange {
    /// The complete new structure, in order, with ids.
    pub options: Vec<VariantOption>,
    pub new_options: Vec<Uuid>,
    pub new_values: Vec<Uuid>,
    pub removed_options: Vec<Uuid>,
    pub removed_values: Vec<Uuid>,
}

impl StructureChange {
    pub fn is_unchanged(&self, existing: &[VariantOption]) -> bool {
        self.new_options.is_empty()
            && self.new_values.is_empty()
            && self.removed_options.is_empty()
            && self.removed_values.is_empty()
            && self.options.iter().zip(existing).all(|(a, b)| {
                a.id == b.id && a.values.iter().map(|v| v.id).eq(b.values.iter().map(|v| v.id))
            })
    }
}

/// Builds the new option structure for `product_id`, reusing ids of
/// options and values that are still present.
pub fn plan_structure(product_id: Uuid, existing: &[VariantOption], desired: &[OptionInput]) -> Result<StructureChange, VariantError> {
    if desired.is_empty() { return Err(VariantError::NoOptions); }
    let names = normalize_option_names(&desired.iter().map(|o| o.name.as_str()).collect::<Vec<_>>())?;

    let mut change = StructureChange::default();
    let mut kept_options = HashSet::new();
    for (position, (name, input)) in names.into_iter().zip(desired).enumerate() {
        let values = normalize_values(&name, &input.values)?;
        let key = option_key(&name);
        let current = existing.iter().find(|o| option_key(&o.name) == key);
        let option_id = match current {
            Some(option) => {
                kept_options.insert(option.id);
                option.id
            }
            None => {
                let id = Uuid::now_v7();
                change.new_options.push(id);
                id
            }
        };

        let mut kept_values = HashSet::new();
        let values: Vec<VariantValue> = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let id = match current.and_then(|o| o.values.iter().find(|v| v.value == value)) {
                    Some(found) => {
                        kept_values.insert(found.id);
                        found.id
                    }
                    None => {
                        let id = Uuid::now_v7();
                        change.new_values.push(id);
                        id
                    }
                };
                VariantValue { id, option_id, value, position: i as i32 }
            })
            .collect();

        if let Some(option) = current {
            change.removed_values.extend(option.values.iter().map(|v| v.id).filter(|id| !kept_values.contains(id)));
        }
        change.options.push(VariantOption { id: option_id, product_id, name, position: position as i32, values });
    }

    for option in existing.iter().filter(|o| !kept_options.contains(&o.id)) {
        change.removed_options.push(option.id);
        change.removed_values.extend(option.values.iter().map(|v| v.id));
    }
    Ok(change)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(input: &OptionInput, product_id: Uuid, position: i32) -> VariantOption {
        let id = Uuid::now_v7();
        let values = input
            .values
            .normalize()
            .into_iter()
            .enumerate()
            .map(|(i, value)| VariantValue { id: Uuid::now_v7(), option_id: id, value, position: i as i32 })
            .collect();
        VariantOption { id, product_id, name: input.name.clone(), position, values }
    }

    fn input(name: &str, values: &str) -> OptionInput {
        OptionInput { name: name.into(), values: ValuesInput::Joined(values.into()) }
    }

    #[test]
    fn comma_separated_values_are_trimmed() {
        assert_eq!(ValuesInput::Joined(" S, M ,,L ".into()).normalize(), vec!["S", "M", "L"]);
        let parsed: OptionInput = serde_json::from_str(r#"{"name":"Hand","values":["Left"," Right "]}"#).unwrap();
        assert_eq!(parsed.values.normalize(), vec!["Left", "Right"]);
    }

    #[test]
    fn names_and_values_are_validated() {
        assert_eq!(normalize_option_names(&["Size", " size "]), Err(VariantError::DuplicateOption("size".into())));
        assert_eq!(normalize_option_names(&["  "]), Err(VariantError::BlankOption));
        assert!(matches!(normalize_values("Size", &ValuesInput::Joined(" , ".into())), Err(VariantError::EmptyOption { .. })));
        assert!(matches!(normalize_values("Size", &ValuesInput::Joined("S,S".into())), Err(VariantError::DuplicateValue { .. })));
        assert!(normalize_values("Size", &ValuesInput::Joined("s,S".into())).is_ok());
    }

    #[test]
    fn surviving_options_and_values_keep_their_ids() {
        let product_id = Uuid::now_v7();
        let size_in = input("Size", "S,M,L");
        let hand_in = input("Hand", "Left,Right");
        let existing = vec![option(&size_in, product_id, 0), option(&hand_in, product_id, 1)];

        let desired = vec![input("Colour", "Red"), input("Size", "M,S,XL")];
        let change = plan_structure(product_id, &existing, &desired).unwrap();

        let size = &change.options[1];
        assert_eq!(size.id, existing[0].id);
        assert_eq!(size.position, 1);
        assert_eq!(size.values[0].id, existing[0].values[1].id);
        assert_eq!(size.values[1].id, existing[0].values[0].id);
        assert_eq!(change.new_options, vec![change.options[0].id]);
        assert_eq!(change.new_values.len(), 2);
        assert_eq!(change.removed_options, vec![existing[1].id]);
        let mut removed = change.removed_values.clone();
        removed.sort();
        let mut expected = vec![existing[0].values[2].id, existing[1].values[0].id, existing[1].values[1].id];
        expected.sort();
        assert_eq!(removed, expected);
        assert!(!change.is_unchanged(&existing));
    }

    #[test]
    fn accented_option_names_match_regardless_of_case() {
        let product_id = Uuid::now_v7();
        let existing = vec![option(&input("Épée", "Pistol,French"), product_id, 0)];
        let change = plan_structure(product_id, &existing, &[input("épée", "Pistol,French")]).unwrap();
        assert_eq!(change.options[0].id, existing[0].id);
        assert!(change.new_options.is_empty());
        assert!(change.removed_options.is_empty());
        assert!(change.new_values.is_empty());
        assert_eq!(normalize_option_names(&["Épée", "ÉPÉE"]), Err(VariantError::DuplicateOption("ÉPÉE".into())));
    }

    #[test]
    fn identical_structure_is_unchanged() {
        let product_id = Uuid::now_v7();
        let size_in = input("Size", "S,M");
        let existing = vec![option(&size_in, product_id, 0)];
        let change = plan_structure(product_id, &existing, &[size_in]).unwrap();
        assert!(change.is_unchanged(&existing));
    }

    #[test]
    fn no_options_is_rejected() {
        assert_eq!(plan_structure(Uuid::now_v7(), &[], &[]).unwrap_err(), VariantError::NoOptions);
    }
}
