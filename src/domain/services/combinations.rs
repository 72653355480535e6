//! Cartesian expansion of variant options into combinations.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::product::VariantValue;

/// Upper bound on the number of variants one product may expand to.
pub const MAX_COMBINATIONS: usize = 1000;

/// Anything that can stand as a value of a variant option.
pub trait OptionValue {
    fn label(&self) -> &str;
}

impl OptionValue for String {
    fn label(&self) -> &str { self }
}

impl OptionValue for VariantValue {
    fn label(&self) -> &str { &self.value }
}

/// One option and its values, in display order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis<V> {
    pub option: String,
    pub values: Vec<V>,
}

impl<V> Axis<V> {
    pub fn new(option: impl Into<String>, values: Vec<V>) -> Self {
        Self { option: option.into(), values }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick<V> {
    pub option: String,
    pub value: V,
}

/// One value per option, ordered like the axes it was expanded from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combination<V> {
    picks: Vec<Pick<V>>,
}

impl<V> Combination<V> {
    pub fn picks(&self) -> &[Pick<V>] { &self.picks }
    pub fn len(&self) -> usize { self.picks.len() }
    pub fn is_empty(&self) -> bool { self.picks.is_empty() }
    pub fn values(&self) -> impl Iterator<Item = &V> { self.picks.iter().map(|p| &p.value) }
}

impl<V: OptionValue> Combination<V> {
    /// Option name to chosen value label.
    pub fn selections(&self) -> HashMap<&str, &str> {
        self.picks.iter().map(|p| (p.option.as_str(), p.value.label())).collect()
    }

    pub fn labels(&self) -> Vec<&str> { self.picks.iter().map(|p| p.value.label()).collect() }

    pub fn title(&self) -> String { self.labels().join(" / ") }
}

impl Combination<VariantValue> {
    pub fn key(&self) -> CombinationKey { self.picks.iter().map(|p| p.value.id).collect() }

    /// Value ids in option order.
    pub fn value_ids(&self) -> Vec<Uuid> { self.picks.iter().map(|p| p.value.id).collect() }
}

/// Identity of a variant: the set of value ids it is linked to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombinationKey(BTreeSet<Uuid>);

impl CombinationKey {
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn contains(&self, value_id: &Uuid) -> bool { self.0.contains(value_id) }
    pub fn iter(&self) -> impl Iterator<Item = &Uuid> { self.0.iter() }
}

impl FromIterator<Uuid> for CombinationKey {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self { Self(iter.into_iter().collect()) }
}

impl fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.0.iter().map(Uuid::to_string).collect();
        write!(f, "{{{}}}", ids.join(","))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expansion<V> {
    /// The product has no options and is sold as itself.
    NotApplicable,
    Combinations(Vec<Combination<V>>),
}

impl<V> Expansion<V> {
    pub fn into_combinations(self) -> Vec<Combination<V>> {
        match self {
            Expansion::NotApplicable => Vec::new(),
            Expansion::Combinations(combos) => combos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
    #[error("every variant option needs at least one value (\"{option}\" has none)")]
    EmptyOption { option: String },
    #[error("a variant product needs at least one option")]
    NoOptions,
    #[error("option name must not be empty")]
    BlankOption,
    #[error("option \"{0}\" is listed more than once")]
    DuplicateOption(String),
    #[error("value \"{value}\" is listed more than once for option \"{option}\"")]
    DuplicateValue { option: String, value: String },
    #[error("{field} must be at most {max} characters: \"{value}\"")]
    TooLong { field: &'static str, max: usize, value: String },
    #[error("{count} combinations exceeds the limit of {MAX_COMBINATIONS}")]
    TooManyCombinations { count: usize },
    #[error("combination {0} is not part of this product")]
    UnknownCombination(CombinationKey),
    #[error("combination {0} appears more than once")]
    DuplicateCombination(CombinationKey),
    #[error("combination {0} was submitted more than once")]
    DuplicateSubmission(CombinationKey),
    #[error("{field} for {combination} must not be negative")]
    Negative { field: &'static str, combination: String },
}

/// Expands the options into every combination of their values.
///
/// The first option varies slowest and values keep their given order, so
/// the output is reproducible for an unchanged option set.
pub fn expand<V: Clone>(axes: &[Axis<V>]) -> Result<Expansion<V>, VariantError> {
    if axes.is_empty() {
        return Ok(Expansion::NotApplicable);
    }
    if let Some(empty) = axes.iter().find(|a| a.values.is_empty()) {
        return Err(VariantError::EmptyOption { option: empty.option.clone() });
    }
    let count = axes.iter().try_fold(1usize, |acc, a| acc.checked_mul(a.values.len()));
    match count {
        Some(count) if count <= MAX_COMBINATIONS => {}
        Some(count) => return Err(VariantError::TooManyCombinations { count }),
        None => return Err(VariantError::TooManyCombinations { count: usize::MAX }),
    }

    let mut combos: Vec<Vec<Pick<V>>> = vec![Vec::new()];
    for axis in axes {
        let mut next = Vec::with_capacity(combos.len() * axis.values.len());
        for existing in &combos {
            for value in &axis.values {
                let mut picks = existing.clone();
                picks.push(Pick { option: axis.option.clone(), value: value.clone() });
                next.push(picks);
            }
        }
        combos = next;
    }
    Ok(Expansion::Combinations(combos.into_iter().map(|picks| Combination { picks }).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn axis(option: &str, values: &[&str]) -> Axis<String> {
        Axis::new(option, values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn expands_full_cartesian_product_in_order() {
        let axes = vec![axis("Size", &["S", "M", "L"]), axis("Hand", &["Left", "Right"])];
        let combos = expand(&axes).unwrap().into_combinations();
        assert_eq!(combos.len(), 6);
        assert_eq!(combos[0].labels(), vec!["S", "Left"]);
        assert_eq!(combos[1].labels(), vec!["S", "Right"]);
        assert_eq!(combos[5].labels(), vec!["L", "Right"]);
        let distinct: HashSet<Vec<&str>> = combos.iter().map(|c| c.labels()).collect();
        assert_eq!(distinct.len(), 6);
    }

    #[test]
    fn product_size_matches_for_three_options() {
        let axes = vec![
            axis("Size", &["XS", "S", "M", "L"]),
            axis("Colour", &["White", "Black"]),
            axis("Hand", &["Left", "Right", "Ambi"]),
        ];
        let combos = expand(&axes).unwrap().into_combinations();
        assert_eq!(combos.len(), 4 * 2 * 3);
        assert!(combos.iter().all(|c| c.len() == 3));
        assert_eq!(combos[0].selections()["Colour"], "White");
    }

    #[test]
    fn expansion_is_reproducible() {
        let axes = vec![axis("Size", &["S", "M"]), axis("Colour", &["Red", "Blue"])];
        assert_eq!(expand(&axes).unwrap(), expand(&axes).unwrap());
    }

    #[test]
    fn zero_options_is_not_applicable() {
        assert_eq!(expand::<String>(&[]).unwrap(), Expansion::NotApplicable);
    }

    #[test]
    fn option_without_values_is_rejected() {
        let axes = vec![axis("Size", &["S"]), axis("Colour", &[])];
        let err = expand(&axes).unwrap_err();
        assert_eq!(err, VariantError::EmptyOption { option: "Colour".into() });
        assert!(err.to_string().contains("every variant option needs at least one value"));
    }

    #[test]
    fn oversized_expansion_is_rejected() {
        let values: Vec<String> = (0..40).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let axes = vec![axis("A", &refs), axis("B", &refs)];
        assert_eq!(expand(&axes).unwrap_err(), VariantError::TooManyCombinations { count: 1600 });
    }

    #[test]
    fn key_ignores_option_order() {
        let product_id = Uuid::now_v7();
        let s = VariantValue { id: Uuid::now_v7(), option_id: product_id, value: "S".into(), position: 0 };
        let red = VariantValue { id: Uuid::now_v7(), option_id: product_id, value: "Red".into(), position: 0 };
        let a = expand(&[Axis::new("Size", vec![s.clone()]), Axis::new("Colour", vec![red.clone()])]).unwrap();
        let b = expand(&[Axis::new("Colour", vec![red]), Axis::new("Size", vec![s])]).unwrap();
        assert_eq!(a.into_combinations()[0].key(), b.into_combinations()[0].key());
    }
}
