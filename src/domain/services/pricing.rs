//! Rule-based defaults for variant price, impact and stock.
//!
//! Base rules are scanned in authored order and the first whose conditions
//! all hold supplies the base figures. Every matching modifier then adds its
//! deltas on top. The result only pre-fills the admin's variant form.

use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::combinations::{Axis, Combination, OptionValue};
use crate::domain::value_objects::round2;

/// `option = value`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ConditionInput")]
pub struct Condition {
    pub option: String,
    pub value: String,
}

/// A condition as submitted: structured, or the legacy `option=value` text.
#[derive(Deserialize)]
#[serde(untagged)]
enum ConditionInput {
    Pair { option: String, value: String },
    Text(String),
}

impl TryFrom<ConditionInput> for Condition {
    type Error = PricingError;

    fn try_from(input: ConditionInput) -> Result<Self, Self::Error> {
        match input {
            ConditionInput::Pair { option, value } if !option.trim().is_empty() && !value.trim().is_empty() => {
                Ok(Self::new(option.trim(), value.trim()))
            }
            ConditionInput::Pair { option, value } => Err(PricingError::MalformedCondition(format!("{option}={value}"))),
            ConditionInput::Text(raw) => Self::parse(&raw),
        }
    }
}

impl Condition {
    pub fn new(option: impl Into<String>, value: impl Into<String>) -> Self {
        Self { option: option.into(), value: value.into() }
    }

    /// Accepts the `Size=Large` form used by older rule editors.
    pub fn parse(raw: &str) -> Result<Self, PricingError> {
        let (option, value) = raw.split_once('=').ok_or_else(|| PricingError::MalformedCondition(raw.to_string()))?;
        let (option, value) = (option.trim(), value.trim());
        if option.is_empty() || value.is_empty() || value.contains('=') {
            return Err(PricingError::MalformedCondition(raw.to_string()));
        }
        Ok(Self::new(option, value))
    }

    pub fn matches(&self, selections: &HashMap<&str, &str>) -> bool {
        selections.get(self.option.as_str()) == Some(&self.value.as_str())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}={}", self.option, self.value) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseRule {
    /// All must hold. An empty list matches every combination.
    pub conditions: Vec<Condition>,
    pub price: Decimal,
    pub impact: Decimal,
    pub stock: i32,
}

impl BaseRule {
    pub fn matches(&self, selections: &HashMap<&str, &str>) -> bool {
        self.conditions.iter().all(|c| c.matches(selections))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub condition: Condition,
    #[serde(default)]
    pub price_delta: Decimal,
    #[serde(default)]
    pub impact_delta: Decimal,
    #[serde(default)]
    pub stock_delta: i32,
}

/// Whether modifiers need a base rule to have matched first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierPolicy {
    #[default]
    Unconditional,
    RequireBaseMatch,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingRules {
    #[serde(default)]
    pub base_rules: Vec<BaseRule>,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub modifier_policy: ModifierPolicy,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDefaults {
    pub price: Decimal,
    pub impact: Decimal,
    /// Not clamped; may be negative when modifiers subtract stock.
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("condition \"{0}\" is not of the form option=value")]
    MalformedCondition(String),
    #[error("rule {rule} refers to unknown option \"{option}\"")]
    UnknownOption { rule: String, option: String },
    #[error("rule {rule} refers to unknown value \"{value}\" of option \"{option}\"")]
    UnknownValue { rule: String, option: String, value: String },
    #[error("rule {rule} has more than one condition on option \"{option}\"")]
    RepeatedOption { rule: String, option: String },
    #[error("base rule {rule} has a negative {field}")]
    NegativeBase { rule: String, field: &'static str },
}

/// Computes the pre-filled figures for one combination with the default policy.
pub fn compute_defaults<V: OptionValue>(
    combination: &Combination<V>,
    base_rules: &[BaseRule],
    modifiers: &[Modifier],
) -> VariantDefaults {
    evaluate(combination, base_rules, modifiers, ModifierPolicy::Unconditional)
}

fn evaluate<V: OptionValue>(
    combination: &Combination<V>,
    base_rules: &[BaseRule],
    modifiers: &[Modifier],
    policy: ModifierPolicy,
) -> VariantDefaults {
    let selections = combination.selections();
    let base = base_rules.iter().find(|rule| rule.matches(&selections));

    let (mut price, mut impact, mut stock) = match base {
        Some(rule) => (rule.price, rule.impact, rule.stock),
        None => (Decimal::ZERO, Decimal::ZERO, 0),
    };

    if base.is_some() || policy == ModifierPolicy::Unconditional {
        for modifier in modifiers.iter().filter(|m| m.condition.matches(&selections)) {
            price += modifier.price_delta;
            impact += modifier.impact_delta;
            stock = stock.saturating_add(modifier.stock_delta);
        }
    }

    VariantDefaults { price: round2(price), impact: round2(impact), stock }
}

impl PricingRules {
    pub fn is_empty(&self) -> bool { self.base_rules.is_empty() && self.modifiers.is_empty() }

    pub fn compute_defaults<V: OptionValue>(&self, combination: &Combination<V>) -> VariantDefaults {
        evaluate(combination, &self.base_rules, &self.modifiers, self.modifier_policy)
    }

    /// Checks every condition against the product's options and values.
    pub fn validate<V: OptionValue>(&self, axes: &[Axis<V>]) -> Result<(), PricingError> {
        for (i, rule) in self.base_rules.iter().enumerate() {
            let label = format!("base #{}", i + 1);
            if rule.price < Decimal::ZERO {
                return Err(PricingError::NegativeBase { rule: label, field: "price" });
            }
            if rule.impact < Decimal::ZERO {
                return Err(PricingError::NegativeBase { rule: label, field: "impact" });
            }
            let mut seen = Vec::with_capacity(rule.conditions.len());
            for condition in &rule.conditions {
                if seen.contains(&condition.option.as_str()) {
                    return Err(PricingError::RepeatedOption { rule: label, option: condition.option.clone() });
                }
                seen.push(condition.option.as_str());
                check_condition(&label, condition, axes)?;
            }
        }
        for (i, modifier) in self.modifiers.iter().enumerate() {
            check_condition(&format!("modifier #{}", i + 1), &modifier.condition, axes)?;
        }
        Ok(())
    }

    /// Drops rules whose conditions no longer name a live option value.
    /// Returns how many rules were removed.
    pub fn retain_valid<V: OptionValue>(&mut self, axes: &[Axis<V>]) -> usize {
        let before = self.base_rules.len() + self.modifiers.len();
        self.base_rules.retain(|r| r.conditions.iter().all(|c| condition_is_live(c, axes)));
        self.modifiers.retain(|m| condition_is_live(&m.condition, axes));
        before - self.base_rules.len() - self.modifiers.len()
    }
}

fn condition_is_live<V: OptionValue>(condition: &Condition, axes: &[Axis<V>]) -> bool {
    check_condition("", condition, axes).is_ok()
}

fn check_condition<V: OptionValue>(rule: &str, condition: &Condition, axes: &[Axis<V>]) -> Result<(), PricingError> {
    let axis = axes.iter().find(|a| a.option == condition.option).ok_or_else(|| PricingError::UnknownOption {
        rule: rule.to_string(),
        option: condition.option.clone(),
    })?;
    if axis.values.iter().any(|v| v.label() == condition.value) {
        Ok(())
    } else {
        Err(PricingError::UnknownValue {
            rule: rule.to_string(),
            option: condition.option.clone(),
            value: condition.value.clone(),
        })
    }
}
