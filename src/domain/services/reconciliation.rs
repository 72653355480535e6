//! Reconciles a product's live variants against its current combinations.
//!
//! Variants are matched by [`CombinationKey`], never by SKU or row id. The
//! plan is applied by the repository inside one transaction.

use std::collections::{BTreeSet, HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::combinations::{Combination, CombinationKey, VariantError};
use super::pricing::{PricingRules, VariantDefaults};
use crate::domain::aggregates::product::{ProductVariant, VariantValue};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{round2, Sku};

/// Price, impact and stock for one variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantInput {
    pub price: Decimal,
    pub impact: Decimal,
    pub stock: i32,
}

impl VariantInput {
    /// Rounds money figures and rejects negatives.
    pub fn checked(self, combination: &str) -> Result<Self, VariantError> {
        let negative = |field: &'static str| VariantError::Negative { field, combination: combination.to_string() };
        if self.price < Decimal::ZERO { return Err(negative("price")); }
        if self.impact < Decimal::ZERO { return Err(negative("impact")); }
        if self.stock < 0 { return Err(negative("stock")); }
        Ok(Self { price: round2(self.price), impact: round2(self.impact), stock: self.stock })
    }

    fn of(variant: &ProductVariant) -> Self {
        Self { price: variant.price, impact: variant.impact, stock: variant.stock }
    }
}

impl From<VariantDefaults> for VariantInput {
    fn from(d: VariantDefaults) -> Self { Self { price: d.price, impact: d.impact, stock: d.stock } }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewVariant {
    pub key: CombinationKey,
    /// In option order, for the join rows and the SKU.
    pub value_ids: Vec<Uuid>,
    pub labels: Vec<String>,
    pub fields: VariantInput,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VariantUpdate {
    pub id: Uuid,
    pub sku: Sku,
    pub fields: VariantInput,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    pub to_create: Vec<NewVariant>,
    pub to_update: Vec<VariantUpdate>,
    /// Join rows go first, then the variant rows.
    pub to_delete: Vec<Uuid>,
    pub unchanged: Vec<Uuid>,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    pub fn event(&self, product_id: Uuid) -> DomainEvent {
        DomainEvent::Product(ProductEvent::VariantsReconciled {
            product_id,
            created: self.to_create.len(),
            updated: self.to_update.len(),
            deleted: self.to_delete.len(),
        })
    }

    /// Keys that will be live once the plan is applied to `existing`.
    pub fn resulting_keys(&self, existing: &[ProductVariant]) -> BTreeSet<CombinationKey> {
        let deleted: HashSet<Uuid> = self.to_delete.iter().copied().collect();
        existing
            .iter()
            .filter(|v| !deleted.contains(&v.id))
            .map(ProductVariant::key)
            .chain(self.to_create.iter().map(|n| n.key.clone()))
            .collect()
    }
}

/// Collects admin submissions, rejecting a combination submitted twice.
pub fn collect_submissions(
    entries: impl IntoIterator<Item = (CombinationKey, VariantInput)>,
) -> Result<HashMap<CombinationKey, VariantInput>, VariantError> {
    let mut map = HashMap::new();
    for (key, input) in entries {
        if map.insert(key.clone(), input).is_some() {
            return Err(VariantError::DuplicateSubmission(key));
        }
    }
    Ok(map)
}

/// Decides which variants to create, update and delete.
///
/// - a desired combination with no live variant is created from its
///   submission, else the rule defaults;
/// - a desired combination with a live variant keeps id and SKU and only
///   changes when a submission differs from what is stored;
/// - a live variant whose key is not desired is deleted, as is any second
///   variant sharing a key.
pub fn reconcile(
    desired: &[Combination<VariantValue>],
    existing: &[ProductVariant],
    submissions: &HashMap<CombinationKey, VariantInput>,
    rules: &PricingRules,
) -> Result<ReconcilePlan, VariantError> {
    let mut desired_keys = HashSet::with_capacity(desired.len());
    for combination in desired {
        let key = combination.key();
        if key.len() != combination.len() || !desired_keys.insert(key.clone()) {
            return Err(VariantError::DuplicateCombination(key));
        }
    }
    if let Some(stray) = submissions.keys().find(|k| !desired_keys.contains(*k)) {
        return Err(VariantError::UnknownCombination(stray.clone()));
    }

    let mut plan = ReconcilePlan::default();
    let mut live: HashMap<CombinationKey, &ProductVariant> = HashMap::with_capacity(existing.len());
    for variant in existing {
        let key = variant.key();
        if !desired_keys.contains(&key) || live.contains_key(&key) {
            plan.to_delete.push(variant.id);
        } else {
            live.insert(key, variant);
        }
    }

    for combination in desired {
        let key = combination.key();
        let title = combination.title();
        let submitted = submissions.get(&key).map(|s| s.checked(&title)).transpose()?;
        match live.get(&key) {
            Some(variant) => match submitted {
                Some(fields) if fields != VariantInput::of(variant) => {
                    plan.to_update.push(VariantUpdate { id: variant.id, sku: variant.sku.clone(), fields });
                }
                _ => plan.unchanged.push(variant.id),
            },
            None => {
                let fields = match submitted {
                    Some(fields) => fields,
                    None => VariantInput::from(rules.compute_defaults(combination)).checked(&title)?,
                };
                plan.to_create.push(NewVariant {
                    key,
                    value_ids: combination.value_ids(),
                    labels: combination.labels().into_iter().map(str::to_string).collect(),
                    fields,
                });
            }
        }
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::combinations::{expand, Axis};
    use crate::domain::services::pricing::{BaseRule, Condition, Modifier};

    fn values(option_id: Uuid, names: &[&str]) -> Vec<VariantValue> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| VariantValue { id: Uuid::now_v7(), option_id, value: n.to_string(), position: i as i32 })
            .collect()
    }

    fn desired(axes: &[Axis<VariantValue>]) -> Vec<Combination<VariantValue>> {
        expand(axes).unwrap().into_combinations()
    }

    /// Applies a plan the way the repository does, minting SKUs in order.
    fn apply(plan: &ReconcilePlan, existing: &[ProductVariant]) -> Vec<ProductVariant> {
        let deleted: HashSet<Uuid> = plan.to_delete.iter().copied().collect();
        let mut out: Vec<ProductVariant> = existing.iter().filter(|v| !deleted.contains(&v.id)).cloned().collect();
        for update in &plan.to_update {
            let v = out.iter_mut().find(|v| v.id == update.id).unwrap();
            v.price = update.fields.price;
            v.impact = update.fields.impact;
            v.stock = update.fields.stock;
        }
        for (i, new) in plan.to_create.iter().enumerate() {
            out.push(ProductVariant {
                id: Uuid::now_v7(),
                product_id: Uuid::nil(),
                sku: Sku::new(format!("GEN-T-{i:04}-{}", out.len())).unwrap(),
                price: new.fields.price,
                impact: new.fields.impact,
                stock: new.fields.stock,
                value_ids: new.value_ids.clone(),
            });
        }
        out
    }

    fn keys(combos: &[Combination<VariantValue>]) -> BTreeSet<CombinationKey> {
        combos.iter().map(Combination::key).collect()
    }

    fn input(price: i64, stock: i32) -> VariantInput {
        VariantInput { price: Decimal::new(price, 0), impact: Decimal::ONE, stock }
    }

    #[test]
    fn first_pass_creates_every_combination() {
        let axes = vec![Axis::new("Size", values(Uuid::now_v7(), &["S", "M", "L"])), Axis::new("Hand", values(Uuid::now_v7(), &["Left", "Right"]))];
        let combos = desired(&axes);
        let rules = PricingRules {
            base_rules: vec![BaseRule { conditions: vec![Condition::new("Size", "L")], price: Decimal::new(50, 0), impact: Decimal::new(2, 0), stock: 5 }],
            modifiers: vec![Modifier { condition: Condition::new("Hand", "Left"), price_delta: Decimal::new(3, 0), impact_delta: Decimal::ZERO, stock_delta: 0 }],
            ..Default::default()
        };
        let plan = reconcile(&combos, &[], &HashMap::new(), &rules).unwrap();
        assert_eq!(plan.to_create.len(), 6);
        assert!(plan.to_update.is_empty() && plan.to_delete.is_empty());
        let large_left = plan.to_create.iter().find(|n| n.labels == ["L", "Left"]).unwrap();
        assert_eq!(large_left.fields, VariantInput { price: Decimal::new(53, 0), impact: Decimal::new(2, 0), stock: 5 });
        assert_eq!(plan.resulting_keys(&[]), keys(&combos));
    }

    #[test]
    fn second_pass_without_changes_is_a_noop() {
        let axes = vec![Axis::new("Size", values(Uuid::now_v7(), &["S", "M"])), Axis::new("Colour", values(Uuid::now_v7(), &["Red", "Blue"]))];
        let combos = desired(&axes);
        let first = reconcile(&combos, &[], &HashMap::new(), &PricingRules::default()).unwrap();
        let live = apply(&first, &[]);
        let second = reconcile(&combos, &live, &HashMap::new(), &PricingRules::default()).unwrap();
        assert!(second.is_noop());
        assert_eq!(second.unchanged.len(), 4);
    }

    #[test]
    fn resubmitting_stored_values_changes_nothing() {
        let axes = vec![Axis::new("Size", values(Uuid::now_v7(), &["S", "M"]))];
        let combos = desired(&axes);
        let live = apply(&reconcile(&combos, &[], &HashMap::new(), &PricingRules::default()).unwrap(), &[]);
        let same = collect_submissions(live.iter().map(|v| (v.key(), VariantInput::of(v)))).unwrap();
        assert!(reconcile(&combos, &live, &same, &PricingRules::default()).unwrap().is_noop());
    }

    #[test]
    fn submissions_update_but_keep_sku_and_id() {
        let axes = vec![Axis::new("Size", values(Uuid::now_v7(), &["S", "M"]))];
        let combos = desired(&axes);
        let live = apply(&reconcile(&combos, &[], &HashMap::new(), &PricingRules::default()).unwrap(), &[]);
        let target = &live[1];
        let subs = collect_submissions([(target.key(), input(40, 6))]).unwrap();
        let plan = reconcile(&combos, &live, &subs, &PricingRules::default()).unwrap();
        assert_eq!(plan.to_update, vec![VariantUpdate { id: target.id, sku: target.sku.clone(), fields: input(40, 6) }]);
        assert!(plan.to_create.is_empty() && plan.to_delete.is_empty());
    }

    #[test]
    fn removing_a_value_deletes_its_variants_only() {
        let size = values(Uuid::now_v7(), &["S", "M", "L"]);
        let colour = values(Uuid::now_v7(), &["Red", "Blue"]);
        let before = desired(&[Axis::new("Size", size.clone()), Axis::new("Colour", colour.clone())]);
        let live = apply(&reconcile(&before, &[], &HashMap::new(), &PricingRules::default()).unwrap(), &[]);

        let after = desired(&[Axis::new("Size", size[..2].to_vec()), Axis::new("Colour", colour)]);
        let plan = reconcile(&after, &live, &HashMap::new(), &PricingRules::default()).unwrap();
        assert_eq!(plan.to_delete.len(), 2);
        assert!(plan.to_create.is_empty());
        assert_eq!(plan.unchanged.len(), 4);
        assert_eq!(plan.resulting_keys(&live), keys(&after));
    }

    #[test]
    fn adding_an_option_replaces_every_variant() {
        let size = values(Uuid::now_v7(), &["S", "M"]);
        let before = desired(&[Axis::new("Size", size.clone())]);
        let live = apply(&reconcile(&before, &[], &HashMap::new(), &PricingRules::default()).unwrap(), &[]);

        let after = desired(&[Axis::new("Size", size), Axis::new("Hand", values(Uuid::now_v7(), &["Left", "Right"]))]);
        let plan = reconcile(&after, &live, &HashMap::new(), &PricingRules::default()).unwrap();
        assert_eq!((plan.to_create.len(), plan.to_delete.len()), (4, 2));
        assert_eq!(plan.resulting_keys(&live), keys(&after));
    }

    #[test]
    fn duplicate_live_variants_are_collapsed() {
        let combos = desired(&[Axis::new("Size", values(Uuid::now_v7(), &["S"]))]);
        let mut live = apply(&reconcile(&combos, &[], &HashMap::new(), &PricingRules::default()).unwrap(), &[]);
        let mut twin = live[0].clone();
        twin.id = Uuid::now_v7();
        twin.sku = Sku::new("GEN-T-TWIN").unwrap();
        live.push(twin.clone());
        let plan = reconcile(&combos, &live, &HashMap::new(), &PricingRules::default()).unwrap();
        assert_eq!(plan.to_delete, vec![twin.id]);
        assert_eq!(plan.unchanged, vec![live[0].id]);
    }

    #[test]
    fn unknown_or_invalid_submissions_are_rejected() {
        let combos = desired(&[Axis::new("Size", values(Uuid::now_v7(), &["S"]))]);
        let stray: CombinationKey = [Uuid::now_v7()].into_iter().collect();
        let subs = collect_submissions([(stray.clone(), input(1, 1))]).unwrap();
        assert_eq!(reconcile(&combos, &[], &subs, &PricingRules::default()), Err(VariantError::UnknownCombination(stray)));

        let subs = collect_submissions([(combos[0].key(), input(-1, 1))]).unwrap();
        assert!(matches!(reconcile(&combos, &[], &subs, &PricingRules::default()), Err(VariantError::Negative { field: "price", .. })));

        let twice = collect_submissions([(combos[0].key(), input(1, 1)), (combos[0].key(), input(2, 1))]);
        assert!(matches!(twice, Err(VariantError::DuplicateSubmission(_))));
    }

    #[test]
    fn negative_default_stock_must_be_resolved_by_the_admin() {
        let combos = desired(&[Axis::new("Size", values(Uuid::now_v7(), &["S"]))]);
        let rules = PricingRules {
            modifiers: vec![Modifier { condition: Condition::new("Size", "S"), price_delta: Decimal::ZERO, impact_delta: Decimal::ZERO, stock_delta: -2 }],
            ..Default::default()
        };
        assert!(matches!(reconcile(&combos, &[], &HashMap::new(), &rules), Err(VariantError::Negative { field: "stock", .. })));
        let subs = collect_submissions([(combos[0].key(), input(5, 0))]).unwrap();
        assert_eq!(reconcile(&combos, &[], &subs, &rules).unwrap().to_create[0].fields.stock, 0);
    }
}
