//! Product creation wizard
//!
//! A [`ProductDraft`] walks `BasicInfo → Options → Values → PricingRules →
//! VariantReview` while held in the admin's session. Nothing is persisted
//! until [`ProductDraft::finish`] produces a [`WizardCommit`] and the
//! repository writes it in one transaction.
//!
//! Going back never discards later input on its own. Resubmitting a step
//! drops only what depended on it: changed options drop the values of
//! removed options, changed values drop pricing rules that no longer match
//! and review edits for combinations that no longer exist.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::product::{Product, ProductDetails, ProductError, VariantOption, VariantValue};
use crate::domain::services::combinations::{expand, Axis, VariantError};
use crate::domain::services::pricing::{PricingError, PricingRules};
use crate::domain::services::reconciliation::{collect_submissions, reconcile, ReconcilePlan, VariantInput};
use crate::domain::services::structure::{normalize_option_names, normalize_values, option_key, ValuesInput};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep { BasicInfo, Options, Values, PricingRules, VariantReview, Committed }

/// Admin override for one combination, identified by its value labels in
/// option order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantEdit {
    pub values: Vec<String>,
    #[serde(flatten)]
    pub fields: VariantInput,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VariantPreview {
    pub values: Vec<String>,
    pub title: String,
    #[serde(flatten)]
    pub fields: VariantInput,
    pub edited: bool,
}

/// Everything `finish` hands to the repository.
#[derive(Clone, Debug)]
pub struct WizardCommit {
    pub product: Product,
    pub options: Vec<VariantOption>,
    pub plan: ReconcilePlan,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductDraft {
    step: WizardStep,
    details: Option<ProductDetails>,
    options: Vec<String>,
    axes: Vec<Axis<String>>,
    rules: PricingRules,
    edits: Vec<VariantEdit>,
    updated_at: DateTime<Utc>,
}

impl Default for ProductDraft {
    fn default() -> Self { Self::new() }
}

impl ProductDraft {
    pub fn new() -> Self {
        Self {
            step: WizardStep::BasicInfo, details: None, options: vec![], axes: vec![],
            rules: PricingRules::default(), edits: vec![], updated_at: Utc::now(),
        }
    }

    pub fn step(&self) -> WizardStep { self.step }
    pub fn details(&self) -> Option<&ProductDetails> { self.details.as_ref() }
    pub fn options(&self) -> &[String] { &self.options }
    pub fn axes(&self) -> &[Axis<String>] { &self.axes }
    pub fn rules(&self) -> &PricingRules { &self.rules }
    pub fn edits(&self) -> &[VariantEdit] { &self.edits }

    pub fn submit_basic_info(&mut self, details: ProductDetails) -> Result<(), WizardError> {
        self.expect(WizardStep::BasicInfo)?;
        details.validate()?;
        self.details = Some(ProductDetails { name: details.name.trim().to_string(), ..details });
        self.advance(WizardStep::Options);
        Ok(())
    }

    pub fn submit_options<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), WizardError> {
        self.expect(WizardStep::Options)?;
        if names.is_empty() { return Err(VariantError::NoOptions.into()); }
        let names = normalize_option_names(names)?;

        // Values of surviving options are kept; the new spelling wins.
        let axes: Vec<Axis<String>> = names
            .iter()
            .filter_map(|name| {
                let key = option_key(name);
                self.axes.iter().find(|a| option_key(&a.option) == key).map(|a| Axis::new(name.clone(), a.values.clone()))
            })
            .collect();
        if names != self.options { self.edits.clear(); }
        self.options = names;
        self.axes = axes;
        self.prune_rules();
        self.advance(WizardStep::Values);
        Ok(())
    }

    /// Values per option name, as lists or comma separated strings.
    pub fn submit_values(&mut self, values: &HashMap<String, ValuesInput>) -> Result<(), WizardError> {
        self.expect(WizardStep::Values)?;
        if let Some(unknown) = values.keys().find(|k| !self.options.contains(*k)) {
            return Err(WizardError::UnknownOption(unknown.clone()));
        }
        let mut axes = Vec::with_capacity(self.options.len());
        for option in &self.options {
            let input = values.get(option).cloned().unwrap_or_default();
            axes.push(Axis::new(option.clone(), normalize_values(option, &input)?));
        }
        expand(&axes)?;

        self.axes = axes;
        self.prune_rules();
        let before = self.edits.len();
        let axes = &self.axes;
        self.edits.retain(|e| is_live(axes, &e.values));
        if self.edits.len() != before {
            tracing::debug!(dropped = before - self.edits.len(), "variant edits dropped after value change");
        }
        self.advance(WizardStep::PricingRules);
        Ok(())
    }

    pub fn submit_rules(&mut self, rules: PricingRules) -> Result<(), WizardError> {
        self.expect(WizardStep::PricingRules)?;
        rules.validate(&self.axes)?;
        self.rules = rules;
        self.advance(WizardStep::VariantReview);
        Ok(())
    }

    /// Every combination with its pre-filled or edited figures.
    pub fn preview(&self) -> Result<Vec<VariantPreview>, WizardError> {
        let combinations = expand(&self.axes)?.into_combinations();
        Ok(combinations
            .iter()
            .map(|c| {
                let values: Vec<String> = c.labels().into_iter().map(str::to_string).collect();
                let edit = self.edits.iter().find(|e| e.values == values);
                VariantPreview {
                    title: c.title(),
                    fields: edit.map_or_else(|| VariantInput::from(self.rules.compute_defaults(c)), |e| e.fields),
                    edited: edit.is_some(),
                    values,
                }
            })
            .collect())
    }

    /// Replaces the review edits. Figures are rounded and must not be negative.
    pub fn submit_variants(&mut self, edits: Vec<VariantEdit>) -> Result<(), WizardError> {
        self.expect(WizardStep::VariantReview)?;
        let mut seen = HashSet::with_capacity(edits.len());
        let mut accepted = Vec::with_capacity(edits.len());
        for edit in edits {
            let title = edit.values.join(" / ");
            if !is_live(&self.axes, &edit.values) { return Err(WizardError::UnknownVariant(title)); }
            if !seen.insert(edit.values.clone()) { return Err(WizardError::DuplicateVariant(title)); }
            let fields = edit.fields.checked(&title)?;
            accepted.push(VariantEdit { values: edit.values, fields });
        }
        self.edits = accepted;
        self.touch();
        Ok(())
    }

    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        self.step = match self.step {
            WizardStep::BasicInfo => return Err(WizardError::AtFirstStep),
            WizardStep::Options => WizardStep::BasicInfo,
            WizardStep::Values => WizardStep::Options,
            WizardStep::PricingRules => WizardStep::Values,
            WizardStep::VariantReview => WizardStep::PricingRules,
            WizardStep::Committed => return Err(WizardError::Committed),
        };
        self.touch();
        Ok(self.step)
    }

    /// Builds the product, its options with fresh ids, and the creation plan.
    /// Combinations without an edit take the rule defaults, which must not
    /// leave stock negative.
    pub fn finish(&self) -> Result<WizardCommit, WizardError> {
        self.expect(WizardStep::VariantReview)?;
        let details = self.details.clone().ok_or(WizardError::OutOfOrder { current: self.step, submitted: WizardStep::BasicInfo })?;
        let product = Product::create_variant_parent(details)?;

        let options: Vec<VariantOption> = self
            .axes
            .iter()
            .enumerate()
            .map(|(position, axis)| {
                let option_id = Uuid::now_v7();
                let values = axis
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, value)| VariantValue { id: Uuid::now_v7(), option_id, value: value.clone(), position: i as i32 })
                    .collect();
                VariantOption { id: option_id, product_id: product.id(), name: axis.option.clone(), position: position as i32, values }
            })
            .collect();

        let axes: Vec<Axis<VariantValue>> = options.iter().map(|o| Axis::new(o.name.clone(), o.values.clone())).collect();
        let combinations = expand(&axes)?.into_combinations();
        let submissions = collect_submissions(self.edits.iter().filter_map(|edit| {
            combinations.iter().find(|c| c.labels() == edit.values).map(|c| (c.key(), edit.fields))
        }))?;
        let plan = reconcile(&combinations, &[], &submissions, &self.rules)?;
        Ok(WizardCommit { product, options, plan })
    }

    pub fn mark_committed(&mut self) {
        self.step = WizardStep::Committed;
        self.touch();
    }

    fn expect(&self, step: WizardStep) -> Result<(), WizardError> {
        match self.step {
            WizardStep::Committed => Err(WizardError::Committed),
            current if current != step => Err(WizardError::OutOfOrder { current, submitted: step }),
            _ => Ok(()),
        }
    }

    fn prune_rules(&mut self) {
        let dropped = self.rules.retain_valid(&self.axes);
        if dropped > 0 {
            tracing::debug!(dropped, "pricing rules dropped after option change");
        }
    }

    fn advance(&mut self, next: WizardStep) {
        self.step = next;
        self.touch();
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn is_live(axes: &[Axis<String>], values: &[String]) -> bool {
    values.len() == axes.len() && axes.iter().zip(values).all(|(axis, value)| axis.values.contains(value))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("the wizard is at the {current:?} step, not {submitted:?}")]
    OutOfOrder { current: WizardStep, submitted: WizardStep },
    #[error("this product has already been created")]
    Committed,
    #[error("already at the first step")]
    AtFirstStep,
    #[error("unknown option \"{0}\"")]
    UnknownOption(String),
    #[error("{0} is not a combination of this product")]
    UnknownVariant(String),
    #[error("{0} was edited more than once")]
    DuplicateVariant(String),
    #[error(transparent)]
    Product(#[from] ProductError),
    #[error(transparent)]
    Variant(#[from] VariantError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::pricing::{BaseRule, Condition, Modifier};
    use rust_decimal::Decimal;

    fn glove_details() -> ProductDetails {
        ProductDetails { name: " Fencing Glove ".into(), description: "Washable".into(), ..Default::default() }
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, ValuesInput> {
        pairs.iter().map(|(o, v)| (o.to_string(), ValuesInput::Joined(v.to_string()))).collect()
    }

    fn rules() -> PricingRules {
        PricingRules {
            base_rules: vec![
                BaseRule { conditions: vec![Condition::new("Size", "Large")], price: Decimal::new(50, 0), impact: Decimal::new(2, 0), stock: 5 },
                BaseRule { conditions: vec![], price: Decimal::new(40, 0), impact: Decimal::new(15, 1), stock: 10 },
            ],
            modifiers: vec![Modifier { condition: Condition::new("Hand", "Left"), price_delta: Decimal::new(5, 0), impact_delta: Decimal::ZERO, stock_delta: 0 }],
            ..Default::default()
        }
    }

    fn at_review() -> ProductDraft {
        let mut draft = ProductDraft::new();
        draft.submit_basic_info(glove_details()).unwrap();
        draft.submit_options(&["Size", "Hand"]).unwrap();
        draft.submit_values(&values(&[("Size", "Small, Medium, Large"), ("Hand", "Left,Right")])).unwrap();
        draft.submit_rules(rules()).unwrap();
        draft
    }

    fn edit(values: &[&str], price: i64, stock: i32) -> VariantEdit {
        VariantEdit {
            values: values.iter().map(|v| v.to_string()).collect(),
            fields: VariantInput { price: Decimal::new(price, 0), impact: Decimal::ONE, stock },
        }
    }

    #[test]
    fn test_wizard_walkthrough() {
        let mut draft = at_review();
        assert_eq!(draft.step(), WizardStep::VariantReview);
        assert_eq!(draft.details().unwrap().name, "Fencing Glove");

        let preview = draft.preview().unwrap();
        assert_eq!(preview.len(), 6);
        let large_left = preview.iter().find(|p| p.title == "Large / Left").unwrap();
        assert_eq!(large_left.fields.price, Decimal::new(55, 0));
        let small_right = preview.iter().find(|p| p.title == "Small / Right").unwrap();
        assert_eq!((small_right.fields.price, small_right.fields.stock), (Decimal::new(40, 0), 10));

        draft.submit_variants(vec![edit(&["Small", "Left"], 42, 3)]).unwrap();
        assert!(draft.preview().unwrap().iter().any(|p| p.edited && p.fields.price == Decimal::new(42, 0)));

        let commit = draft.finish().unwrap();
        assert_eq!(commit.options.len(), 2);
        assert_eq!(commit.options[1].values.len(), 2);
        assert_eq!(commit.plan.to_create.len(), 6);
        let small_left = commit.plan.to_create.iter().find(|n| n.labels == ["Small", "Left"]).unwrap();
        assert_eq!(small_left.fields.stock, 3);
        assert!(commit.options.iter().all(|o| o.product_id == commit.product.id()));

        draft.mark_committed();
        assert_eq!(draft.back(), Err(WizardError::Committed));
        assert_eq!(draft.submit_rules(rules()), Err(WizardError::Committed));
    }

    #[test]
    fn steps_must_be_taken_in_order() {
        let mut draft = ProductDraft::new();
        assert_eq!(
            draft.submit_options(&["Size"]),
            Err(WizardError::OutOfOrder { current: WizardStep::BasicInfo, submitted: WizardStep::Options })
        );
        assert_eq!(draft.back(), Err(WizardError::AtFirstStep));
        assert!(draft.finish().is_err());
    }

    #[test]
    fn going_back_keeps_later_data() {
        let mut draft = at_review();
        draft.submit_variants(vec![edit(&["Medium", "Right"], 45, 2)]).unwrap();
        assert_eq!(draft.back().unwrap(), WizardStep::PricingRules);
        assert_eq!(draft.back().unwrap(), WizardStep::Values);
        draft.submit_values(&values(&[("Size", "Small,Medium,Large"), ("Hand", "Left,Right")])).unwrap();
        assert_eq!(draft.rules(), &rules());
        assert_eq!(draft.edits().len(), 1);
    }

    #[test]
    fn changing_options_drops_dependent_data() {
        let mut draft = at_review();
        draft.submit_variants(vec![edit(&["Medium", "Right"], 45, 2)]).unwrap();
        for _ in 0..3 { draft.back().unwrap(); }
        assert_eq!(draft.step(), WizardStep::Options);

        draft.submit_options(&["size", "Colour"]).unwrap();
        assert_eq!(draft.axes().len(), 1);
        assert_eq!(draft.axes()[0].option, "size");
        assert!(draft.edits().is_empty());
        // The rule on "Size" no longer names a live option; the catch-all stays.
        assert_eq!(draft.rules().base_rules.len(), 1);
        assert!(draft.rules().modifiers.is_empty());

        let err = draft.submit_values(&values(&[("size", "S")])).unwrap_err();
        assert_eq!(err, WizardError::Variant(VariantError::EmptyOption { option: "Colour".into() }));
        assert!(matches!(draft.submit_values(&values(&[("Weight", "1")])), Err(WizardError::UnknownOption(_))));
    }

    #[test]
    fn respelled_accented_option_keeps_its_values() {
        let mut draft = ProductDraft::new();
        draft.submit_basic_info(glove_details()).unwrap();
        draft.submit_options(&["Épée grip"]).unwrap();
        draft.submit_values(&values(&[("Épée grip", "Pistol, French")])).unwrap();
        draft.back().unwrap();
        draft.back().unwrap();

        draft.submit_options(&["ÉPÉE GRIP"]).unwrap();
        assert_eq!(draft.axes().len(), 1);
        assert_eq!(draft.axes()[0].option, "ÉPÉE GRIP");
        assert_eq!(draft.axes()[0].values, vec!["Pistol", "French"]);
    }

    #[test]
    fn removed_values_drop_their_edits_and_rules() {
        let mut draft = at_review();
        draft.submit_variants(vec![edit(&["Large", "Left"], 60, 1), edit(&["Small", "Left"], 41, 1)]).unwrap();
        draft.back().unwrap();
        draft.back().unwrap();
        draft.submit_values(&values(&[("Size", "Small,Medium"), ("Hand", "Left,Right")])).unwrap();
        assert_eq!(draft.edits().len(), 1);
        assert_eq!(draft.rules().base_rules.len(), 1);
        assert_eq!(draft.rules().modifiers.len(), 1);
    }

    #[test]
    fn review_edits_are_checked() {
        let mut draft = at_review();
        assert!(matches!(draft.submit_variants(vec![edit(&["Huge", "Left"], 1, 1)]), Err(WizardError::UnknownVariant(_))));
        assert!(matches!(
            draft.submit_variants(vec![edit(&["Small", "Left"], 1, 1), edit(&["Small", "Left"], 2, 1)]),
            Err(WizardError::DuplicateVariant(_))
        ));
        assert!(matches!(
            draft.submit_variants(vec![edit(&["Small", "Left"], 1, -1)]),
            Err(WizardError::Variant(VariantError::Negative { field: "stock", .. }))
        ));
    }

    #[test]
    fn negative_default_stock_blocks_finish_until_edited() {
        let mut draft = ProductDraft::new();
        draft.submit_basic_info(glove_details()).unwrap();
        draft.submit_options(&["Hand"]).unwrap();
        draft.submit_values(&values(&[("Hand", "Left")])).unwrap();
        draft.submit_rules(PricingRules {
            modifiers: vec![Modifier { condition: Condition::new("Hand", "Left"), price_delta: Decimal::ONE, impact_delta: Decimal::ZERO, stock_delta: -1 }],
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(draft.finish(), Err(WizardError::Variant(VariantError::Negative { .. }))));
        draft.submit_variants(vec![edit(&["Left"], 1, 0)]).unwrap();
        assert_eq!(draft.finish().unwrap().plan.to_create.len(), 1);
    }
}
