//! End-to-end runs of the variant engine and the purchase flow, without a database.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use piste_shop::domain::aggregates::{
    Cart, CartError, CartItem, Category, Checkout, CheckoutError, CheckoutStep, Order, OrderItem, PaymentForm, ProductDetails, ProductDraft,
    ProductVariant, Purchasable, ShippingAddress, VariantEdit,
};
use piste_shop::domain::services::combinations::{expand, Axis};
use piste_shop::domain::services::pricing::{BaseRule, Condition, Modifier, PricingRules};
use piste_shop::domain::services::reconciliation::{reconcile, VariantInput};
use piste_shop::domain::services::sku::{generate_unique_sku, sku_stem};
use piste_shop::domain::services::structure::{plan_structure, OptionInput, ValuesInput};
use piste_shop::domain::value_objects::{Impact, Money, Quantity, Sku};

fn glove_rules() -> PricingRules {
    PricingRules {
        base_rules: vec![
            BaseRule { conditions: vec![Condition::new("Size", "Large")], price: Decimal::new(50, 0), impact: Decimal::new(2, 0), stock: 5 },
            BaseRule { conditions: vec![], price: Decimal::new(40, 0), impact: Decimal::new(15, 1), stock: 10 },
        ],
        modifiers: vec![Modifier {
            condition: Condition::parse("Hand=Left").unwrap(),
            price_delta: Decimal::new(5, 0),
            impact_delta: Decimal::ZERO,
            stock_delta: -2,
        }],
        ..Default::default()
    }
}

fn joined(pairs: &[(&str, &str)]) -> HashMap<String, ValuesInput> {
    pairs.iter().map(|(o, v)| (o.to_string(), ValuesInput::Joined(v.to_string()))).collect()
}

#[test]
fn wizard_to_persisted_variants_and_back_through_reconciliation() {
    let gloves = Category::new("Gloves", None, None, Some("GLV")).unwrap();
    let mut draft = ProductDraft::new();
    draft
        .submit_basic_info(ProductDetails { name: "Fencing Glove".into(), category_id: Some(gloves.id), ..Default::default() })
        .unwrap();
    draft.submit_options(&["Size", "Hand"]).unwrap();
    draft.submit_values(&joined(&[("Size", "Small, Medium, Large"), ("Hand", "Left, Right")])).unwrap();
    draft.submit_rules(glove_rules()).unwrap();
    draft
        .submit_variants(vec![VariantEdit {
            values: vec!["Medium".into(), "Right".into()],
            fields: VariantInput { price: Decimal::new(4499, 2), impact: Decimal::ONE, stock: 7 },
        }])
        .unwrap();

    let commit = draft.finish().unwrap();
    assert_eq!(commit.plan.to_create.len(), 6);
    assert!(commit.product.is_variant_parent());

    let by_labels = |labels: [&str; 2]| commit.plan.to_create.iter().find(|n| n.labels == labels).unwrap().fields;
    assert_eq!(by_labels(["Large", "Left"]), VariantInput { price: Decimal::new(55, 0), impact: Decimal::new(2, 0), stock: 3 });
    assert_eq!(by_labels(["Small", "Right"]), VariantInput { price: Decimal::new(40, 0), impact: Decimal::new(15, 1), stock: 10 });
    assert_eq!(by_labels(["Medium", "Right"]).price, Decimal::new(4499, 2));

    // Persist: mint SKUs the way the repository does, against the ones already taken.
    let mut rng = rand::thread_rng();
    let mut taken: Vec<Sku> = Vec::new();
    let mut stored: Vec<ProductVariant> = Vec::new();
    for new in &commit.plan.to_create {
        let stem = sku_stem(Some(&gloves), commit.product.name(), &new.labels);
        let sku = generate_unique_sku(&stem, &mut rng, 8, |s| taken.contains(s)).unwrap();
        assert!(sku.as_str().starts_with("GLV-"));
        taken.push(sku.clone());
        stored.push(ProductVariant {
            id: Uuid::now_v7(),
            product_id: commit.product.id(),
            sku,
            price: new.fields.price,
            impact: new.fields.impact,
            stock: new.fields.stock,
            value_ids: new.value_ids.clone(),
        });
    }

    // Drop "Small", add "XL". Surviving combinations keep their ids and SKUs.
    let desired = vec![
        OptionInput { name: "Size".into(), values: ValuesInput::Joined("Medium, Large, XL".into()) },
        OptionInput { name: "Hand".into(), values: ValuesInput::List(vec!["Left".into(), "Right".into()]) },
    ];
    let change = plan_structure(commit.product.id(), &commit.options, &desired).unwrap();
    assert_eq!(change.new_values.len(), 1);
    assert_eq!(change.removed_values.len(), 1);
    assert!(change.new_options.is_empty());

    let axes: Vec<_> = change.options.iter().map(|o| Axis::new(o.name.clone(), o.values.clone())).collect();
    let combinations = expand(&axes).unwrap().into_combinations();
    assert_eq!(combinations.len(), 6);

    let plan = reconcile(&combinations, &stored, &HashMap::new(), &glove_rules()).unwrap();
    assert_eq!(plan.unchanged.len(), 4);
    assert_eq!(plan.to_delete.len(), 2);
    assert!(plan.to_update.is_empty());
    assert_eq!(plan.to_create.len(), 2);
    let xl_left = plan.to_create.iter().find(|n| n.labels == ["XL", "Left"]).unwrap();
    assert_eq!(xl_left.fields, VariantInput { price: Decimal::new(45, 0), impact: Decimal::new(15, 1), stock: 8 });

    let keys = plan.resulting_keys(&stored);
    assert_eq!(keys.len(), 6);

    // Re-running with the same structure is a no-op.
    let mut after: Vec<ProductVariant> = stored.iter().filter(|v| !plan.to_delete.contains(&v.id)).cloned().collect();
    for new in &plan.to_create {
        after.push(ProductVariant {
            id: Uuid::now_v7(),
            product_id: commit.product.id(),
            sku: Sku::new(format!("GLV-FG-{}-ZZZZ", new.labels.join("-"))).unwrap(),
            price: new.fields.price,
            impact: new.fields.impact,
            stock: new.fields.stock,
            value_ids: new.value_ids.clone(),
        });
    }
    assert!(reconcile(&combinations, &after, &HashMap::new(), &glove_rules()).unwrap().is_noop());
}

fn glove_line(variant: Uuid, product: Uuid, quantity: u32) -> CartItem {
    CartItem {
        item: Purchasable::Variant(variant),
        product_id: product,
        name: "Fencing Glove (Medium / Right)".into(),
        sku: Sku::new("GLV-FG-M-R-7K2Q").unwrap(),
        quantity: Quantity::new(quantity),
        unit_price: Money::gbp(Decimal::new(4499, 2)),
        unit_impact: Impact::new(Decimal::ONE),
    }
}

#[test]
fn cart_respects_stock_and_checkout_produces_an_invoice() {
    let (variant, product) = (Uuid::now_v7(), Uuid::now_v7());
    let mut cart = Cart::new("GBP");
    assert_eq!(Checkout::start(&cart).unwrap_err(), CheckoutError::EmptyCart);

    cart.add_item(glove_line(variant, product, 5), 10).unwrap();
    cart.add_item(glove_line(variant, product, 5), 10).unwrap();
    let err = cart.add_item(glove_line(variant, product, 1), 10).unwrap_err();
    assert_eq!(err, CartError::InsufficientStock { available: 10 });
    assert_eq!(err.to_string(), "Only 10 items left in stock!");
    cart.update_quantity(Purchasable::Variant(variant), 2, 10).unwrap();

    let mut checkout = Checkout::start(&cart).unwrap();
    checkout
        .submit_shipping(ShippingAddress {
            first_name: "Ana".into(),
            last_name: "Ruiz".into(),
            address: "1 Piste Lane".into(),
            city: "Leeds".into(),
            postcode: "LS1 1AA".into(),
            country: "England".into(),
        })
        .unwrap();
    let today = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
    let expired = PaymentForm { card_number: "4242 4242 4242 4242".into(), expiry: "09/26".into(), cvv: "123".into() };
    assert_eq!(checkout.submit_payment(&expired, today), Err(CheckoutError::CardExpired));
    let card = PaymentForm { expiry: "10/26".into(), ..expired };
    checkout.submit_payment(&card, today).unwrap();
    assert_eq!(checkout.step(), CheckoutStep::Review);

    let (shipping, payment) = checkout.ready().unwrap();
    assert_eq!(payment.card_last4, "4242");
    let items: Vec<OrderItem> = cart
        .items()
        .iter()
        .map(|line| OrderItem {
            id: Uuid::now_v7(),
            item: line.item,
            product_id: line.product_id,
            name: line.name.clone(),
            sku: line.sku.clone(),
            quantity: line.quantity.value(),
            unit_price: line.unit_price.amount(),
            unit_impact: line.unit_impact.kg(),
        })
        .collect();
    let customer = Uuid::now_v7();
    let order = Order::place(customer, items, shipping.clone(), payment.card_last4.clone(), cart.currency()).unwrap();
    checkout.mark_placed().unwrap();

    let invoice = order.invoice();
    assert_eq!(invoice.lines.len(), 1);
    assert_eq!(invoice.subtotal.amount(), Decimal::new(8998, 2));
    assert_eq!(invoice.total_impact.kg(), Decimal::new(2, 0));
    assert!(order.check_access(customer, false).is_ok());
    assert!(order.check_access(Uuid::now_v7(), false).is_err());
    assert!(order.check_access(Uuid::now_v7(), true).is_ok());
}
