//! Checkout flow: shipping, then payment, then review, then placed.
//! `Placing` holds the checkout while the order is being written.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError};

use super::cart::Cart;

pub const COUNTRIES: &[&str] = &["England", "Scotland", "Wales", "Northern Ireland"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep { Shipping, Payment, Review, Placing, Placed }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 20))]
    pub postcode: String,
    #[validate(custom = "validate_country")]
    pub country: String,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct PaymentForm {
    #[validate(custom = "validate_card_number")]
    pub card_number: String,
    /// `MM/YY`
    pub expiry: String,
    #[validate(custom = "validate_cvv")]
    pub cvv: String,
}

/// What is kept of the card once the form is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub card_last4: String,
    pub expiry: String,
}

fn validate_country(country: &str) -> Result<(), ValidationError> {
    if COUNTRIES.contains(&country) { Ok(()) } else { Err(ValidationError::new("country")) }
}

fn validate_card_number(number: &str) -> Result<(), ValidationError> {
    let digits: String = number.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() == 16 && digits.chars().all(|c| c.is_ascii_digit()) { Ok(()) } else { Err(ValidationError::new("card_number")) }
}

fn validate_cvv(cvv: &str) -> Result<(), ValidationError> {
    if (3..=4).contains(&cvv.len()) && cvv.chars().all(|c| c.is_ascii_digit()) { Ok(()) } else { Err(ValidationError::new("cvv")) }
}

/// Parses `MM/YY` into (year, month).
fn parse_expiry(expiry: &str) -> Option<(i32, u32)> {
    let (mm, yy) = expiry.trim().split_once('/')?;
    if mm.len() != 2 || yy.len() != 2 { return None; }
    let month: u32 = mm.parse().ok()?;
    let year: i32 = yy.parse().ok()?;
    (1..=12).contains(&month).then_some((2000 + year, month))
}

impl PaymentForm {
    /// Validates the form against `today` and keeps only the last four digits.
    pub fn accept(&self, today: NaiveDate) -> Result<PaymentDetails, CheckoutError> {
        self.validate().map_err(|e| CheckoutError::Invalid(e.to_string()))?;
        let (year, month) = parse_expiry(&self.expiry).ok_or(CheckoutError::InvalidExpiry)?;
        if (year, month) < (today.year(), today.month()) { return Err(CheckoutError::CardExpired); }
        let digits: Vec<char> = self.card_number.chars().filter(char::is_ascii_digit).collect();
        let card_last4 = digits[digits.len() - 4..].iter().collect();
        Ok(PaymentDetails { card_last4, expiry: self.expiry.trim().to_string() })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkout {
    step: CheckoutStep,
    shipping: Option<ShippingAddress>,
    payment: Option<PaymentDetails>,
}

impl Checkout {
    /// An empty cart cannot enter checkout.
    pub fn start(cart: &Cart) -> Result<Self, CheckoutError> {
        if cart.is_empty() { return Err(CheckoutError::EmptyCart); }
        Ok(Self { step: CheckoutStep::Shipping, shipping: None, payment: None })
    }

    pub fn step(&self) -> CheckoutStep { self.step }
    pub fn shipping(&self) -> Option<&ShippingAddress> { self.shipping.as_ref() }
    pub fn payment(&self) -> Option<&PaymentDetails> { self.payment.as_ref() }

    pub fn submit_shipping(&mut self, form: ShippingAddress) -> Result<(), CheckoutError> {
        self.expect_open()?;
        form.validate().map_err(|e| CheckoutError::Invalid(e.to_string()))?;
        self.shipping = Some(form);
        if self.step == CheckoutStep::Shipping { self.step = CheckoutStep::Payment; }
        Ok(())
    }

    pub fn submit_payment(&mut self, form: &PaymentForm, today: NaiveDate) -> Result<(), CheckoutError> {
        self.expect_open()?;
        if self.shipping.is_none() { return Err(CheckoutError::OutOfOrder { expected: CheckoutStep::Shipping }); }
        self.payment = Some(form.accept(today)?);
        self.step = CheckoutStep::Review;
        Ok(())
    }

    /// Shipping and payment, once the review step is reached.
    pub fn ready(&self) -> Result<(&ShippingAddress, &PaymentDetails), CheckoutError> {
        self.expect_open()?;
        match (self.step, &self.shipping, &self.payment) {
            (CheckoutStep::Review, Some(shipping), Some(payment)) => Ok((shipping, payment)),
            _ => Err(CheckoutError::OutOfOrder { expected: self.step }),
        }
    }

    /// Claims the checkout for order placement. A second claim is refused
    /// until [`Checkout::abort_placing`] or [`Checkout::mark_placed`].
    pub fn begin_placing(&mut self) -> Result<(ShippingAddress, PaymentDetails), CheckoutError> {
        let (shipping, payment) = self.ready()?;
        let claimed = (shipping.clone(), payment.clone());
        self.step = CheckoutStep::Placing;
        Ok(claimed)
    }

    pub fn abort_placing(&mut self) {
        if self.step == CheckoutStep::Placing { self.step = CheckoutStep::Review; }
    }

    pub fn back(&mut self) -> Result<(), CheckoutError> {
        self.step = match self.step {
            CheckoutStep::Review => CheckoutStep::Payment,
            CheckoutStep::Payment => CheckoutStep::Shipping,
            CheckoutStep::Shipping => return Err(CheckoutError::AtFirstStep),
            CheckoutStep::Placing => return Err(CheckoutError::PlacementInProgress),
            CheckoutStep::Placed => return Err(CheckoutError::AlreadyPlaced),
        };
        Ok(())
    }

    pub fn mark_placed(&mut self) -> Result<(), CheckoutError> {
        if self.step != CheckoutStep::Placing { self.ready()?; }
        self.step = CheckoutStep::Placed;
        Ok(())
    }

    fn expect_open(&self) -> Result<(), CheckoutError> {
        match self.step {
            CheckoutStep::Placed => Err(CheckoutError::AlreadyPlaced),
            CheckoutStep::Placing => Err(CheckoutError::PlacementInProgress),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,
    #[error("complete the {expected:?} step first")]
    OutOfOrder { expected: CheckoutStep },
    #[error("already at the first checkout step")]
    AtFirstStep,
    #[error("this order has already been placed")]
    AlreadyPlaced,
    #[error("this order is already being placed")]
    PlacementInProgress,
    #[error("invalid checkout details: {0}")]
    Invalid(String),
    #[error("expiry date must be MM/YY")]
    InvalidExpiry,
    #[error("card has expired")]
    CardExpired,
}
