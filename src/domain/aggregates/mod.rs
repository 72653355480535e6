//! Aggregates module
pub mod cart;
pub mod category;
pub mod checkout;
pub mod order;
pub mod product;
pub mod user;
pub mod wizard;

pub use cart::{Cart, CartError, CartItem, Purchasable};
pub use category::{Category, CategoryError, CategoryTree};
pub use checkout::{Checkout, CheckoutError, CheckoutStep, PaymentForm, ShippingAddress};
pub use order::{Invoice, Order, OrderError, OrderItem};
pub use product::{Product, ProductDetail, ProductDetails, ProductError, ProductKind, ProductVariant, VariantOption, VariantValue};
pub use user::{RoleChange, User, UserError};
pub use wizard::{ProductDraft, VariantEdit, WizardCommit, WizardError, WizardStep};
