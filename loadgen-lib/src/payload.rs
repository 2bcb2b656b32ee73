//! Synthetic order payloads.

use rand::{RngExt as _, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};

/// Customer identifiers are drawn from `1..=MAX_CUSTOMER_ID`.
pub const MAX_CUSTOMER_ID: u32 = 10_000;

const MENU_ITEMS: &[&str] = &["Pad Thai", "Tom Yum Goong", "Green Curry", "Mango Sticky Rice"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    BankTransfer,
}

/// Body of a `POST /api/orders` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: u64,
    pub merchant_id: u64,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
    pub items: Vec<CreateOrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItem {
    pub menu_item_id: u64,
    pub menu_item_name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

/// Produces the order payload sent for a given customer.
pub trait OrderGenerator: Send + Sync + 'static {
    fn generate(&self, customer_id: u32) -> CreateOrderRequest;
}

/// [`OrderGenerator`] producing a random single-item order
/// from a small Thai food menu.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct RandomOrderGenerator;

impl RandomOrderGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl OrderGenerator for RandomOrderGenerator {
    fn generate(&self, customer_id: u32) -> CreateOrderRequest {
        let mut rng = rand::rng();

        let payment_method = if rng.random_bool(0.5) {
            PaymentMethod::CreditCard
        } else {
            PaymentMethod::BankTransfer
        };
        let menu_item_name = MENU_ITEMS
            .choose(&mut rng)
            .copied()
            .unwrap_or("Pad Thai")
            .to_owned();
        let unit_price = (rng.random_range(80.0..=350.0_f64) * 100.).round() / 100.;

        CreateOrderRequest {
            customer_id: customer_id.into(),
            merchant_id: rng.random_range(1..=100),
            payment_method,
            delivery_address: format!("Building {customer_id}, Bangkok 10110"),
            items: vec![CreateOrderItem {
                menu_item_id: rng.random_range(1..=50),
                menu_item_name,
                quantity: rng.random_range(1..=3),
                unit_price,
            }],
        }
    }
}
