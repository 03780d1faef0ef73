//! Validation of checkout submissions.
//!
//! [`CheckoutRequest`] is deliberately loose so that a malformed field still
//! deserializes and produces the field-specific message instead of a generic
//! body error. [`CheckoutRequest::validate`] turns it into a [`CheckoutDraft`]
//! whose fields are all known-good.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::MAX_QUANTITY;
use crate::order::{DEFAULT_COUNTRY, ShippingAddress};
use crate::types::{PaymentMethod, ProductId, ShippingMethod};

/// Why a checkout submission was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Products are required")]
    ProductsRequired,
    #[error("Invalid product line")]
    InvalidLine,
    #[error("totalAmount (number) is required")]
    TotalAmountRequired,
    #[error("Complete shippingAddress is required")]
    IncompleteAddress,
    #[error("paymentMethod is required")]
    PaymentMethodRequired,
    #[error("Unsupported paymentMethod")]
    UnsupportedPaymentMethod,
    #[error("Unsupported shippingMethod")]
    UnsupportedShippingMethod,
}

/// One requested product line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    #[serde(alias = "productId")]
    pub product: ProductId,
    pub quantity: i64,
    /// Price the client displayed. Informational only.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
}

/// Shipping address as submitted; every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl AddressInput {
    fn complete(&self) -> Option<ShippingAddress> {
        Some(ShippingAddress {
            full_name: required(self.full_name.as_deref())?,
            phone: required(self.phone.as_deref())?,
            country: required(self.country.as_deref())
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_owned()),
            district: required(self.district.as_deref())?,
            city: required(self.city.as_deref())?,
        })
    }
}

impl From<ShippingAddress> for AddressInput {
    fn from(address: ShippingAddress) -> Self {
        Self {
            full_name: Some(address.full_name),
            phone: Some(address.phone),
            country: Some(address.country),
            district: Some(address.district),
            city: Some(address.city),
        }
    }
}

fn required(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<CheckoutLine>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<AddressInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

/// A validated checkout, ready to be priced against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDraft {
    /// Requested `(product, quantity)` pairs; one entry per product.
    pub lines: Vec<(ProductId, u32)>,
    /// Total the client claims; compared against the server's pricing.
    pub client_total: Decimal,
    pub shipping_address: ShippingAddress,
    pub shipping_method: ShippingMethod,
    pub payment_method: PaymentMethod,
}

impl CheckoutRequest {
    /// Build a well-formed request, as a client would send it.
    #[must_use]
    pub fn new(
        lines: Vec<CheckoutLine>,
        total_amount: Decimal,
        address: ShippingAddress,
        shipping_method: ShippingMethod,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            products: Some(lines),
            total_amount: decimal_to_json(total_amount),
            shipping_address: Some(address.into()),
            shipping_method: Some(shipping_method.as_str().to_owned()),
            payment_method: Some(payment_method.as_str().to_owned()),
        }
    }

    /// Check every field in submission order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the [`CheckoutError`] for the first invalid field.
    pub fn validate(&self) -> Result<CheckoutDraft, CheckoutError> {
        let lines = match self.products.as_deref() {
            None | Some([]) => return Err(CheckoutError::ProductsRequired),
            Some(lines) => merge_lines(lines)?,
        };

        let client_total = self
            .total_amount
            .as_ref()
            .and_then(json_number)
            .ok_or(CheckoutError::TotalAmountRequired)?;

        let shipping_address = self
            .shipping_address
            .as_ref()
            .and_then(AddressInput::complete)
            .ok_or(CheckoutError::IncompleteAddress)?;

        let payment_method = required(self.payment_method.as_deref())
            .ok_or(CheckoutError::PaymentMethodRequired)?
            .parse::<PaymentMethod>()
            .map_err(|_| CheckoutError::UnsupportedPaymentMethod)?;

        let shipping_method = match required(self.shipping_method.as_deref()) {
            None => ShippingMethod::default(),
            Some(method) => method
                .parse::<ShippingMethod>()
                .map_err(|_| CheckoutError::UnsupportedShippingMethod)?,
        };

        Ok(CheckoutDraft {
            lines,
            client_total,
            shipping_address,
            shipping_method,
            payment_method,
        })
    }
}

fn merge_lines(lines: &[CheckoutLine]) -> Result<Vec<(ProductId, u32)>, CheckoutError> {
    let mut merged: Vec<(ProductId, u32)> = Vec::with_capacity(lines.len());
    for line in lines {
        let quantity = u32::try_from(line.quantity)
            .ok()
            .filter(|q| (1..=MAX_QUANTITY).contains(q))
            .ok_or(CheckoutError::InvalidLine)?;
        match merged.iter_mut().find(|(id, _)| *id == line.product) {
            Some((_, existing)) => {
                *existing = existing
                    .checked_add(quantity)
                    .filter(|q| *q <= MAX_QUANTITY)
                    .ok_or(CheckoutError::InvalidLine)?;
            }
            None => merged.push((line.product, quantity)),
        }
    }
    Ok(merged)
}

/// A non-zero JSON number; zero counts as missing.
fn json_number(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .ok()
            .filter(|amount| !amount.is_zero()),
        _ => None,
    }
}

fn decimal_to_json(amount: Decimal) -> Option<serde_json::Value> {
    use rust_decimal::prelude::ToPrimitive;
    amount
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn valid() -> serde_json::Value {
        json!({
            "products": [
                {"product": 1, "quantity": 1, "price": 30.0},
                {"product": 2, "quantity": 1, "price": 15.5}
            ],
            "totalAmount": 45.50,
            "shippingAddress": {
                "fullName": "Alice Uwase",
                "phone": "0788123456",
                "district": "Gasabo",
                "city": "Kigali"
            },
            "shippingMethod": "Standard",
            "paymentMethod": "Card"
        })
    }

    fn validate(body: serde_json::Value) -> Result<CheckoutDraft, CheckoutError> {
        serde_json::from_value::<CheckoutRequest>(body).unwrap().validate()
    }

    #[test]
    fn test_valid_submission() {
        let draft = validate(valid()).unwrap();
        assert_eq!(draft.lines, vec![(ProductId::new(1), 1), (ProductId::new(2), 1)]);
        assert_eq!(draft.client_total, Decimal::new(4550, 2));
        assert_eq!(draft.shipping_address.country, "Rwanda");
        assert_eq!(draft.payment_method, PaymentMethod::Card);
    }

    #[test]
    fn test_each_failure_independently() {
        let mut body = valid();
        body["products"] = json!([]);
        assert_eq!(validate(body), Err(CheckoutError::ProductsRequired));

        let mut body = valid();
        body.as_object_mut().unwrap().remove("products");
        assert_eq!(validate(body), Err(CheckoutError::ProductsRequired));

        let mut body = valid();
        body["totalAmount"] = json!("45.50");
        assert_eq!(validate(body), Err(CheckoutError::TotalAmountRequired));

        let mut body = valid();
        body["totalAmount"] = json!(0);
        assert_eq!(validate(body), Err(CheckoutError::TotalAmountRequired));

        let mut body = valid();
        body["totalAmount"] = json!(0.0);
        assert_eq!(validate(body), Err(CheckoutError::TotalAmountRequired));

        let mut body = valid();
        body["shippingAddress"]["city"] = json!("  ");
        assert_eq!(validate(body), Err(CheckoutError::IncompleteAddress));

        let mut body = valid();
        body.as_object_mut().unwrap().remove("shippingAddress");
        assert_eq!(validate(body), Err(CheckoutError::IncompleteAddress));

        let mut body = valid();
        body.as_object_mut().unwrap().remove("paymentMethod");
        assert_eq!(validate(body), Err(CheckoutError::PaymentMethodRequired));

        let mut body = valid();
        body["paymentMethod"] = json!("Bitcoin");
        assert_eq!(validate(body), Err(CheckoutError::UnsupportedPaymentMethod));
    }

    #[test]
    fn test_invalid_lines() {
        let mut body = valid();
        body["products"][0]["quantity"] = json!(0);
        assert_eq!(validate(body), Err(CheckoutError::InvalidLine));
    }

    #[test]
    fn test_line_quantity_ceiling() {
        let mut body = valid();
        body["products"][0]["quantity"] = json!(MAX_QUANTITY);
        assert!(validate(body).is_ok());

        let mut body = valid();
        body["products"][0]["quantity"] = json!(300_000_000);
        assert_eq!(validate(body), Err(CheckoutError::InvalidLine));

        let mut body = valid();
        body["products"][0]["quantity"] = json!(MAX_QUANTITY);
        body["products"][1]["product"] = json!(1);
        assert_eq!(validate(body), Err(CheckoutError::InvalidLine));
    }

    #[test]
    fn test_duplicate_lines_are_summed() {
        let mut body = valid();
        body["products"][1]["product"] = json!(1);
        let draft = validate(body).unwrap();
        assert_eq!(draft.lines, vec![(ProductId::new(1), 2)]);
    }

    #[test]
    fn test_shipping_method_defaults_and_rejects_unknown() {
        let mut body = valid();
        body.as_object_mut().unwrap().remove("shippingMethod");
        assert_eq!(validate(body).unwrap().shipping_method, ShippingMethod::Standard);

        let mut body = valid();
        body["shippingMethod"] = json!("Drone");
        assert_eq!(validate(body), Err(CheckoutError::UnsupportedShippingMethod));
    }

    #[test]
    fn test_new_round_trips_through_validate() {
        let request = CheckoutRequest::new(
            vec![CheckoutLine {
                product: ProductId::new(4),
                quantity: 3,
                price: None,
            }],
            Decimal::new(1234, 2),
            crate::order::fixtures::address(),
            ShippingMethod::Express,
            PaymentMethod::MobileMoney,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["paymentMethod"], "Mobile Money");
        assert_eq!(json["totalAmount"], 12.34);
        let draft = request.validate().unwrap();
        assert_eq!(draft.shipping_method, ShippingMethod::Express);
        assert_eq!(draft.lines, vec![(ProductId::new(4), 3)]);
    }
}
