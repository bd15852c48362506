//! Enhanced e-commerce product record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SsgaError, SsgaResult};
use crate::params::ParamValue;

/// One e-commerce line item. Every attribute is optional; `position` is the
/// 1-based slot used to build the `pr<position><field>` parameter keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductField {
    id: Option<i64>,
    name: Option<String>,
    brand: Option<String>,
    category: Option<String>,
    variant: Option<String>,
    price: Option<f64>,
    quantity: Option<i64>,
    position: Option<u32>,
}

impl ProductField {
    /// Start a product record occupying the given list position.
    pub fn at_position(position: u32) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    /// Build a product from a sparse attribute mapping.
    ///
    /// Unknown keys and values of the wrong shape are ignored, leaving the
    /// attribute unset. Numeric attributes accept numbers or numeric strings.
    pub fn from_attributes<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut product = Self::default();
        for (key, value) in attributes {
            match key.as_ref() {
                "id" => product.id = as_integer(&value),
                "name" => product.name = as_text(&value),
                "brand" => product.brand = as_text(&value),
                "category" => product.category = as_text(&value),
                "variant" => product.variant = as_text(&value),
                "price" => product.price = as_decimal(&value),
                "quantity" => product.quantity = as_integer(&value),
                "position" => {
                    product.position = as_integer(&value)
                        .and_then(|p| u32::try_from(p).ok())
                        .filter(|p| *p >= 1)
                }
                _ => {}
            }
        }
        product
    }

    /// Parse a JSON object of attributes. Non-object JSON is rejected.
    pub fn from_json(json: &str) -> SsgaResult<Self> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(map) => Ok(Self::from_attributes(map)),
            other => Err(SsgaError::InvalidArgument(format!(
                "product attributes must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    pub fn price(&self) -> Option<f64> {
        self.price
    }

    pub fn quantity(&self) -> Option<i64> {
        self.quantity
    }

    pub fn position(&self) -> Option<u32> {
        self.position
    }

    /// Look up an attribute by its record name as a protocol value.
    pub fn attribute(&self, name: &str) -> Option<ParamValue> {
        match name {
            "id" => self.id.map(ParamValue::from),
            "name" => self.name.clone().map(ParamValue::from),
            "brand" => self.brand.clone().map(ParamValue::from),
            "category" => self.category.clone().map(ParamValue::from),
            "variant" => self.variant.clone().map(ParamValue::from),
            "price" => self.price.map(ParamValue::from),
            "quantity" => self.quantity.map(ParamValue::from),
            "position" => self.position.map(ParamValue::from),
            _ => None,
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
