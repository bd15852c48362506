//! Hit assembly: turns pageview / event / e-commerce calls into the flat
//! parameter set the collector expects.
//!
//! Precedence inside a hit, lowest first: flattened product params, the
//! hit's own fields, caller params. Null values never override a lower
//! layer. The session merges the result over its protected base set.

use ssga_core::params::{ParamValue, ParameterSet};
use ssga_core::types::ProductField;
use tracing::debug;

use crate::outcome::FailureReason;

/// Checkout step: payment details entered.
pub const CHECKOUT_PAYMENT: i64 = 1;
/// Checkout step: delivery details entered.
pub const CHECKOUT_DELIVERY: i64 = 2;

/// Parameter suffix → product attribute, in emission order.
const PRODUCT_FIELD_MAP: [(&str, &str); 7] = [
    ("id", "id"),
    ("nm", "name"),
    ("ca", "category"),
    ("br", "brand"),
    ("va", "variant"),
    ("pr", "price"),
    ("qt", "quantity"),
];

/// Host and path of the request being tracked, used for pageview defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub host: Option<String>,
    /// Path plus query string.
    pub path: Option<String>,
}

impl RequestContext {
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            path: Some(path.into()),
        }
    }
}

/// Transaction fields of a purchase hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: ParamValue,
    pub affiliation: String,
    pub revenue: f64,
    pub shipping: Option<f64>,
    pub tax: Option<f64>,
    pub coupon: Option<String>,
}

impl Transaction {
    pub fn new(id: impl Into<ParamValue>, affiliation: impl Into<String>, revenue: f64) -> Self {
        Self {
            id: id.into(),
            affiliation: affiliation.into(),
            revenue,
            shipping: None,
            tax: None,
            coupon: None,
        }
    }

    pub fn with_shipping(mut self, shipping: f64) -> Self {
        self.shipping = Some(shipping);
        self
    }

    pub fn with_tax(mut self, tax: f64) -> Self {
        self.tax = Some(tax);
        self
    }

    pub fn with_coupon(mut self, coupon: impl Into<String>) -> Self {
        self.coupon = Some(coupon.into());
        self
    }
}

/// Builds hit parameter sets for one request context.
#[derive(Debug, Clone, Copy)]
pub struct HitBuilder<'a> {
    context: &'a RequestContext,
}

impl<'a> HitBuilder<'a> {
    pub fn new(context: &'a RequestContext) -> Self {
        Self { context }
    }

    pub fn pageview(&self, params: ParameterSet) -> ParameterSet {
        compose([self.pageview_fields(), params])
    }

    pub fn event(&self, category: &str, action: &str, params: ParameterSet) -> ParameterSet {
        compose([event_fields(category, action), params])
    }

    /// Checkout step hit. Fails when the items produce no product params.
    pub fn checkout(
        &self,
        items: &[ProductField],
        step: i64,
        value: impl Into<ParamValue>,
        params: ParameterSet,
    ) -> Result<ParameterSet, FailureReason> {
        let products = non_empty_products(items)?;
        let fields = ParameterSet::new().with("cos", step).with("col", value);
        Ok(compose([products, self.pageview_fields(), fields, params]))
    }

    /// Purchase hit. Fails when the items produce no product params.
    pub fn purchase(
        &self,
        items: &[ProductField],
        transaction: &Transaction,
        params: ParameterSet,
    ) -> Result<ParameterSet, FailureReason> {
        let products = non_empty_products(items)?;
        let mut fields = ParameterSet::new()
            .with("pa", "purchase")
            .with("ti", transaction.id.clone())
            .with("ta", transaction.affiliation.as_str())
            .with("tr", transaction.revenue);
        fields.insert_opt("ts", transaction.shipping.map(ParamValue::from));
        fields.insert_opt("tt", transaction.tax.map(ParamValue::from));
        fields.insert_opt("tcc", transaction.coupon.clone().map(ParamValue::from));
        Ok(compose([products, self.pageview_fields(), fields, params]))
    }

    /// Refund hit: a non-interaction `Ecommerce / Refund` event.
    pub fn refund(&self, transaction_id: impl Into<ParamValue>, params: ParameterSet) -> ParameterSet {
        let fields = ParameterSet::new()
            .with("ni", 1)
            .with("ti", transaction_id)
            .with("pa", "refund");
        compose([event_fields("Ecommerce", "Refund"), fields, params])
    }

    fn pageview_fields(&self) -> ParameterSet {
        let mut fields = ParameterSet::new().with("t", "pageview");
        fields.insert_opt("dh", self.context.host.clone().map(ParamValue::from));
        fields.insert_opt("dp", self.context.path.clone().map(ParamValue::from));
        fields
    }
}

/// Flatten a product list into `pr<position><suffix>` keys.
///
/// Items without a position have no key to live under and contribute
/// nothing. Absent attributes are emitted as nulls. For duplicate positions
/// the later item wins.
pub fn products_to_params(items: &[ProductField]) -> ParameterSet {
    let mut params = ParameterSet::new();
    for item in items {
        let Some(position) = item.position() else {
            debug!(?item, "skipping product without position");
            continue;
        };
        for (suffix, attribute) in PRODUCT_FIELD_MAP {
            params.insert_opt(format!("pr{position}{suffix}"), item.attribute(attribute));
        }
    }
    params
}

fn non_empty_products(items: &[ProductField]) -> Result<ParameterSet, FailureReason> {
    let products = products_to_params(items);
    if products.is_empty() {
        return Err(FailureReason::EmptyProductList);
    }
    Ok(products)
}

fn event_fields(category: &str, action: &str) -> ParameterSet {
    ParameterSet::new()
        .with("t", "event")
        .with("ec", category)
        .with("ea", action)
}

fn compose<const N: usize>(layers: [ParameterSet; N]) -> ParameterSet {
    let mut params = ParameterSet::new();
    for layer in layers {
        params.overlay(layer);
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::new("shop.example.com", "/cart?step=2")
    }

    fn widget() -> ProductField {
        ProductField::at_position(1)
            .with_id(1)
            .with_name("Widget")
            .with_price(9.99)
            .with_quantity(2)
    }

    fn str_of(params: &ParameterSet, key: &str) -> Option<String> {
        params.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_pageview_defaults_from_context() {
        let context = ctx();
        let hit = HitBuilder::new(&context).pageview(ParameterSet::new());
        assert_eq!(str_of(&hit, "t").as_deref(), Some("pageview"));
        assert_eq!(str_of(&hit, "dh").as_deref(), Some("shop.example.com"));
        assert_eq!(str_of(&hit, "dp").as_deref(), Some("/cart?step=2"));
    }

    #[test]
    fn test_pageview_caller_overrides() {
        let context = ctx();
        let hit = HitBuilder::new(&context)
            .pageview(ParameterSet::new().with("dp", "/custom").with("dt", "Title"));
        assert_eq!(str_of(&hit, "dp").as_deref(), Some("/custom"));
        assert_eq!(str_of(&hit, "dt").as_deref(), Some("Title"));
        assert_eq!(str_of(&hit, "dh").as_deref(), Some("shop.example.com"));
    }

    #[test]
    fn test_pageview_without_context_has_no_host_or_path() {
        let context = RequestContext::default();
        let hit = HitBuilder::new(&context).pageview(ParameterSet::new());
        assert!(hit.get("dh").is_none());
        assert!(hit.get("dp").is_none());
        assert_eq!(hit.len(), 1);
    }

    #[test]
    fn test_event_fields() {
        let context = RequestContext::default();
        let hit = HitBuilder::new(&context).event(
            "Video",
            "play",
            ParameterSet::new().with("el", "intro"),
        );
        assert_eq!(str_of(&hit, "t").as_deref(), Some("event"));
        assert_eq!(str_of(&hit, "ec").as_deref(), Some("Video"));
        assert_eq!(str_of(&hit, "ea").as_deref(), Some("play"));
        assert_eq!(str_of(&hit, "el").as_deref(), Some("intro"));
    }

    #[test]
    fn test_products_to_params_field_layout() {
        let items = vec![
            widget(),
            ProductField::at_position(2)
                .with_name("Gadget")
                .with_brand("Acme")
                .with_category("Tools")
                .with_variant("red"),
        ];
        let params = products_to_params(&items);

        assert_eq!(str_of(&params, "pr1id").as_deref(), Some("1"));
        assert_eq!(str_of(&params, "pr1nm").as_deref(), Some("Widget"));
        assert_eq!(str_of(&params, "pr1pr").as_deref(), Some("9.99"));
        assert_eq!(str_of(&params, "pr1qt").as_deref(), Some("2"));
        assert!(params.contains_key("pr1br"));
        assert!(params.get("pr1br").is_none());

        assert_eq!(str_of(&params, "pr2nm").as_deref(), Some("Gadget"));
        assert_eq!(str_of(&params, "pr2br").as_deref(), Some("Acme"));
        assert_eq!(str_of(&params, "pr2ca").as_deref(), Some("Tools"));
        assert_eq!(str_of(&params, "pr2va").as_deref(), Some("red"));
        assert_eq!(params.len(), 14);

        let keys: Vec<&str> = params.iter().take(7).map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["pr1id", "pr1nm", "pr1ca", "pr1br", "pr1va", "pr1pr", "pr1qt"]
        );
    }

    #[test]
    fn test_products_duplicate_position_last_wins() {
        let items = vec![
            ProductField::at_position(1).with_name("First"),
            ProductField::at_position(1).with_name("Second"),
        ];
        let params = products_to_params(&items);
        assert_eq!(str_of(&params, "pr1nm").as_deref(), Some("Second"));
        assert_eq!(params.len(), 7);
    }

    #[test]
    fn test_products_without_position_skipped() {
        let items = vec![ProductField::default().with_name("Orphan")];
        assert!(products_to_params(&items).is_empty());
    }

    #[test]
    fn test_checkout_requires_products() {
        let context = ctx();
        let builder = HitBuilder::new(&context);
        assert_eq!(
            builder.checkout(&[], CHECKOUT_PAYMENT, "Visa", ParameterSet::new()),
            Err(FailureReason::EmptyProductList)
        );
        assert_eq!(
            builder.checkout(
                &[ProductField::default().with_name("Orphan")],
                CHECKOUT_PAYMENT,
                "Visa",
                ParameterSet::new()
            ),
            Err(FailureReason::EmptyProductList)
        );
    }

    #[test]
    fn test_checkout_fields() {
        let context = ctx();
        let hit = HitBuilder::new(&context)
            .checkout(&[widget()], CHECKOUT_DELIVERY, "Courier", ParameterSet::new())
            .unwrap();
        assert_eq!(str_of(&hit, "t").as_deref(), Some("pageview"));
        assert_eq!(str_of(&hit, "cos").as_deref(), Some("2"));
        assert_eq!(str_of(&hit, "col").as_deref(), Some("Courier"));
        assert_eq!(str_of(&hit, "pr1nm").as_deref(), Some("Widget"));
        assert_eq!(str_of(&hit, "dh").as_deref(), Some("shop.example.com"));
    }

    #[test]
    fn test_purchase_example() {
        let context = ctx();
        let hit = HitBuilder::new(&context)
            .purchase(
                &[widget()],
                &Transaction::new("T100", "Shop", 19.98),
                ParameterSet::new(),
            )
            .unwrap();

        assert_eq!(str_of(&hit, "pa").as_deref(), Some("purchase"));
        assert_eq!(str_of(&hit, "ti").as_deref(), Some("T100"));
        assert_eq!(str_of(&hit, "ta").as_deref(), Some("Shop"));
        assert_eq!(str_of(&hit, "tr").as_deref(), Some("19.98"));
        assert_eq!(str_of(&hit, "pr1id").as_deref(), Some("1"));
        assert_eq!(str_of(&hit, "pr1nm").as_deref(), Some("Widget"));
        assert_eq!(str_of(&hit, "pr1pr").as_deref(), Some("9.99"));
        assert_eq!(str_of(&hit, "pr1qt").as_deref(), Some("2"));
        assert!(!hit.contains_key("ts"));
        assert!(!hit.contains_key("tt"));
        assert!(!hit.contains_key("tcc"));
    }

    #[test]
    fn test_purchase_optional_fields() {
        let context = ctx();
        let transaction = Transaction::new(100, "Shop", 25.0)
            .with_shipping(4.5)
            .with_tax(1.2)
            .with_coupon("SUMMER");
        let hit = HitBuilder::new(&context)
            .purchase(&[widget()], &transaction, ParameterSet::new())
            .unwrap();
        assert_eq!(str_of(&hit, "ti").as_deref(), Some("100"));
        assert_eq!(str_of(&hit, "ts").as_deref(), Some("4.5"));
        assert_eq!(str_of(&hit, "tt").as_deref(), Some("1.2"));
        assert_eq!(str_of(&hit, "tcc").as_deref(), Some("SUMMER"));
    }

    #[test]
    fn test_refund_fields() {
        let context = ctx();
        let hit = HitBuilder::new(&context).refund("T100", ParameterSet::new());
        assert_eq!(str_of(&hit, "t").as_deref(), Some("event"));
        assert_eq!(str_of(&hit, "ec").as_deref(), Some("Ecommerce"));
        assert_eq!(str_of(&hit, "ea").as_deref(), Some("Refund"));
        assert_eq!(str_of(&hit, "ni").as_deref(), Some("1"));
        assert_eq!(str_of(&hit, "ti").as_deref(), Some("T100"));
        assert_eq!(str_of(&hit, "pa").as_deref(), Some("refund"));
        assert!(hit.get("dh").is_none());
    }
}
