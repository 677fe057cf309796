//! Checkout, payment-webhook and upload glue
//!
//! Thin orchestration over external SaaS contracts. Validation errors go
//! back to the caller; a signature mismatch is rejected before anything is
//! processed; and once a payment has succeeded, fulfillment problems are
//! downgraded to an explicit reconciliation signal instead of an error, so
//! a vendor outage can never trigger a retry or refund storm.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trail_poster_lib::catalog::SizeCatalog;

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("invalid webhook signature")]
    Signature,

    #[error("fulfillment vendor error: {0}")]
    Vendor(String),
}

pub type CommerceResult<T> = Result<T, CommerceError>;

/// What the checkout endpoint receives.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub size_key: String,
    pub image_url: String,
}

/// Metadata attached to the payment session, echoed back by the webhook.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    pub size_key: String,
    pub image_url: String,
    pub vendor_variant_id: String,
}

/// A validated checkout, ready to hand to the payment provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutOrder {
    pub product_name: String,
    pub product_description: &'static str,
    pub price_cents: u32,
    pub metadata: CheckoutMetadata,
}

/// Validate a checkout request against the static size catalog.
///
/// Unknown size keys and non-TLS image URLs are validation errors; both are
/// fully recoverable and never retried.
pub fn validate_checkout(
    catalog: &SizeCatalog,
    request: &CheckoutRequest,
) -> CommerceResult<CheckoutOrder> {
    let size = catalog
        .find(&request.size_key)
        .map_err(|_| CommerceError::Validation("Invalid size"))?;

    if !request.image_url.starts_with("https://") {
        return Err(CommerceError::Validation("Invalid image URL"));
    }

    Ok(CheckoutOrder {
        product_name: format!("Trail Map Poster \u{2014} {}", size.label),
        product_description: "Enhanced Matte Paper Poster",
        price_cents: size.price_cents,
        metadata: CheckoutMetadata {
            size_key: size.key.to_string(),
            image_url: request.image_url.clone(),
            vendor_variant_id: size.vendor_variant_id.to_string(),
        },
    })
}

/// Reject a webhook delivery whose signature is missing or wrong.
pub fn verify_signature(signature: Option<&str>, secret: &str) -> CommerceResult<()> {
    match signature {
        Some(signature) if constant_time_eq(signature.as_bytes(), secret.as_bytes()) => Ok(()),
        _ => Err(CommerceError::Signature),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// The slice of a payment event the webhook cares about.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub metadata: Option<EventMetadata>,
    #[serde(default)]
    pub shipping: Option<ShippingAddress>,
}

/// Session metadata as it comes back from the provider: every field may be
/// missing.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub vendor_variant_id: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
}

/// A fulfillment order for the print vendor.
#[derive(Clone, Debug, Serialize)]
pub struct FulfillmentOrder {
    pub recipient: Recipient,
    pub variant_id: u32,
    pub quantity: u32,
    pub file_url: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Recipient {
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state_code: String,
    pub country_code: String,
    pub zip: String,
}

impl Recipient {
    fn from_shipping(shipping: &ShippingAddress) -> Self {
        Self {
            name: shipping.name.clone().unwrap_or_else(|| "Customer".to_string()),
            address1: shipping.address1.clone().unwrap_or_default(),
            address2: shipping.address2.clone(),
            city: shipping.city.clone().unwrap_or_default(),
            state_code: shipping.state_code.clone().unwrap_or_default(),
            country_code: shipping.country_code.clone().unwrap_or_else(|| "US".to_string()),
            zip: shipping.zip.clone().unwrap_or_default(),
        }
    }
}

/// The print vendor seam, so webhook handling is testable without the SaaS.
#[allow(async_fn_in_trait)]
pub trait FulfillmentVendor {
    /// Place a draft order; returns the vendor's order id.
    async fn create_order(&self, order: &FulfillmentOrder) -> CommerceResult<u64>;

    /// Confirm a draft order so the vendor starts fulfillment.
    async fn confirm_order(&self, order_id: u64) -> CommerceResult<()>;
}

/// What handling a webhook delivery produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Not a completed-payment event; acknowledged and skipped
    Ignored,
    /// Fulfillment order created and confirmed
    OrderPlaced { order_id: u64 },
    /// Payment succeeded but fulfillment could not be placed; the delivery
    /// is still acknowledged and the order needs manual follow-up
    ReconciliationNeeded { reason: String },
}

/// Handle a verified-signature payment webhook delivery.
///
/// Everything after the signature check is at-most-once effort: missing
/// metadata, missing shipping and vendor failures all acknowledge the
/// delivery and report [`WebhookOutcome::ReconciliationNeeded`].
pub async fn handle_payment_event<V: FulfillmentVendor>(
    vendor: &V,
    signature: Option<&str>,
    webhook_secret: &str,
    event: &PaymentEvent,
) -> CommerceResult<WebhookOutcome> {
    verify_signature(signature, webhook_secret)?;

    if event.event_type != "checkout.session.completed" {
        return Ok(WebhookOutcome::Ignored);
    }

    let (image_url, variant_id) = match &event.metadata {
        Some(EventMetadata {
            image_url: Some(url),
            vendor_variant_id: Some(variant),
        }) => match variant.parse::<u32>() {
            Ok(id) => (url.clone(), id),
            Err(_) => return Ok(reconcile(format!("unparseable variant id {variant:?}"))),
        },
        _ => return Ok(reconcile("missing checkout metadata".to_string())),
    };

    let Some(shipping) = &event.shipping else {
        return Ok(reconcile("missing shipping address".to_string()));
    };

    let order = FulfillmentOrder {
        recipient: Recipient::from_shipping(shipping),
        variant_id,
        quantity: 1,
        file_url: image_url,
    };

    let order_id = match vendor.create_order(&order).await {
        Ok(id) => id,
        Err(e) => return Ok(reconcile(format!("order creation failed: {e}"))),
    };
    if let Err(e) = vendor.confirm_order(order_id).await {
        return Ok(reconcile(format!("order {order_id} confirmation failed: {e}")));
    }

    tracing::info!(order_id, "fulfillment order confirmed");
    Ok(WebhookOutcome::OrderPlaced { order_id })
}

fn reconcile(reason: String) -> WebhookOutcome {
    tracing::warn!(%reason, "payment succeeded but fulfillment needs manual reconciliation");
    WebhookOutcome::ReconciliationNeeded { reason }
}

/// Upload authorization constraints for finished posters.
#[derive(Clone, Copy, Debug)]
pub struct UploadPolicy {
    pub content_types: &'static [&'static str],
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            content_types: &["image/png"],
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

impl UploadPolicy {
    pub fn check(&self, content_type: &str, size_bytes: u64) -> CommerceResult<()> {
        if !self.content_types.contains(&content_type) {
            return Err(CommerceError::Validation("Unsupported content type"));
        }
        if size_bytes > self.max_bytes {
            return Err(CommerceError::Validation("File too large"));
        }
        Ok(())
    }
}
