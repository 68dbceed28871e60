use serde::{Deserialize, Serialize};

use event_store::{EventInfo, EventRecord};

// ============================================================================
// ORDER ENTITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    CreditCard,
    DebitCard,
    Cash,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::CreditCard => "CREDIT_CARD",
            PaymentType::DebitCard => "DEBIT_CARD",
            PaymentType::Cash => "CASH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingType {
    Economic,
    Urgent,
}

impl ShippingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingType::Economic => "ECONOMIC",
            ShippingType::Urgent => "URGENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CarrierType {
    Correios,
    Fedex,
}

impl CarrierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarrierType::Correios => "CORREIOS",
            CarrierType::Fedex => "FEDEX",
        }
    }
}

/// A product reference held by an order: code plus the price at order time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProduct {
    pub code: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderShipping {
    #[serde(rename = "type")]
    pub kind: ShippingType,
    pub carrier: CarrierType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBilling {
    pub payment: PaymentType,
    pub total_price: f64,
}

/// A persisted order. The customer email is the partition key; the id is
/// repository-assigned at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub email: String,
    pub id: String,
    /// Millisecond epoch, repository-assigned
    pub created_at: i64,
    pub shipping: OrderShipping,
    pub billing: OrderBilling,
    pub products: Vec<OrderProduct>,
}

impl Order {
    /// Codes of the constituent products, in order
    pub fn product_codes(&self) -> Vec<String> {
        self.products.iter().map(|p| p.code.clone()).collect()
    }
}

/// An order as submitted for creation, before the repository assigns its
/// id and timestamp
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub email: String,
    pub shipping: OrderShipping,
    pub billing: OrderBilling,
    pub products: Vec<OrderProduct>,
}

// ============================================================================
// CATALOG VIEW
// ============================================================================

/// The slice of a catalog product the orchestrator needs to validate and
/// price an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: String,
    pub code: String,
    pub price: f64,
}

// ============================================================================
// API SHAPES
// ============================================================================

/// Body of POST /orders
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub email: String,
    pub product_ids: Vec<String>,
    pub payment: PaymentType,
    pub shipping: OrderShipping,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub email: String,
    pub id: String,
    pub created_at: i64,
    pub billing: OrderBilling,
    pub shipping: OrderShipping,
    pub products: Vec<OrderProduct>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            email: order.email,
            id: order.id,
            created_at: order.created_at,
            billing: order.billing,
            shipping: order.shipping,
            products: order.products,
        }
    }
}

/// Flat view of an event history row returned by GET /orders/events
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEventView {
    pub email: String,
    pub created_at: i64,
    pub event_type: String,
    pub request_id: String,
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_codes: Option<Vec<String>>,
}

impl From<EventRecord> for OrderEventView {
    fn from(record: EventRecord) -> Self {
        let (order_id, product_codes) = match record.info {
            EventInfo::Order {
                order_id,
                product_codes,
                ..
            } => (order_id, product_codes),
            // Product rows can't surface here through the ORDER_ index
            // queries, but the mapping stays total.
            EventInfo::Product { product_id, .. } => (product_id, None),
        };
        Self {
            email: record.email,
            created_at: record.created_at,
            event_type: record.event_type,
            request_id: record.request_id,
            order_id,
            product_codes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_serializes_camel_case() {
        let order = Order {
            email: "a@b.com".to_string(),
            id: "o1".to_string(),
            created_at: 1000,
            shipping: OrderShipping {
                kind: ShippingType::Economic,
                carrier: CarrierType::Correios,
            },
            billing: OrderBilling {
                payment: PaymentType::Cash,
                total_price: 10.0,
            },
            products: vec![OrderProduct {
                code: "P1".to_string(),
                price: 10.0,
            }],
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["createdAt"], 1000);
        assert_eq!(json["shipping"]["type"], "ECONOMIC");
        assert_eq!(json["shipping"]["carrier"], "CORREIOS");
        assert_eq!(json["billing"]["payment"], "CASH");
        assert_eq!(json["billing"]["totalPrice"], 10.0);
    }

    #[test]
    fn create_request_parses() {
        let request: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "email": "a@b.com",
            "productIds": ["id-1", "id-2"],
            "payment": "DEBIT_CARD",
            "shipping": { "type": "URGENT", "carrier": "FEDEX" }
        }))
        .unwrap();
        assert_eq!(request.product_ids.len(), 2);
        assert_eq!(request.payment, PaymentType::DebitCard);
        assert_eq!(request.shipping.kind, ShippingType::Urgent);
    }
}
