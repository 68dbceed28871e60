use serde::{Deserialize, Serialize};

/// A catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub product_name: String,
    pub code: String,
    pub price: f64,
    pub model: String,
    pub product_url: String,
}

/// Body of POST /products and PUT /products/{id}
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub product_name: String,
    pub code: String,
    pub price: f64,
    pub model: String,
    pub product_url: String,
}

impl ProductRequest {
    /// Materialize with the given id (repository-assigned on create)
    pub fn into_product(self, id: String) -> Product {
        Product {
            id,
            product_name: self.product_name,
            code: self.code,
            price: self.price,
            model: self.model,
            product_url: self.product_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_serializes_camel_case() {
        let product = Product {
            id: "id-1".to_string(),
            product_name: "Widget".to_string(),
            code: "P1".to_string(),
            price: 10.0,
            model: "W-100".to_string(),
            product_url: "https://example.com/w100".to_string(),
        };
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["productName"], "Widget");
        assert_eq!(json["productUrl"], "https://example.com/w100");
    }
}
