use serde::{Deserialize, Serialize};

use crate::domain::price::Price;

#[derive(Debug, Deserialize, Serialize)]
pub struct ListingCreateRequest {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ListingUpdateRequest {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReviewCreateRequest {
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}
