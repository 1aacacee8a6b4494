use serde::{Deserialize, Serialize};

use crate::core::resource::{Document, Stocked};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ticket {
    #[serde(rename = "ticketid")]
    pub ticket_id: String,
    #[serde(rename = "eventid")]
    pub event_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
}

impl Document for Ticket {
    const COLLECTION: &'static str = "ticks";
    const ID_FIELD: &'static str = "ticketid";
    const NAME: &'static str = "Ticket";
}

impl Stocked for Ticket {
    const STOCK_FIELD: &'static str = "quantity";

    fn stock(&self) -> i64 {
        self.quantity
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Merch {
    #[serde(rename = "merchid")]
    pub merch_id: String,
    #[serde(rename = "eventid")]
    pub event_id: String,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub merch_pic: String,
}

impl Document for Merch {
    const COLLECTION: &'static str = "merch";
    const ID_FIELD: &'static str = "merchid";
    const NAME: &'static str = "Merch";
}

impl Stocked for Merch {
    const STOCK_FIELD: &'static str = "stock";

    fn stock(&self) -> i64 {
        self.stock
    }
}
