use reef_collection::Collection;
use reef_query::{Doc, Schema, Shape};
use reef_store::MemoryStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipping {
    pub city: String,
    pub zip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    pub customer: String,
    pub status: String,
    pub total: f64,
    pub tags: Vec<String>,
    pub shipping: Shipping,
}

impl Doc for Order {
    const COLLECTION: &'static str = "orders";

    fn schema() -> Schema {
        Schema::new(Shape::document([
            ("customer", Shape::scalar()),
            ("status", Shape::scalar()),
            ("total", Shape::scalar()),
            ("tags", Shape::array(Shape::scalar())),
            (
                "shipping",
                Shape::document([("city", Shape::scalar()), ("zip", Shape::scalar())]),
            ),
        ]))
    }
}

pub fn order(id: &str, customer: &str, status: &str, total: f64, tags: &[&str], city: &str) -> Order {
    Order {
        id: id.to_string(),
        customer: customer.to_string(),
        status: status.to_string(),
        total,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        shipping: Shipping {
            city: city.to_string(),
            zip: "0000".to_string(),
        },
    }
}

/// A collection over a fresh memory store, seeded with 5 orders.
pub fn seeded() -> Collection<Order, MemoryStore> {
    let collection = Collection::new(MemoryStore::new());
    collection
        .insert_many(&[
            order("ord-1", "ada", "open", 120.0, &["priority"], "Lisbon"),
            order("ord-2", "grace", "open", 75.5, &[], "Porto"),
            order("ord-3", "alan", "held", 12.0, &["gift"], "Lisbon"),
            order("ord-4", "ada", "shipped", 240.0, &["priority", "gift"], "Faro"),
            order("ord-5", "edsger", "cancelled", 0.0, &[], "Porto"),
        ])
        .unwrap();
    collection
}
