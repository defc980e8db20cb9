use cucumber::{gherkin::Step, given};
use sf_common::Cents;
use storefront_engine::{
    db_types::{ExchangeRate, NewProduct, NewSubscriptionPlan},
    CatalogManagement,
};

use crate::cucumber::{store_world::StoreSystem, StoreWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut StoreWorld) {
    let system = StoreSystem::new().await;
    world.system = Some(system);
}

#[given("a catalog with products")]
async fn catalog(world: &mut StoreWorld, step: &Step) {
    let table = step.table.as_ref().expect("A product table is required");
    for row in table.rows.iter().skip(1) {
        let product = NewProduct {
            slug: row[0].clone(),
            name: row[1].clone(),
            description: String::default(),
            price: Cents::parse_decimal(&row[2]).expect("Invalid price"),
            stock: row[3].parse().expect("Invalid stock"),
            active: row[4] == "true",
            category: None,
            image_url: None,
        };
        world.system().db.upsert_product(product).await.expect("Error adding product");
    }
}

#[given(expr = "the SOL exchange rate is {word}")]
async fn sol_rate(world: &mut StoreWorld, rate: String) {
    let rate = ExchangeRate::new("sol", Cents::parse_decimal(&rate).expect("Invalid rate"));
    world.system().rates.set_exchange_rate(&rate).await.expect("Error setting exchange rate");
}

#[given(expr = "a plan {string} every {int} days with {int}% off for {int} products and {int} trial days")]
async fn plan(world: &mut StoreWorld, name: String, interval_days: i64, discount: i64, count: i64, trial_days: i64) {
    let plan = NewSubscriptionPlan { name, interval_days, discount_percent: discount, product_count: count, trial_days };
    world.system().subscriptions.create_plan(plan).await.expect("Error creating plan");
}
