use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        NewOrder,
        NewOrderItem,
        NewShippingAddress,
        Order,
        OrderDetail,
        OrderItem,
        OrderNumber,
        PaymentStatus,
        ShippingAddress,
        ShippingStatus,
    },
    traits::{OrderFlowError, OrderQueryFilter},
};

/// Inserts the order row, then its items and shipping address. This is not atomic on its own: call it with a
/// transaction (`&mut *tx`) so that a failure part-way leaves nothing behind.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<OrderDetail, OrderFlowError> {
    let NewOrder {
        order_number,
        user_id,
        email,
        subtotal,
        shipping_cost,
        total,
        payment_method,
        notes,
        items,
        shipping_address,
    } = order;
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                user_id,
                email,
                subtotal,
                shipping_cost,
                total,
                payment_method,
                notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(order_number.as_str())
    .bind(user_id)
    .bind(email)
    .bind(subtotal)
    .bind(shipping_cost)
    .bind(total)
    .bind(payment_method)
    .bind(notes)
    .fetch_one(&mut *conn)
    .await?;
    trace!("🗃️ Order [{}] inserted with id {}", order.order_number, order.id);
    let mut saved_items = Vec::with_capacity(items.len());
    for item in items {
        saved_items.push(insert_item(order.id, item, conn).await?);
    }
    let shipping_address = insert_address(order.id, shipping_address, conn).await?;
    debug!("🗃️ Order [{}] saved with {} items", order.order_number, saved_items.len());
    Ok(OrderDetail { order, items: saved_items, shipping_address })
}

async fn insert_item(order_id: i64, item: NewOrderItem, conn: &mut SqliteConnection) -> Result<OrderItem, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, product_id, product_name, unit_price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.product_name)
    .bind(item.unit_price)
    .bind(item.quantity)
    .fetch_one(conn)
    .await
}

async fn insert_address(
    order_id: i64,
    address: NewShippingAddress,
    conn: &mut SqliteConnection,
) -> Result<ShippingAddress, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO shipping_addresses (order_id, full_name, line1, line2, city, region, postal_code, country, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(address.full_name)
    .bind(address.line1)
    .bind(address.line2)
    .bind(address.city)
    .bind(address.region)
    .bind(address.postal_code)
    .bind(address.country)
    .bind(address.phone)
    .fetch_one(conn)
    .await
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_number = $1").bind(number.as_str()).fetch_optional(conn).await
}

pub async fn fetch_order_by_stripe_session(
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE stripe_session_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(session_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_order_detail(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderDetail>, sqlx::Error> {
    let Some(order) = fetch_order_by_number(number, &mut *conn).await? else {
        return Ok(None);
    };
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order.id)
        .fetch_all(&mut *conn)
        .await?;
    let shipping_address =
        sqlx::query_as("SELECT * FROM shipping_addresses WHERE order_id = $1").bind(order.id).fetch_one(conn).await?;
    Ok(Some(OrderDetail { order, items, shipping_address }))
}

pub async fn fetch_orders_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_guest_orders_for_email(email: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM orders WHERE user_id IS NULL AND lower(email) = lower($1) ORDER BY created_at DESC, id DESC",
    )
    .bind(email.trim())
    .fetch_all(conn)
    .await
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(number) = query.order_number {
        where_clause.push("order_number = ");
        where_clause.push_bind_unseparated(number.to_string());
    }
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(email) = query.email {
        where_clause.push("lower(email) LIKE ");
        where_clause.push_bind_unseparated(format!("%{}%", email.to_lowercase()));
    }
    if let Some(method) = query.payment_method {
        where_clause.push("payment_method = ");
        where_clause.push_bind_unseparated(method.to_string());
    }
    // Status names come from closed enums, so they are safe to inline
    if !query.payment_status.is_empty() {
        let statuses = query.payment_status.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("payment_status IN ({statuses})"));
    }
    if !query.shipping_status.is_empty() {
        let statuses = query.shipping_status.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("shipping_status IN ({statuses})"));
    }
    if let Some(since) = query.since {
        where_clause.push("datetime(created_at) >= datetime(");
        where_clause.push_bind_unseparated(since);
        where_clause.push_unseparated(")");
    }
    if let Some(until) = query.until {
        where_clause.push("datetime(created_at) <= datetime(");
        where_clause.push_bind_unseparated(until);
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

pub async fn update_payment_status(
    number: &OrderNumber,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE orders SET payment_status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_number = $2 RETURNING *",
    )
    .bind(status)
    .bind(number.as_str())
    .fetch_optional(conn)
    .await
}

pub async fn update_payment_reference(
    number: &OrderNumber,
    reference: &str,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE orders SET payment_reference = $1, payment_status = $2, updated_at = CURRENT_TIMESTAMP
            WHERE order_number = $3
            RETURNING *;
        "#,
    )
    .bind(reference)
    .bind(status)
    .bind(number.as_str())
    .fetch_optional(conn)
    .await
}

pub async fn update_stripe_session(
    number: &OrderNumber,
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE orders SET stripe_session_id = $1, payment_status = $2, updated_at = CURRENT_TIMESTAMP
            WHERE order_number = $3
            RETURNING *;
        "#,
    )
    .bind(session_id)
    .bind(PaymentStatus::Processing)
    .bind(number.as_str())
    .fetch_optional(conn)
    .await
}

pub async fn update_shipping_status(
    number: &OrderNumber,
    status: ShippingStatus,
    tracking_number: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE orders SET
                shipping_status = $1,
                tracking_number = COALESCE($2, tracking_number),
                updated_at = CURRENT_TIMESTAMP
            WHERE order_number = $3
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(tracking_number)
    .bind(number.as_str())
    .fetch_optional(conn)
    .await
}
