use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};
use storefront_engine::db_types::Order;

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

pub fn format_orders(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No orders found.".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["Order", "Placed", "Email", "Total", "Method", "Payment", "Shipping", "Tracking"]);
    for order in orders {
        table.add_row(row![
            order.order_number,
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.email,
            r->order.total,
            order.payment_method,
            order.payment_status,
            order.shipping_status,
            order.tracking_number.as_deref().unwrap_or("-"),
        ]);
    }
    table.set_format(markdown_format());
    table.to_string()
}

pub fn format_order_summary(order: &Order) -> String {
    let tracking = order.tracking_number.as_deref().map(|t| format!(" (tracking {t})")).unwrap_or_default();
    format!(
        "Order {} | {} | payment {} | shipping {}{tracking}",
        order.order_number, order.total, order.payment_status, order.shipping_status
    )
}
