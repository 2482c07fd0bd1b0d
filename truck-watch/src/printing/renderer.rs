//! Customer receipt renderer
//!
//! Renders an [`OrderSnapshot`] into ESC/POS bytes for an 80mm thermal printer.

use chrono_tz::Tz;
use shared::{OrderItem, OrderSnapshot, format_money};
use tracing::instrument;
use truck_printer::EscPosBuilder;

/// Characters per line on 80mm paper with font A
pub const RECEIPT_WIDTH: usize = 42;

/// Blank lines fed before the cut so the last line clears the cutter
pub const FEED_LINES: u8 = 4;

/// Printed when an item's menu reference no longer resolves
pub const UNKNOWN_ITEM: &str = "Unknown Item";

/// Printed in place of a line total too large to compute
pub const UNPRICED: &str = "$--.--";

/// Receipt renderer
///
/// Output depends only on the order and the renderer's settings, so the
/// same snapshot always produces the same bytes.
#[derive(Debug, Clone)]
pub struct ReceiptRenderer {
    width: usize,
    timezone: Tz,
    feed_lines: u8,
}

impl ReceiptRenderer {
    /// Create a new renderer with specified paper width and timezone
    pub fn new(width: usize, timezone: Tz) -> Self {
        Self {
            width,
            timezone,
            feed_lines: FEED_LINES,
        }
    }

    pub fn with_feed_lines(mut self, feed_lines: u8) -> Self {
        self.feed_lines = feed_lines;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn feed_lines(&self) -> u8 {
        self.feed_lines
    }

    /// Render an order to ESC/POS bytes
    #[instrument(skip_all, fields(order_number = order.order_number, items = order.items.len()))]
    pub fn render(&self, order: &OrderSnapshot) -> Vec<u8> {
        let mut b = EscPosBuilder::new(self.width);

        self.render_header(&mut b, order);

        for item in &order.items {
            self.render_item(&mut b, item);
        }

        self.render_totals(&mut b, order);
        self.render_footer(&mut b);

        b.build()
    }

    fn render_header(&self, b: &mut EscPosBuilder, order: &OrderSnapshot) {
        // Order number (large, centered)
        b.center();
        b.bold();
        b.double_size();
        b.line(&format!("ORDER #{}", order.order_number));
        b.reset_size();
        b.bold_off();

        b.left();
        b.bold();
        b.line(&order.customer_name.to_uppercase());
        b.bold_off();

        b.line(&format_timestamp(order.created_at, self.timezone));
        b.sep_single();
    }

    fn render_item(&self, b: &mut EscPosBuilder, item: &OrderItem) {
        let name = item.name.as_deref().unwrap_or(UNKNOWN_ITEM);
        let left = format!("{}x {} ({})", item.quantity, name, item.size);
        let right = match item.line_total() {
            Some(total) => format!("${}", format_money(total)),
            None => UNPRICED.to_string(),
        };
        b.line_lr(&left, &right);

        if !item.customizations.is_empty() {
            b.line(&format!("   + {}", item.customizations.join(", ")));
        }
    }

    fn render_totals(&self, b: &mut EscPosBuilder, order: &OrderSnapshot) {
        b.sep_single();
        b.bold();
        b.line_lr("TOTAL", &format!("${}", format_money(order.total_amount)));
        b.bold_off();
        b.sep_single();
    }

    fn render_footer(&self, b: &mut EscPosBuilder) {
        b.feed(self.feed_lines);
        b.cut();
    }
}

impl Default for ReceiptRenderer {
    fn default() -> Self {
        Self::new(RECEIPT_WIDTH, chrono_tz::Australia::Sydney)
    }
}

/// Format unix timestamp (millis) as `dd/mm/yyyy, hh:mm am` in the given timezone
pub fn format_timestamp(ts: i64, tz: Tz) -> String {
    match chrono::DateTime::from_timestamp_millis(ts) {
        Some(dt) => dt.with_timezone(&tz).format("%d/%m/%Y, %I:%M %P").to_string(),
        None => "Unknown time".to_string(),
    }
}
