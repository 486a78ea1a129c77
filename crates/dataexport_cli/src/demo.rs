//! Sample object graph used by the command line.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};
use dataexport_core::{
    EnumFormatHint, Exportable, SpecDecimal, SpecSchema, impl_export_enum,
};

#[derive(Debug, Clone, Copy)]
pub enum Tier {
    Standard,
    Gold,
}

impl_export_enum!(Tier, "demo::Tier", [Standard, Gold]);

/// Customer; `referrer` may point back into the same graph.
pub struct Customer {
    pub name: String,
    pub tier: Tier,
    pub referrer: RefCell<Option<Rc<Customer>>>,
}

impl Exportable for Customer {
    const TYPE_NAME: &'static str = "Customer";
    const TYPE_FULL_NAME: &'static str = "demo::Customer";

    fn schema() -> SpecSchema {
        SpecSchema::builder::<Self>()
            .property("Name", |c: &Customer| c.name.clone())
            .property("Tier", |c: &Customer| c.tier)
            .property("Referrer", |c: &Customer| c.referrer.borrow().clone())
            .build()
    }
}

pub struct Order {
    pub id: u32,
    pub placed_at: NaiveDateTime,
    pub amount: SpecDecimal,
    pub shipped: bool,
    pub note: Option<String>,
    pub customer: Rc<Customer>,
    pub lines: Vec<String>,
}

impl Exportable for Order {
    const TYPE_NAME: &'static str = "Order";
    const TYPE_FULL_NAME: &'static str = "demo::Order";

    fn schema() -> SpecSchema {
        SpecSchema::builder::<Self>()
            .property("Id", |o: &Order| o.id)
            .header("Order #")
            .property("PlacedAt", |o: &Order| o.placed_at)
            .header("Placed at")
            .property("Amount", |o: &Order| o.amount)
            .format(EnumFormatHint::Currency)
            .property("Shipped", |o: &Order| o.shipped)
            .property("Customer", |o: &Order| Rc::clone(&o.customer))
            .property("Lines", |o: &Order| o.lines.clone())
            .field("Note", |o: &Order| o.note.clone())
            .build()
    }
}

fn derive_timestamp(n_day: u32, n_hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, n_day)
        .and_then(|d| d.and_hms_opt(n_hour, 15, 0))
        .unwrap_or_default()
}

/// Three orders from two customers who refer each other.
pub fn derive_demo_orders() -> Vec<Rc<Order>> {
    let alice = Rc::new(Customer {
        name: "Alice".to_string(),
        tier: Tier::Gold,
        referrer: RefCell::new(None),
    });
    let bob = Rc::new(Customer {
        name: "  Bob  ".to_string(),
        tier: Tier::Standard,
        referrer: RefCell::new(Some(Rc::clone(&alice))),
    });
    *alice.referrer.borrow_mut() = Some(Rc::clone(&bob));

    vec![
        Rc::new(Order {
            id: 1001,
            placed_at: derive_timestamp(4, 9),
            amount: SpecDecimal::new(129_990, 2),
            shipped: true,
            note: None,
            customer: Rc::clone(&alice),
            lines: vec!["Keyboard".to_string(), "Mouse".to_string()],
        }),
        Rc::new(Order {
            id: 1002,
            placed_at: derive_timestamp(5, 14),
            amount: SpecDecimal::new(4_500, 2),
            shipped: false,
            note: Some(" gift wrap ".to_string()),
            customer: Rc::clone(&bob),
            lines: vec!["Cable <USB-C>".to_string()],
        }),
        Rc::new(Order {
            id: 1003,
            placed_at: derive_timestamp(7, 18),
            amount: SpecDecimal::new(-1_000, 2),
            shipped: true,
            note: Some("refund".to_string()),
            customer: alice,
            lines: Vec::new(),
        }),
    ]
}

/// Break the referrer cycle so the customers can be dropped.
pub fn release_demo_orders(orders: &[Rc<Order>]) {
    for order in orders {
        order.customer.referrer.borrow_mut().take();
    }
}
