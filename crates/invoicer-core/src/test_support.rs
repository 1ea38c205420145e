//! Fixtures shared by the unit tests of this crate.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::money::Money;
use crate::types::{Invoice, LineItem, NewInvoice, NewPayment, PaymentRecord, Percent};

/// Midnight UTC on the given day.
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("valid fixture date")
}

/// Items 1000 + 750, tax 10%, issued 2024-03-01, due 2024-03-31.
pub fn new_invoice() -> NewInvoice {
    NewInvoice {
        user_id: "user-1".to_string(),
        client_id: "client-1".to_string(),
        issue_date: at(2024, 3, 1),
        due_date: at(2024, 3, 31),
        items: vec![
            LineItem::from_quantity("Design", Decimal::ONE, Money::from_major(1000)),
            LineItem::from_quantity("Build", Decimal::ONE, Money::from_major(750)),
        ],
        tax_rate: Percent::from_whole(10),
        discount_rate: Percent::zero(),
        currency: "USD".to_string(),
        notes: None,
        terms: None,
    }
}

pub fn draft_invoice() -> Invoice {
    Invoice::create(new_invoice(), "INV-0001".to_string(), at(2024, 3, 1))
        .expect("valid fixture invoice")
}

/// A sent invoice whose total is exactly `total`.
pub fn sent_invoice(total: Money) -> Invoice {
    let mut input = new_invoice();
    input.items = vec![LineItem::from_quantity("Services", Decimal::ONE, total)];
    input.tax_rate = Percent::zero();

    let mut invoice = Invoice::create(input, "INV-0002".to_string(), at(2024, 3, 1))
        .expect("valid fixture invoice");
    invoice.send(at(2024, 3, 1)).expect("draft can be sent");
    invoice
}

pub fn payment_input(amount: Money, method: &str, date: DateTime<Utc>) -> NewPayment {
    NewPayment {
        amount,
        payment_method: method.to_string(),
        payment_date: date,
        reference: None,
        notes: None,
    }
}

pub fn payment_record(invoice: &Invoice, amount: Money, method: &str) -> PaymentRecord {
    PaymentRecord {
        id: Uuid::new_v4().to_string(),
        invoice_id: invoice.id.clone(),
        user_id: invoice.user_id.clone(),
        amount,
        currency: invoice.currency.clone(),
        payment_method: method.to_string(),
        payment_date: at(2024, 3, 10),
        reference: None,
        notes: None,
        created_at: at(2024, 3, 10),
    }
}
