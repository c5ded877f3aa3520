//! Return-file processing example

use bigdecimal::BigDecimal;
use billing_core::{BillingService, Installment, MemoryStorage, Payer};
use chrono::NaiveDate;
use std::str::FromStr;

/// Build one return detail line the way the bank transmits it
fn bank_detail_line(nosso: &str, occurrence: &str, payment_date: &str, paid_cents: u64) -> String {
    let mut line = String::with_capacity(400);
    line.push('1');
    line.push_str(&"0".repeat(17));
    line.push_str(&format!("{nosso:0>11}8"));
    line.push_str(&format!("{:<10}", "CT-1024"));
    line.push_str(occurrence);
    line.push_str(payment_date);
    line.push_str(&format!("{paid_cents:013}"));
    line.push_str(&"0".repeat(39));
    line.push_str("   ");
    line.push_str(&" ".repeat(291));
    line.push_str("000002");
    line
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("📥 Billing Core - Return Processing Example\n");

    let storage = MemoryStorage::new();
    let mut service = BillingService::new(storage);

    // Installments the bank is collecting for us
    for n in 1..=3u32 {
        service
            .installments_mut()
            .register(Installment::new(
                format!("2024{n:06}"),
                "CT-1024".to_string(),
                NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                BigDecimal::from_str("350.00")?,
                format!("{n:011}"),
                Payer {
                    name: "Maria Souza".to_string(),
                    address: "Av. Central, 500".to_string(),
                    neighborhood: "Jardim".to_string(),
                    city: "Campinas".to_string(),
                    state: "SP".to_string(),
                    postal_code: "13010000".to_string(),
                },
            ))
            .await?;
    }

    // The bank's return: one confirmation, one payment, one garbled line
    let return_file = format!(
        "{}\r\n{}\r\nGARBLED\r\n",
        bank_detail_line("00000000001", "02", "000000", 0),
        bank_detail_line("00000000002", "06", "140224", 36_125),
    );

    println!("🔄 Reconciling return file...");
    let (summary, errors) = service.reconcile_return_file(&return_file).await?;

    println!("  ✓ Confirmed entries: {}", summary.confirmed);
    println!("  ✓ Settlements applied: {}", summary.applied);
    println!("  ✓ No-ops: {}", summary.no_ops);
    println!("  ✓ Unmatched: {}", summary.unmatched);
    for error in &errors {
        println!("  ⚠ {error}");
    }

    // Importing the same file again double-applies nothing
    let (again, _) = service.reconcile_return_file(&return_file).await?;
    println!(
        "\n🔁 Re-import: {} applied, {} no-ops",
        again.applied, again.no_ops
    );

    Ok(())
}
