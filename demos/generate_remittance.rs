//! Remittance generation example

use bigdecimal::BigDecimal;
use billing_core::{BankAccount, BillingService, Installment, MemoryStorage, Payer};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏦 Billing Core - Remittance Generation Example\n");

    let storage = MemoryStorage::new();
    let mut service = BillingService::new(storage);

    let account = BankAccount {
        id: Uuid::new_v4(),
        bank_code: 237,
        agency: "01234".to_string(),
        agency_digit: "5".to_string(),
        account: "0067890".to_string(),
        account_digit: "1".to_string(),
        assignor_code: "00123456789012345678".to_string(),
        assignor_name: "Prefeitura Municipal".to_string(),
        wallet_code: "009".to_string(),
        monthly_penalty_rate: BigDecimal::from(2),
        monthly_interest_rate: BigDecimal::from(1),
        remittance_dir: PathBuf::from("/tmp"),
        return_dir: PathBuf::from("/tmp"),
    };

    // 1. Register this quarter's installments
    println!("📋 Registering installments...");
    for n in 1..=4u32 {
        let installment = Installment::new(
            format!("2024{n:06}"),
            "CT-1024".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            BigDecimal::from_str("350.00")?,
            format!("{n:011}"),
            Payer {
                name: "José da Conceição".to_string(),
                address: "Rua São João, 45".to_string(),
                neighborhood: "Vila Nova".to_string(),
                city: "Itu".to_string(),
                state: "SP".to_string(),
                postal_code: "13300000".to_string(),
            },
        );
        let registered = service.installments_mut().register(installment).await?;
        println!("  ✓ Registered title {}", registered.title_number);
    }

    // 2. Check the balance of one overdue installment
    let open = service.installments().list_open(None).await?;
    let statement = service
        .installments()
        .balance(
            &open[0].id,
            &account,
            NaiveDate::from_ymd_opt(2024, 2, 9).unwrap(),
        )
        .await?;
    println!(
        "\n💰 Balance of {}: face {} + penalty {} + interest {} = {}",
        statement.nosso_numero,
        statement.face_value,
        statement.penalty,
        statement.interest,
        statement.total_due
    );

    // 3. Generate the remittance file for everything open
    println!("\n📤 Generating remittance...");
    let file = service
        .generate_remittance_for_open(&account, NaiveDate::from_ymd_opt(2024, 2, 9).unwrap(), 1)
        .await?;

    println!("  ✓ File {} with {} records", file.filename, file.line_count);
    for line in file.contents.trim_end().split("\r\n") {
        println!("    {}...", &line[..60]);
    }

    Ok(())
}
