//! Detection and spend command implementations

use anyhow::Result;

use paylio_core::{
    detect, round_cents, total_spend, DetectedSubscription, DetectionConfig, SubscriptionStatus,
    TransactionSource,
};

use super::truncate;

pub async fn cmd_detect(source: &dyn TransactionSource, days: u32, json: bool) -> Result<()> {
    let transactions = source.fetch(days).await?;
    let subscriptions = detect(&transactions, &DetectionConfig::default());

    if json {
        println!("{}", serde_json::to_string_pretty(&subscriptions)?);
        return Ok(());
    }

    if subscriptions.is_empty() {
        println!(
            "No recurring charges found in {} transactions over the last {} days.",
            transactions.len(),
            days
        );
        return Ok(());
    }

    println!();
    println!("📋 Detected Subscriptions ({} day window)", days);
    println!("   ─────────────────────────────────────────────────────────────");
    for sub in &subscriptions {
        println!("{}", format_subscription_row(sub));
    }
    println!();
    println!("   Review with: paylio serve");

    Ok(())
}

/// Render one table row for a detected subscription
pub(crate) fn format_subscription_row(sub: &DetectedSubscription) -> String {
    let status_icon = match sub.status {
        SubscriptionStatus::Pending => "⏳",
        SubscriptionStatus::Active => "✅",
        SubscriptionStatus::Denied => "🚫",
    };

    format!(
        "   {} {:20} │ {:>8}/{:<7} │ next {}",
        status_icon,
        truncate(&sub.merchant, 20),
        format!("${}", sub.typical_amount),
        sub.frequency.as_str(),
        sub.next_charge_estimate
    )
}

pub async fn cmd_spend(source: &dyn TransactionSource, days: u32) -> Result<()> {
    let transactions = source.fetch(days).await?;
    let total = round_cents(total_spend(&transactions));

    println!(
        "💳 Spend over the last {} days: ${} ({} transactions)",
        days,
        total,
        transactions.len()
    );

    Ok(())
}
