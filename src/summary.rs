//! Weekly summary aggregation: raw transactions to a `/predict` body.

use crate::models::PredictionRequest;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Income,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// `food`, `education`, `entertainment`, `luxury` or `other`.
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
}

/// One week of activity for one child.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    /// Pocket money amounts received during the week.
    #[serde(default)]
    pub pocket_money: Vec<f64>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// Category order used to break ties: the first strictly largest spend wins.
const TOP_CATEGORY_ORDER: [&str; 6] = [
    "food",
    "education",
    "entertainment",
    "luxury",
    "donation",
    "other",
];

fn is_donation(tx: &Transaction) -> bool {
    tx.description
        .as_deref()
        .map(|d| d.to_lowercase().contains("donate"))
        .unwrap_or(false)
}

fn expense_total(transactions: &[Transaction], category: &str) -> f64 {
    transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Expense && t.category == category)
        .map(|t| t.amount)
        .sum()
}

/// Picks the spend with the largest amount; `other` when nothing was spent.
pub fn top_category(spends: &[(&'static str, f64)]) -> &'static str {
    let mut top = "other";
    let mut max = 0.0;
    for (category, amount) in spends {
        if *amount > max {
            max = *amount;
            top = *category;
        }
    }
    top
}

/// Aggregates a week of activity into the 12 model features.
pub fn summarize(request: &SummaryRequest) -> PredictionRequest {
    let txs = &request.transactions;
    let income: f64 = request.pocket_money.iter().sum();

    let food_spend = expense_total(txs, "food");
    let education_spend = expense_total(txs, "education");
    let entertainment_spend = expense_total(txs, "entertainment");
    let luxury_spend = expense_total(txs, "luxury");
    let other_spend = expense_total(txs, "other");
    let donated_amount: f64 = txs.iter().filter(|t| is_donation(t)).map(|t| t.amount).sum();

    let total_expense =
        food_spend + education_spend + entertainment_spend + luxury_spend + other_spend + donated_amount;
    let no_of_transactions = txs.len();
    let avg_transaction_amount = if no_of_transactions > 0 {
        total_expense / no_of_transactions as f64
    } else {
        0.0
    };

    let spends = [
        food_spend,
        education_spend,
        entertainment_spend,
        luxury_spend,
        donated_amount,
        other_spend,
    ];
    let ranked: Vec<(&'static str, f64)> = TOP_CATEGORY_ORDER.into_iter().zip(spends).collect();

    PredictionRequest {
        total_income: income,
        total_expense,
        savings: income - total_expense,
        no_of_transactions: no_of_transactions as f64,
        avg_transaction_amount,
        donated_amount,
        food_spend,
        education_spend,
        entertainment_spend,
        luxury_spend,
        other_spend,
        top_category: top_category(&ranked).to_string(),
    }
}
