use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
    Card,
    Debit,
    Check,
    BankTransfer,
    Cash,
    InsuranceClaim,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Check => "check",
            PaymentMethod::BankTransfer => "bankTransfer",
            PaymentMethod::Cash => "cash",
            PaymentMethod::InsuranceClaim => "insuranceClaim",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub number: String,
    pub expiry: String,
    pub cvv: String,
    pub holder_name: String,
}

/// Method-specific payment data. Exactly one variant is active per submission.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(tag = "method", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PaymentInstrument {
    /// Used for both credit and debit cards.
    Card(CardDetails),
    Check {
        check_number: String,
        bank_name: String,
    },
    BankTransfer {
        account_number: String,
        routing_number: String,
    },
    Cash {
        received_by: String,
    },
    InsuranceClaim {
        provider: String,
        authorization_number: String,
    },
}

impl PaymentInstrument {
    /// Whether this instrument can be charged under `method`.
    pub fn supports(&self, method: PaymentMethod) -> bool {
        matches!(
            (self, method),
            (PaymentInstrument::Card(_), PaymentMethod::Card | PaymentMethod::Debit)
                | (PaymentInstrument::Check { .. }, PaymentMethod::Check)
                | (PaymentInstrument::BankTransfer { .. }, PaymentMethod::BankTransfer)
                | (PaymentInstrument::Cash { .. }, PaymentMethod::Cash)
                | (PaymentInstrument::InsuranceClaim { .. }, PaymentMethod::InsuranceClaim)
        )
    }

    /// A short description safe to print on receipts and in logs.
    pub fn summary(&self) -> String {
        match self {
            PaymentInstrument::Card(card) => mask_card_number(&card.number),
            PaymentInstrument::Check {
                check_number,
                bank_name,
            } => format!("check #{} ({})", check_number.trim(), bank_name.trim()),
            PaymentInstrument::BankTransfer { account_number, .. } => {
                format!("account ending {}", last_digits(account_number, 4))
            }
            PaymentInstrument::Cash { received_by } => {
                format!("cash received by {}", received_by.trim())
            }
            PaymentInstrument::InsuranceClaim {
                provider,
                authorization_number,
            } => format!("{} auth {}", provider.trim(), authorization_number.trim()),
        }
    }
}

/// Removes the spaces a card number may have been typed or displayed with.
pub fn strip_card_number(number: &str) -> String {
    number.chars().filter(|c| *c != ' ').collect()
}

/// Groups a card number into 4-digit blocks for display. Input is not modified.
pub fn format_card_number(number: &str) -> String {
    let digits = strip_card_number(number);
    let chars: Vec<char> = digits.chars().collect();
    chars
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `**** **** **** 1111` style rendering that keeps only the last four digits.
pub fn mask_card_number(number: &str) -> String {
    format!("**** **** **** {}", last_digits(number, 4))
}

fn last_digits(value: &str, count: usize) -> String {
    let digits: Vec<char> = value.chars().filter(char::is_ascii_digit).collect();
    digits[digits.len().saturating_sub(count)..].iter().collect()
}
