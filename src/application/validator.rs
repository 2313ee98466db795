use crate::domain::instrument::{CardDetails, PaymentInstrument, PaymentMethod, strip_card_number};
use crate::domain::money::Money;
use crate::error::FieldErrors;

pub const REQUIRED: &str = "required";
pub const INVALID: &str = "invalid";
pub const EXCEEDS_BALANCE: &str = "exceeds balance";
pub const NOT_POSITIVE: &str = "must be positive";
pub const METHOD_MISMATCH: &str = "does not match instrument";

/// An instrument that passed [`PaymentValidator::validate`].
///
/// Text fields are trimmed and card numbers are stripped of spaces. Only the
/// validator can construct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInstrument {
    method: PaymentMethod,
    instrument: PaymentInstrument,
}

impl ValidatedInstrument {
    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn instrument(&self) -> &PaymentInstrument {
        &self.instrument
    }

    pub fn summary(&self) -> String {
        self.instrument.summary()
    }
}

/// Field-level checks for a payment submission.
///
/// Every rule runs; the error map holds one entry per invalid field so the
/// caller can mark them all at once.
#[derive(Debug, Default, Clone, Copy)]
pub struct PaymentValidator;

impl PaymentValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(
        &self,
        method: PaymentMethod,
        instrument: &PaymentInstrument,
        amount: Money,
        invoice_balance: Money,
    ) -> Result<ValidatedInstrument, FieldErrors> {
        let mut errors = FieldErrors::new();

        if !amount.is_positive() {
            errors.insert("amount", NOT_POSITIVE);
        } else if amount > invoice_balance {
            errors.insert("amount", EXCEEDS_BALANCE);
        }

        if !instrument.supports(method) {
            errors.insert("method", METHOD_MISMATCH);
        }

        let normalized = match instrument {
            PaymentInstrument::Card(card) => PaymentInstrument::Card(check_card(card, &mut errors)),
            PaymentInstrument::Check {
                check_number,
                bank_name,
            } => PaymentInstrument::Check {
                check_number: required("checkNumber", check_number, &mut errors),
                bank_name: required("bankName", bank_name, &mut errors),
            },
            PaymentInstrument::BankTransfer {
                account_number,
                routing_number,
            } => PaymentInstrument::BankTransfer {
                account_number: required("accountNumber", account_number, &mut errors),
                routing_number: check_routing_number(routing_number, &mut errors),
            },
            PaymentInstrument::Cash { received_by } => PaymentInstrument::Cash {
                received_by: required("receivedBy", received_by, &mut errors),
            },
            PaymentInstrument::InsuranceClaim {
                provider,
                authorization_number,
            } => PaymentInstrument::InsuranceClaim {
                provider: required("provider", provider, &mut errors),
                authorization_number: required(
                    "authorizationNumber",
                    authorization_number,
                    &mut errors,
                ),
            },
        };

        errors.into_result(ValidatedInstrument {
            method,
            instrument: normalized,
        })
    }
}

fn required(field: &'static str, value: &str, errors: &mut FieldErrors) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.insert(field, REQUIRED);
    }
    trimmed.to_string()
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

fn check_card(card: &CardDetails, errors: &mut FieldErrors) -> CardDetails {
    let number = strip_card_number(card.number.trim());
    if number.is_empty() {
        errors.insert("number", REQUIRED);
    } else if number.len() != 16 || !is_digits(&number) {
        errors.insert("number", INVALID);
    }

    let expiry = card.expiry.trim();
    if expiry.is_empty() {
        errors.insert("expiry", REQUIRED);
    } else if !is_valid_expiry(expiry) {
        errors.insert("expiry", INVALID);
    }

    let cvv = card.cvv.trim();
    if cvv.is_empty() {
        errors.insert("cvv", REQUIRED);
    } else if !(3..=4).contains(&cvv.len()) || !is_digits(cvv) {
        errors.insert("cvv", INVALID);
    }

    CardDetails {
        number,
        expiry: expiry.to_string(),
        cvv: cvv.to_string(),
        holder_name: required("holderName", &card.holder_name, errors),
    }
}

/// `MM/YY` with a month of 01 through 12.
fn is_valid_expiry(expiry: &str) -> bool {
    let Some((month, year)) = expiry.split_once('/') else {
        return false;
    };
    if month.len() != 2 || year.len() != 2 || !is_digits(month) || !is_digits(year) {
        return false;
    }
    matches!(month.parse::<u8>(), Ok(1..=12))
}

fn check_routing_number(routing_number: &str, errors: &mut FieldErrors) -> String {
    let trimmed = routing_number.trim();
    if trimmed.is_empty() {
        errors.insert("routingNumber", REQUIRED);
    } else if trimmed.len() != 9 || !is_digits(trimmed) {
        errors.insert("routingNumber", INVALID);
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn card(number: &str, expiry: &str, cvv: &str, holder: &str) -> PaymentInstrument {
        PaymentInstrument::Card(CardDetails {
            number: number.to_string(),
            expiry: expiry.to_string(),
            cvv: cvv.to_string(),
            holder_name: holder.to_string(),
        })
    }

    fn validate(method: PaymentMethod, instrument: &PaymentInstrument) -> Result<ValidatedInstrument, FieldErrors> {
        PaymentValidator::new().validate(
            method,
            instrument,
            Money::new(dec!(100)),
            Money::new(dec!(486)),
        )
    }

    #[test]
    fn test_valid_card_is_normalized() {
        let validated = validate(
            PaymentMethod::Card,
            &card("4111 1111 1111 1111", "08/27", "123", "  Asha Rao "),
        )
        .unwrap();

        let PaymentInstrument::Card(details) = validated.instrument() else {
            panic!("expected a card");
        };
        assert_eq!(details.number, "4111111111111111");
        assert_eq!(details.holder_name, "Asha Rao");
        assert_eq!(validated.method(), PaymentMethod::Card);
        assert_eq!(validated.summary(), "**** **** **** 1111");
    }

    #[test]
    fn test_fifteen_digit_card_is_invalid() {
        let errors = validate(
            PaymentMethod::Card,
            &card("4111 1111 1111 111", "08/27", "123", "Asha Rao"),
        )
        .unwrap_err();
        assert_eq!(errors.get("number"), Some(INVALID));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_luhn_is_not_enforced() {
        assert!(
            validate(
                PaymentMethod::Debit,
                &card("1234 5678 9012 3456", "01/30", "9999", "R. Iyer"),
            )
            .is_ok()
        );
    }

    #[test]
    fn test_card_reports_every_invalid_field() {
        let errors = validate(PaymentMethod::Card, &card("4111-1111-1111-1111", "13/27", "12", " ")).unwrap_err();
        assert_eq!(errors.get("number"), Some(INVALID));
        assert_eq!(errors.get("expiry"), Some(INVALID));
        assert_eq!(errors.get("cvv"), Some(INVALID));
        assert_eq!(errors.get("holderName"), Some(REQUIRED));
    }

    #[test]
    fn test_expiry_format() {
        assert!(is_valid_expiry("01/25"));
        assert!(is_valid_expiry("12/99"));
        assert!(!is_valid_expiry("00/25"));
        assert!(!is_valid_expiry("1/25"));
        assert!(!is_valid_expiry("01/2025"));
        assert!(!is_valid_expiry("0125"));
        assert!(!is_valid_expiry("ab/cd"));
    }

    #[test]
    fn test_empty_card_fields_are_required() {
        let errors = validate(PaymentMethod::Card, &card("", "", "", "")).unwrap_err();
        for field in ["number", "expiry", "cvv", "holderName"] {
            assert_eq!(errors.get(field), Some(REQUIRED), "{field}");
        }
    }

    #[test]
    fn test_check_fields() {
        let errors = validate(
            PaymentMethod::Check,
            &PaymentInstrument::Check {
                check_number: " ".to_string(),
                bank_name: String::new(),
            },
        )
        .unwrap_err();
        assert_eq!(errors.get("checkNumber"), Some(REQUIRED));
        assert_eq!(errors.get("bankName"), Some(REQUIRED));
    }

    #[test]
    fn test_routing_number_must_be_nine_digits() {
        let transfer = |routing: &str| PaymentInstrument::BankTransfer {
            account_number: "00123456".to_string(),
            routing_number: routing.to_string(),
        };
        assert!(validate(PaymentMethod::BankTransfer, &transfer("021000021")).is_ok());
        for bad in ["02100002", "0210000210", "02100002x"] {
            let errors = validate(PaymentMethod::BankTransfer, &transfer(bad)).unwrap_err();
            assert_eq!(errors.get("routingNumber"), Some(INVALID), "{bad}");
        }
    }

    #[test]
    fn test_cash_and_insurance_required_fields() {
        let errors = validate(
            PaymentMethod::Cash,
            &PaymentInstrument::Cash {
                received_by: String::new(),
            },
        )
        .unwrap_err();
        assert_eq!(errors.get("receivedBy"), Some(REQUIRED));

        let errors = validate(
            PaymentMethod::InsuranceClaim,
            &PaymentInstrument::InsuranceClaim {
                provider: "Star Health".to_string(),
                authorization_number: String::new(),
            },
        )
        .unwrap_err();
        assert_eq!(errors.get("authorizationNumber"), Some(REQUIRED));
        assert!(!errors.contains("provider"));
    }

    #[test]
    fn test_amount_rules_apply_with_instrument_rules() {
        let validator = PaymentValidator::new();
        let cash = PaymentInstrument::Cash {
            received_by: String::new(),
        };

        let errors = validator
            .validate(PaymentMethod::Cash, &cash, Money::new(dec!(500.01)), Money::new(dec!(500)))
            .unwrap_err();
        assert_eq!(errors.get("amount"), Some(EXCEEDS_BALANCE));
        assert_eq!(errors.get("receivedBy"), Some(REQUIRED));

        let errors = validator
            .validate(PaymentMethod::Cash, &cash, Money::ZERO, Money::new(dec!(500)))
            .unwrap_err();
        assert_eq!(errors.get("amount"), Some(NOT_POSITIVE));
    }

    #[test]
    fn test_full_balance_is_accepted() {
        let cash = PaymentInstrument::Cash {
            received_by: "Cashier 2".to_string(),
        };
        let result = PaymentValidator::new().validate(
            PaymentMethod::Cash,
            &cash,
            Money::new(dec!(486)),
            Money::new(dec!(486)),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_method_must_match_instrument() {
        let cash = PaymentInstrument::Cash {
            received_by: "Cashier 2".to_string(),
        };
        let errors = validate(PaymentMethod::Card, &cash).unwrap_err();
        assert_eq!(errors.get("method"), Some(METHOD_MISMATCH));
    }
}
