//! Validation of spend-job submissions.
//!
//! Runs synchronously in the submission path, before any row is written.
//! A submission that fails here never becomes a job.

use chrono::NaiveDate;

use crate::error::CoreError;
use crate::types::Money;

/// Maximum accepted length of a free-text spending description, in characters.
pub const MAX_PROMPT_CHARS: usize = 2_000;

/// Money is kept to cent precision everywhere.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a `NUMERIC(12,2)` column holds, in cents.
pub const MAX_AMOUNT_CENTS: i64 = 999_999_999_999;

/// Wire format for `transaction_date`.
pub const TRANSACTION_DATE_FORMAT: &str = "%Y-%m-%d";

/// A submission that passed validation and is ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission {
    /// Trimmed free-text description.
    pub prompt: String,
    /// Declared total, rounded to cents and strictly positive.
    pub declared_amount: Money,
    pub pre_settled: bool,
    /// `None` means "use the job's creation time".
    pub transaction_date: Option<NaiveDate>,
}

/// Validate raw submission fields.
///
/// Rules:
/// - `prompt` must not be blank and must not exceed [`MAX_PROMPT_CHARS`].
/// - `amount` rounded to cents must be greater than zero and at most
///   [`max_amount`].
/// - `transaction_date`, when present and non-blank, must be `YYYY-MM-DD`.
pub fn validate_submission(
    prompt: &str,
    amount: Money,
    pre_settled: bool,
    transaction_date: Option<&str>,
) -> Result<ValidatedSubmission, CoreError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(CoreError::validation("Prompt must not be empty"));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(CoreError::Validation(format!(
            "Prompt must not exceed {MAX_PROMPT_CHARS} characters"
        )));
    }

    let declared_amount = round_money(amount);
    if declared_amount <= Money::ZERO {
        return Err(CoreError::validation("Amount must be greater than zero"));
    }
    if declared_amount > max_amount() {
        return Err(CoreError::Validation(format!(
            "Amount must not exceed {}",
            max_amount()
        )));
    }

    let transaction_date = match transaction_date.map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_transaction_date(raw)?),
    };

    Ok(ValidatedSubmission {
        prompt: prompt.to_string(),
        declared_amount,
        pre_settled,
        transaction_date,
    })
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_transaction_date(raw: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(raw, TRANSACTION_DATE_FORMAT).map_err(|_| {
        CoreError::Validation(format!(
            "Invalid transaction_date '{raw}': expected YYYY-MM-DD"
        ))
    })
}

/// Upper bound for any stored amount (9 999 999 999.99).
pub fn max_amount() -> Money {
    Money::new(MAX_AMOUNT_CENTS, MONEY_SCALE)
}

/// Round an amount to cent precision (banker's rounding).
pub fn round_money(amount: Money) -> Money {
    amount.round_dp(MONEY_SCALE)
}
