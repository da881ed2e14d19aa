use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::AccountKind;

/// Phone numbers arrive either as JSON strings or bare numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PhoneInput {
    Text(String),
    Number(u64),
}

impl PhoneInput {
    pub fn into_string(self) -> String {
        match self {
            PhoneInput::Text(s) => s,
            PhoneInput::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub balance: Decimal,
    #[serde(default)]
    pub account_type: AccountKind,
    pub phone_number: PhoneInput,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account_number: Uuid,
    pub balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_number_accepts_string_or_number() {
        let a: CreateAccountRequest =
            serde_json::from_str(r#"{"balance": 10, "phone_number": 5551234}"#).unwrap();
        assert_eq!(a.phone_number.into_string(), "5551234");
        assert_eq!(a.account_type, AccountKind::Savings);

        let b: CreateAccountRequest = serde_json::from_str(
            r#"{"balance": "0.50", "account_type": "virtual", "phone_number": "+44 20 7946"}"#,
        )
        .unwrap();
        assert_eq!(b.phone_number.into_string(), "+44 20 7946");
        assert_eq!(b.account_type, AccountKind::Virtual);
    }
}
