//! Account document model
//!
//! [`Account`] mirrors one `<Account>` element of the export document,
//! including the nested sub-account, position and property trees. Child
//! elements that are missing decode to zero values. [`AccountRecord`] is the
//! flat projection the pipeline persists.

use serde::{Deserialize, Serialize};

/// One `<Account>` element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Account {
    pub user_id: String,
    pub active: bool,
    pub code: String,
    pub credit_limit: f64,
    pub risk_multiplier: f64,
    pub collateral_allowed: bool,
    pub short_sell_allowed: bool,
    pub credit_allowed: bool,
    pub default_currency: String,
    pub derivative_level: String,
    pub allowed_instrument_types: AllowedInstrumentTypes,
    pub sub_accounts: SubAccounts,
    pub properties_nested: PropertiesNested,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowedInstrumentTypes {
    #[serde(rename = "AllowedInstrumentType")]
    pub items: Vec<AllowedInstrumentType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AllowedInstrumentType {
    pub instrument_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubAccounts {
    #[serde(rename = "SubAccount")]
    pub items: Vec<SubAccount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SubAccount {
    pub sub_account_number: String,
    pub portfolio_market_value: f64,
    pub collateral: f64,
    pub future_balance: f64,
    pub variation_margin: f64,
    pub cash_used: bool,
    pub collateral_used: bool,
    pub currency_accounts: CurrencyAccounts,
    pub positions: Positions,
    pub market_references_nested: MarketReferences,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyAccounts {
    #[serde(rename = "CurrencyAccount")]
    pub items: Vec<CurrencyAccount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CurrencyAccount {
    pub currency: String,
    pub balance: f64,
    pub interest: f64,
    pub margin: f64,
    pub currency_credit_limit: f64,
    pub external_margin: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Positions {
    #[serde(rename = "Position")]
    pub items: Vec<Position>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Position {
    pub short_name: String,
    pub instrument_id: String,
    pub volume: f64,
    pub market: String,
    pub currency: String,
    pub daily_amount: f64,
    pub loan_amount: f64,
    pub mean_value: f64,
    pub average_value: f64,
    pub trading_price: f64,
    pub quoting_currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketReferences {
    #[serde(rename = "MarketReference")]
    pub items: Vec<MarketReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct MarketReference {
    pub market_name: String,
    pub reference: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertiesNested {
    #[serde(rename = "PropertyNested")]
    pub items: Vec<PropertyNested>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PropertyNested {
    pub name: String,
    pub property_values: PropertyValues,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyValues {
    #[serde(rename = "PropertyValue")]
    pub values: Vec<String>,
}

/// The fields written for one account
///
/// Creation and modification timestamps are not part of the record; the
/// gateway stamps them when the insert executes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountRecord {
    pub code: String,
    pub credit_limit: f64,
    pub risk_multiplier: f64,
    pub active: bool,
    pub collateral_allowed: bool,
    pub short_sell_allowed: bool,
    pub credit_allowed: bool,
    pub default_currency: String,
    pub derivative_level: String,
}

impl AccountRecord {
    /// A record with the given code and zero values elsewhere
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }
}

impl From<Account> for AccountRecord {
    fn from(account: Account) -> Self {
        Self {
            code: account.code,
            credit_limit: account.credit_limit,
            risk_multiplier: account.risk_multiplier,
            active: account.active,
            collateral_allowed: account.collateral_allowed,
            short_sell_allowed: account.short_sell_allowed,
            credit_allowed: account.credit_allowed,
            default_currency: account.default_currency,
            derivative_level: account.derivative_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_projection_keeps_persisted_fields() {
        let account = Account {
            user_id: "u-17".to_string(),
            active: true,
            code: "ACC-17".to_string(),
            credit_limit: 25_000.0,
            risk_multiplier: 1.5,
            collateral_allowed: true,
            short_sell_allowed: false,
            credit_allowed: true,
            default_currency: "SEK".to_string(),
            derivative_level: "ADVANCED".to_string(),
            sub_accounts: SubAccounts {
                items: vec![SubAccount::default()],
            },
            ..Account::default()
        };

        let record = AccountRecord::from(account);

        assert_eq!(record.code, "ACC-17");
        assert_eq!(record.credit_limit, 25_000.0);
        assert_eq!(record.risk_multiplier, 1.5);
        assert!(record.active);
        assert!(record.collateral_allowed);
        assert!(!record.short_sell_allowed);
        assert!(record.credit_allowed);
        assert_eq!(record.default_currency, "SEK");
        assert_eq!(record.derivative_level, "ADVANCED");
    }
}
