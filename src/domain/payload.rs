//! Entry-function transaction payloads.
//!
//! A `TxPayload` names an on-chain entry function and carries its ordered
//! argument list. Open/close payloads come from the backend; collateral
//! payloads are built locally from the configured module address.
//!
//! Argument encoding follows the chain SDK conventions: booleans stay
//! booleans, every u64 travels as a string (JSON numbers lose precision
//! above 2^53), addresses are 0x-strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::fixed::{to_fixed, FixedPointError};
use super::market::{MarketId, Side};

/// One entry-function argument as received from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryArg {
    Bool(bool),
    /// Raw JSON number; normalized to a string before signing.
    Number(u64),
    Text(String),
}

impl EntryArg {
    /// Stringify numbers, leave booleans and strings untouched.
    pub fn normalize(self) -> Self {
        match self {
            Self::Number(n) => Self::Text(n.to_string()),
            other => other,
        }
    }
}

/// A ready-to-sign entry-function call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxPayload {
    /// Fully qualified function id: `address::module::function`.
    pub function: String,
    #[serde(default)]
    pub type_arguments: Vec<String>,
    pub arguments: Vec<EntryArg>,
}

impl TxPayload {
    pub fn new(function: impl Into<String>, arguments: Vec<EntryArg>) -> Self {
        Self {
            function: function.into(),
            type_arguments: Vec::new(),
            arguments,
        }
    }

    /// Payload with every numeric argument in its wire (string) form.
    /// Applied before both simulation and signing so the two dry-run and
    /// submit bodies are identical.
    pub fn normalized(&self) -> Self {
        Self {
            function: self.function.clone(),
            type_arguments: self.type_arguments.clone(),
            arguments: self
                .arguments
                .iter()
                .cloned()
                .map(EntryArg::normalize)
                .collect(),
        }
    }
}

/// Open-position call built the way the backend builds it. Used by tests
/// and as the reference for the expected argument order:
/// `(market_id, is_long, margin, leverage, admin_addr)`.
pub fn open_position_entry(
    module_addr: &str,
    market_id: MarketId,
    side: Side,
    margin: Decimal,
    leverage: Decimal,
    admin_addr: &str,
) -> Result<TxPayload, FixedPointError> {
    Ok(TxPayload::new(
        format!("{module_addr}::perps_core::open_position_entry"),
        vec![
            EntryArg::Text(market_id.to_string()),
            EntryArg::Bool(side.is_long()),
            EntryArg::Text(to_fixed(margin)?.to_string()),
            EntryArg::Text(to_fixed(leverage)?.to_string()),
            EntryArg::Text(admin_addr.to_string()),
        ],
    ))
}

/// Deposit settlement-token collateral into the program vault.
pub fn deposit_collateral(
    module_addr: &str,
    amount: Decimal,
) -> Result<TxPayload, FixedPointError> {
    Ok(TxPayload::new(
        format!("{module_addr}::perps_core::deposit_collateral"),
        vec![EntryArg::Text(to_fixed(amount)?.to_string())],
    ))
}

/// Mint test collateral to the caller (testnet only).
pub fn mint_test_collateral(
    module_addr: &str,
    recipient: &str,
    amount: Decimal,
) -> Result<TxPayload, FixedPointError> {
    Ok(TxPayload::new(
        format!("{module_addr}::test_usdc::mint"),
        vec![
            EntryArg::Text(recipient.to_string()),
            EntryArg::Text(to_fixed(amount)?.to_string()),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_open_position_argument_order_and_scaling() {
        let payload = open_position_entry(
            "0xmod",
            0,
            Side::Long,
            dec!(100),
            dec!(10),
            "0xadmin",
        )
        .unwrap();
        assert_eq!(payload.function, "0xmod::perps_core::open_position_entry");
        assert_eq!(
            payload.arguments,
            vec![
                EntryArg::Text("0".to_string()),
                EntryArg::Bool(true),
                EntryArg::Text("10000000000".to_string()),
                EntryArg::Text("1000000000".to_string()),
                EntryArg::Text("0xadmin".to_string()),
            ]
        );
    }

    #[test]
    fn test_normalize_stringifies_numbers_only() {
        let payload = TxPayload::new(
            "0xmod::perps_core::close_position_entry",
            vec![
                EntryArg::Number(7),
                EntryArg::Bool(false),
                EntryArg::Text("0xadmin".to_string()),
            ],
        );
        let normalized = payload.normalized();
        assert_eq!(
            normalized.arguments,
            vec![
                EntryArg::Text("7".to_string()),
                EntryArg::Bool(false),
                EntryArg::Text("0xadmin".to_string()),
            ]
        );
    }

    #[test]
    fn test_untagged_arg_deserialization() {
        let payload: TxPayload = serde_json::from_str(
            r#"{"function":"0x1::m::f","arguments":["0",true,"1000000000",42]}"#,
        )
        .unwrap();
        assert_eq!(payload.arguments[1], EntryArg::Bool(true));
        assert_eq!(payload.arguments[3], EntryArg::Number(42));
        assert!(payload.type_arguments.is_empty());
    }

    #[test]
    fn test_deposit_and_mint_builders() {
        let dep = deposit_collateral("0xm", dec!(25.5)).unwrap();
        assert_eq!(dep.arguments, vec![EntryArg::Text("2550000000".into())]);

        let mint = mint_test_collateral("0xm", "0xme", dec!(1000)).unwrap();
        assert_eq!(mint.function, "0xm::test_usdc::mint");
        assert_eq!(mint.arguments.len(), 2);
    }
}
