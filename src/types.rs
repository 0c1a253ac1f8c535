use ethereum_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sentinel address denoting a chain's native currency.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// Decimal carries a 96-bit mantissa and a scale of at most 28.
const MAX_MANTISSA_BITS: usize = 96;
const MAX_SCALE: u8 = 28;

/// A wallet holding on one chain. Identity is `(chain_id, address)`; the
/// zero address stands in for the chain's native currency.
///
/// `balance`, `usd_price` and `usd_value` start empty and are populated
/// during resolution. `usd_value` is set only when a price was resolved and
/// the balance is positive, in which case it is exactly
/// `balance * usd_price`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub chain_id: u64,
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub logo_uri: Option<String>,
    pub balance: Decimal,
    pub usd_price: Option<Decimal>,
    pub usd_value: Option<Decimal>,
}

impl Token {
    pub fn new(
        chain_id: u64,
        address: String,
        symbol: String,
        name: String,
        decimals: u8,
        logo_uri: Option<String>,
    ) -> Self {
        Self {
            chain_id,
            address,
            symbol,
            name,
            decimals,
            logo_uri,
            balance: Decimal::ZERO,
            usd_price: None,
            usd_value: None,
        }
    }

    pub fn is_native(&self) -> bool {
        self.address == ZERO_ADDRESS
    }

    /// Ordering key for the final portfolio: USD value when priced,
    /// raw balance otherwise.
    pub fn sort_key(&self) -> Decimal {
        self.usd_value.unwrap_or(self.balance)
    }
}

/// Valued holdings for one wallet, sorted descending by `sort_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub wallet_address: String,
    pub tokens: Vec<Token>,
    pub total_usd_value: Decimal,
    pub total_tokens: usize,
    pub last_updated: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum AmountError {
    #[error("raw amount {0} exceeds decimal precision")]
    Overflow(U256),
    #[error("unsupported token scale: {0} decimals")]
    Scale(u8),
}

/// Converts a raw smallest-denomination amount into human units, e.g.
/// 1_500_000 with 6 decimals becomes 1.5.
pub fn scale_raw_amount(raw: U256, decimals: u8) -> Result<Decimal, AmountError> {
    if decimals > MAX_SCALE {
        return Err(AmountError::Scale(decimals));
    }
    if raw.bits() > MAX_MANTISSA_BITS {
        return Err(AmountError::Overflow(raw));
    }
    let amount = Decimal::from_i128_with_scale(raw.as_u128() as i128, decimals as u32);
    Ok(amount.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn token(address: &str) -> Token {
        Token::new(
            1,
            address.to_string(),
            "DAI".to_string(),
            "Dai Stablecoin".to_string(),
            18,
            None,
        )
    }

    #[test]
    fn native_detection_uses_zero_address() {
        assert!(token(ZERO_ADDRESS).is_native());
        assert!(!token("0x6b175474e89094c44da98b954eedeac495271d0f").is_native());
    }

    #[test]
    fn scales_wei_to_ether() {
        let raw = U256::from(2_500_000_000_000_000_000u128);
        assert_eq!(scale_raw_amount(raw, 18).unwrap(), dec!(2.5));
    }

    #[test]
    fn scales_six_decimal_amounts() {
        assert_eq!(scale_raw_amount(U256::from(1_500_000u64), 6).unwrap(), dec!(1.5));
        assert_eq!(scale_raw_amount(U256::from(1u64), 6).unwrap(), dec!(0.000001));
    }

    #[test]
    fn zero_raw_amount_is_zero() {
        assert_eq!(scale_raw_amount(U256::zero(), 18).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn oversized_mantissa_is_rejected() {
        let raw = U256::from(1u8) << 97;
        assert!(matches!(
            scale_raw_amount(raw, 18),
            Err(AmountError::Overflow(_))
        ));
    }

    #[test]
    fn oversized_scale_is_rejected() {
        assert!(matches!(
            scale_raw_amount(U256::from(1u64), 30),
            Err(AmountError::Scale(30))
        ));
    }

    #[test]
    fn sort_key_prefers_usd_value() {
        let mut t = token(ZERO_ADDRESS);
        t.balance = dec!(2.5);
        assert_eq!(t.sort_key(), dec!(2.5));
        t.usd_price = Some(dec!(3000));
        t.usd_value = Some(dec!(7500));
        assert_eq!(t.sort_key(), dec!(7500));
    }
}
