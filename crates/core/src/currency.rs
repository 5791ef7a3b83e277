//! Supported currency codes.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// ISO-4217 currency accepted by the ledger.
///
/// Amounts are always carried separately as integer minor units; the currency
/// only partitions balances.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Aud,
    Cad,
    Eur,
    Gbp,
    Hkd,
    Jpy,
    Nzd,
    Sgd,
    Chf,
    Cny,
    Dkk,
    Inr,
    Krw,
    Mxn,
    Nok,
    Pln,
    Sek,
    Brl,
    Zar,
}

impl Currency {
    pub const ALL: [Currency; 20] = [
        Currency::Usd,
        Currency::Aud,
        Currency::Cad,
        Currency::Eur,
        Currency::Gbp,
        Currency::Hkd,
        Currency::Jpy,
        Currency::Nzd,
        Currency::Sgd,
        Currency::Chf,
        Currency::Cny,
        Currency::Dkk,
        Currency::Inr,
        Currency::Krw,
        Currency::Mxn,
        Currency::Nok,
        Currency::Pln,
        Currency::Sek,
        Currency::Brl,
        Currency::Zar,
    ];

    /// Lowercase ISO code, as stored and serialized.
    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Aud => "aud",
            Currency::Cad => "cad",
            Currency::Eur => "eur",
            Currency::Gbp => "gbp",
            Currency::Hkd => "hkd",
            Currency::Jpy => "jpy",
            Currency::Nzd => "nzd",
            Currency::Sgd => "sgd",
            Currency::Chf => "chf",
            Currency::Cny => "cny",
            Currency::Dkk => "dkk",
            Currency::Inr => "inr",
            Currency::Krw => "krw",
            Currency::Mxn => "mxn",
            Currency::Nok => "nok",
            Currency::Pln => "pln",
            Currency::Sek => "sek",
            Currency::Brl => "brl",
            Currency::Zar => "zar",
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Err(LedgerError::CurrencyRequired);
        }
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == needle)
            .ok_or_else(|| LedgerError::validation(format!("unsupported currency '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!(" eur ".parse::<Currency>().unwrap(), Currency::Eur);
    }

    #[test]
    fn empty_code_means_currency_required() {
        assert_eq!("".parse::<Currency>(), Err(LedgerError::CurrencyRequired));
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(matches!(
            "xyz".parse::<Currency>(),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn serde_uses_lowercase_codes() {
        let json = serde_json::to_string(&Currency::Gbp).unwrap();
        assert_eq!(json, "\"gbp\"");
        for c in Currency::ALL {
            let back: Currency = serde_json::from_str(&format!("\"{}\"", c.code())).unwrap();
            assert_eq!(back, c);
        }
    }
}
