use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Label used for the native asset in text and JSON form.
pub const NATIVE_LABEL: &str = "native";

/// Identifies which asset a balance or transfer is denominated in.
///
/// The native currency is a distinguished sentinel; every other asset is a
/// fungible token identified by an opaque string. The ledger never converts
/// between assets: an `AssetId` only keys balances and selects the
/// transfer path.
///
/// # Examples
///
/// ```
/// use split_ledger::core::asset::AssetId;
///
/// let native = AssetId::Native;
/// let usdc = AssetId::token("USDC");
/// assert!(native.is_native());
/// assert!(!usdc.is_native());
/// assert_eq!("native".parse::<AssetId>().unwrap(), AssetId::Native);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AssetId {
    #[default]
    Native,
    Token(String),
}

impl AssetId {
    pub fn token(id: impl Into<String>) -> Self {
        let id = id.into();
        if id == NATIVE_LABEL {
            AssetId::Native
        } else {
            AssetId::Token(id)
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, AssetId::Native)
    }

    pub fn as_str(&self) -> &str {
        match self {
            AssetId::Native => NATIVE_LABEL,
            AssetId::Token(id) => id,
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AssetId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AssetId::token(s.trim()))
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        AssetId::token(s)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        AssetId::token(s)
    }
}

impl From<AssetId> for String {
    fn from(asset: AssetId) -> Self {
        match asset {
            AssetId::Native => NATIVE_LABEL.to_string(),
            AssetId::Token(id) => id,
        }
    }
}
