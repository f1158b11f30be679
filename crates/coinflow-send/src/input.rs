//! Mutable user input of a send session.

use coinflow_core::types::InputType;
use serde::{Deserialize, Serialize};

/// Coarse fee priority, mapped to a fee rate by the fee-rate provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeRatePriority {
    Low,
    #[default]
    Medium,
    High,
}

impl FeeRatePriority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Map a slider position (0, 1, 2) to a priority; anything else is Medium.
    pub fn from_index(index: i32) -> Self {
        match index {
            0 => Self::Low,
            2 => Self::High,
            _ => Self::Medium,
        }
    }

    /// Slider position of this priority.
    pub fn index(&self) -> i32 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

impl std::str::FromStr for FeeRatePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown fee priority: {other}")),
        }
    }
}

/// What the user has entered so far.
///
/// `amount` is a fixed-point value in the unit named by `input_type`:
/// coin base units for [`InputType::Coin`], currency at 8 decimals for
/// [`InputType::Currency`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SendUserInput {
    pub address: Option<String>,
    pub amount: u64,
    pub input_type: InputType,
    pub fee_rate_priority: FeeRatePriority,
}

impl SendUserInput {
    /// Empty input in the given unit.
    pub fn new(input_type: InputType) -> Self {
        Self {
            input_type,
            ..Self::default()
        }
    }

    /// Address with surrounding whitespace removed; `None` when blank.
    pub fn trimmed_address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_from_index_defaults_to_medium() {
        assert_eq!(FeeRatePriority::from_index(0), FeeRatePriority::Low);
        assert_eq!(FeeRatePriority::from_index(1), FeeRatePriority::Medium);
        assert_eq!(FeeRatePriority::from_index(2), FeeRatePriority::High);
        assert_eq!(FeeRatePriority::from_index(7), FeeRatePriority::Medium);
        assert_eq!(FeeRatePriority::from_index(-1), FeeRatePriority::Medium);
        for p in FeeRatePriority::ALL {
            assert_eq!(FeeRatePriority::from_index(p.index()), p);
        }
    }

    #[test]
    fn priority_parse() {
        assert_eq!("HIGH".parse::<FeeRatePriority>().unwrap(), FeeRatePriority::High);
        assert!("urgent".parse::<FeeRatePriority>().is_err());
    }

    #[test]
    fn default_input() {
        let input = SendUserInput::default();
        assert_eq!(input.amount, 0);
        assert_eq!(input.input_type, InputType::Coin);
        assert_eq!(input.fee_rate_priority, FeeRatePriority::Medium);
        assert_eq!(input.trimmed_address(), None);
    }

    #[test]
    fn blank_address_is_none() {
        let input = SendUserInput {
            address: Some("   ".into()),
            ..SendUserInput::default()
        };
        assert_eq!(input.trimmed_address(), None);
        let input = SendUserInput {
            address: Some(" abc ".into()),
            ..SendUserInput::default()
        };
        assert_eq!(input.trimmed_address(), Some("abc"));
    }
}
