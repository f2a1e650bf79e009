//! Participant demographics

use ats_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Youngest accepted participant age
pub const MIN_AGE: u8 = 13;
/// Oldest accepted participant age
pub const MAX_AGE: u8 = 100;

/// Demographic answers collected before any clip is shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    pub age: u8,
    /// Free text as typed by the participant; matched case-insensitively
    pub mother_tongue: String,
}

impl Demographics {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(Error::InvalidInput(format!(
                "age must be between {} and {}",
                MIN_AGE, MAX_AGE
            )));
        }
        if self.mother_tongue.trim().is_empty() {
            return Err(Error::InvalidInput(
                "mother_tongue must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demographics(age: u8, tongue: &str) -> Demographics {
        Demographics {
            age,
            mother_tongue: tongue.to_string(),
        }
    }

    #[test]
    fn test_valid_demographics() {
        assert!(demographics(25, "Spanish").validate().is_ok());
        assert!(demographics(MIN_AGE, "x").validate().is_ok());
        assert!(demographics(MAX_AGE, "x").validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_age() {
        assert!(matches!(
            demographics(12, "English").validate(),
            Err(Error::InvalidInput(_))
        ));
        assert!(demographics(101, "English").validate().is_err());
    }

    #[test]
    fn test_rejects_blank_tongue() {
        assert!(demographics(30, "   ").validate().is_err());
    }
}
