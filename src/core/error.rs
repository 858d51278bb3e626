use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Plan fields the engine cannot default and must be supplied by the caller.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InputField {
    CurrentAge,
    InvestedAssets,
    AnnualIncome,
    AnnualExpenses,
    RetirementExpenses,
}

impl InputField {
    pub fn label(self) -> &'static str {
        match self {
            InputField::CurrentAge => "current age",
            InputField::InvestedAssets => "invested assets",
            InputField::AnnualIncome => "annual income",
            InputField::AnnualExpenses => "annual expenses",
            InputField::RetirementExpenses => "retirement expenses",
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum FireError {
    #[error("missing required input: {0}")]
    MissingInput(InputField),
    #[error("target portfolio is not reached within {max_years} years")]
    NotAchievable { max_years: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_cause() {
        assert_eq!(
            FireError::MissingInput(InputField::AnnualIncome).to_string(),
            "missing required input: annual income"
        );
        assert_eq!(
            FireError::NotAchievable { max_years: 100 }.to_string(),
            "target portfolio is not reached within 100 years"
        );
    }
}
