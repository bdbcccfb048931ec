use serde::{Deserialize, Serialize};

use crate::engine::ReferenceError;

/// Macro to generate enum with as_str + Display + std::str::FromStr pattern.
/// The string form doubles as the serde representation.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ReferenceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ReferenceError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(
    /// Deterministic verdict attached to a drug for a given phenotype.
    RiskLabel {
        Safe => "Safe",
        AdjustDosage => "Adjust Dosage",
        Toxic => "Toxic",
        Ineffective => "Ineffective",
        Unknown => "Unknown",
    }
);

str_enum!(Severity {
    Low => "low",
    Moderate => "moderate",
    High => "high",
    Critical => "critical",
});

str_enum!(
    /// Functional class inferred from a diplotype (CPIC standardized terms).
    Phenotype {
        UltrarapidMetabolizer => "Ultrarapid Metabolizer",
        RapidMetabolizer => "Rapid Metabolizer",
        NormalMetabolizer => "Normal Metabolizer",
        IntermediateMetabolizer => "Intermediate Metabolizer",
        PoorMetabolizer => "Poor Metabolizer",
        NormalFunction => "Normal Function",
        DecreasedFunction => "Decreased Function",
        Indeterminate => "Indeterminate",
    }
);

impl Phenotype {
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Indeterminate)
    }
}
