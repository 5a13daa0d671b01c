//! Domain module
//!
//! Core domain types and business rules. Nothing in here touches the database
//! or HTTP layers, except for the `ExpenseScope::push_*_filter` methods, which
//! render the visibility rule into a `sqlx::QueryBuilder`.

/// Declares a closed, string-backed enum (as stored in VARCHAR columns and sent
/// over the wire) together with `as_str`, `Display` and a case-insensitive `FromStr`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::domain::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_uppercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| $crate::domain::DomainError::InvalidValue {
                        field: stringify!($name),
                        value: s.to_string(),
                    })
            }
        }
    };
}

pub(crate) use string_enum;

pub mod approval;
pub mod context;
pub mod error;
pub mod expense;
pub mod money;
pub mod role;
pub mod scope;

pub use approval::{authorize_decision, ApprovalDecision, ApprovalStatus};
pub use context::OperationContext;
pub use error::DomainError;
pub use expense::{ExpenseCategory, ExpenseStatus, ExpenseTransition};
pub use money::{CurrencyCode, Money, MoneyError};
pub use role::UserRole;
pub use scope::{ExpenseOwnership, ExpenseScope};
