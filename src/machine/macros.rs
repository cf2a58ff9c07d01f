//! Macros for declaring typed state enums.

/// Generate a typed state enum with its [`State`](crate::core::State) implementation.
///
/// Variants are named after themselves unless given an explicit stored
/// name. The enum also gets `ALL` (every variant in declaration order) and
/// `from_name` for reading status attributes back.
///
/// # Example
///
/// ```
/// use state_audit::core::State;
/// use state_audit::state_enum;
///
/// state_enum! {
///     pub enum OrderState {
///         Pending = "pending",
///         Paid = "paid",
///         Refunded = "refunded",
///     }
///     final: [Refunded]
/// }
///
/// assert_eq!(OrderState::Paid.name(), "paid");
/// assert_eq!(OrderState::from_name("refunded"), Some(OrderState::Refunded));
/// assert_eq!(OrderState::ALL.len(), 3);
/// ```
#[macro_export]
macro_rules! state_enum {
    (@name $variant:ident $label:literal) => {
        $label
    };
    (@name $variant:ident) => {
        stringify!($variant)
    };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(= $label:literal)?
            ),* $(,)?
        }

        $(final: [$($final:ident),* $(,)?])?
        $(error: [$($error:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            /// Every state in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// The state stored under `name`, if any.
            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .find(|state| $crate::core::State::name(*state) == name)
                    .cloned()
            }
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $crate::state_enum!(@name $variant $($label)?)),*
                }
            }

            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    _ => false,
                }
            }

            fn is_error(&self) -> bool {
                match self {
                    $($(Self::$error => true,)*)?
                    _ => false,
                }
            }
        }
    };
}
