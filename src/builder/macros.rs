//! Macros for declaring typed states.

/// Generate an enum implementing [`State`](crate::core::State), with the
/// persisted name of each variant given explicitly.
///
/// # Example
///
/// ```
/// use statehold::core::{State, StateName};
/// use statehold::state_enum;
///
/// state_enum! {
///     pub enum WorkerState {
///         Sleeping => "sleeping",
///         Running => "running",
///     }
/// }
///
/// assert_eq!(WorkerState::Running.name(), "running");
/// assert_eq!(StateName::from(WorkerState::Sleeping), StateName::from("sleeping"));
/// assert_eq!(WorkerState::ALL.len(), 2);
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $persisted:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),*];
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $persisted),*
                }
            }
        }

        impl ::std::convert::From<$name> for $crate::core::StateName {
            fn from(state: $name) -> Self {
                $crate::core::StateName::from($crate::core::State::name(&state))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::builder::DefinitionBuilder;
    use crate::core::{State, StateName};

    state_enum! {
        enum GateState {
            Opened => "opened",
            Closed => "closed",
        }
    }

    #[test]
    fn state_enum_macro_generates_trait() {
        assert_eq!(GateState::Opened.name(), "opened");
        assert_eq!(GateState::Closed.state_name(), StateName::from("closed"));
    }

    #[test]
    fn state_enum_variants_declare_a_machine() {
        struct Gate;

        let definition = GateState::ALL
            .iter()
            .fold(DefinitionBuilder::<Gate>::new(), |builder, state| {
                builder.state(*state)
            })
            .build()
            .unwrap();

        assert_eq!(
            definition.state_names(),
            vec![StateName::from("opened"), StateName::from("closed")]
        );
    }

    #[test]
    fn state_enum_supports_visibility() {
        state_enum! {
            pub enum PublicState {
                A => "a",
                B => "b",
            }
        }

        assert_eq!(PublicState::B.name(), "b");
    }
}
