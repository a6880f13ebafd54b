//! Macros for declaring event name enums

/// Declares an enum of event names with their wire strings.
///
/// The generated type implements `AsRef<str>`, so it can be passed anywhere
/// the bus expects an event name.
///
/// ```rust
/// clappr_events::event_names! {
///     /// Events of a made-up widget
///     pub enum WidgetEvent {
///         Clicked => "clicked",
///         Hovered => "hovered",
///     }
/// }
///
/// assert_eq!(WidgetEvent::Clicked.as_str(), "clicked");
/// assert_eq!(WidgetEvent::from_name("hovered"), Some(WidgetEvent::Hovered));
/// ```
#[macro_export]
macro_rules! event_names {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $raw:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire name of the event
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $raw ),+
                }
            }

            /// Look an event up by its wire name
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $raw => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}
