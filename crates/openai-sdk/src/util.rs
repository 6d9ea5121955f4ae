use serde::{de::DeserializeOwned, Deserialize, Deserializer};

/// A wire token that doesn't belong to the enumeration it was parsed as.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownWireValue {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed enumeration whose variants map to fixed wire tokens.
///
/// The mapping is a single static table, consulted by `as_str`, `FromStr`, and the
/// serde impls alike, so JSON bodies and multipart form fields always agree on the
/// spelling of a variant.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            const WIRE: &'static [($name, &'static str)] = &[ $( ($name::$variant, $wire) ),+ ];

            /// The token used for this variant on the wire.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),+
                }
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::util::UnknownWireValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::WIRE
                    .iter()
                    .find(|(_, wire)| *wire == s)
                    .map(|(variant, _)| *variant)
                    .ok_or_else(|| $crate::util::UnknownWireValue {
                        kind: stringify!($name),
                        value: s.to_owned(),
                    })
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: ::serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let s = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(::serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use wire_enum;

/// Deserializes an optional value the provider sometimes sends as a string and
/// sometimes as a number (error codes, mostly), always yielding a string.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(Option::<Loose>::deserialize(deserializer)?.map(|loose| match loose {
        Loose::Text(s) => s,
        Loose::Integer(n) => n.to_string(),
        Loose::Float(n) => n.to_string(),
    }))
}

/// Deserializes an optional value, reading anything this client can't represent as
/// `None` instead of failing the surrounding object.
pub(crate) fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| T::deserialize(value).ok()))
}
