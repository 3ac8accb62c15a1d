/// Defines a record code enum and its query superset, e.g. TYPE and QTYPE. Codes that are not
/// listed are kept as `$unknown(code)` so that they survive a decode and print as
/// `<prefix><code>` (RFC 3597 presentation).
#[macro_export]
macro_rules! define_type {
    {
        $vis:vis [$typ:ident, $qtyp:ident, $unknown:ident, $prefix:literal]:
        $($(#[$def_meta:meta])* $name:ident => $num:literal,)*
        ;
        $($(#[$ext_meta:meta])* $ext_name:ident => $ext_num:literal,)*
    } => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $typ {
            $($(#[$def_meta])* $name,)*
            $unknown(u16),
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $qtyp {
            $($(#[$def_meta])* $name,)*
            $($(#[$ext_meta])* $ext_name,)*
            $unknown(u16),
        }

        impl $typ {
            pub const fn as_u16(&self) -> u16 {
                match self {
                    $(Self::$name => $num,)*
                    Self::$unknown(val) => *val,
                }
            }
        }

        impl $qtyp {
            pub const fn as_u16(&self) -> u16 {
                match self {
                    $(Self::$name => $num,)*
                    $(Self::$ext_name => $ext_num,)*
                    Self::$unknown(val) => *val,
                }
            }
        }

        impl From<u16> for $typ {
            fn from(value: u16) -> Self {
                match value {
                    $($num => Self::$name,)*
                    val => Self::$unknown(val),
                }
            }
        }

        impl From<u16> for $qtyp {
            fn from(value: u16) -> Self {
                Self::from($typ::from(value))
            }
        }

        impl From<$typ> for $qtyp {
            fn from(value: $typ) -> Self {
                match value {
                    $($typ::$name => Self::$name,)*
                    $typ::$unknown(val) => match val {
                        $($ext_num => Self::$ext_name,)*
                        v => Self::$unknown(v),
                    }
                }
            }
        }

        impl std::fmt::Display for $typ {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$name => f.write_str(stringify!($name)),)*
                    Self::$unknown(val) => write!(f, concat!($prefix, "{}"), val),
                }
            }
        }

        impl std::fmt::Display for $qtyp {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$name => f.write_str(stringify!($name)),)*
                    $(Self::$ext_name => f.write_str(stringify!($ext_name)),)*
                    Self::$unknown(val) => write!(f, concat!($prefix, "{}"), val),
                }
            }
        }

        /// Accepts the mnemonic in any case, `<prefix><code>` or a bare code.
        impl std::str::FromStr for $qtyp {
            type Err = $crate::proto::UnknownMnemonic;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(if s.eq_ignore_ascii_case(stringify!($name)) {
                    return Ok(Self::$name);
                })*
                $(if s.eq_ignore_ascii_case(stringify!($ext_name)) {
                    return Ok(Self::$ext_name);
                })*
                let digits = match s.get(..$prefix.len()) {
                    Some(head) if head.eq_ignore_ascii_case($prefix) => &s[$prefix.len()..],
                    _ => s,
                };
                digits
                    .parse::<u16>()
                    .map(Self::from)
                    .map_err(|_| $crate::proto::UnknownMnemonic {
                        kind: $prefix,
                        value: s.to_owned(),
                    })
            }
        }
    };
}
