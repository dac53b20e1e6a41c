/// Byte-order configuration applied uniformly across a message and every
/// nested message reachable from it.
///
/// Each mode corresponds to one of the conventional binary-packing prefix
/// characters; [`Mode::prefix`] yields that character for code generation
/// and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Host byte order (`@`).
    #[default]
    Native,
    /// Little-endian (`<`).
    LittleEndian,
    /// Big-endian (`>`).
    BigEndian,
    /// Network byte order (`!`), i.e. big-endian.
    Network,
}

/// Resolved byte order for encoding; `Mode::Native` collapses to the host's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ByteOrder {
    Little,
    Big,
}

impl Mode {
    /// The format prefix character for this mode.
    pub fn prefix(self) -> char {
        match self {
            Mode::Native => '@',
            Mode::LittleEndian => '<',
            Mode::BigEndian => '>',
            Mode::Network => '!',
        }
    }

    pub(crate) fn byte_order(self) -> ByteOrder {
        match self {
            Mode::Native => {
                if cfg!(target_endian = "big") {
                    ByteOrder::Big
                } else {
                    ByteOrder::Little
                }
            }
            Mode::LittleEndian => ByteOrder::Little,
            Mode::BigEndian | Mode::Network => ByteOrder::Big,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Mode;

    #[test]
    fn test_prefixes() {
        assert_eq!(Mode::Native.prefix(), '@');
        assert_eq!(Mode::LittleEndian.prefix(), '<');
        assert_eq!(Mode::BigEndian.prefix(), '>');
        assert_eq!(Mode::Network.prefix(), '!');
    }

    #[test]
    fn test_network_is_big_endian() {
        assert_eq!(Mode::Network.byte_order(), Mode::BigEndian.byte_order());
    }
}
