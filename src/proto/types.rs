crate::define_type! {
    pub [Type, QType, Unknown, "TYPE"]:
    /// A host address
    A => 1,
    /// An authoritative name server
    NS => 2,
    /// A mail destination (Obsolete - use MX)
    MD => 3,
    /// A mail forwarder (Obsolete - use MX)
    MF => 4,
    /// The canonical name for an alias
    CNAME => 5,
    /// Marks the start of a zone of authority
    SOA => 6,
    MB => 7,
    MG => 8,
    MR => 9,
    NULL => 10,
    WKS => 11,
    /// A domain name pointer
    PTR => 12,
    HINFO => 13,
    MINFO => 14,
    /// Mail exchange
    MX => 15,
    /// Text strings
    TXT => 16,
    /// An IPv6 host address (RFC 3596)
    AAAA => 28,
    ;
    /// A request for a transfer of an entire zone
    AXFR => 252,
    MAILB => 253,
    MAILA => 254,
    /// A request for all records
    ANY => 255,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_codes_map_to_variants() {
        assert_eq!(Type::from(1), Type::A);
        assert_eq!(Type::from(28), Type::AAAA);
        assert_eq!(QType::from(2), QType::NS);
        assert_eq!(QType::from(255), QType::ANY);
        assert_eq!(QType::ANY.as_u16(), 255);
    }

    #[test]
    fn unknown_codes_are_kept() {
        assert_eq!(Type::from(65), Type::Unknown(65));
        assert_eq!(Type::Unknown(65).as_u16(), 65);
        assert_eq!(Type::Unknown(65).to_string(), "TYPE65");
        // Query only codes are not record types.
        assert_eq!(Type::from(252), Type::Unknown(252));
        assert_eq!(QType::from(252), QType::AXFR);
    }

    #[test]
    fn parse_mnemonics() {
        assert_eq!("A".parse::<QType>(), Ok(QType::A));
        assert_eq!("ns".parse::<QType>(), Ok(QType::NS));
        assert_eq!("Any".parse::<QType>(), Ok(QType::ANY));
        assert_eq!("15".parse::<QType>(), Ok(QType::MX));
        assert_eq!("type99".parse::<QType>(), Ok(QType::Unknown(99)));
        assert!("AX".parse::<QType>().is_err());
        assert!("TYPE".parse::<QType>().is_err());
        assert!("70000".parse::<QType>().is_err());
    }
}
