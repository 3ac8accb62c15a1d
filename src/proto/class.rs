crate::define_type! {
    pub [Class, QClass, Unknown, "CLASS"]:
    /// The Internet
    IN => 1,
    /// The CSNET class (Obsolete)
    CS => 2,
    /// The CHAOS class
    CH => 3,
    /// Hesiod
    HS => 4,
    ;
    ANY => 255,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classes() {
        assert_eq!(Class::from(1), Class::IN);
        assert_eq!(QClass::from(255), QClass::ANY);
        assert_eq!(Class::from(1232).to_string(), "CLASS1232");
        assert_eq!("ch".parse::<QClass>(), Ok(QClass::CH));
    }
}
