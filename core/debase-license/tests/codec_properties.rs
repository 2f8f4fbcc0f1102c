//! Property-based tests for the identifier codec.
//!
//! These verify properties that must hold for any input:
//! - Email normalization is idempotent and case-insensitive
//! - User ids are fixed-length hex and namespaced by domain
//! - Machine ids accept exactly the fixed-length hex strings
//! - Machine info never exceeds its cap and keeps its prefix

use debase_license::{
    Email, LicenseCode, MachineId, MachineInfo, UserId, MACHINE_ID_LEN, MACHINE_INFO_MAX_LEN,
    USER_ID_LEN,
};
use proptest::prelude::*;

fn email_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ \\t]{0,3}[a-zA-Z0-9._+-]{1,20}@[a-zA-Z0-9.-]{1,20}[ \\t]{0,3}")
        .unwrap()
}

fn hex_strategy(len: usize) -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!("[0-9a-fA-F]{{{len}}}")).unwrap()
}

proptest! {
    #[test]
    fn email_normalize_is_idempotent(raw in email_strategy()) {
        let once = Email::parse(&raw).unwrap();
        let twice = Email::parse(once.as_str()).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn email_normalize_ignores_case(raw in email_strategy()) {
        let upper = Email::parse(&raw.to_uppercase()).unwrap();
        let lower = Email::parse(&raw.to_lowercase()).unwrap();
        prop_assert_eq!(upper, lower);
    }

    #[test]
    fn user_id_is_fixed_length_hex(raw in email_strategy(), domain in "[a-z.]{1,20}") {
        let email = Email::parse(&raw).unwrap();
        let id = UserId::derive(&domain, &email);
        prop_assert_eq!(id.as_str().len(), USER_ID_LEN);
        prop_assert!(id.as_str().bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        prop_assert_eq!(UserId::derive(&domain, &email), id);
    }

    #[test]
    fn user_id_differs_across_domains(raw in email_strategy(), a in "[a-z]{1,10}", b in "[a-z]{1,10}") {
        prop_assume!(a != b);
        let email = Email::parse(&raw).unwrap();
        prop_assert_ne!(UserId::derive(&a, &email), UserId::derive(&b, &email));
    }

    #[test]
    fn machine_id_accepts_hex_and_lowercases(raw in hex_strategy(MACHINE_ID_LEN)) {
        let id = MachineId::parse(&raw).unwrap();
        prop_assert_eq!(id.as_str(), raw.to_lowercase());
    }

    #[test]
    fn machine_id_rejects_other_lengths(len in 0usize..200) {
        prop_assume!(len != MACHINE_ID_LEN);
        prop_assert!(MachineId::parse(&"a".repeat(len)).is_err());
    }

    #[test]
    fn machine_id_rejects_any_non_hex(raw in hex_strategy(MACHINE_ID_LEN - 1), bad in "[g-zG-Z!@#' ]", pos in 0usize..MACHINE_ID_LEN) {
        let mut s = raw;
        s.insert_str(pos.min(s.len()), &bad);
        prop_assert!(MachineId::parse(&s).is_err());
    }

    #[test]
    fn machine_info_is_capped_prefix(raw in "\\PC{0,400}") {
        let info = MachineInfo::new(&raw);
        let n = info.as_str().chars().count();
        prop_assert!(n <= MACHINE_INFO_MAX_LEN);
        prop_assert!(raw.starts_with(info.as_str()));
        if raw.chars().count() <= MACHINE_INFO_MAX_LEN {
            prop_assert_eq!(info.as_str(), raw.as_str());
        }
    }

    #[test]
    fn license_code_parse_accepts_alphanumerics(raw in "[a-zA-Z0-9]{1,40}") {
        let padded = format!("  {raw}\t");
        let code = LicenseCode::parse(&padded).unwrap();
        prop_assert_eq!(code.as_str(), raw.as_str());
    }
}
