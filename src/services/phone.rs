// Normalização de telefones locais para o formato internacional do gateway

pub const COUNTRY_CODE: &str = "254";
pub const NORMALIZED_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid phone format: {0:?}")]
pub struct InvalidPhoneFormat(pub String);

/// Maps `07XXXXXXXX`, `01XXXXXXXX`, `+254XXXXXXXXX` and `254XXXXXXXXX` onto the
/// 12-digit `254XXXXXXXXX` form. Anything else is rejected.
pub fn normalize_phone(input: &str) -> Result<String, InvalidPhoneFormat> {
    let phone = input.trim();

    let candidate = if let Some(rest) = phone.strip_prefix("07") {
        format!("{COUNTRY_CODE}7{rest}")
    } else if let Some(rest) = phone.strip_prefix("01") {
        format!("{COUNTRY_CODE}1{rest}")
    } else if phone.starts_with("+254") && phone.len() == NORMALIZED_LEN + 1 {
        phone[1..].to_string()
    } else if phone.starts_with(COUNTRY_CODE) && phone.len() == NORMALIZED_LEN {
        phone.to_string()
    } else {
        return Err(InvalidPhoneFormat(input.to_string()));
    };

    let valid = candidate.len() == NORMALIZED_LEN
        && candidate.starts_with(COUNTRY_CODE)
        && candidate.bytes().all(|b| b.is_ascii_digit());

    if valid {
        Ok(candidate)
    } else {
        Err(InvalidPhoneFormat(input.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_local_safaricom_prefixes() {
        assert_eq!(normalize_phone("0712345678").unwrap(), "254712345678");
        assert_eq!(normalize_phone("0112345678").unwrap(), "254112345678");
    }

    #[test]
    fn test_international_forms_pass_through() {
        assert_eq!(normalize_phone("+254712345678").unwrap(), "254712345678");
        assert_eq!(normalize_phone("254712345678").unwrap(), "254712345678");
        assert_eq!(normalize_phone("  0712345678 ").unwrap(), "254712345678");
    }

    #[test]
    fn test_rejects_instead_of_guessing() {
        for bad in [
            "",
            "712345678",
            "071234567",
            "07123456789",
            "07a2345678",
            "+25471234567",
            "25471234567",
            "+14155550123",
            "0812345678",
        ] {
            assert!(normalize_phone(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    proptest! {
        #[test]
        fn proptest_local_numbers_normalize_to_twelve_digits(
            prefix in prop_oneof![Just("07"), Just("01")],
            subscriber in "[0-9]{8}",
        ) {
            let phone = format!("{prefix}{subscriber}");
            let normalized = normalize_phone(&phone).unwrap();
            prop_assert_eq!(normalized.len(), NORMALIZED_LEN);
            prop_assert!(normalized.starts_with(COUNTRY_CODE));
            prop_assert!(normalized.bytes().all(|b| b.is_ascii_digit()));
            prop_assert!(normalized.ends_with(&subscriber));
        }

        #[test]
        fn proptest_international_numbers_are_unchanged(subscriber in "[0-9]{9}") {
            let phone = format!("254{subscriber}");
            prop_assert_eq!(normalize_phone(&phone).unwrap(), phone.clone());
            let prefixed = format!("+{phone}");
            prop_assert_eq!(normalize_phone(&prefixed).unwrap(), phone);
        }

        #[test]
        fn proptest_unrecognized_prefixes_fail(
            prefix in "[3-689]",
            rest in "[0-9]{9,11}",
        ) {
            let phone = format!("{prefix}{rest}");
            prop_assert!(normalize_phone(&phone).is_err());
        }

        #[test]
        fn proptest_wrong_length_local_numbers_fail(
            prefix in prop_oneof![Just("07"), Just("01")],
            subscriber in "[0-9]{0,7}|[0-9]{9,12}",
        ) {
            let phone = format!("{prefix}{subscriber}");
            prop_assert!(normalize_phone(&phone).is_err());
        }
    }
}
