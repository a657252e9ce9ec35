use super::mask_secret;

#[test]
fn mask_missing_secret() {
    assert_eq!(mask_secret(None), "(not set)");
}

#[test]
fn mask_short_secret() {
    assert_eq!(mask_secret(Some("abc")), "****");
}

#[test]
fn mask_keeps_last_four() {
    assert_eq!(mask_secret(Some("pk_1234567890")), "****7890");
}
