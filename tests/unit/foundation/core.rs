use super::*;

#[test]
fn parse_hex_accepts_short_long_and_alpha_forms() {
    assert_eq!(Color::parse_hex("#fff").unwrap(), Color::WHITE);
    assert_eq!(Color::parse_hex("#ff0000").unwrap(), Color::rgb(255, 0, 0));
    assert_eq!(Color::parse_hex("00ff0080").unwrap(), Color::rgba(0, 255, 0, 128));
    assert!(Color::parse_hex("#12345").is_err());
    assert!(Color::parse_hex("#gggggg").is_err());
}

#[test]
fn to_hex_omits_alpha_when_opaque() {
    assert_eq!(Color::rgb(0x12, 0xab, 0xff).to_hex(), "#12abff");
    assert_eq!(Color::rgba(0, 0, 0, 0x80).to_hex(), "#00000080");
}

#[test]
fn serde_accepts_hex_and_arrays() {
    let c: Color = serde_json::from_str("\"#336699\"").unwrap();
    assert_eq!(c, Color::rgb(0x33, 0x66, 0x99));
    let c: Color = serde_json::from_str("[1, 2, 3, 4]").unwrap();
    assert_eq!(c, Color::rgba(1, 2, 3, 4));
    assert!(serde_json::from_str::<Color>("[1, 2]").is_err());
    assert_eq!(serde_json::to_string(&Color::BLACK).unwrap(), "\"#000000\"");
}

#[test]
fn cancel_token_is_shared_between_clones() {
    let token = CancelToken::new();
    let other = token.clone();
    assert!(token.check().is_ok());
    other.cancel();
    assert!(token.is_cancelled());
    assert!(matches!(token.check(), Err(DashflowError::Cancelled)));
}
