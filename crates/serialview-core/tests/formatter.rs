//! Text and hex rendering of received bytes

use chrono::NaiveTime;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serialview_core::config::{Codec, DisplayMode, FormatterConfig};
use serialview_core::format::{decode, format_bytes, to_hex, FrameFormatter};

fn noon() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(12, 0, 0, 250).unwrap()
}

proptest! {
    #[test]
    fn latin1_preserves_every_byte(raw in prop::collection::vec(any::<u8>(), 1..256)) {
        let text = decode(&raw, Codec::Latin1);
        let back: Vec<u8> = text.chars().map(|c| c as u32 as u8).collect();
        prop_assert_eq!(text.chars().count(), raw.len());
        prop_assert_eq!(back, raw);
    }

    #[test]
    fn hex_without_splitting_is_three_chars_per_byte(raw in prop::collection::vec(any::<u8>(), 1..128)) {
        let hex = to_hex(&raw, false);
        prop_assert_eq!(hex.len(), raw.len() * 3 - 1);
        prop_assert!(!hex.contains('\n'));
    }
}

#[test]
fn test_every_latin1_byte_maps_to_its_code_point() {
    let raw: Vec<u8> = (0..=255u8).collect();
    let text = decode(&raw, Codec::Latin1);
    for (c, b) in text.chars().zip(raw.iter().copied()) {
        assert_eq!(c as u32, b as u32);
    }
}

#[test]
fn test_text_mode_with_timestamp() {
    let cfg = FormatterConfig {
        timestamp_enabled: true,
        ..FormatterConfig::default()
    };
    assert_eq!(format_bytes(b"OK\r\n", &cfg, noon()), "12:00:00.250 >> OK\r\n");
}

#[test]
fn test_hex_split_toggle() {
    let raw = [0x41, 0x0D, 0x0A, 0x42];
    let mut formatter = FrameFormatter::new(FormatterConfig {
        mode: DisplayMode::Hex,
        ..FormatterConfig::default()
    });
    assert_eq!(formatter.process(&raw), "41\n[0D 0A]\n42");

    formatter.set_hex_newline_splitting(false);
    assert_eq!(formatter.process(&raw), "41 0D 0A 42");
}

#[test]
fn test_control_run_not_joined_across_reads() {
    let formatter = FrameFormatter::new(FormatterConfig {
        mode: DisplayMode::Hex,
        ..FormatterConfig::default()
    });
    assert_eq!(formatter.process(&[0x41, 0x0D]), "41\n[0D]");
    assert_eq!(formatter.process(&[0x0A, 0x42]), "[0A]\n42");
}

#[test]
fn test_config_change_applies_to_next_call() {
    let mut formatter = FrameFormatter::default();
    assert_eq!(formatter.process(b"Hi"), "Hi");
    formatter.set_mode(DisplayMode::Hex);
    assert_eq!(formatter.process(b"Hi"), "48 69");
    formatter.set_mode(DisplayMode::Text);
    formatter.set_codec(Codec::Utf8);
    assert_eq!(formatter.process("é".as_bytes()), "é");
}

#[test]
fn test_empty_read_yields_nothing() {
    let formatter = FrameFormatter::new(FormatterConfig {
        mode: DisplayMode::Hex,
        timestamp_enabled: true,
        ..FormatterConfig::default()
    });
    assert_eq!(formatter.process(&[]), "");
}
