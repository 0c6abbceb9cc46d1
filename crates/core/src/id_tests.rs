// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

#[test]
fn idbuf_roundtrips_str() {
    let buf = IdBuf::new("cmp-abc123");
    assert_eq!(buf.as_str(), "cmp-abc123");
    assert!(!buf.is_empty());
    assert!(IdBuf::new("").is_empty());
}

#[test]
fn idbuf_borrow_str_hashmap_lookup() {
    let mut map: HashMap<IdBuf, u32> = HashMap::new();
    map.insert(IdBuf::new("cmp-one"), 1);
    assert_eq!(map.get("cmp-one"), Some(&1));
    assert_eq!(map.get("cmp-two"), None);
}

#[test]
fn idbuf_serde_rejects_oversized() {
    let long = "x".repeat(ID_MAX_LEN + 1);
    let json = format!("\"{}\"", long);
    assert!(serde_json::from_str::<IdBuf>(&json).is_err());
}

#[test]
fn campaign_id_from_string() {
    let id = CampaignId::from_string("cmp-holiday24");
    assert_eq!(id, "cmp-holiday24");
    assert_eq!(id.short(3), "cmp");
    assert_eq!(id.to_string(), "cmp-holiday24");
}

#[test]
fn campaign_id_serde_transparent() {
    let id = CampaignId::from_string("cmp-x");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"cmp-x\"");
    let back: CampaignId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn distinct_id_accepts_long_values() {
    let id = DistinctId::new("someone-with-a-very-long-identifier@example.com");
    assert_eq!(id.as_str(), "someone-with-a-very-long-identifier@example.com");
}

#[test]
fn short_truncates() {
    assert_eq!(short("abcdef", 3), "abc");
    assert_eq!(short("ab", 3), "ab");
}
