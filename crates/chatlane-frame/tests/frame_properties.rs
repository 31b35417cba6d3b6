//! Property-based tests for the codec, batcher and scheduler.
//!
//! These check, for generated inputs:
//! - encode then decode yields the original tag and payload
//! - no frame exceeds its budget, and messages leave in append order
//! - logic-lane sends are never closer than the cooldown

use chatlane_frame::{
    decode_frame, decode_token, encode, validate_tag, EncodedMessage, FrameBatcher, FrameError,
    Pushed, TransmissionScheduler, TransmitPolicy, FRAME_SEPARATOR,
};
use chatlane_transport::{Lane, RecordingSink};
use proptest::prelude::*;
use serde_json::{json, Value};

// Tags: printable ASCII without '#' or '%'
fn tag_strategy() -> impl Strategy<Value = String> {
    r#"[!-"$&-~]{1,16}"#
}

// Text built from separator fragments, non-ASCII and plain runs
fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("%".to_string()),
            Just("%%".to_string()),
            Just("###".to_string()),
            Just("\\".to_string()),
            Just("\"".to_string()),
            Just("é".to_string()),
            Just("日本".to_string()),
            Just("🎲".to_string()),
            "[a-zA-Z0-9 ]{0,6}",
        ],
        0..8,
    )
    .prop_map(|parts| parts.concat())
}

// JSON without floats, whose text form need not round-trip exactly
fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        text_strategy().prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(text_strategy(), inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

// Budgets small enough to force frequent sealing
fn budget_strategy() -> impl Strategy<Value = usize> {
    40usize..=480
}

fn numbered(i: usize, pad: usize) -> EncodedMessage {
    encode("m", &json!({ "i": i, "pad": "y".repeat(pad) })).unwrap()
}

fn sequence_of(frame: &str) -> Vec<u64> {
    decode_frame(frame)
        .unwrap()
        .into_iter()
        .map(|token| token.message.unwrap().payload()["i"].as_u64().unwrap())
        .collect()
}

#[test]
fn prop_generated_tags_are_valid() {
    proptest!(|(tag in tag_strategy())| {
        prop_assert!(validate_tag(&tag).is_ok());
    });
}

#[test]
fn prop_encode_decode_round_trip() {
    proptest!(|(tag in tag_strategy(), payload in json_strategy())| {
        let encoded = encode(&tag, &payload).unwrap();
        prop_assert!(!encoded.json().contains(FRAME_SEPARATOR));

        let tokens = decode_frame(encoded.as_str()).unwrap();
        prop_assert_eq!(tokens.len(), 1);
        let decoded = tokens.into_iter().next().unwrap().message.unwrap();
        prop_assert_eq!(decoded.tag(), tag.as_str());
        prop_assert_eq!(decoded.payload(), &payload);
    });
}

#[test]
fn prop_packed_frames_round_trip() {
    proptest!(|(
        budget in budget_strategy(),
        messages in prop::collection::vec((tag_strategy(), json_strategy()), 1..12),
    )| {
        let mut batcher = FrameBatcher::new(budget);
        let mut frames = Vec::new();
        let mut accepted = Vec::new();
        for (tag, payload) in &messages {
            let encoded = encode(tag, payload).unwrap();
            match batcher.append(encoded) {
                Ok(sealed) => {
                    frames.extend(sealed);
                    accepted.push((tag.clone(), payload.clone()));
                }
                Err(FrameError::MessageTooLarge { len, max, .. }) => {
                    prop_assert!(len > max);
                }
                Err(err) => return Err(TestCaseError::fail(err.to_string())),
            }
        }
        frames.extend(batcher.seal());

        let decoded: Vec<(String, Value)> = frames
            .iter()
            .flat_map(|frame| decode_frame(frame.as_str()).unwrap())
            .map(|token| token.message.unwrap().into_parts())
            .collect();
        prop_assert_eq!(decoded, accepted);
    });
}

#[test]
fn prop_frames_within_budget_and_in_order() {
    proptest!(|(
        budget in budget_strategy(),
        pads in prop::collection::vec(0usize..200, 1..80),
    )| {
        let mut batcher = FrameBatcher::new(budget);
        let mut frames = Vec::new();
        let mut accepted = Vec::new();
        for (i, pad) in pads.iter().enumerate() {
            let message = numbered(i, *pad);
            let fits = message.char_len() <= budget;
            match batcher.append(message) {
                Ok(sealed) => {
                    prop_assert!(fits);
                    frames.extend(sealed);
                    accepted.push(i as u64);
                }
                Err(err) => {
                    prop_assert!(!fits);
                    let is_too_large = matches!(err, FrameError::MessageTooLarge { .. });
                    prop_assert!(is_too_large);
                }
            }
        }
        frames.extend(batcher.seal());

        for frame in &frames {
            prop_assert!(frame.char_len() <= budget);
            prop_assert_eq!(frame.char_len(), frame.as_str().chars().count());
        }
        let sent: Vec<u64> = frames.iter().flat_map(|f| sequence_of(f.as_str())).collect();
        prop_assert_eq!(sent, accepted);
    });
}

#[test]
fn prop_scheduler_respects_cooldown_and_fifo() {
    proptest!(|(
        cooldown in 1u64..=40,
        budget in 60usize..=480,
        bursts in prop::collection::vec(prop::collection::vec(0usize..120, 0..4), 1..120),
    )| {
        let mut sched = TransmissionScheduler::new(TransmitPolicy {
            cooldown_ticks: cooldown,
            max_frame_len: budget,
            ..TransmitPolicy::default()
        })
        .unwrap();
        let mut sink = RecordingSink::new();
        let mut sent_at = Vec::new();
        let mut accepted = Vec::new();
        let mut next = 0usize;

        let drain_ticks = (bursts.len() as u64 + 1) * cooldown * 4;
        for tick in 0..bursts.len() as u64 + drain_ticks {
            let before = sink.len();
            if let Some(burst) = bursts.get(tick as usize) {
                for pad in burst {
                    match sched.push(numbered(next, *pad), &mut sink) {
                        Ok(pushed) => {
                            let lost = matches!(pushed, Pushed::SendFailed(_) | Pushed::Dropped);
                            prop_assert!(!lost);
                            accepted.push(next as u64);
                        }
                        Err(err) => {
                            let is_too_large = matches!(err, FrameError::MessageTooLarge { .. });
                            prop_assert!(is_too_large);
                        }
                    }
                    next += 1;
                }
            }
            sched.tick(&mut sink).unwrap();
            sent_at.extend((before..sink.len()).map(|_| tick));
        }

        prop_assert!(sched.is_idle());
        for pair in sent_at.windows(2) {
            prop_assert!(pair[1] - pair[0] >= cooldown, "sends at {} and {}", pair[0], pair[1]);
        }
        let delivered: Vec<u64> = sink
            .lines_on(Lane::Logic)
            .into_iter()
            .flat_map(sequence_of)
            .collect();
        prop_assert_eq!(delivered, accepted);
    });
}

#[test]
fn prop_tag_never_swallows_payload_separators() {
    proptest!(|(tag in tag_strategy(), text in text_strategy())| {
        let encoded = encode(&tag, &text).unwrap();
        let decoded = decode_token(encoded.as_str()).unwrap();
        prop_assert_eq!(decoded.tag(), tag.as_str());
        prop_assert_eq!(decoded.payload(), &Value::String(text));
    });
}
