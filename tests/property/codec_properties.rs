//! Property-based tests for the line codec.
//!
//! Uses proptest to verify:
//! 1. Any newline-free command and arguments survive encode → decode.
//! 2. Any argument containing a newline is rejected by `encode`.
//! 3. `decode` never panics and always reassembles the original line.
//! 4. Any newline-free request encodes to a single line.

use linechat_proto::codec::{self, CodecError};
use linechat_proto::event::ProtocolEvent;
use linechat_proto::message::Request;
use proptest::prelude::*;

/// Strategy for a command word: non-empty, no space, no newline.
fn arb_command() -> impl Strategy<Value = String> {
    "[a-z]{1,12}"
}

/// Strategy for argument text that never contains a newline.
fn arb_arg() -> impl Strategy<Value = String> {
    "[^\n]{0,64}"
}

proptest! {
    #[test]
    fn encode_then_decode_recovers_command_and_params(
        command in arb_command(),
        args in prop::collection::vec(arb_arg(), 1..5),
    ) {
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let line = codec::encode(&command, &arg_refs).unwrap();
        let raw = codec::decode(&line);

        prop_assert_eq!(raw.command, command.as_str());
        prop_assert_eq!(raw.params, arg_refs.join(" "));
    }

    #[test]
    fn bare_command_round_trips_with_empty_params(command in arb_command()) {
        let line = codec::encode(&command, &[]).unwrap();
        let raw = codec::decode(&line);
        prop_assert_eq!(raw.command, command.as_str());
        prop_assert_eq!(raw.params, "");
    }

    #[test]
    fn any_newline_in_an_argument_is_rejected(
        command in arb_command(),
        before in arb_arg(),
        after in arb_arg(),
    ) {
        let payload = format!("{before}\n{after}");
        let result = codec::encode(&command, &["x", payload.as_str()]);
        prop_assert_eq!(result, Err(CodecError::EmbeddedNewline));
    }

    #[test]
    fn decode_never_panics_and_preserves_text(line in ".*") {
        let raw = codec::decode(&line);
        let rebuilt = if line.contains(' ') {
            format!("{} {}", raw.command, raw.params)
        } else {
            raw.command.to_string()
        };
        prop_assert_eq!(rebuilt, line.clone());
        // Interpretation may fail, but must not panic.
        let _ = ProtocolEvent::parse(raw);
    }

    #[test]
    fn private_requests_encode_to_one_line(
        recipient in "[a-z]{1,16}",
        text in arb_arg(),
    ) {
        let line = Request::PrivateMessage { recipient: recipient.clone(), text: text.clone() }
            .encode()
            .unwrap();
        prop_assert!(!line.contains('\n'));
        prop_assert_eq!(line, format!("privmsg {recipient} {text}"));
    }
}
