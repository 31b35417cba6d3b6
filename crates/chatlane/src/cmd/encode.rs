use chatlane_frame::{encode_json, EncodedMessage, FrameError};
use chatlane_transport::PROVIDER_LINE_LIMIT;
use serde::Serialize;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{key_value_line, key_value_table, print_json, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput<'a> {
    tag: &'a str,
    token: &'a str,
    chars: usize,
    max_frame_len: usize,
    /// Budget left for further messages in the same frame.
    headroom: usize,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    if args.max_frame_len == 0 || args.max_frame_len > PROVIDER_LINE_LIMIT {
        return Err(CliError::new(
            USAGE,
            format!("--max-frame-len must be within 1..={PROVIDER_LINE_LIMIT}"),
        ));
    }

    let message = encode_checked(&args.tag, &args.json, args.max_frame_len)
        .map_err(|err| frame_error("encode failed", err))?;
    let out = EncodeOutput {
        tag: message.tag(),
        token: message.as_str(),
        chars: message.char_len(),
        max_frame_len: args.max_frame_len,
        headroom: args.max_frame_len - message.char_len(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => println!("{}", key_value_table(&out)),
        OutputFormat::Pretty => println!("{}", key_value_line(&out)),
    }
    Ok(SUCCESS)
}

fn encode_checked(tag: &str, json: &str, max_frame_len: usize) -> chatlane_frame::Result<EncodedMessage> {
    let message = encode_json(tag, json)?;
    if message.char_len() > max_frame_len {
        return Err(FrameError::MessageTooLarge {
            tag: tag.to_string(),
            len: message.char_len(),
            max: max_frame_len,
        });
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compacts_and_checks_budget() {
        let message = encode_checked("move", "{ \"x\" : 1 }", 480).unwrap();
        assert_eq!(message.as_str(), r#"move###{"x":1}"#);

        let err = encode_checked("move", r#"{"x":1}"#, 10).unwrap_err();
        assert!(matches!(err, FrameError::MessageTooLarge { len: 14, max: 10, .. }));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(encode_checked("move", "{", 480).unwrap_err().is_malformed());
        assert!(encode_checked("a b", "1", 480).unwrap_err().is_encoding());
    }
}
