//! Provider line formatting.
//!
//! Outbound sends are written as:
//! ```text
//! PRIVMSG #<channel> :<text>\r\n
//! ```
//! The provider answers idle connections with `PING :<token>` and expects
//! `PONG :<token>` back.

use crate::error::{Result, TransportError};

/// Maximum characters of message text the provider accepts per line.
pub const PROVIDER_LINE_LIMIT: usize = 500;

/// Check that `text` fits on one provider line.
pub fn validate_line_text(text: &str) -> Result<()> {
    if let Some(position) = text.find(['\r', '\n']) {
        return Err(TransportError::LineBreak { position });
    }
    let len = text.chars().count();
    if len > PROVIDER_LINE_LIMIT {
        return Err(TransportError::LineTooLong {
            len,
            max: PROVIDER_LINE_LIMIT,
        });
    }
    Ok(())
}

/// Format a `PRIVMSG` command for `channel` (without the trailing CRLF).
pub fn privmsg(channel: &str, text: &str) -> Result<String> {
    validate_line_text(text)?;
    let channel = channel.strip_prefix('#').unwrap_or(channel);
    Ok(format!("PRIVMSG #{channel} :{text}"))
}

/// The reply owed for a provider `PING`, or `None` for any other line.
pub fn pong_reply(line: &str) -> Option<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    line.strip_prefix("PING")
        .filter(|rest| rest.is_empty() || rest.starts_with(' '))
        .map(|rest| format!("PONG{rest}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privmsg_formats_channel_and_text() {
        assert_eq!(
            privmsg("gamelogic", "join###{}").unwrap(),
            "PRIVMSG #gamelogic :join###{}"
        );
        assert_eq!(privmsg("#chat", "hi").unwrap(), "PRIVMSG #chat :hi");
    }

    #[test]
    fn line_breaks_rejected() {
        assert!(matches!(
            privmsg("c", "one\r\ntwo"),
            Err(TransportError::LineBreak { position: 3 })
        ));
    }

    #[test]
    fn overlong_text_rejected() {
        let text = "x".repeat(PROVIDER_LINE_LIMIT + 1);
        assert!(matches!(
            validate_line_text(&text),
            Err(TransportError::LineTooLong { .. })
        ));
        assert!(validate_line_text(&text[1..]).is_ok());
    }

    #[test]
    fn pong_mirrors_ping_token() {
        assert_eq!(
            pong_reply("PING :tmi.twitch.tv\r\n").as_deref(),
            Some("PONG :tmi.twitch.tv")
        );
        assert_eq!(pong_reply("PING").as_deref(), Some("PONG"));
        assert_eq!(pong_reply("PINGX :nope"), None);
        assert_eq!(pong_reply(":a!a@a PRIVMSG #c :PING"), None);
    }
}
