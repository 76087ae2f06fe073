//! Relayed-message rendering.
//!
//! The exact wire format is load-bearing: deployed rooms and mail
//! clients on both sides already display it, so the shape here must
//! not drift.

use crate::common::BridgeMessage;

/// Render a normalized message for delivery on the target platform.
///
/// ```text
/// <badge> **[<SOURCE LABEL>] <sender>:**
/// <text>
///
/// _<reply instruction>_
/// ```
pub fn render_relayed(message: &BridgeMessage) -> String {
    let source = message.source_platform;
    format!(
        "{} **[{}] {}:**\n{}\n\n_{}_",
        source.badge(),
        source.label(),
        message.sender_display_name,
        message.text,
        source.reply_instruction(),
    )
}
