//! `%name%` / `%message%` line templates.

pub const NAME: &str = "%name%";
pub const MESSAGE: &str = "%message%";

pub const IRC_CHAT: &str = "<%name%> %message%";
pub const IRC_ACTION: &str = "* %name% %message%";
pub const IRC_JOIN: &str = "%name% joined the game";
pub const IRC_QUIT: &str = "%name% left the game";

pub const GAME_CHAT: &str = "<#%name%> %message%";
pub const GAME_ACTION: &str = "* #%name% %message%";
pub const GAME_EVENT: &str = "* #%name% %message%";
pub const GAME_KICK: &str = "* #%name% %message%";

/// Substitute the placeholders in one pass, so a name or message that itself
/// contains a placeholder is left alone. A blank template uses `fallback`.
pub fn render(template: &str, fallback: &str, name: &str, message: &str) -> String {
    let template = if template.trim().is_empty() {
        fallback
    } else {
        template
    };

    let mut out = String::with_capacity(template.len() + name.len() + message.len());
    let mut rest = template;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix(NAME) {
            out.push_str(name);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(MESSAGE) {
            out.push_str(message);
            rest = after;
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
