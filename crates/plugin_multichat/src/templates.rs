//! Per-language message templates for join/leave announcements.
//!
//! The supported set is closed; each category is a single `match` over
//! [`Lang`] so a missing arm is a compile error, not a runtime fallback.

use multichat_events::Lang;

/// Renders the join announcement for a player name.
pub fn login_line(lang: Lang, name: &str) -> String {
    match lang {
        Lang::En => format!("{name} joined the game"),
        Lang::ZhCn => format!("{name}加入了游戏"),
    }
}

/// Renders the leave announcement for a player name.
pub fn logout_line(lang: Lang, name: &str) -> String {
    match lang {
        Lang::En => format!("{name} left the game"),
        Lang::ZhCn => format!("{name}退出了游戏"),
    }
}
