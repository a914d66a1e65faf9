//! Menu keyboard and reply texts.

use crate::inventory::{Reply, SectionMap, StockRow, REFRESH_ACTION};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Prompt sent with the menu on `/start`
pub const MENU_PROMPT: &str = "📊 Выберите раздел для просмотра остатков:";
/// Caption of the refresh button
pub const REFRESH_LABEL: &str = "🔄 Обновить данные";

// Telegram limit is 4096, leave room for the truncation marker
const MAX_MESSAGE_CHARS: usize = 4000;
const TRUNCATION_MARKER: &str = "\n…(список обрезан)";

/// Inline menu: one button per section plus refresh, one per row.
#[must_use]
pub fn main_menu(sections: &SectionMap) -> InlineKeyboardMarkup {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = sections
        .iter()
        .map(|section| {
            vec![InlineKeyboardButton::callback(
                section.label.clone(),
                section.id.clone(),
            )]
        })
        .collect();
    keyboard.push(vec![InlineKeyboardButton::callback(
        REFRESH_LABEL,
        REFRESH_ACTION,
    )]);
    InlineKeyboardMarkup::new(keyboard)
}

/// Formats one stock line; a missing quantity reads as zero.
#[must_use]
pub fn format_row(row: &StockRow) -> String {
    match &row.quantity {
        Some(quantity) => format!("{} — {quantity} кг", row.label),
        None => format!("{} — 0 кг", row.label),
    }
}

/// Renders a dispatcher reply into message text.
#[must_use]
pub fn render_reply(reply: &Reply) -> String {
    match reply {
        Reply::Report {
            sheet,
            updated_at,
            rows,
        } => {
            let lines: Vec<String> = rows.iter().map(format_row).collect();
            let text = format!(
                "📦 {sheet} (обновлено: {})\n\n{}",
                updated_at.format("%H:%M %d.%m.%Y"),
                lines.join("\n")
            );
            truncate_message(&text)
        }
        Reply::Empty { sheet } => format!("📭 Раздел '{sheet}' пуст"),
        Reply::NotFound => "❌ Раздел не найден".to_string(),
        Reply::Refreshing => "⏳ Обновляю данные...".to_string(),
        Reply::FetchFailed(message) => format!("⚠️ Ошибка: {message}"),
        Reply::SheetMissing { sheet } => format!("⚠️ Ошибка: лист '{sheet}' не найден в файле"),
    }
}

fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let budget = MAX_MESSAGE_CHARS - TRUNCATION_MARKER.chars().count();
    let cut = text
        .char_indices()
        .nth(budget)
        .map_or(text.len(), |(pos, _)| pos);
    // Drop the partial last line
    let head = text[..cut].rsplit_once('\n').map_or(&text[..cut], |(head, _)| head);
    format!("{head}{TRUNCATION_MARKER}")
}
