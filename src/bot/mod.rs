/// Command and callback handlers
pub mod handlers;
/// View layer: menu keyboard and reply texts
pub mod views;

pub use handlers::{handle_menu_callback, menu_reply, start, Command, MenuReply};
