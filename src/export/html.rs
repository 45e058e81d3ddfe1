use std::fs;
use std::path::Path;

use pulldown_cmark::{html, Event, Options, Parser};

use crate::{conversation::Turn, error::SelfPlayError};

const STYLE: &str = r#"<style>
body { font-family: 'Segoe UI', Arial, sans-serif; line-height: 1.6; max-width: 800px; margin: 0 auto; padding: 20px; background-color: #f9f9f9; }
h1 { color: #333; text-align: center; margin-bottom: 30px; border-bottom: 1px solid #ddd; padding-bottom: 10px; }
.chat-container { display: flex; flex-direction: column; gap: 20px; }
.message { margin-bottom: 15px; display: flex; flex-direction: column; }
.user-message .message-content { background-color: #e3f2fd; border-radius: 10px; padding: 15px; margin-left: auto; max-width: 80%; box-shadow: 0 1px 2px rgba(0,0,0,0.1); }
.assistant-message .message-content { background-color: #e8f5e9; border-radius: 10px; padding: 15px; margin-right: auto; max-width: 80%; box-shadow: 0 1px 2px rgba(0,0,0,0.1); }
.user-name { color: #2962FF; font-weight: bold; margin-bottom: 4px; text-align: right; }
.assistant-name { color: #00897B; font-weight: bold; margin-bottom: 4px; }
.message-content pre { background-color: #f5f5f5; padding: 10px; border-radius: 5px; overflow-x: auto; }
.message-content code { background-color: #f5f5f5; padding: 2px 4px; border-radius: 3px; font-family: monospace; }
.message-content blockquote { border-left: 4px solid #ddd; padding-left: 10px; margin-left: 0; color: #666; }
.message-content table { border-collapse: collapse; width: 100%; }
.message-content th, .message-content td { border: 1px solid #ddd; padding: 8px; text-align: left; }
.message-content th { background-color: #f2f2f2; }
.message-content img { max-width: 100%; height: auto; }
</style>
"#;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    // raw HTML in a reply is shown as text, never injected into the page
    let events = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::new();
    html::push_html(&mut out, events);
    out
}

/// Renders `turns` as a standalone HTML page.
///
/// Responses are treated as markdown. Turns at even positions (the bot that
/// opened the conversation) are styled as assistant messages, the others as
/// user messages.
pub fn to_html(turns: &[Turn]) -> String {
    let mut page = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str("<title>Conversation History</title>\n");
    page.push_str(STYLE);
    page.push_str("</head>\n<body>\n<h1>Conversation History</h1>\n<div class=\"chat-container\">\n");

    for (i, turn) in turns.iter().enumerate() {
        let side = if i % 2 == 0 { "assistant" } else { "user" };
        page.push_str(&format!(
            "<div class=\"message {side}-message\">\n  <div class=\"{side}-name\">{}</div>\n  <div class=\"message-content\">{}</div>\n</div>\n\n",
            escape(&turn.speaker),
            render_markdown(&turn.response),
        ));
    }

    page.push_str("</div>\n</body>\n</html>\n");
    page
}

pub fn save_html(turns: &[Turn], path: impl AsRef<Path>) -> Result<(), SelfPlayError> {
    let path = path.as_ref();
    fs::write(path, to_html(turns))?;
    log::info!("Conversation saved to {}", path.display());
    Ok(())
}
