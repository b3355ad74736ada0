use chrono::{DateTime, Utc};
use colored::Colorize;
use keepsake::commands::{CmdMessage, MessageLevel};
use keepsake::messages::MessagePair;
use keepsake::model::{is_inline_uri, Record, RoomCode};
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const TIME_WIDTH: usize = 14;
const PHOTOS_WIDTH: usize = 10;
const INLINE_LABEL: &str = "(inline image, not uploaded)";

pub(super) fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

pub(super) fn render_record_list(records: &[Record], room: Option<&RoomCode>) {
    if let Some(room) = room {
        println!("{} {}", "Room".dimmed(), room.as_str().bold());
        println!();
    }
    if records.is_empty() {
        println!("No memories yet.");
        return;
    }

    for (i, record) in records.iter().enumerate() {
        let idx_str = format!("{:>3}. ", i + 1);
        let photos = format!("{:>3} photo{}", record.photos.len(), plural(record.photos.len()));
        let when = match record.updated_at {
            Some(at) => format_time_ago(at),
            None => format!("{:>width$}", "not synced", width = TIME_WIDTH),
        };

        let label = if record.tags.is_empty() {
            record.title.clone()
        } else {
            format!("{} #{}", record.title, record.tags.join(" #"))
        };

        let fixed = idx_str.width() + PHOTOS_WIDTH + TIME_WIDTH + 2;
        let available = LINE_WIDTH.saturating_sub(fixed);
        let label = truncate_to_width(&label, available);
        let padding = available.saturating_sub(label.width());

        println!(
            "{}{}{} {:>pw$} {}",
            idx_str.yellow(),
            label,
            " ".repeat(padding),
            photos.dimmed(),
            when.dimmed(),
            pw = PHOTOS_WIDTH
        );
    }
}

pub(super) fn render_record(record: &Record) {
    println!("{} {}", record.title.bold(), format!("({})", record.slug).dimmed());
    println!("{}", record.summary);
    println!("--------------------------------");

    field("Theme", &record.theme);
    if !record.tags.is_empty() {
        field("Tags", &record.tags.join(", "));
    }
    if let Some(hero) = &record.hero_image {
        field("Hero", display_src(hero));
    }
    if let Some(at) = record.updated_at {
        field("Updated", format_time_ago(at).trim());
    }
    if let Some(note) = &record.note {
        println!();
        println!("{}", note.italic());
    }
    if let Some(story) = &record.story {
        println!();
        println!("{}", story);
    }

    if !record.timeline.is_empty() {
        println!();
        println!("{}", "Timeline".bold());
        for milestone in &record.timeline {
            match &milestone.note {
                Some(note) => println!(
                    "  {}  {} {}",
                    milestone.date.yellow(),
                    milestone.title,
                    format!("- {}", note).dimmed()
                ),
                None => println!("  {}  {}", milestone.date.yellow(), milestone.title),
            }
        }
    }

    println!();
    println!("{}", "Photos".bold());
    for (i, photo) in record.photos.iter().enumerate() {
        let caption = photo.caption.as_deref().unwrap_or(&photo.alt);
        let date = photo
            .date
            .as_deref()
            .map(|d| format!(" [{}]", d))
            .unwrap_or_default();
        println!(
            "  {} {}{}",
            format!("{:>2}.", i + 1).yellow(),
            caption,
            date.dimmed()
        );
        println!("      {}", display_src(&photo.src).dimmed());
    }
}

pub(super) fn render_message_pair(pair: &MessagePair) {
    println!("{}", "First".bold());
    println!("  {}", pair.first);
    println!("{}", "Second".bold());
    println!("  {}", pair.second);
}

fn field(name: &str, value: &str) {
    println!("{:<8} {}", format!("{}:", name).dimmed(), value);
}

fn display_src(src: &str) -> &str {
    if is_inline_uri(src) {
        INLINE_LABEL
    } else {
        src
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        " "
    } else {
        "s"
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let time_str = Formatter::new().convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
