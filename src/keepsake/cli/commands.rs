//! # CLI Layer
//!
//! This module is **one possible UI client** for keepsake; it is not the application itself.
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Installs the tracing subscriber
//! - Handles argument parsing
//! - Formats output for human consumption
//!
//! ## Structure
//!
//! - `run()`: Main dispatch logic (called by `main.rs`)
//! - `handle_*()`: Per-command handlers that call the API and print the result
//! - `edits_from_args()`: Turns `edit` flags into record edits

use super::render::{print_messages, render_message_pair, render_record, render_record_list};
use super::setup::{Cli, Commands, EditArgs, NewArgs};
use clap::Parser;
use colored::Colorize;
use keepsake::commands::upload::UploadTarget;
use keepsake::commands::{NewRecord, RecordEdit};
use keepsake::config::{data_dir, ENV_BACKEND_KEY, ENV_BACKEND_URL};
use keepsake::error::{KeepsakeError, Result, ValidationError};
use keepsake::image::ImageFile;
use keepsake::init::{initialize, KeepsakeContext};
use keepsake::model::parse_tags;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// Realtime events for one save arrive in a burst; wait this long before re-rendering
const WATCH_SETTLE: Duration = Duration::from_millis(300);

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let dir = data_dir()?;
    let ctx = initialize(&dir, |name| std::env::var(name).ok())?;

    match cli.command {
        Some(Commands::Enter { code }) => handle_enter(&ctx, &code),
        Some(Commands::Room) => handle_room(&ctx),
        Some(Commands::Leave) => handle_leave(&ctx),
        Some(Commands::List) | None => handle_list(&ctx),
        Some(Commands::Show { slug }) => handle_show(&ctx, &slug),
        Some(Commands::New(args)) => handle_new(&ctx, args),
        Some(Commands::Edit(args)) => handle_edit(&ctx, args),
        Some(Commands::Delete { slug }) => handle_delete(&ctx, &slug),
        Some(Commands::Upload { slug, files, hero }) => handle_upload(&ctx, &slug, files, hero),
        Some(Commands::Watch) => handle_watch(&ctx),
        Some(Commands::Message { first, second }) => handle_message(&ctx, first, second),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("keepsake=debug"),
        _ => EnvFilter::new("keepsake=trace"),
    };
    // Logs go to stderr so they never mix with rendered output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_enter(ctx: &KeepsakeContext, code: &str) -> Result<()> {
    let result = ctx.api.enter_room(code)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_room(ctx: &KeepsakeContext) -> Result<()> {
    let result = ctx.api.current_room()?;
    if let Some(room) = &result.room {
        println!("{}", room.as_str().bold());
    }
    if ctx.backend.is_none() {
        println!("{}", "local only (no backend configured)".dimmed());
    }
    Ok(())
}

fn handle_leave(ctx: &KeepsakeContext) -> Result<()> {
    let result = ctx.api.leave_room()?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_list(ctx: &KeepsakeContext) -> Result<()> {
    let result = ctx.api.list_records()?;
    render_record_list(&result.listed_records, result.room.as_ref());
    print_messages(&result.messages);
    Ok(())
}

fn handle_show(ctx: &KeepsakeContext, slug: &str) -> Result<()> {
    let result = ctx.api.show_record(slug)?;
    for record in &result.listed_records {
        render_record(record);
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_new(ctx: &KeepsakeContext, args: NewArgs) -> Result<()> {
    let new = NewRecord {
        title: args.title,
        slug: args.slug,
        summary: args.summary,
        tags: parse_tags(&args.tags),
        theme: args.theme,
        hero_image: None,
        note: args.note,
        story: args.story,
    };
    let result = ctx.api.create_record(new)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_edit(ctx: &KeepsakeContext, args: EditArgs) -> Result<()> {
    let slug = args.slug.clone();
    let edits = edits_from_args(args)?;
    if edits.is_empty() {
        println!("{}", "Nothing to change. See `keepsake edit --help`.".dimmed());
        return Ok(());
    }
    let result = ctx.api.edit_record(&slug, edits)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_delete(ctx: &KeepsakeContext, slug: &str) -> Result<()> {
    let result = ctx.api.delete_record(slug)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_upload(ctx: &KeepsakeContext, slug: &str, paths: Vec<PathBuf>, hero: bool) -> Result<()> {
    let files = paths
        .iter()
        .map(|p| ImageFile::from_path(p))
        .collect::<Result<Vec<_>>>()?;
    let target = if hero {
        UploadTarget::Hero
    } else {
        UploadTarget::Gallery
    };
    let result = ctx.api.upload_images(slug, &files, target)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_watch(ctx: &KeepsakeContext) -> Result<()> {
    let (tx, rx) = mpsc::channel::<()>();
    let subscription = ctx.api.watch(Arc::new(move || {
        let _ = tx.send(());
    }))?;

    handle_list(ctx)?;
    if let Some(notice) = watch_unavailable(ctx.backend.is_some(), subscription.is_active()) {
        println!("{}", notice.yellow());
        return Ok(());
    }
    println!("{}", "Watching for changes (Ctrl-C to stop)".dimmed());

    while rx.recv().is_ok() {
        std::thread::sleep(WATCH_SETTLE);
        while rx.try_recv().is_ok() {}
        println!();
        handle_list(ctx)?;
    }
    Ok(())
}

/// Why `watch` cannot follow changes, if it cannot.
fn watch_unavailable(backend_configured: bool, subscribed: bool) -> Option<String> {
    if !backend_configured {
        Some(format!(
            "Live updates need a backend; set {} and {}",
            ENV_BACKEND_URL, ENV_BACKEND_KEY
        ))
    } else if !subscribed {
        Some("Could not start live updates; see the warning above".to_string())
    } else {
        None
    }
}

fn handle_message(ctx: &KeepsakeContext, first: Option<String>, second: Option<String>) -> Result<()> {
    let result = if first.is_none() && second.is_none() {
        ctx.api.messages()?
    } else {
        ctx.api.set_messages(first, second)?
    };
    if let Some(pair) = &result.message_pair {
        render_message_pair(pair);
    }
    print_messages(&result.messages);
    Ok(())
}

/// Flags in the order they are applied: text fields, captions and dates (positions as
/// shown before the edit), removals, then moves.
fn edits_from_args(args: EditArgs) -> Result<Vec<RecordEdit>> {
    let mut edits = Vec::new();

    if let Some(title) = args.title {
        edits.push(RecordEdit::Title(title));
    }
    if let Some(summary) = args.summary {
        edits.push(RecordEdit::Summary(summary));
    }
    if let Some(tags) = args.tags {
        edits.push(RecordEdit::Tags(parse_tags(&tags)));
    }
    if let Some(theme) = args.theme {
        edits.push(RecordEdit::Theme(theme));
    }
    if let Some(note) = args.note {
        edits.push(RecordEdit::Note(optional(note)));
    }
    if let Some(story) = args.story {
        edits.push(RecordEdit::Story(optional(story)));
    }
    if let Some(hero) = args.hero {
        edits.push(RecordEdit::Hero(optional(hero)));
    }

    for raw in &args.caption {
        let (index, text) = parse_assignment("caption", raw)?;
        edits.push(RecordEdit::Caption {
            index,
            caption: optional(text),
        });
    }
    for raw in &args.date {
        let (index, text) = parse_assignment("date", raw)?;
        edits.push(RecordEdit::Date {
            index,
            date: optional(text),
        });
    }

    // Highest first so earlier removals do not shift later ones
    let mut removals = args
        .remove_photo
        .iter()
        .map(|&n| n.checked_sub(1).ok_or_else(|| invalid("photo position", "0")))
        .collect::<Result<Vec<_>>>()?;
    removals.sort_unstable_by(|a, b| b.cmp(a));
    removals.dedup();
    edits.extend(removals.into_iter().map(RecordEdit::RemovePhoto));

    for raw in &args.move_photo {
        let (from, to) = raw.split_once(':').ok_or_else(|| invalid("move", raw))?;
        edits.push(RecordEdit::MovePhoto {
            from: to_index("move", from)?,
            to: to_index("move", to)?,
        });
    }

    Ok(edits)
}

fn optional(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// `N=TEXT` with a 1-based N.
fn parse_assignment(what: &'static str, raw: &str) -> Result<(usize, String)> {
    let (n, text) = raw.split_once('=').ok_or_else(|| invalid(what, raw))?;
    Ok((to_index(what, n)?, text.to_string()))
}

/// 1-based position to zero-based index.
fn to_index(what: &'static str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(invalid(what, raw)),
    }
}

fn invalid(what: &'static str, value: &str) -> KeepsakeError {
    ValidationError::Argument {
        what,
        value: value.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(slug: &str) -> EditArgs {
        EditArgs {
            slug: slug.to_string(),
            ..EditArgs::default()
        }
    }

    #[test]
    fn watch_notice_names_missing_backend_only_when_absent() {
        let missing = watch_unavailable(false, false).unwrap();
        assert!(missing.contains(ENV_BACKEND_URL));

        let failed = watch_unavailable(true, false).unwrap();
        assert!(!failed.contains(ENV_BACKEND_URL));
        assert!(failed.contains("Could not start live updates"));

        assert!(watch_unavailable(true, true).is_none());
    }

    #[test]
    fn no_flags_no_edits() {
        assert!(edits_from_args(args("trip")).unwrap().is_empty());
    }

    #[test]
    fn positions_become_zero_based() {
        let mut a = args("trip");
        a.caption = vec!["2=Beach".into()];
        a.move_photo = vec!["3:1".into()];
        let edits = edits_from_args(a).unwrap();
        assert_eq!(
            edits,
            vec![
                RecordEdit::Caption {
                    index: 1,
                    caption: Some("Beach".into())
                },
                RecordEdit::MovePhoto { from: 2, to: 0 },
            ]
        );
    }

    #[test]
    fn removals_run_highest_first() {
        let mut a = args("trip");
        a.remove_photo = vec![1, 3, 3];
        let edits = edits_from_args(a).unwrap();
        assert_eq!(
            edits,
            vec![RecordEdit::RemovePhoto(2), RecordEdit::RemovePhoto(0)]
        );
    }

    #[test]
    fn empty_note_clears_it() {
        let mut a = args("trip");
        a.note = Some("  ".into());
        assert_eq!(edits_from_args(a).unwrap(), vec![RecordEdit::Note(None)]);
    }

    #[test]
    fn bad_positions_are_rejected() {
        let mut a = args("trip");
        a.caption = vec!["0=nope".into()];
        assert!(edits_from_args(a).is_err());

        let mut b = args("trip");
        b.move_photo = vec!["2-1".into()];
        assert!(edits_from_args(b).is_err());
    }
}
