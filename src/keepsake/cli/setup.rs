use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2026-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "keepsake", bin_name = "keepsake", version = get_version())]
#[command(about = "A shared memory album for two, synced through a room code", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Join a room, registering it with the backend
    Enter {
        /// The shared room code
        code: String,
    },

    /// Show the current room code
    Room,

    /// Forget the current room code on this device
    Leave,

    /// List memory pages (default)
    #[command(alias = "ls")]
    List,

    /// Show one memory page in full
    #[command(alias = "v")]
    Show { slug: String },

    /// Create a memory page
    #[command(alias = "n")]
    New(NewArgs),

    /// Change a memory page
    #[command(alias = "e")]
    Edit(EditArgs),

    /// Delete a memory page and its photos
    #[command(alias = "rm")]
    Delete { slug: String },

    /// Add images to a memory page
    Upload {
        slug: String,

        /// Image files to add
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Use the (first) image as the hero image instead of adding it to the gallery
        #[arg(long)]
        hero: bool,
    },

    /// List memory pages and refresh whenever the room changes
    Watch,

    /// Show or change the two messages
    Message {
        /// New text for the first message
        #[arg(long)]
        first: Option<String>,

        /// New text for the second message
        #[arg(long)]
        second: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct NewArgs {
    /// Title of the page
    pub title: String,

    /// Slug to use instead of one derived from the title
    #[arg(long)]
    pub slug: Option<String>,

    #[arg(long, default_value = "")]
    pub summary: String,

    /// Comma-separated tags
    #[arg(long, default_value = "")]
    pub tags: String,

    /// Gradient theme (random when omitted)
    #[arg(long)]
    pub theme: Option<String>,

    #[arg(long)]
    pub note: Option<String>,

    #[arg(long)]
    pub story: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct EditArgs {
    pub slug: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub summary: Option<String>,

    /// Comma-separated tags, replacing the current ones
    #[arg(long)]
    pub tags: Option<String>,

    #[arg(long)]
    pub theme: Option<String>,

    /// Note text; an empty value removes it
    #[arg(long)]
    pub note: Option<String>,

    /// Story text; an empty value removes it
    #[arg(long)]
    pub story: Option<String>,

    /// Hero image URL; an empty value removes it
    #[arg(long)]
    pub hero: Option<String>,

    /// Remove the photo at this position (1-based, repeatable)
    #[arg(long = "remove-photo", value_name = "N")]
    pub remove_photo: Vec<usize>,

    /// Move a photo, e.g. `3:1` (1-based, repeatable)
    #[arg(long = "move-photo", value_name = "FROM:TO")]
    pub move_photo: Vec<String>,

    /// Set a caption, e.g. `2=At the beach` (1-based, repeatable)
    #[arg(long, value_name = "N=TEXT")]
    pub caption: Vec<String>,

    /// Set a date label, e.g. `2=2026-05-01` (1-based, repeatable)
    #[arg(long, value_name = "N=TEXT")]
    pub date: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_list() {
        let cli = Cli::try_parse_from(["keepsake"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn verbose_counts() {
        let cli = Cli::try_parse_from(["keepsake", "-vv", "list"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn edit_collects_repeated_flags() {
        let cli = Cli::try_parse_from([
            "keepsake",
            "edit",
            "trip",
            "--remove-photo",
            "2",
            "--remove-photo",
            "3",
            "--caption",
            "1=Beach",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Edit(args)) => {
                assert_eq!(args.slug, "trip");
                assert_eq!(args.remove_photo, vec![2, 3]);
                assert_eq!(args.caption, vec!["1=Beach".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn upload_requires_files() {
        assert!(Cli::try_parse_from(["keepsake", "upload", "trip"]).is_err());
    }
}
