use colored::Colorize;
use keepsake::error::KeepsakeError;

mod cli;

fn main() {
    if let Err(e) = cli::commands::run() {
        match &e {
            KeepsakeError::Unsynced {
                saved_locally: true,
                ..
            } => eprintln!("{}", e.to_string().yellow()),
            _ => eprintln!("{} {}", "Error:".red(), e),
        }
        std::process::exit(1);
    }
}
