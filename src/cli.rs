use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Convert a saved Outlook web calendar page to ICS, or sync it to Google Calendar
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "outlook-sync", version, about)]
pub struct Cli {
    /// Saved Outlook calendar page (HTML or MHTML)
    pub input: Option<PathBuf>,

    /// ICS file to write
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Domain for synthesized organizer addresses
    #[arg(short, long)]
    pub domain: Option<String>,

    /// IANA time zone of the exported times
    #[arg(long)]
    pub timezone: Option<String>,

    /// Sync to Google Calendar instead of writing an ICS file
    #[arg(long)]
    pub google: bool,

    /// Google Calendar ID to sync into
    #[arg(long, requires = "google")]
    pub calendar_id: Option<String>,

    /// Find or create a separate Google calendar with this name
    #[arg(long, requires = "google", conflicts_with = "calendar_id")]
    pub calendar_name: Option<String>,

    /// Meeting link added to every event
    #[arg(long)]
    pub meeting_link: Option<String>,

    /// Report what would change without writing to Google Calendar
    #[arg(long, requires = "google")]
    pub dry_run: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Command-line values take precedence over the environment
    pub fn apply(&self, config: &mut Config) {
        if let Some(input) = &self.input {
            config.input_file = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_file = output.clone();
        }
        if let Some(domain) = &self.domain {
            config.email_domain = domain.clone();
        }
        if let Some(timezone) = &self.timezone {
            config.timezone = timezone.clone();
        }
        if let Some(link) = &self.meeting_link {
            config.meeting_link = Some(link.clone());
        }
        if let Some(id) = &self.calendar_id {
            config.google_calendar_id = Some(id.clone());
            config.google_calendar_name = None;
        }
        if let Some(name) = &self.calendar_name {
            config.google_calendar_name = Some(name.clone());
        }
    }
}
