use anyhow::Result;
use icsync_gcal::{GoogleCalendar, Session};
use owo_colors::OwoColorize;

use crate::CalendarCommand;
use crate::config::Config;

pub async fn run(config: &Config, command: CalendarCommand) -> Result<()> {
    let session = Session::load_valid(&config.auth.account).await?;
    let token = session.access_token();

    match command {
        CalendarCommand::List => {
            let gcal = GoogleCalendar::new(token, &config.calendar.google_id);
            for calendar in gcal.list_calendars().await? {
                println!("{}: {}", calendar.summary.bold(), calendar.id);
            }
        }
        CalendarCommand::Create { summary, timezone, public } => {
            let mut gcal = GoogleCalendar::new(token, "primary");
            let id = gcal.create(&summary, timezone.as_deref()).await?;
            if public {
                gcal.make_public().await?;
            }
            println!("{} {id}", "created".green().bold());
        }
        CalendarCommand::Rename { id, summary } => {
            let gcal = GoogleCalendar::new(token, &id);
            gcal.rename(&summary).await?;
            println!("{} {id}", "renamed".green().bold());
        }
        CalendarCommand::Remove { id } => {
            let gcal = GoogleCalendar::new(token, &id);
            gcal.delete_calendar().await?;
            println!("{} {id}", "removed".green().bold());
        }
        CalendarCommand::AddOwner { id, email } => {
            let gcal = GoogleCalendar::new(token, &id);
            gcal.add_owner(&email).await?;
            println!("{} {email} now owns {id}", "granted".green().bold());
        }
    }
    Ok(())
}
