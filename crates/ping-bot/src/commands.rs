//! Slash command definitions

use serenity::builder::CreateCommand;
use serenity::http::Http;
use serenity::model::application::Command;

pub const DELETE_PINGS: &str = "delete_pings";
pub const SHUTDOWN: &str = "shutdownserver";

/// Reply for unknown commands and failed handlers.
pub const COMMAND_ERROR: &str = "Sorry, something went wrong processing that command.";

pub const SHUTDOWN_ACK: &str = "Acknowledged. Shutting down the bot process...";

pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(DELETE_PINGS).description(
            "[Owner/Manage Messages] Deletes all messages sent by this bot in this server.",
        ),
        CreateCommand::new(SHUTDOWN).description("[Owner Only] Shuts down the bot process."),
    ]
}

/// Replace the global command set with ours.
pub async fn register(http: &Http) -> serenity::Result<Vec<Command>> {
    Command::set_global_commands(http, definitions()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_carry_both_commands() {
        let names: Vec<String> = definitions()
            .iter()
            .map(|c| serde_json::to_value(c).unwrap()["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec![DELETE_PINGS, SHUTDOWN]);
    }

    #[test]
    fn test_descriptions_state_who_may_run_them() {
        for def in definitions() {
            let json = serde_json::to_value(&def).unwrap();
            let description = json["description"].as_str().unwrap();
            assert!(description.starts_with("[Owner"), "{}", description);
        }
    }
}
