//! Line commands accepted on stdin in watch mode.

use std::path::PathBuf;

use fwctl_core::{DeviceCommand, LogViewId, Msg};
use fwctl_logging::fwctl_debug;

pub const HELP: &str = "\
commands:
  select <path>      choose a firmware file (.bin)
  upload             upload the selected file
  update             flash the uploaded firmware to the co-processor
  cancel             abandon the current upload/update
  catalog            refresh the package list
  info <file>        show package details
  delete <file>      delete a stored package (asks first; add --yes to skip)
  yes | no           answer a pending question
  log                refresh the log
  clear              clear the device log
  autorefresh        toggle log auto-refresh
  autoscroll         toggle log auto-scroll
  led <colour>       set the LED colour
  i2c <cmd>          send an I2C command (decimal or 0x..)
  scan               scan the I2C bus
  version            ask the device for its firmware version
  help               show this text
  quit               exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Needs the file read before it becomes a message.
    Select(PathBuf),
    Send(Msg),
    /// Deletion that waits for `yes`.
    StageDelete(String),
    Confirm,
    Decline,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0} (type `help`)")]
    Unknown(String),
    #[error("`{command}` needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    #[error("not an I2C command byte: {0}")]
    InvalidByte(String),
}

/// What the prompt made of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Run(Command),
    /// A question for the user.
    Ask(String),
    Notice(String),
}

/// Holds a staged deletion until the next line answers it.
#[derive(Debug, Default)]
pub struct DeletePrompt {
    pending: Option<String>,
}

impl DeletePrompt {
    #[cfg(test)]
    fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Any command other than an answer drops the staged deletion.
    pub fn route(&mut self, command: Command) -> Routed {
        match command {
            Command::StageDelete(filename) => {
                let question = format!(
                    "Delete firmware package {filename}? Type `yes` to confirm or `no` to keep it."
                );
                self.pending = Some(filename);
                Routed::Ask(question)
            }
            Command::Confirm => match self.pending.take() {
                Some(filename) => Routed::Run(Command::Send(Msg::DeleteConfirmed { filename })),
                None => Routed::Notice("Nothing to confirm.".to_string()),
            },
            Command::Decline => match self.pending.take() {
                Some(filename) => Routed::Notice(format!("Kept {filename}.")),
                None => Routed::Notice("Nothing to cancel.".to_string()),
            },
            other => {
                if let Some(filename) = self.pending.take() {
                    fwctl_debug!("unanswered deletion of {} dropped", filename);
                }
                Routed::Run(other)
            }
        }
    }
}

/// Parses one input line; `Ok(None)` for a blank line.
pub fn parse_line(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    let Some((word, rest)) = split_word(line) else {
        return Ok(None);
    };
    let arg = rest.trim();
    let command = match word.to_ascii_lowercase().as_str() {
        "select" => Command::Select(PathBuf::from(required(arg, "select", "a file path")?)),
        "upload" => Command::Send(Msg::UploadClicked),
        "update" => Command::Send(Msg::UpdateClicked),
        "cancel" => Command::Send(Msg::CancelClicked),
        "catalog" | "list" => Command::Send(Msg::CatalogRefreshRequested),
        "info" => Command::Send(Msg::PackageInfoRequested {
            filename: required(arg, "info", "a package name")?.to_string(),
        }),
        "delete" => {
            let (target, confirmed) = match arg.rsplit_once(char::is_whitespace) {
                Some((head, "--yes" | "-y")) => (head.trim(), true),
                None if matches!(arg, "--yes" | "-y") => ("", true),
                _ => (arg, false),
            };
            let filename = required(target, "delete", "a package name")?.to_string();
            if confirmed {
                Command::Send(Msg::DeleteConfirmed { filename })
            } else {
                Command::StageDelete(filename)
            }
        }
        "yes" | "y" => Command::Confirm,
        "no" | "n" => Command::Decline,
        "log" => Command::Send(Msg::LogRefreshRequested(LogViewId::PRIMARY)),
        "clear" => Command::Send(Msg::ClearLogClicked(LogViewId::PRIMARY)),
        "autorefresh" => Command::Send(Msg::AutoRefreshToggled(LogViewId::PRIMARY)),
        "autoscroll" => Command::Send(Msg::AutoScrollToggled(LogViewId::PRIMARY)),
        "led" => Command::Send(Msg::DeviceCommandRequested(DeviceCommand::SetLed {
            colour: required(arg, "led", "a colour")?.to_ascii_lowercase(),
        })),
        "i2c" => {
            let raw = required(arg, "i2c", "a command byte")?;
            Command::Send(Msg::DeviceCommandRequested(DeviceCommand::I2cCommand {
                cmd: parse_byte(raw)?,
            }))
        }
        "scan" => Command::Send(Msg::DeviceCommandRequested(DeviceCommand::ScanI2c)),
        "version" => Command::Send(Msg::DeviceCommandRequested(DeviceCommand::VersionCheck)),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn split_word(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    Some(line.split_once(char::is_whitespace).unwrap_or((line, "")))
}

fn required<'a>(
    arg: &'a str,
    command: &'static str,
    what: &'static str,
) -> Result<&'a str, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument { command, what })
    } else {
        Ok(arg)
    }
}

fn parse_byte(raw: &str) -> Result<u8, CommandError> {
    let parsed = match raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|_| CommandError::InvalidByte(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_line("   "), Ok(None));
    }

    #[test]
    fn workflow_words_map_to_messages() {
        assert_eq!(
            parse_line("Upload"),
            Ok(Some(Command::Send(Msg::UploadClicked)))
        );
        assert_eq!(
            parse_line("select  ./build/fw v2.bin "),
            Ok(Some(Command::Select(PathBuf::from("./build/fw v2.bin"))))
        );
    }

    #[test]
    fn delete_waits_for_confirmation() {
        assert_eq!(
            parse_line("delete old.bin"),
            Ok(Some(Command::StageDelete("old.bin".into())))
        );
        assert_eq!(parse_line("yes"), Ok(Some(Command::Confirm)));
        assert_eq!(parse_line("n"), Ok(Some(Command::Decline)));
    }

    #[test]
    fn staged_delete_runs_only_after_yes() {
        let mut prompt = DeletePrompt::default();
        let staged = prompt.route(parse_line("delete old.bin").unwrap().unwrap());
        assert!(matches!(staged, Routed::Ask(_)));
        assert_eq!(prompt.pending(), Some("old.bin"));

        assert_eq!(
            prompt.route(Command::Confirm),
            Routed::Run(Command::Send(Msg::DeleteConfirmed {
                filename: "old.bin".into()
            }))
        );
        assert_eq!(prompt.pending(), None);
        assert_eq!(
            prompt.route(Command::Confirm),
            Routed::Notice("Nothing to confirm.".into())
        );
    }

    #[test]
    fn other_commands_drop_a_staged_delete() {
        let mut prompt = DeletePrompt::default();
        prompt.route(Command::StageDelete("old.bin".into()));
        assert_eq!(
            prompt.route(Command::Send(Msg::UploadClicked)),
            Routed::Run(Command::Send(Msg::UploadClicked))
        );
        assert_eq!(
            prompt.route(Command::Confirm),
            Routed::Notice("Nothing to confirm.".into())
        );

        prompt.route(Command::StageDelete("old.bin".into()));
        assert_eq!(
            prompt.route(Command::Decline),
            Routed::Notice("Kept old.bin.".into())
        );
    }

    #[test]
    fn delete_with_yes_flag_skips_the_question() {
        let expected = Ok(Some(Command::Send(Msg::DeleteConfirmed {
            filename: "old.bin".into(),
        })));
        assert_eq!(parse_line("delete old.bin --yes"), expected);
        assert_eq!(parse_line("delete old.bin -y"), expected);
        assert_eq!(
            parse_line("delete --yes"),
            Err(CommandError::MissingArgument {
                command: "delete",
                what: "a package name"
            })
        );
    }

    #[test]
    fn i2c_accepts_hex_and_decimal() {
        let expected = Ok(Some(Command::Send(Msg::DeviceCommandRequested(
            DeviceCommand::I2cCommand { cmd: 66 },
        ))));
        assert_eq!(parse_line("i2c 0x42"), expected);
        assert_eq!(parse_line("i2c 66"), expected);
        assert_eq!(
            parse_line("i2c 300"),
            Err(CommandError::InvalidByte("300".into()))
        );
    }

    #[test]
    fn missing_arguments_are_reported() {
        assert_eq!(
            parse_line("info"),
            Err(CommandError::MissingArgument {
                command: "info",
                what: "a package name"
            })
        );
        assert!(matches!(parse_line("flash"), Err(CommandError::Unknown(_))));
    }
}
