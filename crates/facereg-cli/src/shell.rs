//! Interactive shell: stdin lines become [`UiEvent`]s for the controller.

use crate::controller::{Controller, UiEvent};
use crate::view::{Tab, TerminalView};
use facereg_api::{Config, FaceApi};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

pub const HELP: &str = "\
commands:
  tab <register|recognize|manage>   switch tab
  image <path>                      select an image for the current tab
  remove                            drop the selected image
  name <text> | person <id> | remark <text>
  threshold <0-100> | topk <n>
  submit                            register or recognize
  clear-form                        reset the register form
  search <keyword> | clear          filter the face list
  refresh                           reload the face list
  delete <face-id> | delete-person <person-id> | reset
  y | n                             answer a confirmation
  health | help | quit";

#[derive(Debug, PartialEq)]
pub enum Parsed {
    Event(UiEvent),
    Help,
    Empty,
}

/// Parse one input line.
pub fn parse_line(line: &str) -> Result<Parsed, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Parsed::Empty);
    }
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };

    let arg = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("{cmd}: missing {what}"))
        } else {
            Ok(rest.to_string())
        }
    };

    let event = match cmd {
        "tab" => UiEvent::SwitchTab(arg("tab")?.parse::<Tab>()?),
        "image" | "img" => UiEvent::SelectImage(PathBuf::from(arg("path")?)),
        "remove" => UiEvent::RemoveImage,
        "name" => UiEvent::SetName(rest.to_string()),
        "person" => UiEvent::SetPersonId(rest.to_string()),
        "remark" => UiEvent::SetRemark(rest.to_string()),
        "threshold" => UiEvent::SetThreshold(
            arg("value")?
                .parse()
                .map_err(|_| format!("threshold: not a number: {rest}"))?,
        ),
        "topk" => UiEvent::SetTopK(
            arg("value")?
                .parse()
                .map_err(|_| format!("topk: not a number: {rest}"))?,
        ),
        "submit" => UiEvent::Submit,
        "clear-form" => UiEvent::ResetForm,
        "search" => UiEvent::SearchInput(rest.to_string()),
        "clear" => UiEvent::ClearSearch,
        "refresh" => UiEvent::Refresh,
        "delete" => UiEvent::DeleteFace(arg("face id")?),
        "delete-person" => UiEvent::DeletePerson(arg("person id")?),
        "reset" => UiEvent::ResetDatabase,
        "y" | "yes" => UiEvent::Confirm(true),
        "n" | "no" => UiEvent::Confirm(false),
        "health" => UiEvent::CheckHealth,
        "help" | "?" => return Ok(Parsed::Help),
        "quit" | "exit" | "q" => UiEvent::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Parsed::Event(event))
}

/// Run the shell until `quit` or end of input.
pub async fn run_shell(api: Arc<dyn FaceApi>, config: Config) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel(32);
    let controller = Controller::new(api, TerminalView::new(std::io::stdout()), config);
    let ui = tokio::spawn(controller.run(rx));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Ok(Parsed::Event(event)) => {
                let quit = event == UiEvent::Quit;
                if tx.send(event).await.is_err() || quit {
                    break;
                }
            }
            Ok(Parsed::Help) => println!("{HELP}"),
            Ok(Parsed::Empty) => {}
            Err(msg) => eprintln!("{msg}"),
        }
    }
    drop(tx);
    ui.await?;
    Ok(())
}
