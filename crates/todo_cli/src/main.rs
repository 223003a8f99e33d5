//! Command-line front end for `todo_core`.
//!
//! # Responsibility
//! - Load `.env`, configure the store and logging, then run one command.
//! - Print records and pages as JSON on stdout, errors on stderr.
//!
//! # Usage
//! ```text
//! todo_cli add <title> [description]
//! todo_cli show <id>
//! todo_cli done <id>
//! todo_cli rm <id>
//! todo_cli list [key=value ...]
//! ```

use log::error;
use serde_json::json;
use std::collections::HashMap;
use std::process::ExitCode;
use todo_core::{
    init_logging_from_env, NewTodo, SqliteTodoRepository, StoreConfig, TodoId, TodoPatch,
    TodoService,
};

const UPDATE_ATTEMPTS: u32 = 3;

fn main() -> ExitCode {
    // A missing .env file is the normal case.
    let _ = dotenvy::dotenv();

    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let Some((command, rest)) = args.split_first() else {
        println!("todo_core version={}", todo_core::core_version());
        return Ok(());
    };

    init_logging_from_env()?;
    let config = StoreConfig::from_env().map_err(|err| err.to_string())?;
    let repo = SqliteTodoRepository::open(&config).map_err(|err| {
        error!("event=cli_open module=cli status=error error={err}");
        err.to_string()
    })?;
    let service = TodoService::new(repo);

    let output = match command.as_str() {
        "add" => {
            let title = rest.first().ok_or("usage: add <title> [description]")?;
            let todo = service
                .create_todo(NewTodo {
                    title: title.clone(),
                    description: rest.get(1).cloned().unwrap_or_default(),
                    completed: false,
                })
                .map_err(|err| err.to_string())?;
            json!(todo)
        }
        "show" => {
            let todo = service
                .show_todo(parse_id(rest)?)
                .map_err(|err| err.to_string())?;
            json!(todo)
        }
        "done" => {
            let patch = TodoPatch {
                completed: Some(true),
                ..TodoPatch::default()
            };
            let todo = service
                .update_todo_with_retry(parse_id(rest)?, &patch, UPDATE_ATTEMPTS)
                .map_err(|err| err.to_string())?;
            json!(todo)
        }
        "rm" => {
            service
                .delete_todo(parse_id(rest)?)
                .map_err(|err| err.to_string())?;
            json!({ "message": "todo successfully deleted" })
        }
        "list" => {
            let page = service
                .list_todos_from_query(&parse_pairs(rest)?)
                .map_err(|err| err.to_string())?;
            json!({ "todos": page.items, "metadata": page.metadata })
        }
        other => return Err(format!("unknown command `{other}`")),
    };

    let rendered = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(())
}

fn parse_id(rest: &[String]) -> Result<TodoId, String> {
    let raw = rest.first().ok_or("missing <id> argument")?;
    raw.parse::<TodoId>()
        .map_err(|_| format!("invalid id `{raw}`"))
}

fn parse_pairs(rest: &[String]) -> Result<HashMap<String, String>, String> {
    rest.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| format!("expected key=value, got `{pair}`"))
        })
        .collect()
}
