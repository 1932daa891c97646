//! Line-oriented operator console driving the Hub.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use linkcast_hub_server::{Hub, HubError};
use linkcast_link_store::{LinkStore, normalize_url, parse_url_list, suggest_name};
use linkcast_protocol::Command;

pub const HELP: &str = "\
Commands:
  start                  start listening for agents
  stop                   close every connection and stop listening
  status                 show listener address and connected agents
  open <url>             open one URL on every agent
  multi <url> <url> ...  open several URLs, in order, on every agent
  save [name] <url>      save a link (name defaults to the host)
  send <name>            open a saved link on every agent
  delete <name>          delete a saved link
  links                  list saved links
  bind <host> <port>     change the listen address (restarts if running)
  help                   show this help
  quit                   stop the hub and exit";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Start,
    Stop,
    Status,
    Open(String),
    Multi(Vec<String>),
    Save { name: String, url: String },
    Send(String),
    Delete(String),
    Links,
    Bind { host: IpAddr, port: u16 },
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown command '{0}', type 'help' for a list")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Parses one console line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Input>, InputError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let input = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("start", []) => Input::Start,
        ("stop", []) => Input::Stop,
        ("status", []) => Input::Status,
        ("links", []) => Input::Links,
        ("help" | "?", _) => Input::Help,
        ("quit" | "exit", []) => Input::Quit,
        ("open", [url]) => Input::Open(normalize_url(url).ok_or(InputError::Usage("open <url>"))?),
        ("open", _) => return Err(InputError::Usage("open <url>")),
        ("multi", urls) if !urls.is_empty() => Input::Multi(parse_url_list(&urls.join("\n"))),
        ("multi", _) => return Err(InputError::Usage("multi <url> <url> ...")),
        ("save", [url]) => {
            let url = normalize_url(url).ok_or(InputError::Usage("save [name] <url>"))?;
            Input::Save {
                name: suggest_name(&url),
                url,
            }
        }
        ("save", [name, url]) => Input::Save {
            name: (*name).to_owned(),
            url: normalize_url(url).ok_or(InputError::Usage("save [name] <url>"))?,
        },
        ("save", _) => return Err(InputError::Usage("save [name] <url>")),
        ("send", [name]) => Input::Send((*name).to_owned()),
        ("send", _) => return Err(InputError::Usage("send <name>")),
        ("delete", [name]) => Input::Delete((*name).to_owned()),
        ("delete", _) => return Err(InputError::Usage("delete <name>")),
        ("bind", [host, port]) => Input::Bind {
            host: host
                .parse()
                .map_err(|_| InputError::InvalidAddress((*host).to_owned()))?,
            port: port
                .parse()
                .map_err(|_| InputError::InvalidAddress((*port).to_owned()))?,
        },
        ("bind", _) => return Err(InputError::Usage("bind <host> <port>")),
        (_, _) => return Err(InputError::Unknown(verb.to_owned())),
    };
    Ok(Some(input))
}

/// Lines to show the operator, plus whether to exit.
#[derive(Debug, Default)]
pub struct Reply {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Reply {
    fn say(&mut self, line: impl fmt::Display) {
        self.lines.push(line.to_string());
    }
}

/// Prints `line` with a `[HH:MM:SS]` prefix.
pub fn print_stamped(line: impl fmt::Display) {
    println!("[{}] {line}", chrono::Local::now().format("%H:%M:%S"));
}

pub struct Console {
    hub: Arc<Hub>,
    links: LinkStore,
}

impl Console {
    pub fn new(hub: Arc<Hub>, links: LinkStore) -> Self {
        Self { hub, links }
    }

    pub fn links(&self) -> &LinkStore {
        &self.links
    }

    pub async fn execute(&mut self, input: Input) -> Reply {
        let mut reply = Reply::default();

        match input {
            Input::Start => match self.hub.start().await {
                Ok(s) if s.already_running => {
                    reply.say(format!("Server already running on {}", s.local_addr));
                }
                Ok(_) => {}
                Err(e) => reply.say(format!("Error starting server: {e}")),
            },
            Input::Stop => {
                if !self.hub.stop().await.was_running {
                    reply.say("Server is not running");
                }
            }
            Input::Status => {
                match self.hub.local_addr().await {
                    Some(addr) => reply.say(format!("Listening on {addr}")),
                    None => reply.say("Server stopped"),
                }
                let peers = self.hub.peers();
                reply.say(format!("Connected clients: {}", peers.len()));
                for addr in peers {
                    reply.say(format!("  {addr}"));
                }
            }
            Input::Open(url) => self.broadcast(Command::open_one(url), &mut reply).await,
            Input::Multi(urls) => match Command::open_many(urls) {
                Ok(command) => self.broadcast(command, &mut reply).await,
                Err(e) => reply.say(format!("Error: {e}")),
            },
            Input::Save { name, url } => {
                self.links.insert(name.clone(), url.clone());
                match self.links.save() {
                    Ok(()) => reply.say(format!("Saved '{name}' -> {url}")),
                    Err(e) => reply.say(format!("Error saving links: {e}")),
                }
            }
            Input::Send(name) => match self.links.get(&name) {
                Some(url) => {
                    let command = Command::open_one(url);
                    self.broadcast(command, &mut reply).await;
                }
                None => reply.say(format!("No saved link named '{name}'")),
            },
            Input::Delete(name) => {
                if self.links.remove(&name).is_none() {
                    reply.say(format!("No saved link named '{name}'"));
                } else if let Err(e) = self.links.save() {
                    reply.say(format!("Error saving links: {e}"));
                } else {
                    reply.say(format!("Deleted '{name}'"));
                }
            }
            Input::Links => {
                if self.links.is_empty() {
                    reply.say("No saved links");
                }
                for (name, url) in self.links.iter() {
                    reply.say(format!("  {name:<20} {url}"));
                }
            }
            Input::Bind { host, port } => {
                self.hub.set_address(host, port);
                if self.hub.is_running().await {
                    if let Err(e) = self.hub.restart().await {
                        reply.say(format!("Error restarting server: {e}"));
                    }
                } else {
                    reply.say(format!("Will listen on {host}:{port} on next start"));
                }
            }
            Input::Help => reply.say(HELP),
            Input::Quit => reply.quit = true,
        }

        reply
    }

    async fn broadcast(&self, command: Command, reply: &mut Reply) {
        if !self.hub.is_running().await {
            reply.say("Server is not running");
            return;
        }
        // The hub logs the per-broadcast counts itself.
        if let Err(e) = self.hub.broadcast(&command).await {
            reply.say(format!("Error sending {}: {e}", command.action()));
        }
    }
}

/// Reads commands from stdin until `quit`, EOF or Ctrl-C, then stops the Hub.
pub async fn run(mut console: Console, autostart: bool) -> Result<(), HubError> {
    if autostart {
        for line in console.execute(Input::Start).await.lines {
            print_stamped(line);
        }
    }
    println!("Type 'help' for a list of commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("SIGINT received, shutting down");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let input = match parse(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        let reply = console.execute(input).await;
        for line in reply.lines {
            print_stamped(line);
        }
        if reply.quit {
            break;
        }
    }

    console.hub.stop().await;
    Ok(())
}
