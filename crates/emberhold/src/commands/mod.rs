//! The command interpreter.
//!
//! A line of input is tokenized on whitespace; the lower-cased first
//! token is looked up in the [`CommandTable`], which maps every alias to
//! one [`Verb`]. [`dispatch`] then runs the handler for that verb with
//! the full token list.
//!
//! Handlers take whatever locks they need themselves (see
//! [`World`](emberhold_world::World) for the lock order) and report
//! through the actor's outbox. The input loop sends the prompt after a
//! handler returns.

mod combat;
mod info;
mod items;
mod movement;
mod talk;

use std::collections::HashMap;

use emberhold_store::RecordStore;
use emberhold_world::ActiveCharacter;
use tracing::debug;

use crate::Game;

pub(crate) use info::look;

/// Every command a player can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Quit,
    Look,
    Say,
    Go,
    North,
    South,
    East,
    West,
    Up,
    Down,
    Help,
    Who,
    Show,
    Take,
    Drop,
    Inventory,
    Wear,
    Remove,
    Examine,
    Engage,
    Advance,
    Retreat,
    Flee,
}

impl Verb {
    /// The exit a direction shortcut walks through.
    pub fn direction(self) -> Option<&'static str> {
        match self {
            Verb::North => Some("north"),
            Verb::South => Some("south"),
            Verb::East => Some("east"),
            Verb::West => Some("west"),
            Verb::Up => Some("up"),
            Verb::Down => Some("down"),
            _ => None,
        }
    }
}

const ALIASES: &[(&str, Verb)] = &[
    ("quit", Verb::Quit),
    ("q!", Verb::Quit),
    ("look", Verb::Look),
    ("l", Verb::Look),
    ("say", Verb::Say),
    ("'", Verb::Say),
    ("\"", Verb::Say),
    ("go", Verb::Go),
    ("move", Verb::Go),
    ("north", Verb::North),
    ("n", Verb::North),
    ("south", Verb::South),
    ("s", Verb::South),
    ("east", Verb::East),
    ("e", Verb::East),
    ("west", Verb::West),
    ("w", Verb::West),
    ("up", Verb::Up),
    ("u", Verb::Up),
    ("down", Verb::Down),
    ("d", Verb::Down),
    ("help", Verb::Help),
    ("?", Verb::Help),
    ("who", Verb::Who),
    ("show", Verb::Show),
    ("score", Verb::Show),
    ("take", Verb::Take),
    ("get", Verb::Take),
    ("drop", Verb::Drop),
    ("inventory", Verb::Inventory),
    ("inv", Verb::Inventory),
    ("i", Verb::Inventory),
    ("wear", Verb::Wear),
    ("remove", Verb::Remove),
    ("examine", Verb::Examine),
    ("x", Verb::Examine),
    ("engage", Verb::Engage),
    ("advance", Verb::Advance),
    ("retreat", Verb::Retreat),
    ("flee", Verb::Flee),
];

/// Why a line couldn't be turned into a command. The `Display` text is
/// shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("No command entered.")]
    Empty,

    #[error("Command not understood.")]
    NotUnderstood(String),
}

/// Alias → verb lookup, built once at startup.
#[derive(Debug, Clone)]
pub struct CommandTable {
    verbs: HashMap<&'static str, Verb>,
}

impl CommandTable {
    /// The built-in verbs and their aliases.
    pub fn standard() -> Self {
        Self {
            verbs: ALIASES.iter().copied().collect(),
        }
    }

    pub fn lookup(&self, word: &str) -> Option<Verb> {
        self.verbs.get(word.to_lowercase().as_str()).copied()
    }

    /// Number of registered aliases.
    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    /// Tokenizes `line` and resolves its verb.
    ///
    /// A leading quote is the `say` shorthand even without a space, so
    /// `'hello` reads as `' hello`.
    pub fn validate(&self, line: &str) -> Result<(Verb, Vec<String>), CommandError> {
        let line = line.trim();
        let mut tokens: Vec<String> = Vec::new();
        match line.strip_prefix(['\'', '"']) {
            Some(rest) => {
                tokens.push(line[..1].to_string());
                tokens.extend(rest.split_whitespace().map(String::from));
            }
            None => tokens.extend(line.split_whitespace().map(String::from)),
        }

        let first = tokens.first().ok_or(CommandError::Empty)?;
        let verb = self
            .lookup(first)
            .ok_or_else(|| CommandError::NotUnderstood(first.clone()))?;
        Ok((verb, tokens))
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Runs the handler for `verb`. Returns `true` if the player is done and
/// the session should end.
pub async fn dispatch<S: RecordStore>(
    game: &Game<S>,
    actor: &ActiveCharacter,
    verb: Verb,
    tokens: &[String],
) -> bool {
    debug!(character_id = %actor.id, ?verb, args = tokens.len().saturating_sub(1), "dispatch");
    match verb {
        Verb::Quit => {
            actor.tell("\n\rGoodbye!\n\r").await;
            return true;
        }
        Verb::Look => info::look(game, actor).await,
        Verb::Say => talk::say(game, actor, tokens).await,
        Verb::Go => movement::go(game, actor, tokens.get(1).map(String::as_str)).await,
        Verb::North | Verb::South | Verb::East | Verb::West | Verb::Up | Verb::Down => {
            movement::go(game, actor, verb.direction()).await
        }
        Verb::Help => info::help(actor).await,
        Verb::Who => info::who(game, actor).await,
        Verb::Show => info::show(actor).await,
        Verb::Take => items::take(game, actor, tokens).await,
        Verb::Drop => items::drop(game, actor, tokens).await,
        Verb::Inventory => info::inventory(game, actor).await,
        Verb::Wear => items::wear(game, actor, tokens).await,
        Verb::Remove => items::remove(game, actor, tokens).await,
        Verb::Examine => info::examine(game, actor, tokens).await,
        Verb::Engage => combat::engage(game, actor, tokens).await,
        Verb::Advance => combat::advance(game, actor, tokens).await,
        Verb::Retreat => combat::retreat(game, actor, tokens).await,
        Verb::Flee => combat::flee(game, actor).await,
    }
    false
}

/// Everything after the verb, joined back into one argument.
fn rest(tokens: &[String]) -> Option<String> {
    let joined = tokens.get(1..)?.join(" ");
    (!joined.is_empty()).then_some(joined)
}
