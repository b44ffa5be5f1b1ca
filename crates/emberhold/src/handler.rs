//! Per-connection handler: login, character selection, then play.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Start the session pipeline and register its hangup token
//!   2. Username / password dialog, checked by the `Authenticator`
//!   3. Load (or create) the account, show the message of the day
//!   4. Pick or create a character, put it into the world
//!   5. Run the character's input loop until quit or disconnect
//!   6. Unregister and close the session

use std::sync::Arc;

use emberhold_protocol::{AccountName, CharacterId};
use emberhold_session::{Authenticator, Credentials, Outbox, Session, SessionError};
use emberhold_store::RecordStore;
use emberhold_transport::Connection;
use emberhold_world::{AccountRecord, ActiveCharacter, Character, WorldError};
use tracing::{debug, info, warn};

use crate::input_loop::run_input_loop;
use crate::server::ServerState;
use crate::{EmberholdError, Game};

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C, A, S>(
    conn: C,
    state: Arc<ServerState<A, S>>,
) -> Result<(), EmberholdError>
where
    C: Connection,
    A: Authenticator,
    S: RecordStore,
{
    let mut session = Session::start(conn, &state.game.config.session);
    let id = session.id();
    state.sessions.lock().await.register(id, session.hangup_token());

    let result = play(&mut session, &state).await;

    state.sessions.lock().await.remove(id);
    session.close().await;
    result
}

async fn play<C, A, S>(
    session: &mut Session<C>,
    state: &ServerState<A, S>,
) -> Result<(), EmberholdError>
where
    C: Connection,
    A: Authenticator,
    S: RecordStore,
{
    let game = &*state.game;
    let outbox = session.outbox();

    // --- Step 2: Login ---
    let Some(account) = login(session, state, &outbox).await? else {
        return Ok(());
    };

    // --- Step 3: Account and greeting ---
    let mut record = game.load_account(&account).await?;
    let greeting = if game.motd.is_empty() {
        "\n\rWelcome to the game!\n\r".to_string()
    } else {
        format!("\n\r{}\n\r", game.motd.join("\n\r"))
    };
    outbox.send(greeting).await?;

    // --- Step 4: Character ---
    let Some(actor) = enter_world(session, game, &outbox, &mut record).await? else {
        return Ok(());
    };

    // --- Step 5: Play ---
    run_input_loop(game, actor, session.lines()).await;
    Ok(())
}

/// The username / password dialog. `Ok(None)` means the player went away
/// or ran out of attempts.
async fn login<C, A, S>(
    session: &mut Session<C>,
    state: &ServerState<A, S>,
    outbox: &Outbox,
) -> Result<Option<AccountName>, EmberholdError>
where
    C: Connection,
    A: Authenticator,
    S: RecordStore,
{
    let attempts = state.game.config.max_login_attempts.max(1);
    for attempt in 1..=attempts {
        let Some(username) = ask(session, outbox, "\n\rUsername: ").await else {
            return Ok(None);
        };
        session.set_echo(false);
        let password = ask(session, outbox, "Password: ").await;
        session.set_echo(true);
        let Some(password) = password else {
            return Ok(None);
        };
        outbox.send("\n\r").await?;

        let creds = Credentials {
            username: username.trim().to_string(),
            password,
        };
        match state.auth.authenticate(&creds).await {
            Ok(account) => {
                let bound = state.sessions.lock().await.login(session.id(), account.clone());
                match bound {
                    Ok(()) => return Ok(Some(account)),
                    Err(SessionError::AlreadyConnected(_)) => {
                        outbox.send("That account is already logged in.\n\r").await?;
                        return Ok(None);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => {
                warn!(id = %session.id(), attempt, error = %e, "login failed");
                outbox.send("Invalid username or password.\n\r").await?;
            }
        }
    }

    outbox.send("Too many failed attempts.\n\r").await?;
    Ok(None)
}

/// The character menu. Loops until a character is active and standing
/// in its room, or the player goes away.
async fn enter_world<C, S>(
    session: &mut Session<C>,
    game: &Game<S>,
    outbox: &Outbox,
    account: &mut AccountRecord,
) -> Result<Option<Arc<ActiveCharacter>>, EmberholdError>
where
    C: Connection,
    S: RecordStore,
{
    loop {
        let mut menu = String::from("\n\rSelect a character:\n\r0: Create a new character\n\r");
        let owned: Vec<(String, CharacterId)> = account
            .characters
            .iter()
            .map(|(name, id)| (name.clone(), *id))
            .collect();
        for (n, (name, _)) in owned.iter().enumerate() {
            menu.push_str(&format!("{}: {name}\n\r", n + 1));
        }
        menu.push_str("Enter the number of your choice: ");

        let Some(choice) = ask(session, outbox, &menu).await else {
            return Ok(None);
        };
        let character = match choice.trim().parse::<usize>() {
            Ok(0) => match create_character(session, game, outbox, account).await? {
                Some(ch) => ch,
                None => return Ok(None),
            },
            Ok(n) if n <= owned.len() => {
                let id = owned[n - 1].1;
                if game.world.is_active(id) {
                    outbox.send("That character is already in the world.\n\r").await?;
                    continue;
                }
                match game.load_character(id).await? {
                    Some(ch) => ch,
                    None => {
                        warn!(account = %account.name, character_id = %id, "character record missing");
                        outbox.send("That character could not be found.\n\r").await?;
                        continue;
                    }
                }
            }
            _ => {
                outbox.send("Invalid choice.\n\r").await?;
                continue;
            }
        };

        if let Some(actor) = activate(game, character, outbox).await? {
            return Ok(Some(actor));
        }
    }
}

/// Makes `character` live. `Ok(None)` if someone got there first.
async fn activate<S: RecordStore>(
    game: &Game<S>,
    character: Character,
    outbox: &Outbox,
) -> Result<Option<Arc<ActiveCharacter>>, EmberholdError> {
    let room = character.room;
    let actor = ActiveCharacter::new(character, outbox.clone());
    match game.world.activate(actor.clone()) {
        Ok(()) => {}
        Err(WorldError::AlreadyActive(_)) => {
            outbox.send("That character is already in the world.\n\r").await?;
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    if let Err(e) = game.world.enter_room(&actor, room).await {
        game.world.deactivate(actor.id);
        return Err(e.into());
    }
    info!(character_id = %actor.id, name = %actor.name, %room, "entered the world");
    game.world
        .broadcast(room, &format!("\n\r{} has entered the world.\n\r", actor.name), Some(actor.id))
        .await;
    Ok(Some(actor))
}

/// The creation dialog: name, archetype, then save. `Ok(None)` if the
/// player went away partway.
async fn create_character<C, S>(
    session: &mut Session<C>,
    game: &Game<S>,
    outbox: &Outbox,
    account: &mut AccountRecord,
) -> Result<Option<Character>, EmberholdError>
where
    C: Connection,
    S: RecordStore,
{
    let max_len = game.config.max_name_len;
    let name = loop {
        let Some(line) = ask(session, outbox, "\n\rEnter your character name: ").await else {
            return Ok(None);
        };
        let name = line.trim().to_string();
        if !valid_name(&name, max_len) {
            outbox
                .send(format!("Names must be 1 to {max_len} letters.\n\r"))
                .await?;
            continue;
        }
        if game.names.test(&name) {
            outbox.send("That name is already taken.\n\r").await?;
            continue;
        }
        break name;
    };

    let archetypes: Vec<_> = game.world.archetypes().collect();
    let archetype = if archetypes.is_empty() {
        None
    } else {
        let mut menu = String::from("\n\rChoose an archetype:\n\r");
        for (n, a) in archetypes.iter().enumerate() {
            menu.push_str(&format!("{}: {} - {}\n\r", n + 1, a.name, a.description));
        }
        menu.push_str("Enter the number of your choice: ");
        loop {
            let Some(choice) = ask(session, outbox, &menu).await else {
                return Ok(None);
            };
            match choice.trim().parse::<usize>() {
                Ok(n) if (1..=archetypes.len()).contains(&n) => break Some(archetypes[n - 1]),
                _ => outbox.send("Invalid choice.\n\r").await?,
            }
        }
    };

    let id = game.allocate_character_id().await?;
    let character = game
        .world
        .new_character(id, account.name.clone(), name.clone(), archetype);
    game.names.add(&name);
    game.save_character_record(&character.to_record()).await?;
    account.characters.insert(name.clone(), id);
    game.save_account(account).await?;

    info!(account = %account.name, character_id = %id, %name, "character created");
    Ok(Some(character))
}

fn valid_name(name: &str, max_len: usize) -> bool {
    let len = name.chars().count();
    (1..=max_len).contains(&len) && name.chars().all(char::is_alphabetic)
}

/// Sends `prompt` and waits for the answer. `None` once the player is
/// gone.
async fn ask<C: Connection>(session: &mut Session<C>, outbox: &Outbox, prompt: &str) -> Option<String> {
    if outbox.send(prompt).await.is_err() {
        debug!(id = %session.id(), "prompt dropped, session closed");
        return None;
    }
    session.read_line().await
}
