mod config;
mod quiz;

use std::sync::Arc;

use config::Config;
use log::{debug, info, warn};
use quiz::game::{unix_now, Event, GameOverReason, GameState, Notice, QuizController, Round};
use quiz::omdb::OmdbClient;
use quiz::{scoreboard, Genre};
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, InMemStorage, SqliteStorage, Storage},
    prelude::*,
    types::{
        ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
        KeyboardRemove, ParseMode,
    },
    utils::command::BotCommands,
};

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type DialogueStorage = Arc<ErasedStorage<State>>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    /// Waiting for a genre. `last_round` carries the round count of the
    /// previous game so its buttons stay stale in the next one.
    Lobby { last_round: u32 },
    InGame(GameState),
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
enum Command {
    #[command(description = "go back to the lobby and pick a genre.")]
    Start,
    #[command(description = "start the current game over from question one.")]
    Restart,
    #[command(description = "show this text.")]
    Help,
}

const ANSWER_PREFIX: &str = "answer";
const PLAY_AGAIN: &str = "restart";
const CHANGE_GENRE: &str = "lobby";

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };
    log::info!("Starting movie quiz bot...");

    let bot = Bot::from_env();

    let storage: DialogueStorage = match &config.dialogue_db {
        Some(path) => {
            info!("Keeping dialogues in {}", path.display());
            match SqliteStorage::open(&path.to_string_lossy(), Json).await {
                Ok(storage) => storage.erase(),
                Err(err) => {
                    log::error!("Failed to open dialogue database: {}", err);
                    std::process::exit(1);
                }
            }
        }
        None => InMemStorage::<State>::new().erase(),
    };

    let omdb = match OmdbClient::new(
        config.omdb_base_url.clone(),
        config.omdb_api_key.clone(),
        config.omdb_timeout,
    ) {
        Ok(omdb) => omdb,
        Err(err) => {
            log::error!("Failed to set up the OMDb client: {}", err);
            std::process::exit(1);
        }
    };
    let controller = Arc::new(QuizController::new(
        Arc::new(omdb),
        config.distractor_attempts,
    ));
    let config = Arc::new(config);

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, ErasedStorage<State>, State>()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(receive_command),
                )
                .branch(dptree::case![State::Start].endpoint(start))
                .branch(dptree::case![State::Lobby { last_round }].endpoint(receive_genre))
                .branch(dptree::case![State::InGame(game)].endpoint(stray_message)),
        )
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, ErasedStorage<State>, State>()
                .endpoint(receive_button),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![storage, controller, config])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn genre_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![Genre::ALL
        .iter()
        .map(|genre| KeyboardButton::new(genre.name()))
        .collect::<Vec<_>>()])
    .resize_keyboard(true)
}

fn answer_keyboard(round: &Round) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(round.options.values.iter().enumerate().map(|(index, value)| {
        vec![InlineKeyboardButton::callback(
            value.clone(),
            format!("{}:{}:{}", ANSWER_PREFIX, round.number, index),
        )]
    }))
}

fn finished_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("Play again", PLAY_AGAIN),
        InlineKeyboardButton::callback("Change genre", CHANGE_GENRE),
    ]])
}

#[derive(Debug, PartialEq)]
enum Button {
    Answer { round: u32, index: usize },
    PlayAgain,
    ChangeGenre,
}

fn parse_button(data: &str) -> Option<Button> {
    match data {
        PLAY_AGAIN => return Some(Button::PlayAgain),
        CHANGE_GENRE => return Some(Button::ChangeGenre),
        _ => {}
    }
    let mut parts = data.split(':');
    if parts.next()? != ANSWER_PREFIX {
        return None;
    }
    let round = parts.next()?.parse().ok()?;
    let index = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Button::Answer { round, index })
}

fn game_over_text(reason: &GameOverReason, score: u32) -> String {
    let headline = match reason {
        GameOverReason::WrongAnswer { correct } => {
            format!("Game Over! The right answer was <b>{}</b>.", escape(correct))
        }
        GameOverReason::NoMovies => {
            "No movies could be found for this genre. Please try again later.".to_string()
        }
        GameOverReason::Unreachable => {
            "There was a problem fetching the movie data. Please try again later.".to_string()
        }
    };
    format!("{}\nYou reached level {}.", headline, score)
}

const WIN_TEXT: &str = "<b>Congratulations!</b>\nYou won!\nSadly there is no real money here, but you made it!";

/// Minimal escaping for Telegram's HTML parse mode.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn question_text(round: &Round, score: u32) -> String {
    format!(
        "Question {}:\n<b>{}</b>\n\n{}",
        round.number,
        escape(&round.prompt()),
        scoreboard::render(score)
    )
}

async fn show_notices(bot: &Bot, chat_id: ChatId, state: &GameState, notices: &[Notice]) -> HandlerResult {
    for notice in notices {
        match notice {
            Notice::Correct => {
                bot.send_message(chat_id, "Correct!").await?;
            }
            Notice::Question(round) => {
                bot.send_message(chat_id, question_text(round, state.score))
                    .parse_mode(ParseMode::Html)
                    .reply_markup(answer_keyboard(round))
                    .await?;
            }
            Notice::GameOver(reason) => {
                bot.send_message(chat_id, game_over_text(reason, state.score))
                    .parse_mode(ParseMode::Html)
                    .reply_markup(finished_keyboard())
                    .await?;
            }
            Notice::Won => {
                bot.send_message(chat_id, WIN_TEXT)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(finished_keyboard())
                    .await?;
            }
            Notice::Stale => {}
        }
    }
    Ok(())
}

/// Runs one event through the controller, stores the resulting state and
/// then shows the notices. The state is saved even if sending fails.
async fn dispatch(
    controller: &QuizController,
    bot: &Bot,
    dialogue: &QuizDialogue,
    state: GameState,
    event: Event,
) -> HandlerResult {
    let chat_id = dialogue.chat_id();
    if matches!(event, Event::Start(_) | Event::Restart | Event::Answer { .. }) {
        // Fetching takes a while; the indicator is optional.
        let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;
    }

    let step = controller.handle(state, event).await;
    dialogue.update(State::InGame(step.state.clone())).await?;
    show_notices(bot, chat_id, &step.state, &step.notices).await
}

const GREETING_TEXT: &str = "Hi! I'm the movie quiz bot. Answer questions about movies and climb all the way to level 14. One wrong answer and it's game over! Pick a genre to start.";

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    let last_round = match dialogue.get().await? {
        Some(State::InGame(game)) => game.round,
        Some(State::Lobby { last_round }) => last_round,
        _ => 0,
    };
    dialogue.update(State::Lobby { last_round }).await?;
    bot.send_message(msg.chat.id, GREETING_TEXT)
        .reply_markup(genre_keyboard())
        .await?;
    Ok(())
}

async fn receive_genre(
    controller: Arc<QuizController>,
    bot: Bot,
    dialogue: QuizDialogue,
    last_round: u32,
    msg: Message,
) -> HandlerResult {
    let Some(genre) = msg.text().and_then(Genre::from_name) else {
        bot.send_message(msg.chat.id, "Please pick one of the genres")
            .reply_markup(genre_keyboard())
            .await?;
        return Ok(());
    };

    bot.send_message(msg.chat.id, format!("{} it is! Here comes the first question.", genre))
        .reply_markup(KeyboardRemove::new())
        .await?;
    let lobby = GameState::after_round(genre, last_round);
    dispatch(&controller, &bot, &dialogue, lobby, Event::Start(genre)).await
}

async fn stray_message(bot: Bot, game: GameState, msg: Message) -> HandlerResult {
    let text = if game.is_finished() {
        "The game is over. Tap \"Play again\" or send /restart."
    } else {
        "Use the buttons under the question to answer."
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn receive_command(
    controller: Arc<QuizController>,
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    cmd: Command,
) -> HandlerResult {
    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Start => start(bot, dialogue, msg).await?,
        Command::Restart => match dialogue.get().await? {
            Some(State::InGame(game)) => {
                dispatch(&controller, &bot, &dialogue, game, Event::Restart).await?
            }
            _ => start(bot, dialogue, msg).await?,
        },
    }
    Ok(())
}

async fn receive_button(
    controller: Arc<QuizController>,
    config: Arc<Config>,
    bot: Bot,
    dialogue: QuizDialogue,
    q: CallbackQuery,
) -> HandlerResult {
    // Stops the button's loading spinner; nothing to do if it fails.
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(button) = q.data.as_deref().and_then(parse_button) else {
        warn!("Unknown button data {:?}", q.data);
        return Ok(());
    };
    let game = match dialogue.get().await? {
        Some(State::InGame(game)) => game,
        _ => {
            debug!("Button pressed outside of a game");
            return Ok(());
        }
    };

    match button {
        Button::ChangeGenre => {
            dialogue.update(State::Lobby { last_round: game.round }).await?;
            bot.send_message(dialogue.chat_id(), "Pick a genre")
                .reply_markup(genre_keyboard())
                .await?;
            Ok(())
        }
        Button::PlayAgain => dispatch(&controller, &bot, &dialogue, game, Event::Restart).await,
        Button::Answer { round, index } => {
            let mut game = game;
            let late = game
                .current
                .as_ref()
                .is_some_and(|current| current.number == round && current.answered_late(unix_now(), config.away_after));
            if late {
                game = controller.handle(game, Event::FocusLost).await.state;
            }
            dispatch(&controller, &bot, &dialogue, game, Event::Answer { round, index }).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::testing::{movie, ScriptedSource};

    #[test]
    fn answer_buttons_round_trip() {
        assert_eq!(
            parse_button("answer:12:3"),
            Some(Button::Answer { round: 12, index: 3 })
        );
        assert_eq!(parse_button(PLAY_AGAIN), Some(Button::PlayAgain));
        assert_eq!(parse_button(CHANGE_GENRE), Some(Button::ChangeGenre));
    }

    #[test]
    fn junk_buttons_are_rejected() {
        for data in ["", "answer", "answer:1", "answer:x:1", "answer:1:2:3", "vote:1:2"] {
            assert_eq!(parse_button(data), None, "{:?}", data);
        }
    }

    #[test]
    fn game_over_text_escapes_answers() {
        let text = game_over_text(
            &GameOverReason::WrongAnswer {
                correct: "Tom & Jerry <3".into(),
            },
            4,
        );
        assert!(text.contains("<b>Tom &amp; Jerry &lt;3</b>"));
        assert!(text.ends_with("You reached level 4."));
    }

    /// A bot whose API url points at a port nobody listens on.
    async fn unreachable_bot() -> Bot {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);
        Bot::new("1234:test").set_api_url(reqwest::Url::parse(&url).unwrap())
    }

    #[tokio::test]
    async fn state_is_saved_even_when_sending_fails() {
        let script = ["q", "w1", "w2", "w3"]
            .into_iter()
            .map(|tag| Ok(movie(tag)))
            .collect();
        let controller = QuizController::new(Arc::new(ScriptedSource::new(script)), 6);
        let storage: DialogueStorage = InMemStorage::<State>::new().erase();
        let dialogue = QuizDialogue::new(storage, ChatId(42));

        let result = dispatch(
            &controller,
            &unreachable_bot().await,
            &dialogue,
            GameState::after_round(Genre::Action, 4),
            Event::Start(Genre::Action),
        )
        .await;

        assert!(result.is_err());
        match dialogue.get().await.unwrap() {
            Some(State::InGame(game)) => {
                assert!(game.is_playing());
                assert_eq!(game.round, 5);
                assert_eq!(game.current.map(|round| round.movie.title), Some("Title q".to_string()));
            }
            _ => panic!("the new game was not stored"),
        }
    }
}
