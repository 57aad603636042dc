use dotenv::dotenv;
use std::sync::Arc;
use teloxide::dispatching::dialogue::{self, InMemStorage};
use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::types::{ChatId, ParseMode};
use teloxide::{prelude::*, utils::command::BotCommands};

mod callback;
mod config;
mod db;
mod dietary;
mod error;
mod recipe;
mod render;
mod scaling;
mod session;
mod view;

use callback::Action;
use config::Config;
use db::RecipeStore;
use render::Reply;
use session::{OpenRecipe, Outcome, State};
use view::Detail;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type MyDialogue = Dialogue<State, InMemStorage<State>>;

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
enum Command {
    #[command(description = "Display this text.")]
    Help,
    #[command(description = "List every recipe.")]
    Recipes,
    #[command(description = "Show the recipe with the given id.")]
    Recipe(String),
    #[command(description = "Propose a recipe you have not been proposed yet.")]
    Random,
}

#[tokio::main]
async fn main() {
    // Load all env variables from .env file.
    dotenv().ok();
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();
    log::info!("Starting bot...");

    let config = Config::from_env();
    log::info!("Serving recipes from {:?}", config.recipes_path);
    let store = RecipeStore::new(config.recipes_path.clone());

    let bot = Bot::from_env();
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![
            Arc::new(store),
            Arc::new(config),
            InMemStorage::<State>::new()
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    let command_handler = dptree::entry()
        .filter_command::<Command>()
        .branch(dptree::case![Command::Help].endpoint(help))
        .branch(dptree::case![Command::Recipes].endpoint(send_catalog))
        .branch(dptree::case![Command::Recipe(id)].endpoint(send_recipe))
        .branch(dptree::case![Command::Random].endpoint(send_random_recipe));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(dptree::endpoint(receive_servings));

    let callback_handler = Update::filter_callback_query().endpoint(receive_action);

    dialogue::enter::<Update, InMemStorage<State>, State, _>()
        .branch(message_handler)
        .branch(callback_handler)
}

async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

async fn send_reply(
    bot: &Bot,
    chat_id: ChatId,
    reply: Reply,
) -> Result<Message, teloxide::RequestError> {
    let mut request = bot
        .send_message(chat_id, reply.text)
        .parse_mode(ParseMode::Html);
    if let Some(keyboard) = reply.keyboard {
        request = request.reply_markup(keyboard);
    }
    request.await
}

async fn send_catalog(bot: Bot, store: Arc<RecipeStore>, msg: Message) -> HandlerResult {
    let rows = match store.fetch_catalog() {
        Ok(rows) => rows,
        Err(e) => {
            log::error!("Error loading recipes: {}", e);
            Vec::new()
        }
    };
    let entries = view::catalog_entries(rows);
    log::debug!("Sending a catalog of {} recipes", entries.len());
    send_reply(&bot, msg.chat.id, render::catalog_reply(&entries)).await?;
    Ok(())
}

async fn send_recipe(
    bot: Bot,
    dialogue: MyDialogue,
    store: Arc<RecipeStore>,
    config: Arc<Config>,
    state: State,
    id: String,
) -> HandlerResult {
    open_recipe(&bot, &dialogue, &store, &config, state, id.trim()).await
}

async fn send_random_recipe(
    bot: Bot,
    dialogue: MyDialogue,
    store: Arc<RecipeStore>,
    config: Arc<Config>,
    mut state: State,
) -> HandlerResult {
    let recipe = match store.fetch_random_recipe(&state.seen) {
        Ok(Some(recipe)) => recipe,
        Ok(None) => {
            let text = state.nothing_to_propose();
            bot.send_message(dialogue.chat_id(), text).await?;
            dialogue.update(state).await?;
            return Ok(());
        }
        Err(e) => {
            log::error!("Error loading recipes: {}", e);
            return Ok(());
        }
    };
    state.seen.push(recipe.id.clone());
    show_detail(&bot, &dialogue, &config, state, Detail::from(Some(recipe))).await
}

async fn open_recipe(
    bot: &Bot,
    dialogue: &MyDialogue,
    store: &RecipeStore,
    config: &Config,
    state: State,
    id: &str,
) -> HandlerResult {
    match store.fetch_recipe_from_id(id) {
        Ok(recipe) => show_detail(bot, dialogue, config, state, Detail::from(recipe)).await,
        Err(e) => {
            log::error!("Error loading recipe {:?}: {}", id, e);
            Ok(())
        }
    }
}

/// Sends a fresh detail view, replacing whatever recipe the chat had open.
async fn show_detail(
    bot: &Bot,
    dialogue: &MyDialogue,
    config: &Config,
    mut state: State,
    detail: Detail,
) -> HandlerResult {
    let chat_id = dialogue.chat_id();
    state.open = None;
    let token = state.next_token();
    let view = match detail {
        Detail::Found(view) => view,
        not_found => {
            send_reply(bot, chat_id, render::detail_reply(&not_found, token)).await?;
            dialogue.update(state).await?;
            return Ok(());
        }
    };

    let recipe = view.recipe();
    if let Some(image) = recipe.image.as_deref().filter(|i| !i.is_empty()) {
        let photo = render::image_file(image, &config.assets_dir);
        if let Err(e) = bot
            .send_photo(chat_id, photo)
            .caption(recipe.title.clone())
            .await
        {
            log::warn!("Failed to send image {:?} of {:?}: {}", image, recipe.id, e);
        }
    }

    let sent = send_reply(bot, chat_id, render::view_reply(&view, token)).await?;
    log::debug!("Opened recipe {:?} in chat {}", view.recipe().id, chat_id);
    state.open = Some(OpenRecipe {
        view,
        message_id: sent.id,
        token,
    });
    dialogue.update(state).await?;
    Ok(())
}

/// Stores `state` and edits the open detail message when the outcome asks for it.
async fn rerender(
    bot: &Bot,
    dialogue: &MyDialogue,
    state: State,
    outcome: Outcome,
) -> HandlerResult {
    if let Outcome::Edit { message_id, reply } = outcome {
        let mut request = bot
            .edit_message_text(dialogue.chat_id(), message_id, reply.text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = reply.keyboard {
            request = request.reply_markup(keyboard);
        }
        request.await?;
    }
    dialogue.update(state).await?;
    Ok(())
}

async fn receive_servings(
    bot: Bot,
    dialogue: MyDialogue,
    msg: Message,
    mut state: State,
) -> HandlerResult {
    let outcome = match msg.text() {
        Some(text) => session::apply_text(&mut state, text),
        None => Outcome::Ignored,
    };
    if outcome == Outcome::Ignored {
        bot.send_message(msg.chat.id, "Browse the recipes with /recipes")
            .await?;
        return Ok(());
    }
    rerender(&bot, &dialogue, state, outcome).await
}

async fn receive_action(
    bot: Bot,
    dialogue: MyDialogue,
    store: Arc<RecipeStore>,
    config: Arc<Config>,
    q: CallbackQuery,
    mut state: State,
) -> HandlerResult {
    let Some(action) = q.data.as_deref().and_then(Action::decode) else {
        log::debug!("Ignoring callback data {:?}", q.data);
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    if let Action::Open(id) = &action {
        bot.answer_callback_query(q.id).await?;
        return open_recipe(&bot, &dialogue, &store, &config, state, id).await;
    }

    match session::apply(&mut state, &action) {
        Outcome::Notice(text) => {
            log::debug!("Refused {:?}: {}", action, text);
            bot.answer_callback_query(q.id).text(text).await?;
            Ok(())
        }
        outcome => {
            bot.answer_callback_query(q.id).await?;
            rerender(&bot, &dialogue, state, outcome).await
        }
    }
}
