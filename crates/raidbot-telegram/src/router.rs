use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use raidbot_core::{
    config::Config,
    cooldown::Cooldown,
    copy::AnnouncementCopy,
    dispatcher::{Announcer, Dispatcher as AnnouncementDispatcher},
    feed::FeedSource,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    triggers::ManualTriggers,
    watcher::{FeedWatcher, WatcherConfig},
};
use raidbot_twitter::TwitterClient;

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    /// Our own username, used to drop `/cmd@otherbot`. `None` if `get_me` failed.
    pub bot_username: Option<String>,
    pub messenger: Arc<dyn MessagingPort>,
    pub triggers: Arc<ManualTriggers>,
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    let bot_username = match bot.get_me().await {
        Ok(me) => {
            info!(bot = %me.username(), "raidbot started");
            me.user.username.clone()
        }
        Err(e) => {
            warn!(error = %e, "get_me failed; commands addressed with @mention will be ignored");
            None
        }
    };
    info!(
        account = %cfg.twitter_user_id,
        destinations = cfg.destinations.len(),
        "watching account"
    );

    // Throttle on top of the raw adapter; the adapter still retries once on RetryAfter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let feed: Arc<dyn FeedSource> = Arc::new(TwitterClient::new(
        cfg.twitter_bearer_token.clone(),
        cfg.twitter_api_base.clone(),
    ));

    let announcer: Arc<dyn Announcer> = Arc::new(AnnouncementDispatcher::new(
        messenger.clone(),
        cfg.destinations.clone(),
        AnnouncementCopy::default(),
        cfg.raid_image_path.clone(),
    ));

    let cancel = CancellationToken::new();
    let watcher = FeedWatcher::new(WatcherConfig::from(&*cfg), feed.clone(), announcer.clone());
    let watcher_task = tokio::spawn(watcher.run(cancel.clone()));

    let triggers = Arc::new(ManualTriggers::new(
        feed,
        announcer,
        cfg.twitter_user_id.clone(),
        cfg.fetch_limit,
        Cooldown::new(
            cfg.raid_cooldown_enabled,
            cfg.raid_cooldown_requests,
            cfg.raid_cooldown_window,
        ),
    ));

    let state = Arc::new(AppState {
        bot_username,
        messenger,
        triggers,
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    cancel.cancel();
    if let Err(e) = watcher_task.await {
        warn!(error = %e, "feed watcher task ended abnormally");
    }

    Ok(())
}
