//! `rally`: command-line client for the badminton matching service.

mod cli;
mod render;
mod room_sync;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use rally_api::{
    ApiClient, ApiConfig, FileTokenStore, NewMember, ProfileUpdate, SessionEvent, TokenStore,
};
use rally_channel::{
    ChannelConfig, ConnectionState, FanOutPolicy, ReconnectPolicy, RoomChannel, WsConnector,
};
use rally_core::{RoomDetail, RoomLink};
use std::sync::Arc;
use std::time::Duration;

use cli::{Cli, Command, JoinArgs, ManagerCommand, MatchCommand};
use room_sync::RoomSync;

fn api_client(cli: &Cli) -> Result<ApiClient> {
    let store = match &cli.token_file {
        Some(path) => FileTokenStore::new(path),
        None => FileTokenStore::at_default_path()?,
    };
    let tokens: Arc<dyn TokenStore> = Arc::new(store);
    let config = ApiConfig {
        base_url: cli.api_url.clone(),
        timeout: Duration::from_secs(cli.timeout),
    };
    Ok(ApiClient::new(config, tokens)?)
}

/// Room id for a `watch` target, parsed the same way as `join --link`.
async fn resolve_room(api: &ApiClient, target: &str) -> Result<u64> {
    match RoomLink::parse(target)? {
        RoomLink::Room(id) => Ok(id),
        RoomLink::EntryCode(code) => match api.join_by_entry_code(&code).await? {
            Some(room) if room.id != 0 => Ok(room.id),
            _ => bail!("Joined with code {code} but the server did not say which room"),
        },
    }
}

async fn join(api: &ApiClient, args: JoinArgs) -> Result<Option<RoomDetail>> {
    if let Some(id) = args.room_id {
        return Ok(api.join_room(id).await?);
    }
    if let Some(code) = args.code {
        return Ok(api.join_by_entry_code(&code).await?);
    }
    let link = args.link.context("Nothing to join")?;
    match RoomLink::parse(&link)? {
        RoomLink::Room(id) => Ok(api.join_room(id).await?),
        RoomLink::EntryCode(code) => Ok(api.join_by_entry_code(&code).await?),
    }
}

async fn watch(api: ApiClient, ws_url: &str, target: &str, max_retries: u32) -> Result<()> {
    let room_id = resolve_room(&api, target).await?;

    let config = ChannelConfig {
        websocket_url: ws_url.to_string(),
        fan_out: FanOutPolicy::Uniform,
        reconnect: ReconnectPolicy {
            max_retries,
            ..ReconnectPolicy::default()
        },
        ..ChannelConfig::default()
    };
    let connector = WsConnector::new(config.websocket_url.clone());
    let channel = RoomChannel::new(config, Arc::new(connector));

    let sync = RoomSync::start(&channel, Arc::new(api.clone()), room_id).await?;
    let mut changes = sync.subscribe();
    let mut states = channel.subscribe_state();
    let mut sessions = api.subscribe();

    print!("{}", render::room(&changes.borrow_and_update()));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                println!();
                print!("{}", render::room(&changes.borrow_and_update()));
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                eprintln!("-- {state:?}");
                if state == ConnectionState::Failed {
                    bail!("Lost connection to room {room_id}");
                }
            }
            event = sessions.recv() => {
                if let Ok(SessionEvent::Expired) = event {
                    bail!("Session expired, run `rally login` again");
                }
            }
        }
    }

    channel.disconnect();
    info!("Stopped watching room {}", sync.room_id());
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let api = api_client(&cli)?;

    match cli.command {
        Command::Login { login_id, password } => {
            api.login(&login_id, &password).await?;
            println!("Logged in as {login_id}");
        }
        Command::Logout => {
            api.logout()?;
            println!("Logged out");
        }
        Command::Register(args) => {
            let member = NewMember {
                login_id: args.login_id,
                password: args.password,
                username: args.name,
                phone_number: args.phone,
                level: args.level,
            };
            api.register(&member).await?;
            println!("Registered {}", member.login_id);
        }
        Command::Profile => print!("{}", render::profile(&api.profile().await?)),
        Command::UpdateProfile { name, level } => {
            let profile = api.update_profile(&ProfileUpdate { name, level }).await?;
            print!("{}", render::profile(&profile));
        }
        Command::DeleteAccount { password } => {
            api.delete_member(&password).await?;
            println!("Account deleted");
        }
        Command::Rooms => print!("{}", render::room_list(&api.rooms().await?)),
        Command::CreateRoom { name } => print!("{}", render::room(&api.create_room(&name).await?)),
        Command::Join(args) => match join(&api, args).await? {
            Some(room) => print!("{}", render::room(&room)),
            None => println!("Joined"),
        },
        Command::Room { room_id } => print!("{}", render::room(&api.room(room_id).await?)),
        Command::Status { room_id, status } => {
            api.update_room_status(room_id, status).await?;
            println!("Status set to {status:?}");
        }
        Command::Manager(ManagerCommand::Grant { room_id, member_id }) => {
            api.grant_manager(room_id, member_id).await?;
            println!("Member {member_id} now manages room {room_id}");
        }
        Command::Manager(ManagerCommand::Revoke { room_id, member_id }) => {
            api.revoke_manager(room_id, member_id).await?;
            println!("Member {member_id} no longer manages room {room_id}");
        }
        Command::Match(MatchCommand::Start { room_id, matching_type }) => {
            api.start_matching(room_id, matching_type).await?;
            println!("Matching started ({matching_type:?})");
        }
        Command::Match(MatchCommand::Custom { room_id, member_ids }) => {
            api.start_custom_matching(room_id, &member_ids).await?;
            println!("Group formed");
        }
        Command::Match(MatchCommand::Replace {
            room_id,
            group_id,
            old_member_id,
            new_member_id,
        }) => {
            api.replace_group_member(room_id, group_id, old_member_id, new_member_id)
                .await?;
            println!("Replaced {old_member_id} with {new_member_id} in group {group_id}");
        }
        Command::Match(MatchCommand::GroupStatus {
            room_id,
            group_id,
            status,
        }) => {
            api.update_group_status(room_id, group_id, status).await?;
            println!("Group {group_id} is now {status:?}");
        }
        Command::Watch { room, max_retries } => watch(api, &cli.ws_url, &room, max_retries).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    run(Cli::parse()).await
}
