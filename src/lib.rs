pub mod auth;
pub mod chat;
pub mod cli;
pub mod gateway;
pub mod history;
pub mod models;

use auth::AuthStore;
use chat::{ ChatController, Rejection, Submission };
use chrono::Local;
use cli::{ Args, Command };
use gateway::new_gateway;
use history::categorize::{ categorize, filter };
use history::snapshot::create_snapshot_store;
use history::SessionStore;
use log::{ info, warn };
use models::auth::Credentials;
use models::chat::Sender;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Gateway Base URL: {}", args.base_url);
    info!("Storage Type: {}", args.storage_type);
    info!("Storage Dir: {}", args.storage_dir);
    info!("-------------------------");

    let backend = create_snapshot_store(&args)?;
    let mut auth = AuthStore::open(backend.clone())?;
    let store = Arc::new(Mutex::new(SessionStore::open(backend)?));
    let gateway = new_gateway(&args)?;

    match args.command {
        Command::Login { email, password } => {
            let reply = auth.sign_in(gateway.as_ref(), Credentials::new(email, password)).await?;
            println!("{}", reply.into_content());
        }
        Command::Register { email, password } => {
            let reply = gateway.register(&Credentials::new(email, password)).await?;
            println!("{}", reply.into_content());
        }
        Command::Logout => {
            auth.logout()?;
        }
        Command::New { title, select } => {
            let controller = ChatController::new(store.clone(), gateway, auth.credentials().cloned());
            let id = controller.create_chat(&title).await?;
            if select {
                store.lock().await.set_active_session(&id)?;
            }
            println!("{}", id);
        }
        Command::List { query } => {
            let store = store.lock().await;
            let buckets = categorize(store.sessions(), &Local::now());
            let visible = filter(&buckets, &query);
            if visible.is_empty() {
                println!("No chats");
            }
            let active = store.active_session_id();
            for (label, sessions) in visible.iter_labeled() {
                println!("{}", label);
                for session in sessions {
                    let marker = if active == Some(session.id.as_str()) { "*" } else { " " };
                    println!("{} {}  {}", marker, session.id, session.title);
                }
            }
        }
        Command::Select { id } => {
            store.lock().await.set_active_session(&id)?;
        }
        Command::Delete { id } => {
            if !store.lock().await.delete_session(&id)? {
                warn!("No chat with id {}", id);
            }
        }
        Command::Show => {
            let controller = ChatController::new(store, gateway, auth.credentials().cloned());
            for message in controller.messages().await {
                print_message(message.sender, &message.content);
            }
        }
        Command::Send { text } => {
            let controller = ChatController::new(store, gateway, auth.credentials().cloned());
            controller.set_input(&text).await;
            match controller.submit().await? {
                Submission::Replied(message) => print_message(message.sender, &message.content),
                Submission::Rejected(Rejection::EmptyInput) => warn!("Nothing to send"),
                Submission::Rejected(Rejection::NoActiveSession) => {
                    warn!("No active chat; select one with `select <id>`")
                }
                Submission::Rejected(Rejection::SendInFlight) => {
                    warn!("A message is already being sent")
                }
            }
        }
    }

    Ok(())
}

fn print_message(sender: Sender, content: &str) {
    println!("[{}] {}", sender, content);
}
