use clap::{ Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Gateway Args ---
    /// Base URL of the assistant API (e.g., http://127.0.0.1:8000)
    #[arg(long, env = "CHAT_BASE_URL", default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    // --- Storage Args ---
    /// Chat state storage type (file, memory)
    #[arg(long, env = "STORAGE_TYPE", default_value = "file")]
    pub storage_type: String,

    /// Directory holding the persisted chat and auth snapshots.
    #[arg(long, env = "STORAGE_DIR", default_value = ".chat-client")]
    pub storage_dir: String,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check credentials against the API and remember them.
    Login {
        #[arg(long, env = "CHAT_EMAIL")]
        email: String,
        #[arg(long, env = "CHAT_PASSWORD")]
        password: String,
    },
    /// Create an account on the API.
    Register {
        #[arg(long, env = "CHAT_EMAIL")]
        email: String,
        #[arg(long, env = "CHAT_PASSWORD")]
        password: String,
    },
    /// Forget the stored credentials.
    Logout,
    /// Create a new chat.
    New {
        #[arg(default_value = "New chat")]
        title: String,
        /// Make the new chat the active one.
        #[arg(long, default_value = "false")]
        select: bool,
    },
    /// List chats grouped by today, this week and earlier.
    List {
        /// Only show chats whose title contains this text (case-insensitive).
        #[arg(short, long, default_value = "")]
        query: String,
    },
    /// Make a chat the active one.
    Select { id: String },
    /// Delete a chat.
    Delete { id: String },
    /// Print the messages of the active chat.
    Show,
    /// Send a message to the assistant in the active chat.
    Send { text: String },
}
