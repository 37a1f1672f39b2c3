mod chat;
mod tools;

pub use chat::ChatCommand;
pub use tools::ToolsCommand;
