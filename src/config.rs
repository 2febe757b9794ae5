// ABOUTME: Version and REPL constants for the Duso interpreter

pub const VERSION: &str = "0.1.0";
pub const WELCOME_MESSAGE: &str = "Duso v0.1";
pub const WELCOME_SUBTITLE: &str = "An embeddable scripting language for agent workflows";
pub const WELCOME_FOOTER: &str = "Type a statement to run it, 'quit' or Ctrl-D to exit.";

pub const PROMPT: &str = "duso> ";
pub const HISTORY_FILE: &str = ".duso_history";
