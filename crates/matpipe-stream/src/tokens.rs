//! Sentinel tokens and command text exchanged with the engine.
//!
//! These strings are a wire contract: the engine prints them verbatim, and
//! reads wait for exact byte matches.

/// Printed by the display command at the end of every exchange.
pub const COMMAND_END_TOKEN: &str = "___MATLAB_PIPE_COMMAND_ENDED___";

/// The engine's interactive prompt.
pub const DEFAULT_PROMPT: &str = ">> ";

/// The engine is ready to receive a load payload on its console.
pub const LOAD_READY: &[u8] = b"ack load stdio\n";

/// The engine finished consuming a load payload.
pub const LOAD_FINISHED: &[u8] = b"ack load finished\n";

/// Binary save output follows immediately after this token.
pub const BINARY_START: &[u8] = b"start_binary\n";

/// Pseudo-file name that maps load/save onto the console stream.
pub const PSEUDO_FILE: &str = "stdio";

/// Legacy container version requested from save.
pub const SAVE_FORMAT: &str = "-v6";

/// The byte sequence that ends every synchronized exchange.
pub fn completion_marker(token: &str, prompt: &str) -> Vec<u8> {
    format!("{token}\n{prompt}").into_bytes()
}

/// Command that makes the engine print `token` on its own line.
pub fn display_command(token: &str) -> String {
    format!("disp('{token}');")
}

/// Command that reads variables from the console as a data file.
pub fn load_command() -> String {
    format!("load {PSEUDO_FILE};")
}

/// Command that writes variables to the console as a data file.
///
/// `None` saves the whole workspace.
pub fn save_command(names: Option<&[String]>) -> String {
    let mut args = vec![format!("'{PSEUDO_FILE}'")];
    if let Some(names) = names {
        args.extend(names.iter().map(|name| format!("'{name}'")));
    }
    args.push(format!("'{SAVE_FORMAT}'"));
    format!("save({});", args.join(", "))
}
